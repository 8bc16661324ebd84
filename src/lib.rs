//! DAN Settlement Client
//!
//! Moves DAN tokens between member wallets and the platform on-chain, and
//! keeps the platform ledger in step with every confirmed transfer.
//!
//! # Modules
//!
//! - [`money`] - exact human <-> base-unit amount conversion
//! - [`chain`] - ERC-20 contract seam, `ethers` client, address checks
//! - [`settlement`] - executor, token session, two-phase settlement service
//! - [`ledger`] - REST client for the ledger API and the settlement notifier
//! - [`auth`] - wallet-signature login and token storage
//! - [`account`] - off-chain balance, transfers, packages, history
//! - [`config`] - YAML configuration, wallet secrets from the environment
//! - [`logging`] - tracing subscriber setup

pub mod account;
pub mod auth;
pub mod chain;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod settlement;

pub use chain::{ChainError, TokenConnector, TokenContract};
pub use config::{AppConfig, ConfigError};
pub use ledger::{LedgerApi, LedgerClient, LedgerError};
pub use money::MoneyError;
pub use settlement::{
    SettlementError, SettlementReport, SettlementService, SettlementState, TransferDirection,
};
