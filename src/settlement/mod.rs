//! Token Settlement
//!
//! Deposit and withdrawal of DAN between user wallets and the platform,
//! reconciled with the ledger.
//!
//! # Architecture
//!
//! ```text
//! SettlementService
//!   |-- withdraw only: LedgerApi::pre_withdraw (daily cap)
//!   |-- TransferExecutor::execute(TokenSession, TransferIntent) -> OnChainResult
//!   +-- LedgerNotifier::notify(&OnChainResult)                   -> LedgerRecord
//! ```
//!
//! Each step gates the next. There is no coordination between concurrent
//! settlements; the advisory balance check does not lock anything.

pub mod error;
pub mod executor;
pub mod service;
pub mod session;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use error::SettlementError;
pub use executor::TransferExecutor;
pub use service::SettlementService;
pub use session::TokenSession;
pub use state::SettlementState;
pub use types::{
    BalanceSnapshot, LedgerRecord, OnChainResult, SettlementReport, TransferDirection,
    TransferIntent, WalletBalance,
};
