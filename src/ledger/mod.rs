//! Platform Ledger
//!
//! The REST backend owns the authoritative off-chain balance. This module
//! holds the HTTP client, the request/response shapes, and the notifier that
//! records confirmed on-chain transfers.

pub mod client;
pub mod error;
pub mod notifier;
pub mod types;

#[cfg(test)]
pub(crate) mod test_server;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use notifier::LedgerNotifier;
pub use types::{LedgerEntryRequest, LedgerReply, PreWithdrawResponse};

/// Settlement endpoints of the ledger
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// `POST /deposit`
    async fn record_deposit(&self, entry: &LedgerEntryRequest) -> Result<LedgerReply, LedgerError>;

    /// `POST /withdraw`
    async fn record_withdraw(&self, entry: &LedgerEntryRequest)
    -> Result<LedgerReply, LedgerError>;

    /// `POST /withdraw/pre`: daily cap and balance check
    async fn pre_withdraw(&self, amount: Decimal) -> Result<PreWithdrawResponse, LedgerError>;
}
