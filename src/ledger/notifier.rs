//! Records confirmed on-chain transfers with the ledger.
//!
//! Takes the [`OnChainResult`] itself rather than a bare hash, so nothing can
//! be recorded that the executor has not confirmed. A failure here leaves the
//! transfer in place; no compensating transfer is ever attempted.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info};

use super::LedgerApi;
use super::types::LedgerEntryRequest;
use crate::settlement::error::SettlementError;
use crate::settlement::types::{LedgerRecord, OnChainResult, TransferDirection};

#[derive(Clone)]
pub struct LedgerNotifier {
    api: Arc<dyn LedgerApi>,
}

impl LedgerNotifier {
    pub fn new(api: Arc<dyn LedgerApi>) -> Self {
        Self { api }
    }

    pub async fn notify(
        &self,
        direction: TransferDirection,
        amount: Decimal,
        on_chain: &OnChainResult,
    ) -> Result<LedgerRecord, SettlementError> {
        if !on_chain.confirmed {
            return Err(SettlementError::LedgerNotifyFailed(
                "transfer is not confirmed".to_string(),
            ));
        }

        let entry = LedgerEntryRequest {
            dan_amount: amount,
            txn_hash: on_chain.hash_hex(),
        };

        let result = match direction {
            TransferDirection::Deposit => self.api.record_deposit(&entry).await,
            TransferDirection::Withdraw => self.api.record_withdraw(&entry).await,
        };

        match result {
            Ok(reply) => {
                info!(
                    direction = %direction,
                    amount = %amount,
                    tx_hash = %entry.txn_hash,
                    "Ledger recorded transfer"
                );
                Ok(LedgerRecord {
                    direction,
                    amount,
                    transaction_hash: entry.txn_hash,
                    recorded_at: Utc::now(),
                    message: reply.message(),
                })
            }
            Err(e) => {
                error!(
                    direction = %direction,
                    amount = %amount,
                    tx_hash = %entry.txn_hash,
                    path = direction.ledger_path(),
                    error = %e,
                    "Ledger notify failed after on-chain confirmation"
                );
                Err(SettlementError::LedgerNotifyFailed(e.user_message()))
            }
        }
    }
}
