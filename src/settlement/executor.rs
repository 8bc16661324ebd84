//! Transfer Executor
//!
//! Runs one on-chain token transfer from start to confirmation:
//!
//! 1. Validate addresses and amount (no network)
//! 2. Connect; the sender must be the session's signer
//! 3. Resolve decimals through the session
//! 4. Convert to base units
//! 5. Advisory balance check (fresh read, never cached)
//! 6. Best-effort gas estimate
//! 7. Submit `transfer(to, amount)`
//! 8. Wait for the receipt
//!
//! Nothing is retried. Once a transaction has been submitted, any failure
//! carries its hash so the caller can check it before trying again.

use ethers::types::Address;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::error::SettlementError;
use super::session::TokenSession;
use super::state::SettlementState;
use super::types::{BalanceSnapshot, OnChainResult, TransferIntent};
use crate::chain::{ChainError, checksummed, parse_address};
use crate::money;

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferExecutor;

impl TransferExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Local checks only: positive amount, well-formed addresses.
    pub fn validate(intent: &TransferIntent) -> Result<(Address, Address), SettlementError> {
        if intent.amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let from = parse_address(&intent.from)?;
        let to = parse_address(&intent.to)?;
        if from == to {
            return Err(SettlementError::InvalidAddress(
                "Sender and recipient are the same address".to_string(),
            ));
        }
        Ok((from, to))
    }

    pub async fn execute(
        &self,
        session: &mut TokenSession,
        intent: &TransferIntent,
    ) -> Result<OnChainResult, SettlementError> {
        let mut progress = Progress::new(intent);
        let (from, to) = Self::validate(intent)?;
        progress.advance(SettlementState::Validated);

        let contract = session.contract().await?;
        let signer = contract.signer_address();
        if from != signer {
            return Err(SettlementError::InvalidAddress(format!(
                "Sender {} is not the connected signer {}",
                checksummed(&from),
                checksummed(&signer)
            )));
        }
        let decimals = session.decimals().await?;
        let required = money::to_base_units(intent.amount, decimals)?;

        let snapshot = BalanceSnapshot {
            owner: from,
            base_units: contract.balance_of(from).await?,
            decimals,
        };
        if !snapshot.covers(required) {
            warn!(
                direction = %intent.direction,
                required = %intent.amount,
                available = %snapshot.display(),
                "Balance below transfer amount, not submitting"
            );
            return Err(SettlementError::InsufficientBalance {
                required: intent.amount.normalize().to_string(),
                available: snapshot.display(),
            });
        }

        match contract.estimate_transfer_gas(to, required).await {
            Ok(gas) => debug!(gas = %gas, "Gas estimated"),
            Err(e) => warn!(error = %e, "Gas estimation failed, submitting anyway"),
        }

        let tx_hash = contract.send_transfer(to, required).await?;
        let hash_hex = format!("{:#x}", tx_hash);
        progress.advance(SettlementState::Submitted);
        info!(
            direction = %intent.direction,
            amount = %intent.amount,
            base_units = %required,
            tx_hash = %hash_hex,
            "Transfer submitted, waiting for confirmation"
        );

        match contract.wait_for_receipt(tx_hash).await {
            Ok(Some(receipt)) if receipt.succeeded => {
                progress.advance(SettlementState::Confirmed);
                info!(
                    tx_hash = %hash_hex,
                    block = receipt.block_number,
                    gas_used = %receipt.gas_used,
                    "Transfer confirmed"
                );
                Ok(OnChainResult {
                    transaction_hash: receipt.transaction_hash,
                    block_number: receipt.block_number,
                    gas_used: receipt.gas_used,
                    confirmed: true,
                })
            }
            Ok(Some(receipt)) => Err(SettlementError::ContractCallReverted(format!(
                "transaction {} reverted in block {}",
                hash_hex, receipt.block_number
            ))),
            Ok(None) => Err(SettlementError::Unknown {
                message: "transaction dropped before confirmation".to_string(),
                tx_hash: Some(hash_hex),
            }),
            Err(ChainError::Reverted(m)) => Err(SettlementError::ContractCallReverted(m)),
            Err(e) => Err(SettlementError::Unknown {
                message: e.to_string(),
                tx_hash: Some(hash_hex),
            }),
        }
    }
}

/// Walks one intent through the legal state transitions
struct Progress<'a> {
    intent: &'a TransferIntent,
    state: SettlementState,
}

impl<'a> Progress<'a> {
    fn new(intent: &'a TransferIntent) -> Self {
        Self {
            intent,
            state: SettlementState::Init,
        }
    }

    fn advance(&mut self, next: SettlementState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal settlement transition {} -> {}",
            self.state,
            next
        );
        debug!(
            direction = %self.intent.direction,
            amount = %self.intent.amount,
            from = %self.state,
            state = %next,
            "Settlement state"
        );
        self.state = next;
    }
}
