//! Records passed between the settlement steps

use chrono::{DateTime, Utc};
use ethers::types::{Address, TxHash, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use super::error::SettlementError;
use super::state::SettlementState;
use crate::chain::checksummed;
use crate::money;

/// Which way tokens move relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// User wallet to platform deposit wallet
    Deposit,
    /// Platform payment wallet to the user's recipient address
    Withdraw,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::Deposit => "deposit",
            TransferDirection::Withdraw => "withdraw",
        }
    }

    /// Ledger route recording this direction
    pub fn ledger_path(&self) -> &'static str {
        match self {
            TransferDirection::Deposit => "/deposit",
            TransferDirection::Withdraw => "/withdraw",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested token movement.
///
/// Addresses stay as entered so the executor can reject malformed ones
/// before touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub amount: Decimal,
    pub from: String,
    pub to: String,
    pub direction: TransferDirection,
}

impl TransferIntent {
    pub fn new(
        amount: Decimal,
        from: impl Into<String>,
        to: impl Into<String>,
        direction: TransferDirection,
    ) -> Self {
        Self {
            amount,
            from: from.into(),
            to: to.into(),
            direction,
        }
    }
}

/// A transfer the network has mined successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnChainResult {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub gas_used: U256,
    pub confirmed: bool,
}

impl OnChainResult {
    /// `0x`-prefixed lowercase hex, as the ledger expects it
    pub fn hash_hex(&self) -> String {
        format!("{:#x}", self.transaction_hash)
    }
}

/// The ledger's acknowledgement of a settled transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRecord {
    pub direction: TransferDirection,
    pub amount: Decimal,
    pub transaction_hash: String,
    pub recorded_at: DateTime<Utc>,
    pub message: Option<String>,
}

/// Token balance read right before a transfer. Never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub owner: Address,
    pub base_units: U256,
    pub decimals: u8,
}

impl BalanceSnapshot {
    pub fn covers(&self, required: U256) -> bool {
        self.base_units >= required
    }

    /// Balance for display, truncated to 4 decimals
    pub fn display(&self) -> String {
        money::format_units_display(self.base_units, self.decimals, 4)
    }
}

/// Wallet balance with its token symbol, for display.
///
/// `balance` is the exact decimal string of `base_units`; token balances
/// can carry more significant digits than `Decimal` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletBalance {
    pub address: String,
    pub balance: String,
    #[serde(serialize_with = "serialize_u256_dec")]
    pub base_units: U256,
    pub decimals: u8,
    pub symbol: String,
}

fn serialize_u256_dec<S: serde::Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

impl WalletBalance {
    pub fn new(address: &Address, base_units: U256, decimals: u8, symbol: String) -> Self {
        Self {
            address: checksummed(address),
            balance: money::format_units(base_units, decimals),
            base_units,
            decimals,
            symbol,
        }
    }
}

/// Outcome of a deposit or withdrawal, returned instead of an error
#[derive(Debug, Clone, Serialize)]
pub struct SettlementReport {
    pub direction: TransferDirection,
    pub amount: Decimal,
    #[serde(serialize_with = "serialize_state")]
    pub state: SettlementState,
    /// True once funds have moved, even when the ledger record is missing
    pub success: bool,
    pub message: String,
    pub on_chain: Option<OnChainResult>,
    pub ledger: Option<LedgerRecord>,
    #[serde(skip)]
    pub failure: Option<SettlementError>,
}

fn serialize_state<S: serde::Serializer>(state: &SettlementState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(state.as_str())
}

impl SettlementReport {
    pub fn recorded(on_chain: OnChainResult, ledger: LedgerRecord) -> Self {
        let message = ledger.message.clone().unwrap_or_else(|| {
            format!(
                "{} of {} DAN recorded",
                capitalize(ledger.direction.as_str()),
                ledger.amount.normalize()
            )
        });
        Self {
            direction: ledger.direction,
            amount: ledger.amount,
            state: SettlementState::Recorded,
            success: true,
            message,
            on_chain: Some(on_chain),
            ledger: Some(ledger),
            failure: None,
        }
    }

    /// Funds moved on-chain but the ledger did not record them
    pub fn needs_reconciliation(
        direction: TransferDirection,
        amount: Decimal,
        on_chain: OnChainResult,
        error: SettlementError,
    ) -> Self {
        let message = format!(
            "Transfer confirmed on-chain ({}) but the {} could not be recorded: {}. \
             Contact support with the transaction hash.",
            on_chain.hash_hex(),
            direction,
            error
        );
        Self {
            direction,
            amount,
            state: SettlementState::NeedsReconciliation,
            success: true,
            message,
            on_chain: Some(on_chain),
            ledger: None,
            failure: Some(error),
        }
    }

    /// Failed attempt. An unknown outcome after submission ends in
    /// [`SettlementState::Unconfirmed`] rather than `Failed`.
    pub fn failed(direction: TransferDirection, amount: Decimal, error: SettlementError) -> Self {
        let state = match &error {
            SettlementError::Unknown {
                tx_hash: Some(_), ..
            } => SettlementState::Unconfirmed,
            _ => SettlementState::Failed,
        };
        Self {
            direction,
            amount,
            state,
            success: false,
            message: error.to_string(),
            on_chain: None,
            ledger: None,
            failure: Some(error),
        }
    }

    /// Refused by the withdrawal pre-check; a warning, not an error
    pub fn blocked(amount: Decimal, message: String) -> Self {
        Self {
            direction: TransferDirection::Withdraw,
            amount,
            state: SettlementState::Blocked,
            success: false,
            message: message.clone(),
            on_chain: None,
            ledger: None,
            failure: Some(SettlementError::WithdrawNotAllowed(message)),
        }
    }

    /// Tokens moved, or may have, without a matching ledger record
    pub fn needs_attention(&self) -> bool {
        matches!(
            self.state,
            SettlementState::NeedsReconciliation | SettlementState::Unconfirmed
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
