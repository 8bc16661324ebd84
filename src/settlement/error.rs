//! Settlement Error Types
//!
//! User-facing failure categories of a deposit or withdrawal. Raw chain and
//! HTTP errors are mapped into these before they reach a caller.

use thiserror::Error;

use crate::chain::ChainError;
use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::money::MoneyError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    // === Validation (before any network call) ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // === Advisory pre-checks ===
    #[error("Insufficient balance. Required: {required} DAN, Available: {available} DAN")]
    InsufficientBalance { required: String, available: String },

    #[error("{0}")]
    WithdrawNotAllowed(String),

    // === Chain ===
    #[error("Insufficient funds for gas: {0}")]
    InsufficientFunds(String),

    #[error("Transaction was rejected by the user")]
    UserRejected,

    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Contract call reverted: {0}")]
    ContractCallReverted(String),

    /// Outcome not known. When `tx_hash` is set the transfer may still
    /// land; verify it on-chain before retrying.
    #[error("{}", unknown_message(.message, .tx_hash))]
    Unknown {
        message: String,
        tx_hash: Option<String>,
    },

    // === Ledger ===
    #[error("Ledger notification failed: {0}")]
    LedgerNotifyFailed(String),

    #[error("{0}")]
    Api(String),

    // === Setup ===
    #[error("Configuration error: {0}")]
    Config(String),
}

fn unknown_message(message: &str, tx_hash: &Option<String>) -> String {
    match tx_hash {
        Some(hash) => format!(
            "Transaction {} status unknown: {}. Verify it on-chain before retrying.",
            hash, message
        ),
        None => format!("Unknown error: {}", message),
    }
}

impl SettlementError {
    pub fn unknown(message: impl Into<String>) -> Self {
        SettlementError::Unknown {
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::InvalidAmount(_) => "INVALID_AMOUNT",
            SettlementError::InvalidAddress(_) => "INVALID_ADDRESS",
            SettlementError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            SettlementError::WithdrawNotAllowed(_) => "WITHDRAW_NOT_ALLOWED",
            SettlementError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            SettlementError::UserRejected => "USER_REJECTED",
            SettlementError::GasEstimationFailed(_) => "GAS_ESTIMATION_FAILED",
            SettlementError::Network(_) => "NETWORK_ERROR",
            SettlementError::ContractCallReverted(_) => "CONTRACT_CALL_REVERTED",
            SettlementError::Unknown { .. } => "UNKNOWN",
            SettlementError::LedgerNotifyFailed(_) => "LEDGER_NOTIFY_FAILED",
            SettlementError::Api(_) => "API_ERROR",
            SettlementError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Rejected before anything was sent anywhere
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SettlementError::InvalidAmount(_) | SettlementError::InvalidAddress(_)
        )
    }
}

impl From<ChainError> for SettlementError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::InsufficientFunds(m) => SettlementError::InsufficientFunds(m),
            ChainError::UserRejected => SettlementError::UserRejected,
            ChainError::GasEstimation(m) => SettlementError::GasEstimationFailed(m),
            ChainError::Reverted(m) => SettlementError::ContractCallReverted(m),
            ChainError::Network(m) => SettlementError::Network(m),
            e @ ChainError::WrongChain { .. } => SettlementError::Network(e.to_string()),
            ChainError::InvalidAddress(m) => SettlementError::InvalidAddress(m),
            ChainError::Signer(m) => SettlementError::Config(m),
            ChainError::Unknown(m) => SettlementError::unknown(m),
        }
    }
}

impl From<MoneyError> for SettlementError {
    fn from(e: MoneyError) -> Self {
        SettlementError::InvalidAmount(e.to_string())
    }
}

impl From<ConfigError> for SettlementError {
    fn from(e: ConfigError) -> Self {
        SettlementError::Config(e.to_string())
    }
}

impl From<LedgerError> for SettlementError {
    fn from(e: LedgerError) -> Self {
        SettlementError::Api(e.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SettlementError::UserRejected.code(), "USER_REJECTED");
        assert_eq!(
            SettlementError::LedgerNotifyFailed("x".into()).code(),
            "LEDGER_NOTIFY_FAILED"
        );
        assert_eq!(SettlementError::unknown("x").code(), "UNKNOWN");
    }

    #[test]
    fn test_insufficient_balance_message() {
        let err = SettlementError::InsufficientBalance {
            required: "100".into(),
            available: "12.5".into(),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance. Required: 100 DAN, Available: 12.5 DAN"
        );
    }

    #[test]
    fn test_unknown_with_hash_asks_for_verification() {
        let err = SettlementError::Unknown {
            message: "receipt not found".into(),
            tx_hash: Some("0xabc".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("0xabc"));
        assert!(msg.contains("Verify it on-chain"));
    }

    #[test]
    fn test_from_chain_error() {
        assert_eq!(
            SettlementError::from(ChainError::Reverted("boom".into())),
            SettlementError::ContractCallReverted("boom".into())
        );
        assert_eq!(
            SettlementError::from(ChainError::WrongChain {
                expected: 56,
                actual: 1
            })
            .code(),
            "NETWORK_ERROR"
        );
        assert!(SettlementError::from(ChainError::InvalidAddress("0x1".into())).is_validation());
    }

    #[test]
    fn test_from_money_error() {
        let err: SettlementError = MoneyError::InvalidAmount.into();
        assert!(err.is_validation());
    }
}
