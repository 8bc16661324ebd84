use ethers::contract::ContractError;
use ethers::providers::Middleware;
use thiserror::Error;

/// Chain-side failures, already classified.
///
/// Raw provider/contract errors are unstable strings; everything leaving
/// the `chain` module goes through [`classify_contract_error`] or
/// [`classify_message`] first.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Insufficient funds for transaction: {0}")]
    InsufficientFunds(String),

    #[error("Transaction rejected by signer")]
    UserRejected,

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("Contract call reverted: {0}")]
    Reverted(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Wrong network: expected chain id {expected}, connected to {actual}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Signer unavailable: {0}")]
    Signer(String),

    #[error("{0}")]
    Unknown(String),
}

/// Map a contract-call error to a [`ChainError`].
///
/// A typed revert is recognised structurally; every other variant falls
/// back to [`classify_message`].
pub fn classify_contract_error<M: Middleware>(err: &ContractError<M>) -> ChainError {
    if let ContractError::Revert(data) = err {
        return ChainError::Reverted(format!("execution reverted ({})", data));
    }
    classify_message(&err.to_string())
}

/// Substring classification of a provider/middleware error message.
///
/// Order matters: node messages like "insufficient funds for gas * price +
/// value" must not be classified as gas failures.
pub fn classify_message(message: &str) -> ChainError {
    let lower = message.to_lowercase();

    if lower.contains("insufficient funds") {
        ChainError::InsufficientFunds(message.to_string())
    } else if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("rejected by user")
    {
        ChainError::UserRejected
    } else if lower.contains("gas") {
        ChainError::GasEstimation(message.to_string())
    } else if lower.contains("execution reverted")
        || lower.contains("call_exception")
        || lower.contains("revert")
    {
        ChainError::Reverted(message.to_string())
    } else if lower.contains("error sending request")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("timed out")
        || lower.contains("dns error")
    {
        ChainError::Network(message.to_string())
    } else {
        ChainError::Unknown(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{Http, Provider};
    use ethers::types::Bytes;

    #[test]
    fn test_insufficient_funds_wins_over_gas() {
        let err = classify_message("insufficient funds for gas * price + value");
        assert!(matches!(err, ChainError::InsufficientFunds(_)));
    }

    #[test]
    fn test_user_rejected() {
        assert_eq!(
            classify_message("MetaMask Tx Signature: User denied transaction signature."),
            ChainError::UserRejected
        );
        assert_eq!(
            classify_message("user rejected transaction"),
            ChainError::UserRejected
        );
    }

    #[test]
    fn test_gas_and_revert() {
        assert!(matches!(
            classify_message("gas required exceeds allowance (30000000)"),
            ChainError::GasEstimation(_)
        ));
        assert!(matches!(
            classify_message("execution reverted: ERC20: transfer amount exceeds balance"),
            ChainError::Reverted(_)
        ));
        assert!(matches!(
            classify_message("CALL_EXCEPTION"),
            ChainError::Reverted(_)
        ));
    }

    #[test]
    fn test_network_and_unknown() {
        assert!(matches!(
            classify_message("error sending request for url (http://127.0.0.1:8545/)"),
            ChainError::Network(_)
        ));
        assert_eq!(
            classify_message("nonce too low"),
            ChainError::Unknown("nonce too low".to_string())
        );
    }

    #[test]
    fn test_typed_revert_is_structural() {
        let err: ContractError<Provider<Http>> =
            ContractError::Revert(Bytes::from(vec![0x08, 0xc3, 0x79, 0xa0]));
        assert!(matches!(
            classify_contract_error(&err),
            ChainError::Reverted(_)
        ));
    }
}
