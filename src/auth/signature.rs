//! EIP-191 personal-message signatures for wallet login.
//!
//! The backend recovers the signer from `signature` over the nonce it issued,
//! so the private key never leaves this process.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature};

use crate::chain::ChainError;

/// Sign `message` as `personal_sign` does; returns `0x`-prefixed hex.
pub async fn sign_nonce(wallet: &LocalWallet, message: &str) -> Result<String, ChainError> {
    let signature = wallet
        .sign_message(message)
        .await
        .map_err(|e| ChainError::Signer(e.to_string()))?;
    Ok(format!("0x{}", signature))
}

/// Check that `signature` over `message` was produced by `expected`.
pub fn verify_signature(message: &str, signature: &str, expected: Address) -> bool {
    let Ok(sig) = signature.trim_start_matches("0x").parse::<Signature>() else {
        return false;
    };
    sig.verify(message, expected).is_ok()
}
