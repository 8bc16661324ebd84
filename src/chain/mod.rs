//! Token Contract Access
//!
//! ERC-20 shaped view of the DAN token used by the settlement flow.
//!
//! # Components
//!
//! - [`TokenContract`] - the contract-call seam (balance, decimals, transfer,
//!   confirmation). Implemented by [`erc20::Erc20Client`] over `ethers`, and
//!   by in-crate mocks in tests.
//! - [`TokenConnector`] - builds a signed [`TokenContract`] handle for a wallet.
//! - [`address`] - EIP-55 address validation.
//! - [`error`] - the single place raw chain errors are classified.

pub mod address;
pub mod erc20;
pub mod error;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::signers::LocalWallet;
use ethers::types::{Address, TxHash, U256};

pub use address::{checksummed, parse_address};
pub use erc20::{Erc20Client, RpcTokenConnector, SignedClient};
pub use error::{ChainError, classify_contract_error, classify_message};

/// Mined transfer, as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub gas_used: U256,
    /// `false` when the transaction was mined but reverted
    pub succeeded: bool,
}

/// ERC-20 calls the settlement flow needs, bound to one signing account.
#[async_trait]
pub trait TokenContract: Send + Sync + Debug {
    /// Token contract address
    fn token_address(&self) -> Address;

    /// Account that signs transfers sent through this handle
    fn signer_address(&self) -> Address;

    async fn decimals(&self) -> Result<u8, ChainError>;

    async fn symbol(&self) -> Result<String, ChainError>;

    async fn balance_of(&self, owner: Address) -> Result<U256, ChainError>;

    /// Gas estimate for `transfer(to, amount)` from the signer
    async fn estimate_transfer_gas(&self, to: Address, amount: U256) -> Result<U256, ChainError>;

    /// Sign and broadcast `transfer(to, amount)`. Returns once the node has
    /// accepted the transaction, not once it is mined.
    async fn send_transfer(&self, to: Address, amount: U256) -> Result<TxHash, ChainError>;

    /// Wait until `tx_hash` is mined with the configured confirmations.
    ///
    /// `Ok(None)` means the transaction was dropped from the mempool.
    async fn wait_for_receipt(&self, tx_hash: TxHash)
    -> Result<Option<TransferReceipt>, ChainError>;
}

/// Builds a [`TokenContract`] handle that signs with `wallet`.
#[async_trait]
pub trait TokenConnector: Send + Sync {
    async fn connect(&self, wallet: &LocalWallet) -> Result<Arc<dyn TokenContract>, ChainError>;
}
