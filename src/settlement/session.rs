//! Token session
//!
//! Owns the signed contract handle for one wallet. The handle is connected on
//! first use and the token's decimals are read once per session. Switching
//! the account drops both so the next call reconnects with the new signer.

use std::sync::Arc;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use tracing::{debug, info};

use crate::chain::{ChainError, TokenConnector, TokenContract, checksummed};
use crate::money;

pub struct TokenSession {
    connector: Arc<dyn TokenConnector>,
    wallet: LocalWallet,
    contract: Option<Arc<dyn TokenContract>>,
    decimals: Option<u8>,
}

impl TokenSession {
    pub fn new(connector: Arc<dyn TokenConnector>, wallet: LocalWallet) -> Self {
        Self {
            connector,
            wallet,
            contract: None,
            decimals: None,
        }
    }

    /// Address of the signing wallet
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    pub fn is_connected(&self) -> bool {
        self.contract.is_some()
    }

    /// Contract handle, connecting on first use
    pub async fn contract(&mut self) -> Result<Arc<dyn TokenContract>, ChainError> {
        if let Some(contract) = &self.contract {
            return Ok(contract.clone());
        }
        let contract = self.connector.connect(&self.wallet).await?;
        debug!(signer = %checksummed(&self.address()), "Token contract connected");
        self.contract = Some(contract.clone());
        Ok(contract)
    }

    /// Token decimals, queried once; a failed query falls back to 18.
    pub async fn decimals(&mut self) -> Result<u8, ChainError> {
        if let Some(decimals) = self.decimals {
            return Ok(decimals);
        }
        let contract = self.contract().await?;
        let decimals = money::resolve_decimals(contract.decimals().await);
        self.decimals = Some(decimals);
        Ok(decimals)
    }

    /// Account-changed event: the next call reconnects with `wallet`.
    pub fn switch_account(&mut self, wallet: LocalWallet) {
        info!(
            from = %checksummed(&self.address()),
            to = %checksummed(&wallet.address()),
            "Account changed, resetting token session"
        );
        self.wallet = wallet;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.contract = None;
        self.decimals = None;
    }
}

impl std::fmt::Debug for TokenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSession")
            .field("address", &checksummed(&self.address()))
            .field("connected", &self.is_connected())
            .field("decimals", &self.decimals)
            .finish()
    }
}
