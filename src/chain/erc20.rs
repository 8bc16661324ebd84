//! `ethers` implementation of [`TokenContract`]
//!
//! Connects over JSON-RPC (HTTP), verifies the chain id, and signs with a
//! local wallet through `SignerMiddleware`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TxHash, U64, U256};
use tracing::{debug, info};

use super::error::{ChainError, classify_contract_error, classify_message};
use super::{TokenConnector, TokenContract, TransferReceipt};
use crate::config::ChainConfig;

abigen!(
    Erc20Token,
    r#"[
        function transfer(address to, uint256 amount) external returns (bool)
        function balanceOf(address owner) external view returns (uint256)
        function decimals() external view returns (uint8)
        function symbol() external view returns (string)
        function name() external view returns (string)
    ]"#
);

/// Provider + local signer stack used for every real transfer
pub type SignedClient = SignerMiddleware<Provider<Http>, LocalWallet>;

#[derive(Debug)]
pub struct Erc20Client<M: Middleware> {
    client: Arc<M>,
    contract: Erc20Token<M>,
    signer: Address,
    confirmations: usize,
    poll_interval: Duration,
}

impl<M: Middleware + 'static> Erc20Client<M> {
    pub fn new(
        client: Arc<M>,
        token: Address,
        signer: Address,
        confirmations: usize,
        poll_interval: Duration,
    ) -> Self {
        let contract = Erc20Token::new(token, client.clone());
        Self {
            client,
            contract,
            signer,
            confirmations,
            poll_interval,
        }
    }
}

#[async_trait]
impl<M> TokenContract for Erc20Client<M>
where
    M: Middleware + std::fmt::Debug + 'static,
{
    fn token_address(&self) -> Address {
        self.contract.address()
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn decimals(&self) -> Result<u8, ChainError> {
        self.contract
            .decimals()
            .call()
            .await
            .map_err(|e| classify_contract_error(&e))
    }

    async fn symbol(&self) -> Result<String, ChainError> {
        self.contract
            .symbol()
            .call()
            .await
            .map_err(|e| classify_contract_error(&e))
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, ChainError> {
        self.contract
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| classify_contract_error(&e))
    }

    async fn estimate_transfer_gas(&self, to: Address, amount: U256) -> Result<U256, ChainError> {
        self.contract
            .transfer(to, amount)
            .from(self.signer)
            .estimate_gas()
            .await
            .map_err(|e| classify_contract_error(&e))
    }

    async fn send_transfer(&self, to: Address, amount: U256) -> Result<TxHash, ChainError> {
        let call = self.contract.transfer(to, amount);
        let pending = call
            .send()
            .await
            .map_err(|e| classify_contract_error(&e))?;
        let tx_hash = *pending;
        debug!(tx_hash = ?tx_hash, "Transfer broadcast");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransferReceipt>, ChainError> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .confirmations(self.confirmations)
            .interval(self.poll_interval)
            .await
            .map_err(|e| classify_message(&e.to_string()))?;

        Ok(receipt.map(|r| TransferReceipt {
            transaction_hash: r.transaction_hash,
            block_number: r.block_number.map(|n| n.as_u64()).unwrap_or_default(),
            gas_used: r.gas_used.unwrap_or_default(),
            succeeded: r.status.is_none_or(|s| s == U64::one()),
        }))
    }
}

/// Connects signed token handles using the `chain` section of the config.
#[derive(Debug, Clone)]
pub struct RpcTokenConnector {
    config: ChainConfig,
}

impl RpcTokenConnector {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    fn provider(&self) -> Result<Provider<Http>, ChainError> {
        Provider::<Http>::try_from(self.config.rpc_url.as_str()).map_err(|e| {
            ChainError::Network(format!("Invalid RPC url {}: {}", self.config.rpc_url, e))
        })
    }
}

#[async_trait]
impl TokenConnector for RpcTokenConnector {
    async fn connect(&self, wallet: &LocalWallet) -> Result<Arc<dyn TokenContract>, ChainError> {
        let token = super::parse_address(&self.config.token_address)?;
        let provider = self.provider()?;

        let actual = provider
            .get_chainid()
            .await
            .map_err(|e| classify_message(&e.to_string()))?;
        if actual != U256::from(self.config.chain_id) {
            return Err(ChainError::WrongChain {
                expected: self.config.chain_id,
                actual: actual.low_u64(),
            });
        }

        let wallet = wallet.clone().with_chain_id(self.config.chain_id);
        let signer = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        info!(
            network = %self.config.network,
            chain_id = self.config.chain_id,
            signer = %super::checksummed(&signer),
            "Token session connected"
        );

        Ok(Arc::new(Erc20Client::new(
            client,
            token,
            signer,
            self.config.confirmations,
            Duration::from_millis(self.config.poll_interval_ms),
        )))
    }
}
