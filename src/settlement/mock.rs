//! Mock token and ledger adapters for settlement tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TxHash, U256};
use rust_decimal::Decimal;

use crate::chain::{ChainError, TokenConnector, TokenContract, TransferReceipt};
use crate::ledger::types::{PreWithdrawResponse, WithdrawCap};
use crate::ledger::{LedgerApi, LedgerEntryRequest, LedgerError, LedgerReply};

pub const USER_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const PAYMENT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEPOSIT_WALLET: &str = "0x469bc9606e510EED0541Eb3E2D2405924126aEdB";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub fn user_wallet() -> LocalWallet {
    USER_KEY.parse().unwrap()
}

pub fn payment_wallet() -> LocalWallet {
    PAYMENT_KEY.parse().unwrap()
}

/// Hash starting `0xabc0...`
pub fn test_tx_hash() -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xab;
    bytes[1] = 0xc0;
    TxHash::from(bytes)
}

#[derive(Debug, Clone)]
pub enum ReceiptMode {
    Success,
    Reverted,
    Dropped,
    Error(ChainError),
}

#[derive(Debug)]
pub struct MockToken {
    signer: Mutex<Address>,
    decimals: Mutex<Result<u8, ChainError>>,
    balance: Mutex<U256>,
    symbol: Mutex<Result<String, ChainError>>,
    estimate_error: Mutex<Option<ChainError>>,
    send_error: Mutex<Option<ChainError>>,
    receipt: Mutex<ReceiptMode>,
    /// Every `send_transfer` call: (to, amount)
    sent: Mutex<Vec<(Address, U256)>>,
    balance_queries: Mutex<Vec<Address>>,
    decimals_calls: AtomicUsize,
    balance_calls: AtomicUsize,
    estimate_calls: AtomicUsize,
    send_calls: AtomicUsize,
    wait_calls: AtomicUsize,
}

impl MockToken {
    pub fn new() -> Self {
        Self {
            signer: Mutex::new(Address::zero()),
            decimals: Mutex::new(Ok(18)),
            balance: Mutex::new(U256::exp10(18) * U256::from(1_000_000u64)),
            symbol: Mutex::new(Ok("DAN".to_string())),
            estimate_error: Mutex::new(None),
            send_error: Mutex::new(None),
            receipt: Mutex::new(ReceiptMode::Success),
            sent: Mutex::new(Vec::new()),
            balance_queries: Mutex::new(Vec::new()),
            decimals_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            wait_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_decimals(&self, decimals: Result<u8, ChainError>) {
        *self.decimals.lock().unwrap() = decimals;
    }

    pub fn set_balance(&self, balance: U256) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn set_symbol(&self, symbol: Result<String, ChainError>) {
        *self.symbol.lock().unwrap() = symbol;
    }

    pub fn set_estimate_error(&self, err: Option<ChainError>) {
        *self.estimate_error.lock().unwrap() = err;
    }

    pub fn set_send_error(&self, err: Option<ChainError>) {
        *self.send_error.lock().unwrap() = err;
    }

    pub fn set_receipt(&self, mode: ReceiptMode) {
        *self.receipt.lock().unwrap() = mode;
    }

    fn set_signer(&self, signer: Address) {
        *self.signer.lock().unwrap() = signer;
    }

    pub fn sent(&self) -> Vec<(Address, U256)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn balance_queries(&self) -> Vec<Address> {
        self.balance_queries.lock().unwrap().clone()
    }

    pub fn decimals_calls(&self) -> usize {
        self.decimals_calls.load(Ordering::SeqCst)
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn estimate_calls(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn wait_calls(&self) -> usize {
        self.wait_calls.load(Ordering::SeqCst)
    }

    /// All calls that would reach a node
    pub fn network_calls(&self) -> usize {
        self.decimals_calls()
            + self.balance_calls()
            + self.estimate_calls()
            + self.send_calls()
            + self.wait_calls()
    }
}

#[async_trait]
impl TokenContract for MockToken {
    fn token_address(&self) -> Address {
        Address::repeat_byte(0x04)
    }

    fn signer_address(&self) -> Address {
        *self.signer.lock().unwrap()
    }

    async fn decimals(&self) -> Result<u8, ChainError> {
        self.decimals_calls.fetch_add(1, Ordering::SeqCst);
        self.decimals.lock().unwrap().clone()
    }

    async fn symbol(&self) -> Result<String, ChainError> {
        self.symbol.lock().unwrap().clone()
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, ChainError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.balance_queries.lock().unwrap().push(owner);
        Ok(*self.balance.lock().unwrap())
    }

    async fn estimate_transfer_gas(&self, _to: Address, _amount: U256) -> Result<U256, ChainError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        match self.estimate_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(U256::from(52_000u64)),
        }
    }

    async fn send_transfer(&self, to: Address, amount: U256) -> Result<TxHash, ChainError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push((to, amount));
        Ok(test_tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransferReceipt>, ChainError> {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
        let receipt = |succeeded| TransferReceipt {
            transaction_hash: tx_hash,
            block_number: 1234,
            gas_used: U256::from(51_234u64),
            succeeded,
        };
        match self.receipt.lock().unwrap().clone() {
            ReceiptMode::Success => Ok(Some(receipt(true))),
            ReceiptMode::Reverted => Ok(Some(receipt(false))),
            ReceiptMode::Dropped => Ok(None),
            ReceiptMode::Error(err) => Err(err),
        }
    }
}

/// Hands out the same [`MockToken`] for every wallet
pub struct MockConnector {
    pub token: Arc<MockToken>,
    connect_error: Mutex<Option<ChainError>>,
    connected: Mutex<Vec<Address>>,
}

impl MockConnector {
    pub fn new(token: Arc<MockToken>) -> Self {
        Self {
            token,
            connect_error: Mutex::new(None),
            connected: Mutex::new(Vec::new()),
        }
    }

    pub fn set_connect_error(&self, err: Option<ChainError>) {
        *self.connect_error.lock().unwrap() = err;
    }

    pub fn connect_count(&self) -> usize {
        self.connected.lock().unwrap().len()
    }

    /// Signer address of each connect call, in order
    pub fn connected(&self) -> Vec<Address> {
        self.connected.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenConnector for MockConnector {
    async fn connect(&self, wallet: &LocalWallet) -> Result<Arc<dyn TokenContract>, ChainError> {
        self.connected.lock().unwrap().push(wallet.address());
        if let Some(err) = self.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.token.set_signer(wallet.address());
        let token: Arc<dyn TokenContract> = self.token.clone();
        Ok(token)
    }
}

pub fn allowed_pre_withdraw(amount: Decimal) -> PreWithdrawResponse {
    PreWithdrawResponse {
        can_withdraw: true,
        attempted: amount,
        limit_24h: Decimal::from(10_000),
        used_last_24h: Decimal::ZERO,
        remaining_allowance: Decimal::from(10_000),
        projected_total: Some(amount),
        balance: None,
        cap: WithdrawCap { exceeded: false },
    }
}

pub struct MockLedger {
    deposits: Mutex<Vec<LedgerEntryRequest>>,
    withdrawals: Mutex<Vec<LedgerEntryRequest>>,
    pre_withdraw_calls: AtomicUsize,
    record_error: Mutex<Option<LedgerError>>,
    pre_withdraw: Mutex<Option<Result<PreWithdrawResponse, LedgerError>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            deposits: Mutex::new(Vec::new()),
            withdrawals: Mutex::new(Vec::new()),
            pre_withdraw_calls: AtomicUsize::new(0),
            record_error: Mutex::new(None),
            pre_withdraw: Mutex::new(None),
        }
    }

    pub fn fail_records(&self, err: LedgerError) {
        *self.record_error.lock().unwrap() = Some(err);
    }

    /// Fixed pre-check reply; without one every amount is allowed
    pub fn set_pre_withdraw(&self, reply: Result<PreWithdrawResponse, LedgerError>) {
        *self.pre_withdraw.lock().unwrap() = Some(reply);
    }

    pub fn deposits(&self) -> Vec<LedgerEntryRequest> {
        self.deposits.lock().unwrap().clone()
    }

    pub fn withdrawals(&self) -> Vec<LedgerEntryRequest> {
        self.withdrawals.lock().unwrap().clone()
    }

    pub fn deposit_count(&self) -> usize {
        self.deposits.lock().unwrap().len()
    }

    pub fn withdraw_count(&self) -> usize {
        self.withdrawals.lock().unwrap().len()
    }

    pub fn pre_withdraw_calls(&self) -> usize {
        self.pre_withdraw_calls.load(Ordering::SeqCst)
    }

    fn reply(&self) -> Result<LedgerReply, LedgerError> {
        match self.record_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(LedgerReply {
                success: Some(true),
                message: Some("Recorded".to_string()),
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl LedgerApi for MockLedger {
    async fn record_deposit(&self, entry: &LedgerEntryRequest) -> Result<LedgerReply, LedgerError> {
        self.deposits.lock().unwrap().push(entry.clone());
        self.reply()
    }

    async fn record_withdraw(
        &self,
        entry: &LedgerEntryRequest,
    ) -> Result<LedgerReply, LedgerError> {
        self.withdrawals.lock().unwrap().push(entry.clone());
        self.reply()
    }

    async fn pre_withdraw(&self, amount: Decimal) -> Result<PreWithdrawResponse, LedgerError> {
        self.pre_withdraw_calls.fetch_add(1, Ordering::SeqCst);
        match self.pre_withdraw.lock().unwrap().clone() {
            Some(reply) => reply,
            None => Ok(allowed_pre_withdraw(amount)),
        }
    }
}
