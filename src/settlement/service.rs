//! Settlement Service
//!
//! Deposit and withdrawal as two explicit phases: the on-chain transfer,
//! then the ledger record. The ledger is only told about confirmed
//! transfers. When the second phase fails the report ends in
//! [`SettlementState::NeedsReconciliation`] and still counts as success,
//! since the tokens did move.
//!
//! Withdrawals first ask the ledger's daily-cap pre-check. A refusal ends
//! in [`SettlementState::Blocked`] without touching the chain.

use std::sync::Arc;

use ethers::signers::LocalWallet;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::error::SettlementError;
use super::executor::TransferExecutor;
use super::session::TokenSession;
use super::state::SettlementState;
use super::types::{SettlementReport, TransferDirection, TransferIntent, WalletBalance};
use crate::chain::{TokenConnector, checksummed};
use crate::ledger::{LedgerApi, LedgerNotifier};

pub struct SettlementService {
    executor: TransferExecutor,
    notifier: LedgerNotifier,
    ledger: Arc<dyn LedgerApi>,
    /// User's own wallet, signs deposits
    user: TokenSession,
    /// Platform custodial wallet, signs withdrawals
    payment: Option<TokenSession>,
    deposit_wallet: String,
    token_symbol: String,
}

impl SettlementService {
    pub fn new(
        connector: Arc<dyn TokenConnector>,
        ledger: Arc<dyn LedgerApi>,
        user_wallet: LocalWallet,
        deposit_wallet: impl Into<String>,
    ) -> Self {
        Self {
            executor: TransferExecutor::new(),
            notifier: LedgerNotifier::new(ledger.clone()),
            user: TokenSession::new(connector, user_wallet),
            ledger,
            payment: None,
            deposit_wallet: deposit_wallet.into(),
            token_symbol: "DAN".to_string(),
        }
    }

    /// Enable withdrawals, signed by the custodial `wallet`
    pub fn with_payment_wallet(
        mut self,
        connector: Arc<dyn TokenConnector>,
        wallet: LocalWallet,
    ) -> Self {
        self.payment = Some(TokenSession::new(connector, wallet));
        self
    }

    /// Symbol shown when the contract's `symbol()` cannot be read
    pub fn with_token_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.token_symbol = symbol.into();
        self
    }

    pub fn user_address(&self) -> String {
        checksummed(&self.user.address())
    }

    /// Account-changed event for the user wallet
    pub fn switch_account(&mut self, wallet: LocalWallet) {
        self.user.switch_account(wallet);
    }

    /// Move `amount` from the user's wallet to the platform deposit wallet,
    /// then record it with `POST /deposit`.
    pub async fn deposit(&mut self, amount: Decimal) -> SettlementReport {
        let intent = TransferIntent::new(
            amount,
            checksummed(&self.user.address()),
            self.deposit_wallet.clone(),
            TransferDirection::Deposit,
        );
        info!(amount = %amount, from = %intent.from, "Deposit started");
        settle(&self.executor, &self.notifier, &mut self.user, intent).await
    }

    /// Pay `amount` from the custodial wallet to `recipient`, then record it
    /// with `POST /withdraw`. Refused up front when the pre-check says no.
    pub async fn withdraw(&mut self, amount: Decimal, recipient: &str) -> SettlementReport {
        let direction = TransferDirection::Withdraw;
        let Some(payment) = self.payment.as_mut() else {
            return SettlementReport::failed(
                direction,
                amount,
                SettlementError::Config("Payment wallet is not configured".to_string()),
            );
        };

        let intent = TransferIntent::new(
            amount,
            checksummed(&payment.address()),
            recipient,
            direction,
        );
        if let Err(e) = TransferExecutor::validate(&intent) {
            return SettlementReport::failed(direction, amount, e);
        }

        info!(amount = %amount, to = %recipient, "Withdrawal pre-check");
        match self.ledger.pre_withdraw(amount).await {
            Ok(check) if !check.can_withdraw => {
                let message = check.refusal_message();
                warn!(
                    amount = %amount,
                    used_last_24h = %check.used_last_24h,
                    limit_24h = %check.limit_24h,
                    cap_exceeded = check.cap.exceeded,
                    "Withdrawal blocked by pre-check"
                );
                return SettlementReport::blocked(amount, message);
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Withdrawal pre-check failed");
                return SettlementReport::failed(direction, amount, e.into());
            }
        }

        settle(&self.executor, &self.notifier, payment, intent).await
    }

    /// Custodial wallet balance, for operators
    pub async fn payment_wallet_balance(&mut self) -> Result<WalletBalance, SettlementError> {
        let symbol = self.token_symbol.clone();
        let payment = self.payment.as_mut().ok_or_else(|| {
            SettlementError::Config("Payment wallet is not configured".to_string())
        })?;
        wallet_balance(payment, symbol).await
    }

    /// On-chain token balance of the user's wallet
    pub async fn user_wallet_balance(&mut self) -> Result<WalletBalance, SettlementError> {
        let symbol = self.token_symbol.clone();
        wallet_balance(&mut self.user, symbol).await
    }
}

async fn settle(
    executor: &TransferExecutor,
    notifier: &LedgerNotifier,
    session: &mut TokenSession,
    intent: TransferIntent,
) -> SettlementReport {
    let direction = intent.direction;
    let amount = intent.amount;

    let on_chain = match executor.execute(session, &intent).await {
        Ok(result) => result,
        Err(e) => {
            warn!(direction = %direction, amount = %amount, code = e.code(), error = %e, "Transfer failed");
            return SettlementReport::failed(direction, amount, e);
        }
    };

    match notifier.notify(direction, amount, &on_chain).await {
        Ok(record) => {
            info!(
                direction = %direction,
                amount = %amount,
                tx_hash = %record.transaction_hash,
                state = %SettlementState::Recorded,
                "Settlement complete"
            );
            SettlementReport::recorded(on_chain, record)
        }
        Err(e) => {
            error!(
                direction = %direction,
                amount = %amount,
                tx_hash = %on_chain.hash_hex(),
                state = %SettlementState::NeedsReconciliation,
                "Funds moved but ledger record is missing"
            );
            SettlementReport::needs_reconciliation(direction, amount, on_chain, e)
        }
    }
}

async fn wallet_balance(
    session: &mut TokenSession,
    fallback_symbol: String,
) -> Result<WalletBalance, SettlementError> {
    let contract = session.contract().await?;
    let decimals = session.decimals().await?;
    let owner = session.address();
    let raw = contract.balance_of(owner).await?;
    let symbol = match contract.symbol().await {
        Ok(symbol) => symbol,
        Err(e) => {
            warn!(error = %e, "Failed to read token symbol");
            fallback_symbol
        }
    };
    Ok(WalletBalance::new(&owner, raw, decimals, symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainError;
    use crate::ledger::LedgerError;
    use crate::ledger::types::{PreWithdrawResponse, WithdrawCap};
    use crate::settlement::mock::*;
    use ethers::signers::Signer;
    use ethers::types::U256;

    struct Harness {
        token: Arc<MockToken>,
        ledger: Arc<MockLedger>,
        service: SettlementService,
    }

    fn harness() -> Harness {
        let token = Arc::new(MockToken::new());
        let connector: Arc<MockConnector> = Arc::new(MockConnector::new(token.clone()));
        let ledger = Arc::new(MockLedger::new());
        let service =
            SettlementService::new(connector.clone(), ledger.clone(), user_wallet(), DEPOSIT_WALLET)
                .with_payment_wallet(connector, payment_wallet());
        Harness {
            token,
            ledger,
            service,
        }
    }

    fn blocked_reply() -> PreWithdrawResponse {
        PreWithdrawResponse {
            can_withdraw: false,
            attempted: Decimal::from(500),
            limit_24h: Decimal::from(1000),
            used_last_24h: Decimal::from(800),
            remaining_allowance: Decimal::from(200),
            projected_total: Some(Decimal::from(1300)),
            balance: None,
            cap: WithdrawCap { exceeded: true },
        }
    }

    #[tokio::test]
    async fn test_deposit_records_confirmed_hash() {
        let mut h = harness();
        let report = h.service.deposit(Decimal::from(100)).await;

        assert!(report.success, "{}", report.message);
        assert_eq!(report.state, SettlementState::Recorded);
        let deposits = h.ledger.deposits();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].dan_amount, Decimal::from(100));
        assert_eq!(deposits[0].txn_hash, format!("{:#x}", test_tx_hash()));
        assert!(deposits[0].txn_hash.starts_with("0xabc"));
        assert_eq!(h.token.sent()[0].1, U256::exp10(20));
    }

    #[tokio::test]
    async fn test_failed_confirmation_never_notifies() {
        for (mode, state) in [
            (ReceiptMode::Reverted, SettlementState::Failed),
            (ReceiptMode::Dropped, SettlementState::Unconfirmed),
            (
                ReceiptMode::Error(ChainError::Network("timed out".into())),
                SettlementState::Unconfirmed,
            ),
        ] {
            let mut h = harness();
            h.token.set_receipt(mode);

            let report = h.service.deposit(Decimal::from(10)).await;

            assert!(!report.success);
            assert_eq!(report.state, state);
            assert_eq!(h.ledger.deposit_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_insufficient_balance_never_submits_or_notifies() {
        let mut h = harness();
        h.token.set_balance(U256::from(1u64));

        let report = h.service.deposit(Decimal::from(10)).await;

        assert_eq!(report.failure.as_ref().map(|e| e.code()), Some("INSUFFICIENT_BALANCE"));
        assert!(report.message.starts_with("Insufficient balance. Required: 10 DAN"));
        assert_eq!(h.token.send_calls(), 0);
        assert_eq!(h.ledger.deposit_count(), 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_needs_reconciliation() {
        let mut h = harness();
        h.ledger.fail_records(LedgerError::Transport("connection refused".into()));

        let report = h.service.deposit(Decimal::from(5)).await;

        assert!(report.success);
        assert_eq!(report.state, SettlementState::NeedsReconciliation);
        assert!(report.on_chain.is_some());
        assert!(report.ledger.is_none());
        assert_eq!(
            report.failure.as_ref().map(|e| e.code()),
            Some("LEDGER_NOTIFY_FAILED")
        );
        // no compensating transfer
        assert_eq!(h.token.send_calls(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_pays_recipient_from_payment_wallet() {
        let mut h = harness();
        let report = h.service.withdraw(Decimal::from(25), RECIPIENT).await;

        assert!(report.success, "{}", report.message);
        assert_eq!(h.ledger.pre_withdraw_calls(), 1);
        assert_eq!(h.token.balance_queries(), vec![payment_wallet().address()]);
        assert_eq!(h.token.sent()[0].0, crate::chain::parse_address(RECIPIENT).unwrap());
        assert_eq!(h.ledger.withdraw_count(), 1);
        assert_eq!(h.ledger.deposit_count(), 0);
    }

    #[tokio::test]
    async fn test_blocked_withdraw_never_executes() {
        let mut h = harness();
        h.ledger.set_pre_withdraw(Ok(blocked_reply()));

        let report = h.service.withdraw(Decimal::from(500), RECIPIENT).await;

        assert_eq!(report.state, SettlementState::Blocked);
        assert!(!report.success);
        assert!(report.message.contains("Daily withdrawal limit exceeded"));
        assert_eq!(h.token.network_calls(), 0);
        assert_eq!(h.ledger.withdraw_count(), 0);
    }

    #[tokio::test]
    async fn test_pre_check_error_fails_closed() {
        let mut h = harness();
        h.ledger.set_pre_withdraw(Err(LedgerError::Unauthorized));

        let report = h.service.withdraw(Decimal::from(5), RECIPIENT).await;

        assert_eq!(report.state, SettlementState::Failed);
        assert_eq!(h.token.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_bad_recipient_skips_pre_check() {
        let mut h = harness();
        let report = h.service.withdraw(Decimal::from(5), "0x1234").await;

        assert_eq!(report.failure.as_ref().map(|e| e.code()), Some("INVALID_ADDRESS"));
        assert_eq!(h.ledger.pre_withdraw_calls(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_without_payment_wallet() {
        let token = Arc::new(MockToken::new());
        let connector = Arc::new(MockConnector::new(token));
        let ledger = Arc::new(MockLedger::new());
        let mut service =
            SettlementService::new(connector, ledger.clone(), user_wallet(), DEPOSIT_WALLET);

        let report = service.withdraw(Decimal::from(5), RECIPIENT).await;
        assert_eq!(report.failure.as_ref().map(|e| e.code()), Some("CONFIG_ERROR"));
        assert_eq!(ledger.pre_withdraw_calls(), 0);
    }

    #[tokio::test]
    async fn test_switch_account_changes_deposit_sender() {
        let mut h = harness();
        h.service.deposit(Decimal::ONE).await;
        h.service.switch_account(payment_wallet());
        h.service.deposit(Decimal::ONE).await;

        assert_eq!(
            h.token.balance_queries(),
            vec![user_wallet().address(), payment_wallet().address()]
        );
    }

    #[tokio::test]
    async fn test_payment_wallet_balance() {
        let mut h = harness();
        h.token.set_balance(U256::from_dec_str("1500000000000000000").unwrap());

        let balance = h.service.payment_wallet_balance().await.unwrap();
        assert_eq!(balance.balance, "1.5");
        assert_eq!(balance.symbol, "DAN");
        assert_eq!(balance.address, checksummed(&payment_wallet().address()));
    }

    #[tokio::test]
    async fn test_balance_beyond_decimal_precision_is_exact() {
        let mut h = harness();
        // 100 billion DAN plus one wei: 30 significant digits
        let raw = U256::from_dec_str("100000000000000000000000000001").unwrap();
        h.token.set_balance(raw);

        let balance = h.service.user_wallet_balance().await.unwrap();
        assert_eq!(balance.balance, "100000000000.000000000000000001");
        assert_eq!(balance.base_units, raw);

        let json = serde_json::to_value(&balance).unwrap();
        assert_eq!(json["base_units"], "100000000000000000000000000001");
    }

    #[tokio::test]
    async fn test_symbol_failure_uses_configured_symbol() {
        let mut h = harness();
        h.token.set_symbol(Err(ChainError::Reverted("no symbol".into())));
        h.service = h.service.with_token_symbol("tDAN");

        let balance = h.service.user_wallet_balance().await.unwrap();
        assert_eq!(balance.symbol, "tDAN");
    }
}
