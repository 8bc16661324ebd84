//! Account operations against the platform ledger
//!
//! Off-chain only: sign-up, profile, balance, internal transfers between
//! members, investment packages and holdings, the binary team tree and
//! referrals, history and the dashboard summary. Inputs are checked locally
//! before a request is sent.

pub mod validation;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::ledger::client::unwrap_data;
use crate::ledger::types::{
    BalanceData, BuyPackageRequest, DashboardData, DepositHistoryEntry, DirectReferralList,
    HistoryData, HistoryEntry, InternalTransferRequest, InvestmentList, PackageList, Profile,
    ReferralData, RegisteredUser, SignUpRequest, TeamData, UpdateFullnameRequest,
};
use crate::ledger::{LedgerClient, LedgerError, LedgerReply};

pub use validation::ValidationError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Package {0} not found")]
    PackageNotFound(i64),

    #[error("Insufficient balance for {name}: requires {required} DAN, available {available} DAN")]
    CannotAfford {
        name: String,
        required: Decimal,
        available: Decimal,
    },
}

impl AccountError {
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::Validation(_) => "VALIDATION_ERROR",
            AccountError::Ledger(e) => e.code(),
            AccountError::PackageNotFound(_) => "PACKAGE_NOT_FOUND",
            AccountError::CannotAfford { .. } => "INSUFFICIENT_BALANCE",
        }
    }
}

/// One page of filtered history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub page: usize,
    pub total_pages: usize,
    /// Entries matching the filter
    pub matched: usize,
}

/// Client-side filter and pagination over `GET /history`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub tran_type: String,
    pub page: usize,
    pub per_page: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            tran_type: "all".to_string(),
            page: 1,
            per_page: 10,
        }
    }
}

impl HistoryQuery {
    pub fn apply(&self, history: &HistoryData) -> Result<HistoryPage, ValidationError> {
        if self.page == 0 || self.per_page == 0 {
            return Err(ValidationError::InvalidPage);
        }
        let filtered = history.filter_by_type(&self.tran_type);
        let matched = filtered.len();
        let total_pages = matched.div_ceil(self.per_page);
        let entries = filtered
            .into_iter()
            .skip((self.page - 1).saturating_mul(self.per_page))
            .take(self.per_page)
            .cloned()
            .collect();
        Ok(HistoryPage {
            entries,
            page: self.page,
            total_pages,
            matched,
        })
    }
}

/// Outcome of `POST /auth/sign-up`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub message: Option<String>,
    pub user: Option<RegisteredUser>,
}

pub struct AccountService {
    client: Arc<LedgerClient>,
}

impl AccountService {
    pub fn new(client: Arc<LedgerClient>) -> Self {
        Self { client }
    }

    /// `GET /get-balance`: ledger-side DAN balance
    pub async fn balance(&self) -> Result<BalanceData, AccountError> {
        Ok(self.client.get_data("/get-balance").await?)
    }

    /// `POST /transfer`: move ledger balance to another member's wallet
    pub async fn transfer(
        &self,
        amount: Decimal,
        to_wallet_address: &str,
    ) -> Result<LedgerReply, AccountError> {
        let request = InternalTransferRequest {
            dan_amount: validation::validate_amount(amount)?,
            to_wallet_address: validation::validate_wallet_address(to_wallet_address)?,
        };
        let reply = self.client.post_reply("/transfer", &request).await?;
        info!(amount = %request.dan_amount, to = %request.to_wallet_address, "Internal transfer done");
        Ok(reply)
    }

    pub async fn packages(&self) -> Result<PackageList, AccountError> {
        Ok(self.client.get_data("/get-packages").await?)
    }

    /// `POST /buy-package`, refused locally when the listing says the user
    /// cannot afford it.
    pub async fn buy_package(&self, p_id: i64) -> Result<LedgerReply, AccountError> {
        let p_id = validation::validate_package_id(p_id)?;
        let list = self.packages().await?;
        let package = list
            .packages
            .iter()
            .find(|p| p.p_id == p_id)
            .ok_or(AccountError::PackageNotFound(p_id))?;
        if !package.can_afford {
            return Err(AccountError::CannotAfford {
                name: package.p_name.clone(),
                required: package.required_dan,
                available: package.user_balance,
            });
        }

        let reply = self
            .client
            .post_reply("/buy-package", &BuyPackageRequest { p_id })
            .await?;
        info!(p_id, name = %package.p_name, "Package purchased");
        Ok(reply)
    }

    pub async fn history(&self) -> Result<HistoryData, AccountError> {
        Ok(self.client.get_data("/history").await?)
    }

    pub async fn history_page(&self, query: &HistoryQuery) -> Result<HistoryPage, AccountError> {
        let history = self.history().await?;
        Ok(query.apply(&history)?)
    }

    /// `GET /dashboard`
    pub async fn dashboard(&self) -> Result<DashboardData, AccountError> {
        let body: Value = self.client.get("/dashboard").await?;
        decode(checked_data(body, "Failed to fetch dashboard")?)
    }

    /// `POST /auth/sign-up`. `referrer` and `side` place the new member in
    /// the sponsor's binary tree; both are optional.
    pub async fn register(&self, request: &SignUpRequest) -> Result<Registration, AccountError> {
        let request = SignUpRequest {
            referrer: request
                .referrer
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            side: request.side,
            firstname: validation::validate_name("firstname", &request.firstname)?,
            lastname: validation::validate_name("lastname", &request.lastname)?,
            wallet_address: validation::validate_wallet_address(&request.wallet_address)?,
        };

        let reply = self.client.post_reply("/auth/sign-up", &request).await?;
        let user = match reply.data.clone() {
            Some(data) if !data.is_null() => Some(decode::<RegisteredUser>(data)?),
            _ => None,
        };
        info!(
            wallet = %request.wallet_address,
            referrer = request.referrer.as_deref().unwrap_or(""),
            side = request.side.map(|s| s.as_str()).unwrap_or(""),
            "Member registered"
        );
        Ok(Registration {
            message: reply.message(),
            user,
        })
    }

    pub async fn profile(&self) -> Result<Profile, AccountError> {
        Ok(self.client.get_data("/profile").await?)
    }

    /// `PUT /profile/fullname`
    pub async fn update_fullname(
        &self,
        firstname: &str,
        lastname: &str,
    ) -> Result<LedgerReply, AccountError> {
        let request = UpdateFullnameRequest {
            firstname: validation::validate_name("firstname", firstname)?,
            lastname: validation::validate_name("lastname", lastname)?,
        };
        Ok(self.client.put_reply("/profile/fullname", &request).await?)
    }

    /// `GET /my-team`: sponsor, upline and both legs of the binary tree
    pub async fn team(&self) -> Result<TeamData, AccountError> {
        Ok(self.client.get_data("/my-team").await?)
    }

    pub async fn direct_referrals(&self) -> Result<DirectReferralList, AccountError> {
        Ok(self.client.get_data("/my-direct-ref").await?)
    }

    /// `GET /ref-link`: referral code and the left/right sign-up links
    pub async fn referral_links(&self) -> Result<ReferralData, AccountError> {
        Ok(self.client.get_data("/ref-link").await?)
    }

    pub async fn investments(&self) -> Result<InvestmentList, AccountError> {
        let body: Value = self.client.get("/my-investment").await?;
        decode(checked_data(body, "Failed to fetch investment data")?)
    }

    /// `GET /deposit/history`; rows come bare, enveloped, or under `deposits`.
    pub async fn deposit_history(&self) -> Result<Vec<DepositHistoryEntry>, AccountError> {
        let body: Value = self.client.get("/deposit/history").await?;
        let rows = match checked_data(body, "Failed to fetch deposit history")? {
            Value::Object(mut map) => match map.remove("deposits") {
                Some(rows) => rows,
                None => Value::Object(map),
            },
            other => other,
        };
        decode(rows)
    }
}

/// `success: false` on a 200 is a rejection; otherwise the `data` payload.
fn checked_data(body: Value, fallback: &str) -> Result<Value, LedgerError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = ["error", "message"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .unwrap_or(fallback)
            .to_string();
        return Err(LedgerError::Rejected(message));
    }
    Ok(unwrap_data(body))
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R, AccountError> {
    serde_json::from_value(value).map_err(|e| AccountError::Ledger(LedgerError::Decode(e.to_string())))
}
