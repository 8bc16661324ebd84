//! Ledger API request/response shapes
//!
//! Amounts sent to the backend are JSON numbers (`dan_amount: 100`), so
//! request types serialize `Decimal` through `rust_decimal::serde::float`.
//! Response types use `Decimal`'s default deserializer, which accepts both
//! numbers and numeric strings; the backend mixes the two.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Settlement
// ============================================================================

/// Body of `POST /deposit` and `POST /withdraw`
///
/// `dan_amount` goes out as an `f64`, the backend's wire type. Amounts
/// beyond about 15 significant digits arrive rounded; the on-chain transfer
/// itself used the exact value, and `txn_hash` is the reconciliation key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntryRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub dan_amount: Decimal,
    pub txn_hash: String,
}

/// Body of `POST /withdraw/pre`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreWithdrawRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub dan_amount: Decimal,
}

/// Generic reply of the write endpoints: `{ success, message?, error?, data? }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerReply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl LedgerReply {
    /// An explicit `success: false` counts as a rejection even on HTTP 200.
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }

    /// Backend message, looking inside `data` as the deposit route does.
    pub fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| {
            self.data
                .as_ref()
                .and_then(|d| d.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
    }
}

/// Daily withdrawal cap check
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreWithdrawResponse {
    pub can_withdraw: bool,
    pub attempted: Decimal,
    pub limit_24h: Decimal,
    pub used_last_24h: Decimal,
    pub remaining_allowance: Decimal,
    #[serde(default)]
    pub projected_total: Option<Decimal>,
    #[serde(default)]
    pub balance: Option<PreWithdrawBalance>,
    pub cap: WithdrawCap,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreWithdrawBalance {
    pub current: Decimal,
    pub after: Decimal,
    pub insufficient: bool,
    pub shortfall: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WithdrawCap {
    pub exceeded: bool,
}

impl PreWithdrawResponse {
    /// User-facing warning when the withdrawal is refused
    pub fn refusal_message(&self) -> String {
        let mut msg = String::from("Withdrawal not allowed. ");
        if self.cap.exceeded {
            msg.push_str(&format!(
                "Daily withdrawal limit exceeded. You have used {} DAN out of {} DAN limit. \
                 Remaining allowance: {} DAN. You attempted to withdraw {} DAN.",
                self.used_last_24h.normalize(),
                self.limit_24h.normalize(),
                self.remaining_allowance.normalize(),
                self.attempted.normalize()
            ));
        } else if self.balance.as_ref().is_some_and(|b| b.insufficient) {
            msg.push_str("Insufficient balance for withdrawal.");
        } else {
            msg.push_str("Please check your withdrawal limits.");
        }
        msg
    }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

/// Body of `POST /auth/wallet-login`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletLoginRequest {
    pub wallet_address: String,
    pub signature: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub userid: i64,
    pub wallet_address: String,
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BalanceData {
    pub userid: i64,
    pub dan_balance: Decimal,
}

/// Body of `POST /transfer` (ledger-internal, no on-chain movement)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternalTransferRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub dan_amount: Decimal,
    pub to_wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageItem {
    pub p_id: i64,
    pub p_name: String,
    pub p_percent: Decimal,
    pub p_period: String,
    pub p_amount: Decimal,
    pub p_order: i64,
    pub required_dan: Decimal,
    pub can_afford: bool,
    pub user_balance: Decimal,
    pub dan_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageList {
    pub packages: Vec<PackageItem>,
    pub total_count: u64,
    pub dan_price: Decimal,
    pub user_balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuyPackageRequest {
    pub p_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    pub t_id: i64,
    pub tran_type: String,
    pub coin_name: String,
    pub in_amount: Decimal,
    pub out_amount: Decimal,
    #[serde(default)]
    pub fee_dan: Option<Decimal>,
    #[serde(default)]
    pub detail: String,
    pub created_datetime: String,
    #[serde(default)]
    pub admin_status: String,
    #[serde(default)]
    pub to_userid: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryData {
    pub transactions: Vec<HistoryEntry>,
    pub total_count: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl HistoryData {
    /// Entries of one `tran_type` (case-insensitive); `"all"` keeps everything.
    pub fn filter_by_type(&self, tran_type: &str) -> Vec<&HistoryEntry> {
        self.transactions
            .iter()
            .filter(|t| tran_type == "all" || t.tran_type.eq_ignore_ascii_case(tran_type))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardMember {
    pub created_at: String,
    pub has_invested: bool,
    #[serde(default)]
    pub countdown_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardBalances {
    pub account_balance: Decimal,
    pub total_deposit: Decimal,
    pub total_earned: Decimal,
    pub total_withdraw: Decimal,
    pub total_investment_active: Decimal,
    pub total_investment: Decimal,
    pub total_commission: Decimal,
    pub total_transfer_in: Decimal,
    pub total_transfer_out: Decimal,
    pub total_referrals: u64,
    pub earned_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardData {
    pub member: DashboardMember,
    pub balances: DashboardBalances,
}

// ============================================================================
// Sign-up, profile
// ============================================================================

/// Leg of the sponsor's binary tree a new member is placed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementSide {
    Left,
    Right,
}

impl PlacementSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementSide::Left => "left",
            PlacementSide::Right => "right",
        }
    }
}

impl fmt::Display for PlacementSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlacementSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(PlacementSide::Left),
            "right" | "r" => Ok(PlacementSide::Right),
            other => Err(format!("side must be left or right, got '{}'", other)),
        }
    }
}

/// Body of `POST /auth/sign-up`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUpRequest {
    /// Sponsor's referral code
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<PlacementSide>,
    pub firstname: String,
    pub lastname: String,
    pub wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    pub userid: i64,
    #[serde(default)]
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub wallet_address: String,
    #[serde(default)]
    pub registration_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub userid: i64,
    #[serde(default)]
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub wallet_address: String,
    #[serde(default)]
    pub registration_date: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

/// Body of `PUT /profile/fullname`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateFullnameRequest {
    pub firstname: String,
    pub lastname: String,
}

// ============================================================================
// Team, referrals, investments
// ============================================================================

/// Ids in the team payloads arrive as numbers or strings
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {}", other))),
    }
}

/// Point volumes: own (`s_pv`), left leg, right leg
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointVolume {
    #[serde(default)]
    pub s_pv: Decimal,
    #[serde(default)]
    pub l_pv: Decimal,
    #[serde(default)]
    pub r_pv: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub userid: i64,
    pub firstname: String,
    #[serde(flatten)]
    pub volume: PointVolume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRoot {
    pub userid: i64,
    pub firstname: String,
    #[serde(default)]
    pub ref_code: String,
    #[serde(flatten)]
    pub volume: PointVolume,
}

/// Sponsor or placement upline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLink {
    #[serde(deserialize_with = "id_string")]
    pub userid: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamChildren {
    #[serde(default)]
    pub left: Vec<TeamMember>,
    #[serde(default)]
    pub right: Vec<TeamMember>,
}

/// `GET /my-team`: the member's node in the binary tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamData {
    pub user: TeamRoot,
    /// Absent at the root of the tree
    #[serde(default)]
    pub sponsor: Option<TeamLink>,
    #[serde(default)]
    pub upline: Option<TeamLink>,
    #[serde(default)]
    pub children: TeamChildren,
    #[serde(default)]
    pub total_referrals: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectReferral {
    #[serde(default)]
    pub no: u32,
    pub userid: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub status: String,
    #[serde(default)]
    pub register_date: String,
}

/// `GET /my-direct-ref`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectReferralList {
    pub referrals: Vec<DirectReferral>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralLinks {
    pub left_side: String,
    pub right_side: String,
}

/// `GET /ref-link`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralData {
    pub ref_code: String,
    pub referral_links: ReferralLinks,
}

impl ReferralData {
    pub fn link(&self, side: PlacementSide) -> &str {
        match side {
            PlacementSide::Left => &self.referral_links.left_side,
            PlacementSide::Right => &self.referral_links.right_side,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentItem {
    pub inv_id: i64,
    pub inv_date: String,
    pub inv_amount: Decimal,
    pub p_amount: Decimal,
    /// ACTIVE, COMPLETED, PENDING or CANCELLED
    pub status: String,
    #[serde(default)]
    pub coin_name: String,
}

impl InvestmentItem {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("ACTIVE")
    }
}

/// `GET /my-investment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentList {
    pub investments: Vec<InvestmentItem>,
    #[serde(default)]
    pub total_count: u64,
}

impl InvestmentList {
    pub fn active_total(&self) -> Decimal {
        self.investments
            .iter()
            .filter(|i| i.is_active())
            .map(|i| i.inv_amount)
            .sum()
    }
}

/// One row of `GET /deposit/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositHistoryEntry {
    pub dan_amount: Decimal,
    pub txn_hash: String,
    #[serde(default)]
    pub timestamp: String,
}
