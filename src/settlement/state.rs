//! Settlement state machine
//!
//! ```text
//! Init -> Validated -> Submitted -> Confirmed -> Recorded
//!   |         |            |            |
//!   |         |            |            +--> NeedsReconciliation
//!   |         |            +--> Failed / Unconfirmed
//!   +---------+--> Failed / Blocked
//! ```

use std::fmt;

/// Where a single deposit or withdrawal ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementState {
    /// Intent created, nothing checked yet
    Init,

    /// Addresses, amount and advisory balance checked
    Validated,

    /// Transfer broadcast, hash known, not yet mined
    Submitted,

    /// Transfer mined and successful. Funds have moved.
    Confirmed,

    /// Terminal: ledger accepted the record
    Recorded,

    /// Terminal: refused locally, rejected by the signer, or reverted.
    /// No tokens moved.
    Failed,

    /// Terminal: submitted, but the receipt was never observed. Tokens may
    /// have moved; check the transaction hash before retrying.
    Unconfirmed,

    /// Terminal: withdrawal refused by the ledger pre-check
    Blocked,

    /// Terminal: funds moved but the ledger has no record of it.
    /// Needs manual reconciliation against the transaction hash.
    NeedsReconciliation,
}

impl SettlementState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementState::Recorded
                | SettlementState::Failed
                | SettlementState::Unconfirmed
                | SettlementState::Blocked
                | SettlementState::NeedsReconciliation
        )
    }

    /// Whether tokens have left the source wallet
    #[inline]
    pub fn funds_moved(&self) -> bool {
        matches!(
            self,
            SettlementState::Confirmed
                | SettlementState::Recorded
                | SettlementState::NeedsReconciliation
        )
    }

    pub fn can_transition_to(&self, next: SettlementState) -> bool {
        use SettlementState::*;
        matches!(
            (self, next),
            (Init, Validated)
                | (Init, Failed)
                | (Init, Blocked)
                | (Validated, Submitted)
                | (Validated, Failed)
                | (Submitted, Confirmed)
                | (Submitted, Failed)
                | (Submitted, Unconfirmed)
                | (Confirmed, Recorded)
                | (Confirmed, NeedsReconciliation)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::Init => "INIT",
            SettlementState::Validated => "VALIDATED",
            SettlementState::Submitted => "SUBMITTED",
            SettlementState::Confirmed => "CONFIRMED",
            SettlementState::Recorded => "RECORDED",
            SettlementState::Failed => "FAILED",
            SettlementState::Unconfirmed => "UNCONFIRMED",
            SettlementState::Blocked => "BLOCKED",
            SettlementState::NeedsReconciliation => "NEEDS_RECONCILIATION",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
