use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Not authenticated, please log in")]
    Unauthorized,

    #[error("Ledger request timed out: {0}")]
    Timeout(String),

    #[error("Ledger unreachable: {0}")]
    Transport(String),

    #[error("Ledger returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Ledger rejected request: {0}")]
    Rejected(String),

    #[error("Unexpected ledger response: {0}")]
    Decode(String),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Unauthorized => "UNAUTHORIZED",
            LedgerError::Timeout(_) => "LEDGER_TIMEOUT",
            LedgerError::Transport(_) => "LEDGER_UNREACHABLE",
            LedgerError::Status { .. } => "LEDGER_STATUS",
            LedgerError::Rejected(_) => "LEDGER_REJECTED",
            LedgerError::Decode(_) => "LEDGER_DECODE",
        }
    }

    /// Message suitable for showing to the user as-is
    pub fn user_message(&self) -> String {
        match self {
            LedgerError::Status { message, .. } | LedgerError::Rejected(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}
