use std::time::Duration;
use thiserror::Error;

use crate::domain::progress::ProgressState;
use crate::types::{ConflictReport, SecureHash};

/// Errors reported by the notary when it refuses to sign a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotaryError {
    /// Some of the transaction's states were already consumed
    #[error("Conflict on transaction {tx_id}: {report}")]
    Conflict {
        /// The rejected transaction
        tx_id: SecureHash,
        /// The states that had already been consumed
        report: ConflictReport,
    },

    /// The transaction failed notary-side validation
    #[error("Transaction invalid: {0}")]
    TransactionInvalid(String),

    /// The transaction's time window has passed or not yet opened
    #[error("Time window invalid")]
    TimeWindowInvalid,

    /// Anything else the notary reports
    #[error("Notary error: {0}")]
    General(String),
}

/// Error raised by a flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The notary rejected a transaction
    #[error("Notary rejected transaction: {0}")]
    Notary(#[from] NotaryError),

    /// Business logic failure raised by a flow
    #[error("Flow error: {0}")]
    Flow(String),

    /// Ledger query or vault failure
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Flow instance could not be checkpointed
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A call-site deadline expired before the flow finished
    #[error("Flow did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    /// The retry loop ran more attempts than its configured guard allows
    #[error("Attempt guard tripped after {attempts} attempts")]
    AttemptGuardTripped {
        /// Attempts run before the guard fired
        attempts: u32,
    },

    /// Progress was moved along a transition that is not allowed
    #[error("Invalid progress transition from {from:?} to {to:?}")]
    InvalidProgressTransition {
        /// Current state
        from: Option<ProgressState>,
        /// Requested state
        to: ProgressState,
    },

    /// The flow task was cancelled or panicked
    #[error("Flow cancelled: {0}")]
    Cancelled(String),
}

impl FlowError {
    /// The conflict report, if this error is a notary uniqueness conflict
    pub fn conflict_report(&self) -> Option<&ConflictReport> {
        match self {
            FlowError::Notary(NotaryError::Conflict { report, .. }) => Some(report),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Ledger(format!("Serialization error: {}", err))
    }
}

impl From<String> for FlowError {
    fn from(err: String) -> Self {
        FlowError::Flow(err)
    }
}

impl From<&str> for FlowError {
    fn from(err: &str) -> Self {
        FlowError::Flow(err.to_string())
    }
}
