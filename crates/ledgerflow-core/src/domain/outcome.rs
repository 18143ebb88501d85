//! Tagged result of one attempt of an inner flow.

use crate::error::{FlowError, NotaryError};
use crate::types::{ConflictReport, SecureHash};

/// What a single attempt of a flow produced.
///
/// Built once per attempt from the raised result so that classification is a
/// pure function over data rather than error inspection scattered around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome<T> {
    /// The flow returned a value
    Success(T),

    /// The notary reported a uniqueness conflict
    ConsensusConflict {
        /// The transaction the notary rejected
        tx_id: SecureHash,
        /// The states that had already been consumed
        report: ConflictReport,
    },

    /// Any other failure, with its original cause
    FatalError(FlowError),
}

impl<T> FlowOutcome<T> {
    /// Tag the result of running a flow
    pub fn from_result(result: Result<T, FlowError>) -> Self {
        match result {
            Ok(value) => FlowOutcome::Success(value),
            Err(FlowError::Notary(NotaryError::Conflict { tx_id, report })) => {
                FlowOutcome::ConsensusConflict { tx_id, report }
            }
            Err(other) => FlowOutcome::FatalError(other),
        }
    }

    /// True for the success variant
    pub fn is_success(&self) -> bool {
        matches!(self, FlowOutcome::Success(_))
    }

    /// Turn the outcome back into the result the flow raised.
    ///
    /// A conflict is rebuilt into the same notary error it was tagged from.
    pub fn into_result(self) -> Result<T, FlowError> {
        match self {
            FlowOutcome::Success(value) => Ok(value),
            FlowOutcome::ConsensusConflict { tx_id, report } => {
                Err(NotaryError::Conflict { tx_id, report }.into())
            }
            FlowOutcome::FatalError(error) => Err(error),
        }
    }
}
