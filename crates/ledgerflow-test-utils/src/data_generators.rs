//! Generators for ledger test data.

use ledgerflow_core::{
    ConflictReport, ConsumptionKind, ConsumptionRecord, FlowError, NotaryError, SecureHash,
    StateRef,
};

/// A deterministic state ref derived from a seed
pub fn state_ref(seed: &str, index: u32) -> StateRef {
    StateRef::new(SecureHash::sha256(seed), index)
}

/// A conflict report with every ref consumed in the given way
pub fn conflict_report(refs: &[StateRef], kind: ConsumptionKind) -> ConflictReport {
    let winner = SecureHash::sha256(b"winning-transaction");
    ConflictReport::new(
        refs.iter()
            .map(|state_ref| (*state_ref, ConsumptionRecord::new(winner, kind))),
    )
}

/// The notary error raised when `refs` were superseded while only referenced
pub fn reference_conflict(refs: &[StateRef]) -> FlowError {
    conflict_error(conflict_report(refs, ConsumptionKind::ReferenceInput))
}

/// The notary error raised when `refs` were already spent
pub fn ordinary_conflict(refs: &[StateRef]) -> FlowError {
    conflict_error(conflict_report(refs, ConsumptionKind::OrdinaryInput))
}

/// Wrap a report in the notary error a flow would raise
pub fn conflict_error(report: ConflictReport) -> FlowError {
    NotaryError::Conflict {
        tx_id: SecureHash::sha256(b"losing-transaction"),
        report,
    }
    .into()
}
