//! Decides whether a notary conflict can be waited out.

use std::collections::HashSet;

use crate::types::{ConflictReport, ConsumptionKind, StateRef};

/// Result of classifying a conflict report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Every conflicting state was only referenced; wait for these and retry
    Retryable(HashSet<StateRef>),

    /// At least one conflicting state was spent as an ordinary input
    Fatal,
}

/// Classify a conflict report.
///
/// A single ordinary-input conflict makes the whole report fatal: the
/// transaction itself double-spends and no amount of waiting fixes it, so no
/// partial retryable subset is extracted.
pub fn classify(report: &ConflictReport) -> Classification {
    let mut refs = HashSet::with_capacity(report.len());
    for (state_ref, record) in report.records() {
        match record.kind {
            ConsumptionKind::ReferenceInput => {
                refs.insert(*state_ref);
            }
            ConsumptionKind::OrdinaryInput => return Classification::Fatal,
        }
    }

    Classification::Retryable(refs)
}
