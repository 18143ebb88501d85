//! Assertions over progress-state histories.

use ledgerflow_core::{ProgressState, ProgressTracker};

/// Assert the tracker went through exactly `expected`
pub fn assert_progress_sequence(tracker: &ProgressTracker, expected: &[ProgressState]) {
    let history = tracker.history();
    assert_eq!(
        history.as_slice(),
        expected,
        "unexpected progress sequence: {:?}",
        history
    );
}

/// Assert a history only moves forward.
///
/// It must start at Attempting, only leave RetryingAfterConflict for a new
/// Attempting, never repeat a state back to back and never leave Succeeded.
pub fn assert_progress_monotonic(history: &[ProgressState]) {
    use ProgressState::*;

    if let Some(first) = history.first() {
        assert_eq!(*first, Attempting, "progress must start at Attempting: {:?}", history);
    }

    for pair in history.windows(2) {
        let allowed = matches!(
            (pair[0], pair[1]),
            (Attempting, RetryingAfterConflict)
                | (RetryingAfterConflict, Attempting)
                | (Attempting, Succeeded)
        );
        assert!(
            allowed,
            "progress regressed from {:?} to {:?} in {:?}",
            pair[0], pair[1], history
        );
    }
}
