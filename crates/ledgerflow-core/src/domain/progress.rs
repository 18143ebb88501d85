//! Observable progress of a retry coordinator.

use parking_lot::Mutex;
use std::collections::VecDeque;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::FlowError;

const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Most recent state changes kept by [`ProgressTracker::history`]
pub const PROGRESS_HISTORY_LIMIT: usize = 64;

/// Progress label exposed for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressState {
    /// Running the inner flow
    Attempting,

    /// Suspended until conflicting reference states settle
    RetryingAfterConflict,

    /// The inner flow returned a value
    Succeeded,
}

impl ProgressState {
    /// Whether moving from `from` to `self` is allowed.
    ///
    /// The only cycle is Attempting -> RetryingAfterConflict -> Attempting,
    /// and Succeeded is terminal.
    fn can_follow(self, from: Option<ProgressState>) -> bool {
        use ProgressState::*;
        matches!(
            (from, self),
            (None, Attempting)
                | (Some(Attempting), RetryingAfterConflict)
                | (Some(RetryingAfterConflict), Attempting)
                | (Some(Attempting), Succeeded)
        )
    }
}

/// Tracks the current progress state and notifies subscribers of changes.
///
/// A new tracker has no state: the coordinator has not started. Its first
/// state is always [`ProgressState::Attempting`]. Setting the state that is
/// already current is a no-op and does not notify.
#[derive(Debug)]
pub struct ProgressTracker {
    current: Mutex<Option<ProgressState>>,
    history: Mutex<VecDeque<ProgressState>>,
    changes: broadcast::Sender<ProgressState>,
}

impl ProgressTracker {
    /// Create a tracker with no state set yet
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            current: Mutex::new(None),
            history: Mutex::new(VecDeque::new()),
            changes,
        }
    }

    /// The current state, or `None` before the first attempt has started
    pub fn current(&self) -> Option<ProgressState> {
        *self.current.lock()
    }

    /// The most recent state changes, oldest first.
    ///
    /// At most [`PROGRESS_HISTORY_LIMIT`] entries are kept, so a long run of
    /// retries only shows its tail.
    pub fn history(&self) -> Vec<ProgressState> {
        self.history.lock().iter().copied().collect()
    }

    /// Subscribe to future state changes
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressState> {
        self.changes.subscribe()
    }

    /// Move to `next`, returning whether the state changed.
    pub fn set(&self, next: ProgressState) -> Result<bool, FlowError> {
        let mut current = self.current.lock();
        if *current == Some(next) {
            return Ok(false);
        }
        if !next.can_follow(*current) {
            return Err(FlowError::InvalidProgressTransition {
                from: *current,
                to: next,
            });
        }

        trace!(from = ?*current, to = ?next, "Progress changed");
        *current = Some(next);
        let mut history = self.history.lock();
        if history.len() == PROGRESS_HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(next);
        drop(history);
        // No subscribers is fine
        let _ = self.changes.send(next);
        Ok(true)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProgressState::*;

    #[test]
    fn test_retry_cycle_is_allowed() {
        let tracker = ProgressTracker::new();
        for state in [Attempting, RetryingAfterConflict, Attempting, Succeeded] {
            assert!(tracker.set(state).unwrap());
        }
        assert_eq!(
            tracker.history(),
            vec![Attempting, RetryingAfterConflict, Attempting, Succeeded]
        );
        assert_eq!(tracker.current(), Some(Succeeded));
    }

    #[test]
    fn test_repeated_state_is_not_renotified() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();

        tracker.set(Attempting).unwrap();
        tracker.set(RetryingAfterConflict).unwrap();
        assert!(!tracker.set(RetryingAfterConflict).unwrap());

        assert_eq!(rx.try_recv().unwrap(), Attempting);
        assert_eq!(rx.try_recv().unwrap(), RetryingAfterConflict);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_succeeded_is_terminal() {
        let tracker = ProgressTracker::new();
        tracker.set(Attempting).unwrap();
        tracker.set(Succeeded).unwrap();

        let err = tracker.set(Attempting).unwrap_err();
        assert_eq!(
            err,
            FlowError::InvalidProgressTransition {
                from: Some(Succeeded),
                to: Attempting,
            }
        );
        assert_eq!(tracker.current(), Some(Succeeded));
    }

    #[test]
    fn test_new_tracker_has_not_started() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.current(), None);
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn test_history_keeps_only_recent_changes() {
        let tracker = ProgressTracker::new();
        for _ in 0..100 {
            tracker.set(Attempting).unwrap();
            tracker.set(RetryingAfterConflict).unwrap();
        }
        tracker.set(Attempting).unwrap();

        let history = tracker.history();
        assert_eq!(history.len(), PROGRESS_HISTORY_LIMIT);
        assert_eq!(history.last(), Some(&Attempting));
        assert_eq!(history.first(), Some(&RetryingAfterConflict));
        assert_eq!(tracker.current(), Some(Attempting));
    }

    #[test]
    fn test_cannot_start_in_the_middle() {
        let tracker = ProgressTracker::new();
        assert!(tracker.set(RetryingAfterConflict).is_err());
        assert!(tracker.set(Succeeded).is_err());
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn test_cannot_succeed_while_waiting() {
        let tracker = ProgressTracker::new();
        tracker.set(Attempting).unwrap();
        tracker.set(RetryingAfterConflict).unwrap();
        assert!(tracker.set(Succeeded).is_err());
    }
}
