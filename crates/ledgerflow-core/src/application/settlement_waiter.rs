//! Builds suspend points that resolve once reference states are consumed.
//!
//! The waiter queries the ledger once and only subscribes to the states that
//! are not yet consumed. If every state is already consumed the returned
//! suspend point is ready and the caller never parks.
//!
//! A state the ledger never reports as consumed keeps the suspend point
//! pending forever. Callers that need bounded waiting wrap the whole flow
//! with a deadline at the call site.

use futures::{FutureExt, TryFutureExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::suspend_point::SuspendPoint;
use crate::domain::services::LedgerQueryService;
use crate::types::StateRef;
use crate::FlowError;

/// Waits for a set of states to reach the consumed status
#[derive(Clone)]
pub struct SettlementWaiter {
    ledger: Arc<dyn LedgerQueryService>,
}

impl SettlementWaiter {
    /// Create a waiter over the given ledger
    pub fn new(ledger: Arc<dyn LedgerQueryService>) -> Self {
        Self { ledger }
    }

    /// Suspend point that resolves when every state in `refs` is consumed.
    ///
    /// States the ledger does not know about count as not yet consumed.
    pub async fn await_settlement(
        &self,
        refs: &HashSet<StateRef>,
    ) -> Result<SuspendPoint, FlowError> {
        if refs.is_empty() {
            debug!("No state refs to wait for. No need to suspend.");
            return Ok(SuspendPoint::Ready);
        }

        let statuses = self.ledger.status_of(refs).await?;
        let mut not_yet_consumed: Vec<StateRef> = refs
            .iter()
            .filter(|state_ref| !statuses.get(*state_ref).map_or(false, |s| s.consumed))
            .copied()
            .collect();

        if not_yet_consumed.is_empty() {
            debug!(count = refs.len(), "All state refs have already been consumed. No need to suspend.");
            return Ok(SuspendPoint::Ready);
        }

        not_yet_consumed.sort();
        info!(
            waiting = not_yet_consumed.len(),
            already_consumed = refs.len() - not_yet_consumed.len(),
            refs = ?not_yet_consumed,
            "Suspending until state refs are consumed"
        );

        let subscriptions: Vec<_> = not_yet_consumed
            .iter()
            .map(|state_ref| self.ledger.when_consumed(*state_ref))
            .collect();
        // Join, not race: every subscription has to resolve
        let future = futures::future::try_join_all(subscriptions)
            .map_ok(|_| ())
            .boxed();

        Ok(SuspendPoint::Pending {
            awaiting: not_yet_consumed,
            future,
        })
    }
}

impl std::fmt::Debug for SettlementWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementWaiter").finish_non_exhaustive()
    }
}
