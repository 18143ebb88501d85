//! A ledger query service whose consumption events the test drives.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use ledgerflow_core::{FlowError, LedgerQueryService, StateRef, StateStatus};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

#[derive(Default)]
struct LedgerInner {
    known: HashMap<StateRef, bool>,
    waiters: HashMap<StateRef, Vec<oneshot::Sender<()>>>,
}

/// Fake ledger: states are added and consumed explicitly by the test.
///
/// Counts status queries and consumption subscriptions so tests can check
/// the waiter's fast path.
#[derive(Default)]
pub struct ControlledLedger {
    inner: Mutex<LedgerInner>,
    status_queries: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl ControlledLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger that knows the given unconsumed states
    pub fn with_unconsumed(refs: impl IntoIterator<Item = StateRef>) -> Self {
        let ledger = Self::new();
        for state_ref in refs {
            ledger.add_unconsumed(state_ref);
        }
        ledger
    }

    /// Make the ledger aware of an unconsumed state
    pub fn add_unconsumed(&self, state_ref: StateRef) {
        self.inner.lock().known.entry(state_ref).or_insert(false);
    }

    /// Mark a state consumed and wake everything waiting on it
    pub fn consume(&self, state_ref: StateRef) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.known.insert(state_ref, true);
            inner.waiters.remove(&state_ref).unwrap_or_default()
        };
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// Whether the ledger has the state marked consumed
    pub fn is_consumed(&self, state_ref: &StateRef) -> bool {
        self.inner.lock().known.get(state_ref).copied().unwrap_or(false)
    }

    /// Number of `status_of` calls so far
    pub fn status_query_count(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    /// Number of `when_consumed` calls so far
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Number of subscriptions still waiting on `state_ref`
    pub fn pending_waiters(&self, state_ref: &StateRef) -> usize {
        self.inner
            .lock()
            .waiters
            .get(state_ref)
            .map_or(0, |waiters| waiters.len())
    }
}

#[async_trait]
impl LedgerQueryService for ControlledLedger {
    async fn status_of(
        &self,
        refs: &HashSet<StateRef>,
    ) -> Result<HashMap<StateRef, StateStatus>, FlowError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock();
        Ok(refs
            .iter()
            .filter_map(|state_ref| {
                inner
                    .known
                    .get(state_ref)
                    .map(|consumed| (*state_ref, StateStatus { consumed: *consumed }))
            })
            .collect())
    }

    fn when_consumed(&self, state_ref: StateRef) -> BoxFuture<'static, Result<(), FlowError>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock();
        if inner.known.get(&state_ref).copied().unwrap_or(false) {
            return futures::future::ready(Ok(())).boxed();
        }

        let (tx, rx) = oneshot::channel();
        inner.waiters.entry(state_ref).or_default().push(tx);
        rx.map(|result| result.map_err(|_| FlowError::Ledger("ledger shut down".to_string())))
            .boxed()
    }
}
