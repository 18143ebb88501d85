//! Collaborator interfaces consumed by flows.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::types::StateRef;
use crate::FlowError;

/// Consumption status of a state as seen by the local ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateStatus {
    /// True once a recorded transaction has consumed the state
    pub consumed: bool,
}

/// Read-only view of the node's ledger used while waiting for settlement.
///
/// Implementations must report a state as consumed at most once and never
/// un-report it.
#[async_trait]
pub trait LedgerQueryService: Send + Sync {
    /// Current status of each requested state the ledger knows about.
    ///
    /// States the ledger has never seen are omitted from the result.
    async fn status_of(
        &self,
        refs: &HashSet<StateRef>,
    ) -> Result<HashMap<StateRef, StateStatus>, FlowError>;

    /// A future that resolves the first time `state_ref` is observed consumed.
    ///
    /// Must resolve promptly for a state that is already consumed.
    fn when_consumed(&self, state_ref: StateRef) -> BoxFuture<'static, Result<(), FlowError>>;
}

/// Services available to a running flow
#[derive(Clone)]
pub struct ServiceHub {
    ledger: Arc<dyn LedgerQueryService>,
}

impl ServiceHub {
    /// Create a service hub
    pub fn new(ledger: Arc<dyn LedgerQueryService>) -> Self {
        Self { ledger }
    }

    /// The ledger query service
    pub fn ledger(&self) -> &Arc<dyn LedgerQueryService> {
        &self.ledger
    }
}

impl std::fmt::Debug for ServiceHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHub").finish_non_exhaustive()
    }
}
