//! In-memory vault: the node's local view of which states exist and which
//! have been consumed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use ledgerflow_core::{FlowError, LedgerQueryService, SecureHash, StateRef, StateStatus};

use crate::transaction::{LedgerTransaction, StateAndRef, TransactionState};

const UPDATE_CAPACITY: usize = 256;

/// States consumed and produced by one recorded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultUpdate {
    /// Transaction that caused the update
    pub tx_id: SecureHash,
    /// States the transaction spent
    pub consumed: Vec<StateRef>,
    /// States the transaction created
    pub produced: Vec<StateRef>,
}

#[derive(Debug)]
struct Consumption {
    consuming_tx: SecureHash,
    at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct VaultStore {
    states: HashMap<StateRef, TransactionState>,
    consumed: HashMap<StateRef, Consumption>,
    recorded: HashSet<SecureHash>,
}

impl VaultStore {
    fn is_consumed(&self, state_ref: &StateRef) -> bool {
        self.consumed.contains_key(state_ref)
    }
}

/// The vault a node keeps of the transactions it has recorded.
///
/// A consumption the vault has not learnt about yet is invisible to it, so
/// [`InMemoryVault::when_consumed`] keeps waiting until the consuming
/// transaction is recorded.
#[derive(Clone)]
pub struct InMemoryVault {
    store: Arc<RwLock<VaultStore>>,
    updates: broadcast::Sender<VaultUpdate>,
}

impl InMemoryVault {
    /// Create an empty vault
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            store: Arc::new(RwLock::new(VaultStore::default())),
            updates,
        }
    }

    /// Record a finalised transaction.
    ///
    /// Inputs become consumed and outputs become unconsumed states. Reference
    /// inputs are left alone. Returns `false` if the transaction was already
    /// recorded.
    pub async fn record_transaction(&self, tx: &LedgerTransaction) -> bool {
        let update = {
            let mut store = self.store.write().await;
            if !store.recorded.insert(tx.id) {
                trace!(tx_id = %tx.id, "Transaction already recorded");
                return false;
            }

            let now = Utc::now();
            for input in &tx.inputs {
                store.consumed.entry(*input).or_insert(Consumption {
                    consuming_tx: tx.id,
                    at: now,
                });
            }

            let produced: Vec<StateRef> = tx
                .out_refs()
                .into_iter()
                .map(|StateAndRef { state_ref, state }| {
                    store.states.insert(state_ref, state);
                    state_ref
                })
                .collect();

            VaultUpdate {
                tx_id: tx.id,
                consumed: tx.inputs.clone(),
                produced,
            }
        };

        debug!(
            tx_id = %tx.id,
            consumed = update.consumed.len(),
            produced = update.produced.len(),
            "Recorded transaction"
        );
        // Nobody listening is fine
        let _ = self.updates.send(update);
        true
    }

    /// Look up a state the vault knows about
    pub async fn state(&self, state_ref: &StateRef) -> Option<TransactionState> {
        self.store.read().await.states.get(state_ref).cloned()
    }

    /// Transaction that consumed `state_ref` and when the vault learnt of it
    pub async fn consumed_by(&self, state_ref: &StateRef) -> Option<(SecureHash, DateTime<Utc>)> {
        self.store
            .read()
            .await
            .consumed
            .get(state_ref)
            .map(|c| (c.consuming_tx, c.at))
    }

    /// Every known state not yet consumed, ordered by ref
    pub async fn unconsumed_states(&self) -> Vec<StateAndRef> {
        let store = self.store.read().await;
        let mut unconsumed: Vec<StateAndRef> = store
            .states
            .iter()
            .filter(|(state_ref, _)| !store.is_consumed(state_ref))
            .map(|(state_ref, state)| StateAndRef {
                state_ref: *state_ref,
                state: state.clone(),
            })
            .collect();
        unconsumed.sort_by_key(|s| s.state_ref);
        unconsumed
    }

    /// The current version of a linear state
    pub async fn latest_by_linear_id(&self, linear_id: Uuid) -> Option<StateAndRef> {
        let store = self.store.read().await;
        store
            .states
            .iter()
            .filter(|(state_ref, state)| {
                state.linear_id == Some(linear_id) && !store.is_consumed(state_ref)
            })
            .map(|(state_ref, state)| StateAndRef {
                state_ref: *state_ref,
                state: state.clone(),
            })
            .min_by_key(|s| s.state_ref)
    }

    /// Feed of vault updates from now on
    pub fn subscribe_updates(&self) -> broadcast::Receiver<VaultUpdate> {
        self.updates.subscribe()
    }
}

impl Default for InMemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVault")
            .field("subscribers", &self.updates.receiver_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerQueryService for InMemoryVault {
    async fn status_of(
        &self,
        refs: &HashSet<StateRef>,
    ) -> Result<HashMap<StateRef, StateStatus>, FlowError> {
        let store = self.store.read().await;
        Ok(refs
            .iter()
            .filter_map(|state_ref| {
                let consumed = store.is_consumed(state_ref);
                if consumed || store.states.contains_key(state_ref) {
                    Some((*state_ref, StateStatus { consumed }))
                } else {
                    None
                }
            })
            .collect())
    }

    fn when_consumed(&self, state_ref: StateRef) -> BoxFuture<'static, Result<(), FlowError>> {
        // Subscribe before checking so a consumption between the two is not missed
        let mut updates = self.updates.subscribe();
        let store = self.store.clone();

        async move {
            if store.read().await.is_consumed(&state_ref) {
                return Ok(());
            }
            loop {
                match updates.recv().await {
                    Ok(update) if update.consumed.contains(&state_ref) => return Ok(()),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(%state_ref, skipped, "Vault update feed lagged; re-checking");
                        if store.read().await.is_consumed(&state_ref) {
                            return Ok(());
                        }
                    }
                    Err(RecvError::Closed) => {
                        return Err(FlowError::Ledger("vault update feed closed".to_string()))
                    }
                }
            }
        }
        .boxed()
    }
}
