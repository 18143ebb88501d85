//! Node wiring and reference-data helpers.

use ledgerflow_core::domain::repository::memory::MemoryFlowInstanceRepository;
use ledgerflow_core::{FlowError, FlowExecutor, StateRef};
use ledgerflow_ledger_inmemory::{InMemoryLedger, LedgerTransaction, TransactionBuilder, TransactionState};
use ledgerflow_monitoring::MetricsEventHandler;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// A node: its ledger view plus an executor running flows against it
pub struct Node {
    /// The node's vault and the shared notary
    pub ledger: InMemoryLedger,
    /// Executor whose ledger query service is the node's vault
    pub executor: FlowExecutor,
    /// Checkpoints written by the executor
    pub repo: Arc<MemoryFlowInstanceRepository>,
    /// Metrics derived from the executor's events
    pub metrics: Arc<MetricsEventHandler>,
}

/// Wire an executor to `ledger`
pub fn node_executor(ledger: InMemoryLedger) -> Node {
    let repo = Arc::new(MemoryFlowInstanceRepository::new());
    let metrics = Arc::new(MetricsEventHandler::new("e2e"));
    let executor = FlowExecutor::new(repo.clone(), metrics.clone(), ledger.service_hub());
    Node {
        ledger,
        executor,
        repo,
        metrics,
    }
}

/// Issue version 1 of a linear reference state on every given node
pub async fn issue_reference(nodes: &[&InMemoryLedger], data: Value) -> Result<(Uuid, StateRef), FlowError> {
    let linear_id = Uuid::new_v4();
    let issue = TransactionBuilder::new()
        .add_output(TransactionState::linear(linear_id, data))
        .build()?;
    for node in nodes {
        node.record(&issue).await;
    }
    Ok((linear_id, issue.out_ref(0)))
}

/// Replace the current version of a reference state, finalising on `ledger`
pub async fn update_reference(
    ledger: &InMemoryLedger,
    current: StateRef,
    linear_id: Uuid,
    data: Value,
) -> Result<LedgerTransaction, FlowError> {
    let tx = TransactionBuilder::new()
        .add_input(current)
        .add_output(TransactionState::linear(linear_id, data))
        .build()?;
    ledger.finalise(&tx).await?;
    Ok(tx)
}

/// Flow side of a pause: signals arrival, then waits to be released
#[derive(Debug)]
pub struct PausePoint {
    reached: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl PausePoint {
    /// Pause here the first time only
    pub async fn pass(&self) {
        let reached = self.reached.lock().take();
        let release = self.release.lock().take();
        if let (Some(reached), Some(release)) = (reached, release) {
            let _ = reached.send(());
            let _ = release.await;
        }
    }
}

/// Test side of a pause
#[derive(Debug)]
pub struct PauseControl {
    reached: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

impl PauseControl {
    /// Wait until the flow is paused
    pub async fn reached(&mut self) {
        let _ = (&mut self.reached).await;
    }

    /// Let the flow continue
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// A one-shot pause between a flow and the test driving it
pub fn pause_point() -> (PausePoint, PauseControl) {
    let (reached_tx, reached_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    (
        PausePoint {
            reached: Mutex::new(Some(reached_tx)),
            release: Mutex::new(Some(release_rx)),
        },
        PauseControl {
            reached: reached_rx,
            release: release_tx,
        },
    )
}
