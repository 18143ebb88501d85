//! Business flows used by the scenarios.
//!
//! Each flow rebuilds its transaction from the vault on every call, so it can
//! be re-run from scratch by a retry coordinator.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerflow_core::{FlowContext, FlowError, FlowLogic, StateRef};
use ledgerflow_ledger_inmemory::{InMemoryLedger, LedgerTransaction, TransactionBuilder, TransactionState};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::fixtures::PausePoint;

/// Issues a new state that quotes the current version of a reference state
pub struct IssueAgainstReference {
    ledger: InMemoryLedger,
    reference_id: Uuid,
    payload: Value,
    pause: Option<PausePoint>,
    used: Arc<Mutex<Vec<StateRef>>>,
}

impl IssueAgainstReference {
    /// Quote the reference state `reference_id` in a new `payload` state
    pub fn new(ledger: InMemoryLedger, reference_id: Uuid, payload: Value) -> Self {
        Self {
            ledger,
            reference_id,
            payload,
            pause: None,
            used: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pause the first attempt after it has read the reference
    pub fn pause_after_read(mut self, pause: PausePoint) -> Self {
        self.pause = Some(pause);
        self
    }

    /// Shared log of the reference version each attempt read, in order
    pub fn used_references(&self) -> Arc<Mutex<Vec<StateRef>>> {
        self.used.clone()
    }
}

#[async_trait]
impl FlowLogic for IssueAgainstReference {
    type Output = LedgerTransaction;

    fn name(&self) -> &str {
        "IssueAgainstReference"
    }

    async fn call(&self, _ctx: &FlowContext) -> Result<LedgerTransaction, FlowError> {
        let reference = self
            .ledger
            .vault()
            .latest_by_linear_id(self.reference_id)
            .await
            .ok_or_else(|| FlowError::Ledger(format!("No reference state {}", self.reference_id)))?;
        self.used.lock().push(reference.state_ref);
        debug!(reference = %reference.state_ref, "Read reference state");

        if let Some(pause) = &self.pause {
            pause.pass().await;
        }

        let tx = TransactionBuilder::new()
            .add_reference(reference.state_ref)
            .add_output(TransactionState::new(json!({
                "payload": self.payload,
                "quoted": reference.state.data,
            })))
            .build()?;
        self.ledger.finalise(&tx).await?;
        Ok(tx)
    }
}

/// Moves a linear reference state to a new version
pub struct UpdateReference {
    ledger: InMemoryLedger,
    reference_id: Uuid,
    data: Value,
}

impl UpdateReference {
    /// Replace the reference `reference_id` with `data`
    pub fn new(ledger: InMemoryLedger, reference_id: Uuid, data: Value) -> Self {
        Self {
            ledger,
            reference_id,
            data,
        }
    }
}

#[async_trait]
impl FlowLogic for UpdateReference {
    type Output = LedgerTransaction;

    fn name(&self) -> &str {
        "UpdateReference"
    }

    async fn call(&self, _ctx: &FlowContext) -> Result<LedgerTransaction, FlowError> {
        let current = self
            .ledger
            .vault()
            .latest_by_linear_id(self.reference_id)
            .await
            .ok_or_else(|| FlowError::Ledger(format!("No reference state {}", self.reference_id)))?;

        let tx = TransactionBuilder::new()
            .add_input(current.state_ref)
            .add_output(TransactionState::linear(self.reference_id, self.data.clone()))
            .build()?;
        self.ledger.finalise(&tx).await?;
        Ok(tx)
    }
}

/// Spends one known state
pub struct SpendState {
    ledger: InMemoryLedger,
    state_ref: StateRef,
}

impl SpendState {
    /// Spend `state_ref`
    pub fn new(ledger: InMemoryLedger, state_ref: StateRef) -> Self {
        Self { ledger, state_ref }
    }
}

#[async_trait]
impl FlowLogic for SpendState {
    type Output = LedgerTransaction;

    fn name(&self) -> &str {
        "SpendState"
    }

    async fn call(&self, _ctx: &FlowContext) -> Result<LedgerTransaction, FlowError> {
        let tx = TransactionBuilder::new().add_input(self.state_ref).build()?;
        self.ledger.finalise(&tx).await?;
        Ok(tx)
    }
}
