//! In-memory uniqueness notary.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use ledgerflow_core::{
    ConflictReport, ConsumptionKind, ConsumptionRecord, NotaryError, SecureHash, StateRef,
};

use crate::transaction::LedgerTransaction;

#[derive(Debug, Default)]
struct ConsumptionLog {
    consumed: HashMap<StateRef, SecureHash>,
    committed: HashSet<SecureHash>,
}

/// Notary that prevents double spends and stale reference reads.
///
/// Every input and reference of a transaction is checked against the log of
/// consumed states. A transaction with any conflict is rejected as a whole
/// and commits nothing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotary {
    log: Arc<RwLock<ConsumptionLog>>,
}

impl InMemoryNotary {
    /// Create a notary with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `tx` for conflicts and commit its inputs.
    ///
    /// Re-notarising an already committed transaction succeeds without
    /// changing the log.
    pub async fn notarise(&self, tx: &LedgerTransaction) -> Result<(), NotaryError> {
        if tx.inputs.is_empty() && tx.references.is_empty() {
            return Err(NotaryError::TransactionInvalid(
                "transaction has no inputs and no references".to_string(),
            ));
        }
        let inputs: HashSet<&StateRef> = tx.inputs.iter().collect();
        if inputs.len() != tx.inputs.len() {
            return Err(NotaryError::TransactionInvalid(
                "transaction spends the same state twice".to_string(),
            ));
        }
        if tx.references.iter().any(|r| inputs.contains(r)) {
            return Err(NotaryError::TransactionInvalid(
                "a state cannot be both an input and a reference".to_string(),
            ));
        }

        let mut log = self.log.write().await;
        if log.committed.contains(&tx.id) {
            debug!(tx_id = %tx.id, "Transaction already notarised");
            return Ok(());
        }

        let report = ConflictReport::new(
            tx.inputs
                .iter()
                .map(|r| (r, ConsumptionKind::OrdinaryInput))
                .chain(
                    tx.references
                        .iter()
                        .map(|r| (r, ConsumptionKind::ReferenceInput)),
                )
                .filter_map(|(state_ref, kind)| {
                    log.consumed
                        .get(state_ref)
                        .map(|consuming_tx| (*state_ref, ConsumptionRecord::new(*consuming_tx, kind)))
                }),
        );

        if !report.is_empty() {
            warn!(tx_id = %tx.id, conflicts = %report, "Notarisation rejected");
            return Err(NotaryError::Conflict {
                tx_id: tx.id,
                report,
            });
        }

        for input in &tx.inputs {
            log.consumed.insert(*input, tx.id);
        }
        log.committed.insert(tx.id);
        debug!(
            tx_id = %tx.id,
            inputs = tx.inputs.len(),
            references = tx.references.len(),
            "Transaction notarised"
        );
        Ok(())
    }

    /// Transaction that consumed `state_ref`, if any
    pub async fn consumed_by(&self, state_ref: &StateRef) -> Option<SecureHash> {
        self.log.read().await.consumed.get(state_ref).copied()
    }
}
