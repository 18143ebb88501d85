//! In-memory ledger for ledgerflow nodes
//!
//! This crate provides an in-memory vault implementing the ledger query
//! service defined in ledgerflow-core, and a uniqueness notary. It is meant
//! for development and testing where no real network is needed.

use std::sync::Arc;
use tracing::debug;

use ledgerflow_core::{FlowError, ServiceHub};

pub mod notary;
pub mod transaction;
pub mod vault;

pub use notary::InMemoryNotary;
pub use transaction::{LedgerTransaction, StateAndRef, TransactionBuilder, TransactionState};
pub use vault::{InMemoryVault, VaultUpdate};

/// One notary and one node vault wired together
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    vault: InMemoryVault,
    notary: InMemoryNotary,
}

impl InMemoryLedger {
    /// Create a ledger with an empty vault and notary
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger for another node: its own empty vault, sharing this notary
    pub fn with_notary(notary: InMemoryNotary) -> Self {
        Self {
            vault: InMemoryVault::new(),
            notary,
        }
    }

    /// The node's vault
    pub fn vault(&self) -> &InMemoryVault {
        &self.vault
    }

    /// The notary
    pub fn notary(&self) -> &InMemoryNotary {
        &self.notary
    }

    /// Services for a flow executor running on this node
    pub fn service_hub(&self) -> ServiceHub {
        ServiceHub::new(Arc::new(self.vault.clone()))
    }

    /// Notarise `tx` and record it in the vault
    pub async fn finalise(&self, tx: &LedgerTransaction) -> Result<(), FlowError> {
        self.notary.notarise(tx).await?;
        self.vault.record_transaction(tx).await;
        debug!(tx_id = %tx.id, "Transaction finalised");
        Ok(())
    }

    /// Record a transaction in the vault without notarising it.
    ///
    /// Issuances need no notary, and tests use this to deliver transactions
    /// finalised by other nodes.
    pub async fn record(&self, tx: &LedgerTransaction) {
        self.vault.record_transaction(tx).await;
    }
}
