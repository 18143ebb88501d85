//! Ledger transactions as seen by the in-memory vault and notary.

use ledgerflow_core::{FlowError, SecureHash, StateRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One output of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionState {
    /// Identity shared by every version of a linear state
    pub linear_id: Option<Uuid>,

    /// Contract data
    pub data: serde_json::Value,
}

impl TransactionState {
    /// A state with no linear identity
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            linear_id: None,
            data,
        }
    }

    /// A version of the linear state `linear_id`
    pub fn linear(linear_id: Uuid, data: serde_json::Value) -> Self {
        Self {
            linear_id: Some(linear_id),
            data,
        }
    }
}

/// A state together with the ref that points at it
#[derive(Debug, Clone, PartialEq)]
pub struct StateAndRef {
    /// Where the state lives
    pub state_ref: StateRef,
    /// The state itself
    pub state: TransactionState,
}

/// A transaction ready for notarisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Hash of the transaction contents
    pub id: SecureHash,

    /// States spent by this transaction
    pub inputs: Vec<StateRef>,

    /// States read but not spent
    pub references: Vec<StateRef>,

    /// States produced
    pub outputs: Vec<TransactionState>,
}

impl LedgerTransaction {
    /// Ref to the output at `index`
    pub fn out_ref(&self, index: u32) -> StateRef {
        StateRef::new(self.id, index)
    }

    /// Every output with its ref
    pub fn out_refs(&self) -> Vec<StateAndRef> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(index, state)| StateAndRef {
                state_ref: self.out_ref(index as u32),
                state: state.clone(),
            })
            .collect()
    }
}

#[derive(Serialize)]
struct IdPayload<'a> {
    inputs: &'a [StateRef],
    references: &'a [StateRef],
    outputs: &'a [TransactionState],
    nonce: Uuid,
}

/// Assembles a [`LedgerTransaction`]
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    inputs: Vec<StateRef>,
    references: Vec<StateRef>,
    outputs: Vec<TransactionState>,
}

impl TransactionBuilder {
    /// Start an empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend a state
    pub fn add_input(mut self, state_ref: StateRef) -> Self {
        self.inputs.push(state_ref);
        self
    }

    /// Read a state without spending it
    pub fn add_reference(mut self, state_ref: StateRef) -> Self {
        self.references.push(state_ref);
        self
    }

    /// Produce a state
    pub fn add_output(mut self, state: TransactionState) -> Self {
        self.outputs.push(state);
        self
    }

    /// Fix the contents and compute the transaction id.
    ///
    /// A random nonce makes two builds of the same contents distinct.
    pub fn build(self) -> Result<LedgerTransaction, FlowError> {
        let payload = IdPayload {
            inputs: &self.inputs,
            references: &self.references,
            outputs: &self.outputs,
            nonce: Uuid::new_v4(),
        };
        let id = SecureHash::sha256(serde_json::to_vec(&payload)?);

        Ok(LedgerTransaction {
            id,
            inputs: self.inputs,
            references: self.references,
            outputs: self.outputs,
        })
    }
}
