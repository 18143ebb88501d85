//! Ledger value types shared by the runtime and its collaborators.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::FlowError;

/// A SHA-256 digest, used as the identifier of ledger transactions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecureHash(pub [u8; 32]);

impl SecureHash {
    /// The all-zero hash
    pub const ZERO: SecureHash = SecureHash([0u8; 32]);

    /// Hash arbitrary bytes with SHA-256
    pub fn sha256(bytes: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(bytes.as_ref());
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        SecureHash(out)
    }

    /// Parse a hash from its hex representation (either case)
    pub fn parse(text: &str) -> Result<Self, FlowError> {
        let bytes = hex::decode(text)
            .map_err(|e| FlowError::Ledger(format!("Invalid hash '{}': {}", text, e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            FlowError::Ledger(format!("Invalid hash '{}': expected 32 bytes", text))
        })?;
        Ok(SecureHash(bytes))
    }

    /// Short prefix used in log lines
    pub fn prefix(&self) -> String {
        hex::encode_upper(&self.0[..4])
    }
}

impl fmt::Display for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureHash({})", self.prefix())
    }
}

/// Value object: a reference to one output of a ledger transaction.
///
/// A state ref is created when the producing transaction is recorded and is
/// consumed at most once, when a later transaction spends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    /// Id of the transaction that produced the state
    pub txhash: SecureHash,

    /// Position of the state in that transaction's outputs
    pub index: u32,
}

impl StateRef {
    /// Create a new state ref
    pub fn new(txhash: SecureHash, index: u32) -> Self {
        Self { txhash, index }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

/// How a transaction used a state it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsumptionKind {
    /// Spent as a required input
    OrdinaryInput,

    /// Only read; the state stays unconsumed
    ReferenceInput,
}

/// Record of the transaction that consumed a state first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    /// Transaction that consumed the state
    pub consuming_tx: SecureHash,

    /// How the losing transaction used the state
    pub kind: ConsumptionKind,
}

impl ConsumptionRecord {
    /// Create a new consumption record
    pub fn new(consuming_tx: SecureHash, kind: ConsumptionKind) -> Self {
        Self { consuming_tx, kind }
    }
}

/// The states a rejected transaction named that were already consumed.
///
/// Built once by the notary per rejected transaction and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConflictReport {
    consumed: BTreeMap<StateRef, ConsumptionRecord>,
}

impl ConflictReport {
    /// Create a report from its records
    pub fn new(consumed: impl IntoIterator<Item = (StateRef, ConsumptionRecord)>) -> Self {
        Self {
            consumed: consumed.into_iter().collect(),
        }
    }

    /// The conflicting records, ordered by state ref
    pub fn records(&self) -> impl Iterator<Item = (&StateRef, &ConsumptionRecord)> {
        self.consumed.iter()
    }

    /// Every state ref named in the report
    pub fn state_refs(&self) -> HashSet<StateRef> {
        self.consumed.keys().copied().collect()
    }

    /// Look up the record for a single state ref
    pub fn get(&self, state_ref: &StateRef) -> Option<&ConsumptionRecord> {
        self.consumed.get(state_ref)
    }

    /// Number of conflicting states
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    /// True when the report names no states
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        f.write_str("[")?;
        for (state_ref, record) in &self.consumed {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(
                f,
                "{} consumed by {} as {:?}",
                state_ref,
                record.consuming_tx.prefix(),
                record.kind
            )?;
        }
        f.write_str("]")
    }
}
