//! Fake implementations of collaborators for tests.

pub mod controlled_ledger;
pub mod scripted_flow;
