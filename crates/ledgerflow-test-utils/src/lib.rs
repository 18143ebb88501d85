//! Testing utilities for ledgerflow.
//!
//! Mocks and fakes of the ledger collaborators, scripted flows, executor
//! builders, data generators and progress assertions.

pub mod assertions;
pub mod builders;
pub mod data_generators;
pub mod implementations;
pub mod mocks;
pub mod util;

/// Re-export commonly used types for convenience
pub use mockall;

pub use assertions::progress::{assert_progress_monotonic, assert_progress_sequence};
pub use builders::{test_executor, RecordingEventHandler, TestExecutor};
pub use implementations::controlled_ledger::ControlledLedger;
pub use implementations::scripted_flow::ScriptedFlow;
pub use mocks::MockLedgerQuery;
pub use util::eventually;

/// Install a test subscriber that honours `RUST_LOG`; safe to call repeatedly
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
