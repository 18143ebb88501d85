//!
//! Ledgerflow Core - flow runtime for ledgerflow nodes
//!
//! This crate defines the ledger value types, the in-process flow executor,
//! and the retry coordinator that lets a flow reading shared reference data
//! survive a notary conflict by waiting for the data to settle and retrying.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - ledger model, checkpoints, events and collaborator traits
pub mod domain;

/// Application services - executor, settlement waiter, retry coordinator
pub mod application;

/// Ledger value types
pub mod types;

/// Configuration
pub mod config;

/// Error types
pub mod error;

// Re-export key types
pub use config::CoordinatorConfig;
pub use error::{FlowError, NotaryError};
pub use types::{ConflictReport, ConsumptionKind, ConsumptionRecord, SecureHash, StateRef};

pub use domain::classifier::{classify, Classification};
pub use domain::events::{DomainEvent, DomainEventHandler, NoopEventHandler};
pub use domain::flow_instance::{FlowInstance, FlowInstanceId, FlowStatus};
pub use domain::outcome::FlowOutcome;
pub use domain::progress::{ProgressState, ProgressTracker};
pub use domain::repository::FlowInstanceRepository;
pub use domain::services::{LedgerQueryService, ServiceHub, StateStatus};

pub use application::flow_executor::{FlowContext, FlowExecutor, FlowHandle, FlowLogic};
pub use application::retry_coordinator::RetryCoordinator;
pub use application::settlement_waiter::SettlementWaiter;
pub use application::suspend_point::SuspendPoint;
