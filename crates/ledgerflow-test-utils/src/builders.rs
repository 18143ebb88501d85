//! Builders for executors wired to in-memory collaborators.

use async_trait::async_trait;
use ledgerflow_core::domain::repository::memory::MemoryFlowInstanceRepository;
use ledgerflow_core::{
    DomainEvent, DomainEventHandler, FlowError, FlowExecutor, LedgerQueryService, ServiceHub,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Event handler that remembers the type of every event it sees
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingEventHandler {
    /// Event types seen so far, in order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    /// How many events of one type were seen
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|seen| **seen == event_type)
            .count()
    }
}

#[async_trait]
impl DomainEventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: Box<dyn DomainEvent>) -> Result<(), FlowError> {
        self.events.lock().push(event.event_type());
        Ok(())
    }
}

/// An executor plus handles on its repository and recorded events
pub struct TestExecutor {
    /// The executor
    pub executor: FlowExecutor,
    /// Checkpoint repository the executor writes to
    pub repo: Arc<MemoryFlowInstanceRepository>,
    /// Events the executor emitted
    pub events: Arc<RecordingEventHandler>,
}

/// Build an executor over `ledger` with an in-memory repository
pub fn test_executor(ledger: Arc<dyn LedgerQueryService>) -> TestExecutor {
    let repo = Arc::new(MemoryFlowInstanceRepository::new());
    let events = Arc::new(RecordingEventHandler::default());
    let executor = FlowExecutor::new(repo.clone(), events.clone(), ServiceHub::new(ledger));
    TestExecutor {
        executor,
        repo,
        events,
    }
}
