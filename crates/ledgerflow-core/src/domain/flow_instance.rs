use crate::{
    domain::events::{
        AttemptStarted, DomainEvent, FlowCompleted, FlowFailed, FlowResumed, FlowStarted,
        FlowSuspendedForSettlement, RetryStarted,
    },
    types::StateRef,
    FlowError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flow instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowStatus {
    /// Flow is currently running
    Running,

    /// Flow is parked until reference states settle
    WaitingForSettlement,

    /// Flow has completed successfully
    Completed,

    /// Flow failed
    Failed,
}

/// Value object: Flow Instance ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowInstanceId(pub String);

impl FlowInstanceId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        FlowInstanceId(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for FlowInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate: the checkpoint record of a running flow
#[derive(Debug, Serialize, Deserialize)]
pub struct FlowInstance {
    /// Unique identifier
    pub id: FlowInstanceId,

    /// Name of the top-level flow
    pub flow_name: String,

    /// Current status
    pub status: FlowStatus,

    /// Number of sub-flow attempts started so far, nested sub-flows included
    pub attempts: u32,

    /// Number of times a retry coordinator re-ran its inner flow
    #[serde(default)]
    pub retries: u32,

    /// States the flow is suspended on, empty unless waiting
    pub awaiting: Vec<StateRef>,

    /// Error message if flow failed
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// Domain events
    #[serde(skip)]
    pub events: Vec<Box<dyn DomainEvent>>,
}

// Domain events are not cloned
impl Clone for FlowInstance {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            flow_name: self.flow_name.clone(),
            status: self.status,
            attempts: self.attempts,
            retries: self.retries,
            awaiting: self.awaiting.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: Vec::new(),
        }
    }
}

impl FlowInstance {
    /// Create a running flow instance
    pub fn new(flow_name: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut instance = Self {
            id: FlowInstanceId::generate(),
            flow_name: flow_name.into(),
            status: FlowStatus::Running,
            attempts: 0,
            retries: 0,
            awaiting: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
            events: Vec::with_capacity(4),
        };

        instance.record_event(Box::new(FlowStarted {
            flow_instance_id: instance.id.clone(),
            flow_name: instance.flow_name.clone(),
            timestamp: now,
        }));

        instance
    }

    /// True once the instance has completed or failed
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, FlowStatus::Completed | FlowStatus::Failed)
    }

    /// Record the start of a sub-flow attempt, returning its 1-based number
    pub fn begin_attempt(&mut self, flow_name: &str) -> Result<u32, FlowError> {
        self.require_status(FlowStatus::Running, "begin an attempt")?;

        self.attempts += 1;
        self.update_timestamp();
        self.record_event(Box::new(AttemptStarted {
            flow_instance_id: self.id.clone(),
            flow_name: flow_name.to_string(),
            attempt: self.attempts,
            timestamp: self.updated_at,
        }));

        Ok(self.attempts)
    }

    /// Record that a retry coordinator is about to run `flow_name` again
    pub fn record_retry(&mut self, flow_name: &str, attempt: u32) -> Result<u32, FlowError> {
        self.require_status(FlowStatus::Running, "retry")?;

        self.retries += 1;
        self.update_timestamp();
        self.record_event(Box::new(RetryStarted {
            flow_instance_id: self.id.clone(),
            flow_name: flow_name.to_string(),
            attempt,
            timestamp: self.updated_at,
        }));

        Ok(self.retries)
    }

    /// Park the flow until the given states settle
    pub fn suspend_for_settlement(&mut self, awaiting: Vec<StateRef>) -> Result<(), FlowError> {
        self.require_status(FlowStatus::Running, "suspend")?;

        self.status = FlowStatus::WaitingForSettlement;
        self.awaiting = awaiting;
        self.update_timestamp();
        self.record_event(Box::new(FlowSuspendedForSettlement {
            flow_instance_id: self.id.clone(),
            awaiting: self.awaiting.clone(),
            timestamp: self.updated_at,
        }));

        Ok(())
    }

    /// Resume a flow that was waiting for settlement
    pub fn resume(&mut self) -> Result<(), FlowError> {
        self.require_status(FlowStatus::WaitingForSettlement, "resume")?;

        self.status = FlowStatus::Running;
        self.awaiting.clear();
        self.update_timestamp();
        self.record_event(Box::new(FlowResumed {
            flow_instance_id: self.id.clone(),
            timestamp: self.updated_at,
        }));

        Ok(())
    }

    /// Mark the flow as completed
    pub fn complete(&mut self) -> Result<(), FlowError> {
        self.require_status(FlowStatus::Running, "complete")?;

        self.status = FlowStatus::Completed;
        self.update_timestamp();
        self.record_event(Box::new(FlowCompleted {
            flow_instance_id: self.id.clone(),
            timestamp: self.updated_at,
        }));

        Ok(())
    }

    /// Mark the flow as failed
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), FlowError> {
        if self.is_terminal() {
            return Err(FlowError::Checkpoint(format!(
                "Cannot fail flow in state: {:?}",
                self.status
            )));
        }

        let error = error.into();
        self.status = FlowStatus::Failed;
        self.awaiting.clear();
        self.error = Some(error.clone());
        self.update_timestamp();
        self.record_event(Box::new(FlowFailed {
            flow_instance_id: self.id.clone(),
            error,
            timestamp: self.updated_at,
        }));

        Ok(())
    }

    /// Drain the events recorded since the last call
    pub fn take_events(&mut self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    fn update_timestamp(&mut self) {
        self.updated_at = Utc::now();
    }

    fn record_event(&mut self, event: Box<dyn DomainEvent>) {
        self.events.push(event);
    }

    fn require_status(&self, expected: FlowStatus, action: &str) -> Result<(), FlowError> {
        if self.status != expected {
            return Err(FlowError::Checkpoint(format!(
                "Cannot {} while flow is in state: {:?}",
                action, self.status
            )));
        }
        Ok(())
    }
}
