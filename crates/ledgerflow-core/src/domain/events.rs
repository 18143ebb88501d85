use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::domain::flow_instance::FlowInstanceId;
use crate::types::StateRef;
use crate::FlowError;

/// Domain event trait for all events in the system
pub trait DomainEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the flow instance ID this event is associated with
    fn flow_instance_id(&self) -> &FlowInstanceId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Receives domain events emitted by the flow executor
#[async_trait]
pub trait DomainEventHandler: Send + Sync {
    /// Handle a domain event
    async fn handle_event(&self, event: Box<dyn DomainEvent>) -> Result<(), FlowError>;
}

/// Event handler that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventHandler;

#[async_trait]
impl DomainEventHandler for NoopEventHandler {
    async fn handle_event(&self, _event: Box<dyn DomainEvent>) -> Result<(), FlowError> {
        Ok(())
    }
}

macro_rules! impl_domain_event {
    ($event:ty, $name:literal) => {
        impl DomainEvent for $event {
            fn event_type(&self) -> &'static str {
                $name
            }

            fn flow_instance_id(&self) -> &FlowInstanceId {
                &self.flow_instance_id
            }

            fn timestamp(&self) -> DateTime<Utc> {
                self.timestamp
            }
        }
    };
}

/// Event: Flow started
#[derive(Debug)]
pub struct FlowStarted {
    /// The unique identifier of the flow instance
    pub flow_instance_id: FlowInstanceId,

    /// Name of the top-level flow
    pub flow_name: String,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(FlowStarted, "flow_instance.started");

/// Event: A sub-flow attempt started
#[derive(Debug)]
pub struct AttemptStarted {
    /// The unique identifier of the flow instance
    pub flow_instance_id: FlowInstanceId,

    /// Name of the sub-flow being attempted
    pub flow_name: String,

    /// 1-based attempt number within the instance
    pub attempt: u32,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(AttemptStarted, "attempt.started");

/// Event: A retry coordinator started another attempt after a conflict
#[derive(Debug)]
pub struct RetryStarted {
    /// The unique identifier of the flow instance
    pub flow_instance_id: FlowInstanceId,

    /// Name of the flow being retried
    pub flow_name: String,

    /// The coordinator's attempt number, always 2 or more
    pub attempt: u32,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(RetryStarted, "retry.started");

/// Event: Flow suspended until reference states settle
#[derive(Debug)]
pub struct FlowSuspendedForSettlement {
    /// The unique identifier of the flow instance
    pub flow_instance_id: FlowInstanceId,

    /// States the flow is waiting on
    pub awaiting: Vec<StateRef>,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(FlowSuspendedForSettlement, "flow_instance.suspended_for_settlement");

/// Event: Flow resumed after settlement
#[derive(Debug)]
pub struct FlowResumed {
    /// The unique identifier of the flow instance
    pub flow_instance_id: FlowInstanceId,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(FlowResumed, "flow_instance.resumed");

/// Event: Flow completed
#[derive(Debug)]
pub struct FlowCompleted {
    /// The unique identifier of the flow instance
    pub flow_instance_id: FlowInstanceId,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(FlowCompleted, "flow_instance.completed");

/// Event: Flow failed
#[derive(Debug)]
pub struct FlowFailed {
    /// The unique identifier of the flow instance
    pub flow_instance_id: FlowInstanceId,

    /// The error that ended the flow
    pub error: String,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl_domain_event!(FlowFailed, "flow_instance.failed");
