//! Flow metrics derived from domain events.

use async_trait::async_trait;
use dashmap::DashSet;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use ledgerflow_core::{DomainEvent, DomainEventHandler, FlowError, FlowInstanceId};

const FLOWS_STARTED: &str = "ledgerflow_flows_started_total";
const ATTEMPTS: &str = "ledgerflow_attempts_total";
const RETRIES: &str = "ledgerflow_retries_total";
const SUSPENSIONS: &str = "ledgerflow_settlement_suspensions_total";
const RESUMPTIONS: &str = "ledgerflow_settlement_resumptions_total";
const FLOWS_COMPLETED: &str = "ledgerflow_flows_completed_total";
const FLOWS_FAILED: &str = "ledgerflow_flows_failed_total";

/// Point-in-time copy of the counters a [`MetricsEventHandler`] keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlowMetricsSnapshot {
    /// Flows started
    pub flows_started: u64,
    /// Sub-flow attempts, nested sub-flows included
    pub attempts: u64,
    /// Inner flows re-run by a retry coordinator
    pub retries: u64,
    /// Times a flow parked waiting for settlement
    pub suspensions: u64,
    /// Times a parked flow resumed
    pub resumptions: u64,
    /// Flows completed
    pub flows_completed: u64,
    /// Flows failed
    pub flows_failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    flows_started: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    suspensions: AtomicU64,
    resumptions: AtomicU64,
    flows_completed: AtomicU64,
    flows_failed: AtomicU64,
}

/// Counts flow lifecycle events.
///
/// Every event is reported through the `metrics` facade, so whichever
/// recorder is installed (Prometheus by default) sees it. The handler also
/// keeps its own tallies, readable with [`MetricsEventHandler::snapshot`].
#[derive(Debug)]
pub struct MetricsEventHandler {
    service: String,
    counters: Counters,
    active: DashSet<FlowInstanceId>,
}

impl MetricsEventHandler {
    /// Create a handler labelling metrics with `service`
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            counters: Counters::default(),
            active: DashSet::new(),
        }
    }

    /// Current tallies
    pub fn snapshot(&self) -> FlowMetricsSnapshot {
        let c = &self.counters;
        FlowMetricsSnapshot {
            flows_started: c.flows_started.load(Ordering::Relaxed),
            attempts: c.attempts.load(Ordering::Relaxed),
            retries: c.retries.load(Ordering::Relaxed),
            suspensions: c.suspensions.load(Ordering::Relaxed),
            resumptions: c.resumptions.load(Ordering::Relaxed),
            flows_completed: c.flows_completed.load(Ordering::Relaxed),
            flows_failed: c.flows_failed.load(Ordering::Relaxed),
        }
    }

    /// Flows with at least one attempt that have not finished yet
    pub fn active_flows(&self) -> usize {
        self.active.len()
    }

    fn count(&self, counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        ::metrics::increment_counter!(name, "service" => self.service.clone());
    }

    fn record_attempt(&self, instance: &FlowInstanceId) {
        self.count(&self.counters.attempts, ATTEMPTS);
        self.active.insert(instance.clone());
    }

    fn record_finish(&self, instance: &FlowInstanceId, counter: &AtomicU64, name: &'static str) {
        self.active.remove(instance);
        self.count(counter, name);
    }
}

impl Default for MetricsEventHandler {
    fn default() -> Self {
        Self::new("ledgerflow")
    }
}

#[async_trait]
impl DomainEventHandler for MetricsEventHandler {
    async fn handle_event(&self, event: Box<dyn DomainEvent>) -> Result<(), FlowError> {
        trace!(event_type = event.event_type(), instance_id = %event.flow_instance_id(), "Metrics event");

        match event.event_type() {
            "flow_instance.started" => self.count(&self.counters.flows_started, FLOWS_STARTED),
            "attempt.started" => self.record_attempt(event.flow_instance_id()),
            "retry.started" => self.count(&self.counters.retries, RETRIES),
            "flow_instance.suspended_for_settlement" => {
                self.count(&self.counters.suspensions, SUSPENSIONS)
            }
            "flow_instance.resumed" => self.count(&self.counters.resumptions, RESUMPTIONS),
            "flow_instance.completed" => self.record_finish(
                event.flow_instance_id(),
                &self.counters.flows_completed,
                FLOWS_COMPLETED,
            ),
            "flow_instance.failed" => self.record_finish(
                event.flow_instance_id(),
                &self.counters.flows_failed,
                FLOWS_FAILED,
            ),
            _ => {}
        }

        Ok(())
    }
}

/// Install the Prometheus recorder as the global metrics recorder
#[cfg(feature = "prometheus")]
pub fn install_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, crate::MonitoringError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| crate::MonitoringError::Exporter(e.to_string()))
}
