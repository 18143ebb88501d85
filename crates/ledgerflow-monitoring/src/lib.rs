//! Monitoring for ledgerflow nodes.
//!
//! Structured logging set-up and flow metrics derived from the domain events
//! the executor emits.

use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::MonitoringError;
pub use logging::{init_logging, LogExt};
pub use crate::metrics::{FlowMetricsSnapshot, MetricsEventHandler};

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Service name attached to logs and metrics
    pub service_name: String,
    /// Log level filter (e.g., "info,ledgerflow_core=debug"), overridden by `RUST_LOG`
    pub log_filter: String,
    /// JSON logs instead of pretty ones
    pub enable_json_logging: bool,
    /// Install the Prometheus recorder on init
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "ledgerflow".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            enable_metrics: true,
        }
    }
}

impl MonitoringConfig {
    /// Check the configuration before anything is installed
    pub fn validate(&self) -> Result<(), MonitoringError> {
        if self.service_name.trim().is_empty() {
            return Err(MonitoringError::InvalidConfig(
                "service name must not be empty".to_string(),
            ));
        }
        EnvFilter::try_new(&self.log_filter).map_err(|e| {
            MonitoringError::InvalidConfig(format!("log filter '{}': {}", self.log_filter, e))
        })?;
        Ok(())
    }
}

/// Initialize logging and, when enabled, the metrics recorder
pub fn init(config: &MonitoringConfig) -> anyhow::Result<()> {
    config.validate()?;
    init_logging(config)?;

    #[cfg(feature = "prometheus")]
    {
        if config.enable_metrics {
            crate::metrics::install_prometheus_recorder()
                .log_err("Failed to install Prometheus recorder")?;
        }
    }

    info!(service_name = %config.service_name, "Monitoring initialized");
    Ok(())
}
