//! Structured logging module using tracing.
//!
//! Logs are JSON for aggregation or pretty for development. `RUST_LOG` takes
//! precedence over the configured filter.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{MonitoringConfig, MonitoringError};

/// Initialize structured logging
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let json_layer = config.enable_json_logging.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let pretty_layer = (!config.enable_json_logging).then(|| {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .map_err(|e| MonitoringError::AlreadyInitialized(e.to_string()))
        .context("Failed to set global default subscriber")?;

    info!(
        service_name = %config.service_name,
        log_format = if config.enable_json_logging { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

/// Trait to add log context to results
pub trait LogExt<T, E> {
    /// Log error with additional context before returning
    fn log_err(self, message: &str) -> Result<T, E>;

    /// Log success with additional context before returning
    fn log_ok(self, message: &str) -> Result<T, E>;
}

impl<T, E: std::fmt::Display> LogExt<T, E> for Result<T, E> {
    fn log_err(self, message: &str) -> Result<T, E> {
        if let Err(ref e) = self {
            tracing::error!("{}: {}", message, e);
        }
        self
    }

    fn log_ok(self, message: &str) -> Result<T, E> {
        if self.is_ok() {
            tracing::info!("{}", message);
        }
        self
    }
}
