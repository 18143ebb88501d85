use thiserror::Error;

/// Errors raised while setting up monitoring
#[derive(Error, Debug)]
pub enum MonitoringError {
    /// Configuration error
    #[error("Invalid monitoring config: {0}")]
    InvalidConfig(String),

    /// A global subscriber or recorder was already installed
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    /// Metrics exporter error
    #[error("Metrics exporter error: {0}")]
    Exporter(String),
}
