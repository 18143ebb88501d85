//! Configuration for flows wrapped in a retry coordinator
//!
//! Defaults leave the retry loop unbounded and impose no deadline. Both knobs
//! are opt-in and can be set from the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

/// Environment variable holding the attempt guard
pub const ATTEMPT_GUARD_VAR: &str = "LEDGERFLOW_ATTEMPT_GUARD";

/// Environment variable holding the call-site deadline in milliseconds
pub const FLOW_DEADLINE_VAR: &str = "LEDGERFLOW_FLOW_DEADLINE_MS";

/// Retry coordinator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Fail after this many attempts instead of looping forever.
    ///
    /// Meant for test harnesses that want to detect livelock.
    #[serde(default)]
    pub attempt_guard: Option<u32>,

    /// Deadline applied by call sites that wait on a flow handle
    #[serde(default)]
    pub flow_deadline_ms: Option<u64>,
}

impl CoordinatorConfig {
    /// Config with an attempt guard
    pub fn with_attempt_guard(attempts: u32) -> Self {
        Self {
            attempt_guard: Some(attempts),
            ..Self::default()
        }
    }

    /// The call-site deadline, if one is configured
    pub fn flow_deadline(&self) -> Option<Duration> {
        self.flow_deadline_ms.map(Duration::from_millis)
    }

    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ATTEMPT_GUARD_VAR) {
            match value.parse::<u32>() {
                Ok(attempts) if attempts > 0 => config.attempt_guard = Some(attempts),
                _ => warn!("Invalid {} value: {}", ATTEMPT_GUARD_VAR, value),
            }
        }

        if let Some(value) = lookup(FLOW_DEADLINE_VAR) {
            match value.parse::<u64>() {
                Ok(ms) => config.flow_deadline_ms = Some(ms),
                Err(_) => warn!("Invalid {} value: {}", FLOW_DEADLINE_VAR, value),
            }
        }

        config
    }
}
