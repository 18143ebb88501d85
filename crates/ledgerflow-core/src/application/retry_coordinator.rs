//! Retries a flow that lost a race on reference states.
//!
//! The inner flow runs as a sub-flow. When the notary rejects its transaction
//! because referenced (not spent) states were superseded, the coordinator
//! parks until the local ledger has seen those states consumed and then runs
//! the inner flow again from scratch so it picks up the new versions.
//!
//! The loop is unbounded. Each retry only starts once the specific
//! conflicting states have settled, so the same conflict cannot repeat, but a
//! retried attempt can still race on other reference states. Tests can set
//! [`CoordinatorConfig::attempt_guard`] to turn a livelock into an error.
//!
//! Precondition: the inner flow must be safe to re-invoke from scratch. The
//! coordinator does not make its side effects idempotent.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::flow_executor::{FlowContext, FlowLogic};
use super::settlement_waiter::SettlementWaiter;
use crate::config::CoordinatorConfig;
use crate::domain::classifier::{classify, Classification};
use crate::domain::outcome::FlowOutcome;
use crate::domain::progress::{ProgressState, ProgressTracker};
use crate::error::NotaryError;
use crate::FlowError;

/// Runs an inner flow and retries it after reference-state conflicts.
///
/// One coordinator serves one invocation. Its progress ends at
/// [`ProgressState::Succeeded`], which is terminal, so calling it again fails.
pub struct RetryCoordinator<F> {
    inner: F,
    config: CoordinatorConfig,
    progress: Arc<ProgressTracker>,
}

impl<F: FlowLogic> RetryCoordinator<F> {
    /// Wrap `inner` with the default, unbounded configuration
    pub fn new(inner: F) -> Self {
        Self::with_config(inner, CoordinatorConfig::default())
    }

    /// Wrap `inner` with an explicit configuration
    pub fn with_config(inner: F, config: CoordinatorConfig) -> Self {
        Self {
            inner,
            config,
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    /// Progress of this coordinator, for monitoring
    pub fn progress(&self) -> Arc<ProgressTracker> {
        self.progress.clone()
    }

    /// Attempt, and on a retryable conflict wait and attempt again.
    pub async fn run(&self, ctx: &FlowContext) -> Result<F::Output, FlowError> {
        let waiter = SettlementWaiter::new(ctx.services().ledger().clone());
        let mut attempts: u32 = 0;

        loop {
            if let Some(guard) = self.config.attempt_guard {
                if attempts >= guard {
                    warn!(attempts, flow = self.inner.name(), "Attempt guard tripped");
                    return Err(FlowError::AttemptGuardTripped { attempts });
                }
            }
            attempts += 1;
            if attempts > 1 {
                ctx.record_retry(&self.inner, attempts).await?;
            }

            self.progress.set(ProgressState::Attempting)?;
            let outcome = FlowOutcome::from_result(ctx.run_subflow(&self.inner).await);

            let (tx_id, report) = match outcome {
                FlowOutcome::Success(value) => {
                    self.progress.set(ProgressState::Succeeded)?;
                    debug!(attempts, flow = self.inner.name(), "Inner flow succeeded");
                    return Ok(value);
                }
                FlowOutcome::FatalError(error) => {
                    warn!(attempts, flow = self.inner.name(), error = %error, "Inner flow failed");
                    return Err(error);
                }
                FlowOutcome::ConsensusConflict { tx_id, report } => (tx_id, report),
            };

            let refs = match classify(&report) {
                Classification::Retryable(refs) => refs,
                Classification::Fatal => {
                    warn!(
                        attempts,
                        tx_id = %tx_id,
                        conflicts = %report,
                        "Conflict involves spent inputs; not retrying"
                    );
                    return Err(NotaryError::Conflict { tx_id, report }.into());
                }
            };

            self.progress.set(ProgressState::RetryingAfterConflict)?;
            info!(
                attempts,
                tx_id = %tx_id,
                refs = refs.len(),
                "Reference states were superseded; waiting for them to settle before retrying"
            );

            let point = waiter.await_settlement(&refs).await?;
            ctx.suspend_until(point).await?;
        }
    }
}

#[async_trait]
impl<F: FlowLogic> FlowLogic for RetryCoordinator<F> {
    type Output = F::Output;

    fn name(&self) -> &str {
        "RetryCoordinator"
    }

    async fn call(&self, ctx: &FlowContext) -> Result<F::Output, FlowError> {
        self.run(ctx).await
    }
}

impl<F> std::fmt::Debug for RetryCoordinator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryCoordinator")
            .field("config", &self.config)
            .field("progress", &self.progress.current())
            .finish_non_exhaustive()
    }
}
