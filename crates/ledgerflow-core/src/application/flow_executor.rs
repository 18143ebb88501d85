//! In-process flow executor.
//!
//! Flows run as tokio tasks. A flow parks by awaiting a [`SuspendPoint`], so
//! thousands of suspended flows cost no worker threads, and a resumed flow
//! continues on whichever worker the runtime picks. Every lifecycle change is
//! checkpointed to a [`FlowInstanceRepository`] and its domain events are
//! handed to a [`DomainEventHandler`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::suspend_point::SuspendPoint;
use crate::{
    domain::events::DomainEventHandler,
    domain::flow_instance::{FlowInstance, FlowInstanceId},
    domain::repository::FlowInstanceRepository,
    domain::services::ServiceHub,
    FlowError,
};

/// A unit of suspendable business logic.
///
/// Implementations wrapped by a retry coordinator must be safe to re-invoke
/// from scratch: no state from a failed attempt may leak into the next one.
#[async_trait]
pub trait FlowLogic: Send + Sync {
    /// Value returned on success
    type Output: Send + 'static;

    /// Name used in checkpoints and logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run the flow
    async fn call(&self, ctx: &FlowContext) -> Result<Self::Output, FlowError>;
}

struct ContextInner {
    instance_id: FlowInstanceId,
    instance: Mutex<FlowInstance>,
    repo: Arc<dyn FlowInstanceRepository>,
    event_handler: Arc<dyn DomainEventHandler>,
    services: ServiceHub,
}

/// Handle a running flow uses to reach the executor
#[derive(Clone)]
pub struct FlowContext {
    inner: Arc<ContextInner>,
}

impl FlowContext {
    fn new(
        instance: FlowInstance,
        repo: Arc<dyn FlowInstanceRepository>,
        event_handler: Arc<dyn DomainEventHandler>,
        services: ServiceHub,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                instance_id: instance.id.clone(),
                instance: Mutex::new(instance),
                repo,
                event_handler,
                services,
            }),
        }
    }

    /// Id of the flow instance this context belongs to
    pub fn instance_id(&self) -> &FlowInstanceId {
        &self.inner.instance_id
    }

    /// Collaborator services
    pub fn services(&self) -> &ServiceHub {
        &self.inner.services
    }

    /// Run `flow` as a sub-flow of the current instance.
    ///
    /// Each call counts as one attempt and is checkpointed before the
    /// sub-flow starts.
    pub async fn run_subflow<F: FlowLogic>(&self, flow: &F) -> Result<F::Output, FlowError> {
        let attempt = self
            .checkpoint(|instance| instance.begin_attempt(flow.name()))
            .await?;
        debug!(flow = flow.name(), attempt, "Starting sub-flow");
        flow.call(self).await
    }

    /// Record that `flow` is being run again after a conflict.
    ///
    /// Only a retry coordinator calls this, once before each attempt after
    /// its first. `attempt` is the coordinator's own attempt number.
    pub async fn record_retry<F: FlowLogic>(&self, flow: &F, attempt: u32) -> Result<(), FlowError> {
        self.checkpoint(|instance| instance.record_retry(flow.name(), attempt))
            .await?;
        Ok(())
    }

    /// Park the flow until `point` completes.
    ///
    /// A ready point returns immediately without checkpointing.
    pub async fn suspend_until(&self, point: SuspendPoint) -> Result<(), FlowError> {
        let (awaiting, future) = match point {
            SuspendPoint::Ready => return Ok(()),
            SuspendPoint::Pending { awaiting, future } => (awaiting, future),
        };

        self.checkpoint(|instance| instance.suspend_for_settlement(awaiting))
            .await?;
        debug!(instance_id = %self.instance_id(), "Flow suspended");

        future.await?;

        self.checkpoint(|instance| instance.resume()).await?;
        debug!(instance_id = %self.instance_id(), "Flow resumed");
        Ok(())
    }

    /// Apply a change to the instance, persist it and dispatch its events
    async fn checkpoint<R: Send>(
        &self,
        change: impl FnOnce(&mut FlowInstance) -> Result<R, FlowError> + Send,
    ) -> Result<R, FlowError> {
        let mut instance = self.inner.instance.lock().await;
        let result = change(&mut *instance)?;
        self.inner.repo.save(&*instance).await?;

        for event in instance.take_events() {
            self.inner.event_handler.handle_event(event).await?;
        }

        Ok(result)
    }

    /// Record the final result of the top-level flow.
    ///
    /// A flow error is returned unchanged even if recording it fails.
    async fn finish<T>(&self, result: Result<T, FlowError>) -> Result<T, FlowError> {
        match result {
            Ok(value) => {
                self.checkpoint(|instance| instance.complete()).await?;
                info!(instance_id = %self.instance_id(), "Flow completed");
                Ok(value)
            }
            Err(error) => {
                self.record_failure(&error).await;
                Err(error)
            }
        }
    }

    async fn record_failure(&self, error: &FlowError) {
        warn!(instance_id = %self.instance_id(), error = %error, "Flow failed");
        if let Err(checkpoint_error) = self
            .checkpoint(|instance| instance.fail(error.to_string()))
            .await
        {
            warn!(
                instance_id = %self.instance_id(),
                error = %checkpoint_error,
                "Could not record flow failure"
            );
        }
    }
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("instance_id", &self.inner.instance_id)
            .finish_non_exhaustive()
    }
}

/// Handle to a flow started by the executor.
///
/// Dropping the handle detaches the flow; it keeps running to completion.
#[derive(Debug)]
pub struct FlowHandle<T> {
    ctx: FlowContext,
    task: JoinHandle<Result<T, FlowError>>,
    interrupt: oneshot::Sender<FlowError>,
}

impl<T> FlowHandle<T> {
    /// Id of the flow instance
    pub fn instance_id(&self) -> &FlowInstanceId {
        self.ctx.instance_id()
    }

    /// Wait for the flow to finish
    pub async fn result(self) -> Result<T, FlowError> {
        join(self.task).await
    }

    /// Wait for the flow, giving up after `deadline`.
    ///
    /// On expiry the flow body is interrupted and the instance is marked
    /// failed with [`FlowError::DeadlineExceeded`]. A flow that had already
    /// returned is not interrupted: its result is recorded and returned even
    /// if recording it outlasts the deadline.
    pub async fn result_within(self, deadline: Duration) -> Result<T, FlowError> {
        let Self {
            ctx,
            mut task,
            interrupt,
        } = self;

        match tokio::time::timeout(deadline, &mut task).await {
            Ok(joined) => flatten(joined),
            Err(_) => {
                if interrupt.send(FlowError::DeadlineExceeded(deadline)).is_ok() {
                    debug!(instance_id = %ctx.instance_id(), ?deadline, "Deadline reached; interrupting flow");
                }
                join(task).await
            }
        }
    }

    /// Wait with an optional deadline
    pub async fn result_with_deadline(self, deadline: Option<Duration>) -> Result<T, FlowError> {
        match deadline {
            Some(deadline) => self.result_within(deadline).await,
            None => self.result().await,
        }
    }
}

async fn join<T>(task: JoinHandle<Result<T, FlowError>>) -> Result<T, FlowError> {
    flatten(task.await)
}

fn flatten<T>(
    joined: Result<Result<T, FlowError>, tokio::task::JoinError>,
) -> Result<T, FlowError> {
    match joined {
        Ok(result) => result,
        Err(join_error) => Err(FlowError::Cancelled(join_error.to_string())),
    }
}

/// Starts flows and checkpoints their lifecycle
#[derive(Clone)]
pub struct FlowExecutor {
    repo: Arc<dyn FlowInstanceRepository>,
    event_handler: Arc<dyn DomainEventHandler>,
    services: ServiceHub,
}

impl FlowExecutor {
    /// Create a new flow executor
    pub fn new(
        repo: Arc<dyn FlowInstanceRepository>,
        event_handler: Arc<dyn DomainEventHandler>,
        services: ServiceHub,
    ) -> Self {
        Self {
            repo,
            event_handler,
            services,
        }
    }

    /// Start `flow` on the runtime and return a handle to its result
    pub async fn start_flow<F>(&self, flow: F) -> Result<FlowHandle<F::Output>, FlowError>
    where
        F: FlowLogic + 'static,
    {
        let instance = FlowInstance::new(flow.name());
        let ctx = FlowContext::new(
            instance,
            self.repo.clone(),
            self.event_handler.clone(),
            self.services.clone(),
        );
        // Persist the start before anything can observe the id
        ctx.checkpoint(|_| Ok(())).await?;

        let span = info_span!("flow", instance_id = %ctx.instance_id(), flow = flow.name());
        let task_ctx = ctx.clone();
        let (interrupt, interrupted) = oneshot::channel::<FlowError>();
        let task = tokio::spawn(
            async move {
                // A dropped handle closes the channel, which leaves the flow running
                let result = tokio::select! {
                    biased;
                    result = flow.call(&task_ctx) => result,
                    Ok(error) = interrupted => Err(error),
                };
                task_ctx.finish(result).await
            }
            .instrument(span),
        );

        Ok(FlowHandle {
            ctx,
            task,
            interrupt,
        })
    }

    /// Start `flow` and wait for its result
    pub async fn run_flow<F>(&self, flow: F) -> Result<F::Output, FlowError>
    where
        F: FlowLogic + 'static,
    {
        self.start_flow(flow).await?.result().await
    }

    /// Latest checkpoint of a flow instance
    pub async fn instance(&self, id: &FlowInstanceId) -> Result<Option<FlowInstance>, FlowError> {
        self.repo.find_by_id(id).await
    }
}
