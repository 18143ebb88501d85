//! Flows whose attempts return pre-programmed results.

use async_trait::async_trait;
use ledgerflow_core::{FlowContext, FlowError, FlowLogic};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

type Script<T> = Box<dyn Fn(u32) -> Result<T, FlowError> + Send + Sync>;

/// A flow that answers each invocation from a script.
///
/// The invocation counter is shared, so a clone of [`ScriptedFlow::invocations`]
/// stays readable after the flow has been moved into an executor.
pub struct ScriptedFlow<T> {
    name: String,
    script: Script<T>,
    invocations: Arc<AtomicU32>,
}

impl<T: Send + 'static> ScriptedFlow<T> {
    /// Return the given results in order, then fail once they run out
    pub fn new(results: Vec<Result<T, FlowError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(results));
        Self::from_fn(move |attempt| {
            queue.lock().pop_front().unwrap_or_else(|| {
                Err(FlowError::Flow(format!("script exhausted at attempt {}", attempt)))
            })
        })
    }

    /// Compute each result from the 1-based attempt number
    pub fn from_fn(script: impl Fn(u32) -> Result<T, FlowError> + Send + Sync + 'static) -> Self {
        Self {
            name: "ScriptedFlow".to_string(),
            script: Box::new(script),
            invocations: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Set the name reported to the executor
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Shared invocation counter
    pub fn invocations(&self) -> Arc<AtomicU32> {
        self.invocations.clone()
    }

    /// Number of invocations so far
    pub fn invocation_count(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Send + 'static> FlowLogic for ScriptedFlow<T> {
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _ctx: &FlowContext) -> Result<T, FlowError> {
        let attempt = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
        (self.script)(attempt)
    }
}
