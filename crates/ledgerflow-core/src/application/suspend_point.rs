//! Explicit suspend-point values handed to the flow executor.

use futures::future::BoxFuture;
use std::fmt;

use crate::types::StateRef;
use crate::FlowError;

/// A pending external completion a flow can be parked on.
///
/// The executor awaits the future on the async runtime, so a parked flow
/// holds no worker thread while it waits.
pub enum SuspendPoint {
    /// Nothing to wait for; the flow continues without suspending
    Ready,

    /// Resolves once every awaited state has been consumed
    Pending {
        /// States the future is waiting on
        awaiting: Vec<StateRef>,
        /// Combined completion future
        future: BoxFuture<'static, Result<(), FlowError>>,
    },
}

impl SuspendPoint {
    /// True for the no-wait fast path
    pub fn is_ready(&self) -> bool {
        matches!(self, SuspendPoint::Ready)
    }

    /// States still being waited on
    pub fn awaiting(&self) -> &[StateRef] {
        match self {
            SuspendPoint::Ready => &[],
            SuspendPoint::Pending { awaiting, .. } => awaiting,
        }
    }

    /// Wait for completion outside of a flow context
    pub async fn wait(self) -> Result<(), FlowError> {
        match self {
            SuspendPoint::Ready => Ok(()),
            SuspendPoint::Pending { future, .. } => future.await,
        }
    }
}

impl fmt::Debug for SuspendPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendPoint::Ready => f.write_str("Ready"),
            SuspendPoint::Pending { awaiting, .. } => f
                .debug_struct("Pending")
                .field("awaiting", awaiting)
                .finish_non_exhaustive(),
        }
    }
}
