/// Flow executor, flow contexts and handles
pub mod flow_executor;

/// Retry coordinator for reference-state conflicts
pub mod retry_coordinator;

/// Settlement waiter
pub mod settlement_waiter;

/// Suspend points
pub mod suspend_point;
