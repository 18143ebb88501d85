//! A flow waiting on a reference update its node never receives.

use async_trait::async_trait;
use ledgerflow_core::{
    CoordinatorConfig, FlowContext, FlowError, FlowLogic, FlowStatus, ProgressState::*,
    RetryCoordinator,
};
use ledgerflow_ledger_inmemory::{InMemoryLedger, TransactionBuilder, TransactionState};
use ledgerflow_test_utils::{eventually, init_test_logging};
use ledgerflow_tests::{issue_reference, node_executor, update_reference, IssueAgainstReference};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn test_call_site_deadline_ends_an_unbounded_wait() -> anyhow::Result<()> {
    init_test_logging();
    let config = CoordinatorConfig::load_from(|key| match key {
        "LEDGERFLOW_FLOW_DEADLINE_MS" => Some("200".to_string()),
        _ => None,
    });
    assert_eq!(config.attempt_guard, None);

    let node_a = node_executor(InMemoryLedger::new());
    let node_b = InMemoryLedger::with_notary(node_a.ledger.notary().clone());
    let (rate_id, v1) = issue_reference(&[&node_a.ledger, &node_b], json!({"rate": 1})).await?;

    // Replaced on node B; node A is never told
    update_reference(&node_b, v1, rate_id, json!({"rate": 2})).await?;

    let flow = IssueAgainstReference::new(node_a.ledger.clone(), rate_id, json!("stuck"));
    let coordinator = RetryCoordinator::with_config(flow, config.clone());
    let progress = coordinator.progress();
    let handle = node_a.executor.start_flow(coordinator).await?;
    let id = handle.instance_id().clone();

    let err = handle.result_with_deadline(config.flow_deadline()).await.unwrap_err();
    assert_eq!(err, FlowError::DeadlineExceeded(Duration::from_millis(200)));
    assert_eq!(progress.history(), vec![Attempting, RetryingAfterConflict]);

    let instance = node_a.executor.instance(&id).await?.expect("checkpoint");
    assert_eq!(instance.status, FlowStatus::Failed);
    assert_eq!(instance.attempts, 1);
    assert!(instance.awaiting.is_empty());
    eventually(Duration::from_secs(5), || node_a.metrics.snapshot().flows_failed == 1).await;
    Ok(())
}

/// Reads a reference, then replaces it before notarising a quote of the old version
struct AlwaysStale {
    ledger: InMemoryLedger,
    reference_id: Uuid,
}

#[async_trait]
impl FlowLogic for AlwaysStale {
    type Output = ();

    async fn call(&self, _ctx: &FlowContext) -> Result<(), FlowError> {
        let read = self
            .ledger
            .vault()
            .latest_by_linear_id(self.reference_id)
            .await
            .ok_or_else(|| FlowError::Ledger("reference missing".to_string()))?;
        update_reference(&self.ledger, read.state_ref, self.reference_id, json!("newer")).await?;

        let quote = TransactionBuilder::new()
            .add_reference(read.state_ref)
            .add_output(TransactionState::new(json!("quote")))
            .build()?;
        self.ledger.finalise(&quote).await
    }
}

#[tokio::test]
async fn test_attempt_guard_stops_a_flow_that_keeps_losing() -> anyhow::Result<()> {
    let node = node_executor(InMemoryLedger::new());
    let (rate_id, _) = issue_reference(&[&node.ledger], json!({"rate": 0})).await?;

    let coordinator = RetryCoordinator::with_config(
        AlwaysStale {
            ledger: node.ledger.clone(),
            reference_id: rate_id,
        },
        CoordinatorConfig::with_attempt_guard(3),
    );
    let progress = coordinator.progress();
    let err = node.executor.run_flow(coordinator).await.unwrap_err();

    assert_eq!(err, FlowError::AttemptGuardTripped { attempts: 3 });
    assert_eq!(
        progress.history(),
        vec![
            Attempting,
            RetryingAfterConflict,
            Attempting,
            RetryingAfterConflict,
            Attempting,
            RetryingAfterConflict
        ]
    );
    assert_eq!(node.metrics.snapshot().retries, 2);
    Ok(())
}
