//! Two flows race on a shared reference state.
//!
//! One flow quotes the current version of a reference state while another
//! replaces that version. The quoting flow loses at the notary, waits until
//! its node has seen the replacement, and succeeds against the new version.

use ledgerflow_core::{FlowStatus, ProgressState::*, RetryCoordinator};
use ledgerflow_ledger_inmemory::InMemoryLedger;
use ledgerflow_test_utils::{assert_progress_sequence, eventually};
use ledgerflow_tests::{issue_reference, node_executor, pause_point, IssueAgainstReference, UpdateReference};
use serde_json::json;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_retry_after_reference_update_on_same_node() -> anyhow::Result<()> {
    let node = node_executor(InMemoryLedger::new());
    let (rate_id, v1) = issue_reference(&[&node.ledger], json!({"rate": 1})).await?;

    let (pause, mut control) = pause_point();
    let flow = IssueAgainstReference::new(node.ledger.clone(), rate_id, json!("order-1"))
        .pause_after_read(pause);
    let used = flow.used_references();
    let coordinator = RetryCoordinator::new(flow);
    let progress = coordinator.progress();
    let handle = node.executor.start_flow(coordinator).await?;

    // The quoting flow has read v1; replace it before it notarises
    control.reached().await;
    let update = node
        .executor
        .run_flow(UpdateReference::new(node.ledger.clone(), rate_id, json!({"rate": 2})))
        .await?;
    control.release();

    let tx = handle.result().await?;
    assert_eq!(tx.references, vec![update.out_ref(0)]);
    assert_eq!(*used.lock(), vec![v1, update.out_ref(0)]);
    assert_progress_sequence(
        &progress,
        &[Attempting, RetryingAfterConflict, Attempting, Succeeded],
    );

    // The node recorded the update itself, so there was nothing to wait for
    let metrics = node.metrics.snapshot();
    assert_eq!(metrics.suspensions, 0);
    assert_eq!(metrics.retries, 1);
    assert_eq!(metrics.flows_completed, 2);
    Ok(())
}

#[tokio::test]
async fn test_lagging_node_waits_for_settlement_then_retries() -> anyhow::Result<()> {
    let node_a = node_executor(InMemoryLedger::new());
    let node_b = node_executor(InMemoryLedger::with_notary(node_a.ledger.notary().clone()));
    let (rate_id, v1) =
        issue_reference(&[&node_a.ledger, &node_b.ledger], json!({"rate": 1})).await?;

    let (pause, mut control) = pause_point();
    let flow = IssueAgainstReference::new(node_a.ledger.clone(), rate_id, json!("order-2"))
        .pause_after_read(pause);
    let used = flow.used_references();
    let coordinator = RetryCoordinator::new(flow);
    let progress = coordinator.progress();
    let handle = node_a.executor.start_flow(coordinator).await?;
    let id = handle.instance_id().clone();

    control.reached().await;
    let update = node_b
        .executor
        .run_flow(UpdateReference::new(node_b.ledger.clone(), rate_id, json!({"rate": 2})))
        .await?;
    control.release();

    // Node A has not seen the update, so the flow parks
    eventually(WAIT, || node_a.metrics.snapshot().suspensions == 1).await;
    assert_eq!(progress.current(), Some(RetryingAfterConflict));
    let parked = node_a.executor.instance(&id).await?.expect("checkpoint");
    assert_eq!(parked.status, FlowStatus::WaitingForSettlement);
    assert_eq!(parked.awaiting, vec![v1]);
    assert_eq!(*used.lock(), vec![v1]);

    // Deliver the update to node A
    node_a.ledger.record(&update).await;

    let tx = handle.result().await?;
    assert_eq!(tx.references, vec![update.out_ref(0)]);
    assert_eq!(*used.lock(), vec![v1, update.out_ref(0)]);
    assert_progress_sequence(
        &progress,
        &[Attempting, RetryingAfterConflict, Attempting, Succeeded],
    );

    let finished = node_a.executor.instance(&id).await?.expect("checkpoint");
    assert_eq!(finished.status, FlowStatus::Completed);
    assert_eq!(finished.attempts, 2);
    assert!(finished.awaiting.is_empty());

    let metrics = node_a.metrics.snapshot();
    assert_eq!(metrics.suspensions, 1);
    assert_eq!(metrics.resumptions, 1);
    assert_eq!(metrics.retries, 1);
    Ok(())
}

#[tokio::test]
async fn test_many_flows_parked_on_one_reference() -> anyhow::Result<()> {
    let node_a = node_executor(InMemoryLedger::new());
    let node_b = node_executor(InMemoryLedger::with_notary(node_a.ledger.notary().clone()));
    let (rate_id, _) =
        issue_reference(&[&node_a.ledger, &node_b.ledger], json!({"rate": 1})).await?;

    // Replace the reference on node B only; node A still quotes v1
    let update = node_b
        .executor
        .run_flow(UpdateReference::new(node_b.ledger.clone(), rate_id, json!({"rate": 2})))
        .await?;

    let mut handles = Vec::new();
    for n in 0..50 {
        let flow = IssueAgainstReference::new(node_a.ledger.clone(), rate_id, json!(n));
        handles.push(node_a.executor.start_flow(RetryCoordinator::new(flow)).await?);
    }
    eventually(WAIT, || node_a.metrics.snapshot().suspensions == 50).await;

    node_a.ledger.record(&update).await;

    for handle in handles {
        let tx = handle.result().await?;
        assert_eq!(tx.references, vec![update.out_ref(0)]);
    }
    assert_eq!(node_a.metrics.snapshot().flows_completed, 50);
    Ok(())
}
