//! Conflicts the coordinator must not retry.

use async_trait::async_trait;
use ledgerflow_core::{
    ConsumptionKind, FlowContext, FlowError, FlowLogic, FlowStatus, NotaryError,
    ProgressState::*, RetryCoordinator, StateRef,
};
use ledgerflow_ledger_inmemory::{InMemoryLedger, TransactionBuilder, TransactionState};
use ledgerflow_test_utils::assert_progress_sequence;
use ledgerflow_tests::{node_executor, SpendState};
use serde_json::json;

#[tokio::test]
async fn test_double_spend_is_returned_unchanged() -> anyhow::Result<()> {
    let node = node_executor(InMemoryLedger::new());
    let coin = TransactionBuilder::new()
        .add_output(TransactionState::new(json!({"amount": 100})))
        .build()?;
    node.ledger.record(&coin).await;

    let first = node
        .executor
        .run_flow(RetryCoordinator::new(SpendState::new(node.ledger.clone(), coin.out_ref(0))))
        .await?;

    let coordinator =
        RetryCoordinator::new(SpendState::new(node.ledger.clone(), coin.out_ref(0)));
    let progress = coordinator.progress();
    let handle = node.executor.start_flow(coordinator).await?;
    let id = handle.instance_id().clone();
    let err = handle.result().await.unwrap_err();

    let report = match &err {
        FlowError::Notary(NotaryError::Conflict { report, .. }) => report.clone(),
        other => panic!("expected a notary conflict, got {:?}", other),
    };
    let record = report.get(&coin.out_ref(0)).expect("conflict on the coin");
    assert_eq!(record.kind, ConsumptionKind::OrdinaryInput);
    assert_eq!(record.consuming_tx, first.id);

    assert_progress_sequence(&progress, &[Attempting]);
    let instance = node.executor.instance(&id).await?.expect("checkpoint");
    assert_eq!(instance.status, FlowStatus::Failed);
    assert_eq!(instance.attempts, 1);
    assert_eq!(instance.error, Some(err.to_string()));
    assert_eq!(node.metrics.snapshot().suspensions, 0);
    Ok(())
}

/// Spends the same state twice in one transaction
struct SpendTwice {
    ledger: InMemoryLedger,
    state_ref: StateRef,
}

#[async_trait]
impl FlowLogic for SpendTwice {
    type Output = ();

    async fn call(&self, _ctx: &FlowContext) -> Result<(), FlowError> {
        let tx = TransactionBuilder::new()
            .add_input(self.state_ref)
            .add_input(self.state_ref)
            .build()?;
        self.ledger.finalise(&tx).await
    }
}

#[tokio::test]
async fn test_invalid_transaction_is_fatal() -> anyhow::Result<()> {
    let node = node_executor(InMemoryLedger::new());
    let coin = TransactionBuilder::new()
        .add_output(TransactionState::new(json!({"amount": 1})))
        .build()?;
    node.ledger.record(&coin).await;

    let coordinator = RetryCoordinator::new(SpendTwice {
        ledger: node.ledger.clone(),
        state_ref: coin.out_ref(0),
    });
    let progress = coordinator.progress();
    let err = node.executor.run_flow(coordinator).await.unwrap_err();

    assert!(matches!(
        err,
        FlowError::Notary(NotaryError::TransactionInvalid(_))
    ));
    assert_progress_sequence(&progress, &[Attempting]);
    assert_eq!(node.metrics.snapshot().flows_failed, 1);
    Ok(())
}
