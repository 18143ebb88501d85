//! mockall mocks of collaborator traits.

use async_trait::async_trait;
use futures::future::BoxFuture;
use ledgerflow_core::{FlowError, LedgerQueryService, StateRef, StateStatus};
use mockall::mock;
use std::collections::{HashMap, HashSet};

mock! {
    /// Mock ledger query service
    pub LedgerQuery {}

    #[async_trait]
    impl LedgerQueryService for LedgerQuery {
        async fn status_of(
            &self,
            refs: &HashSet<StateRef>,
        ) -> Result<HashMap<StateRef, StateStatus>, FlowError>;

        fn when_consumed(&self, state_ref: StateRef) -> BoxFuture<'static, Result<(), FlowError>>;
    }
}
