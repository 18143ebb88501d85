//! Repository traits for flow checkpoints
//!
//! External crates can implement these traits to persist flow instances in
//! different storage engines.

use async_trait::async_trait;

use super::flow_instance::{FlowInstance, FlowInstanceId, FlowStatus};
use crate::FlowError;

/// Repository for flow instances
#[async_trait]
pub trait FlowInstanceRepository: Send + Sync {
    /// Find a flow instance by ID
    async fn find_by_id(&self, id: &FlowInstanceId) -> Result<Option<FlowInstance>, FlowError>;

    /// Save a flow instance
    async fn save(&self, instance: &FlowInstance) -> Result<(), FlowError>;

    /// Delete a flow instance
    async fn delete(&self, id: &FlowInstanceId) -> Result<(), FlowError>;

    /// List flow instances, optionally filtered by status
    async fn list_instances(
        &self,
        status: Option<FlowStatus>,
    ) -> Result<Vec<FlowInstance>, FlowError>;
}

/// Memory implementations for testing
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::Arc;

    /// In-memory flow instance repository backed by a concurrent map
    #[derive(Clone)]
    pub struct MemoryFlowInstanceRepository {
        instances: Arc<DashMap<String, FlowInstance>>,
    }

    impl MemoryFlowInstanceRepository {
        /// Create a new memory flow instance repository
        pub fn new() -> Self {
            Self {
                instances: Arc::new(DashMap::with_capacity(64)),
            }
        }
    }

    impl Default for MemoryFlowInstanceRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl FlowInstanceRepository for MemoryFlowInstanceRepository {
        async fn find_by_id(
            &self,
            id: &FlowInstanceId,
        ) -> Result<Option<FlowInstance>, FlowError> {
            Ok(self.instances.get(&id.0).map(|entry| entry.value().clone()))
        }

        async fn save(&self, instance: &FlowInstance) -> Result<(), FlowError> {
            self.instances.insert(instance.id.0.clone(), instance.clone());
            Ok(())
        }

        async fn delete(&self, id: &FlowInstanceId) -> Result<(), FlowError> {
            self.instances.remove(&id.0);
            Ok(())
        }

        async fn list_instances(
            &self,
            status: Option<FlowStatus>,
        ) -> Result<Vec<FlowInstance>, FlowError> {
            Ok(self
                .instances
                .iter()
                .filter(|entry| status.map_or(true, |s| entry.value().status == s))
                .map(|entry| entry.value().clone())
                .collect())
        }
    }

}
