use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sokoni_types::{Batch, SubOrderStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════
// CORE TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Recorded status transition for one sub-order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub sub_order_id: String,
    pub from_status: SubOrderStatus,
    pub to_status: SubOrderStatus,
    pub timestamp: u64,
    pub details: Option<String>,
}

impl StateTransition {
    pub fn new(
        sub_order_id: impl Into<String>,
        from_status: SubOrderStatus,
        to_status: SubOrderStatus,
        timestamp: u64,
    ) -> Self {
        Self {
            sub_order_id: sub_order_id.into(),
            from_status,
            to_status,
            timestamp,
            details: None,
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("batch not found: {0}")]
    NotFound(String),

    #[error("duplicate batch ID: {0}")]
    DuplicateId(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Batch storage - request/response, implementable for different backends.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Store a new batch
    async fn create(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Replace the stored batch
    async fn update(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Get a batch by ID
    async fn get(&self, batch_id: &str) -> Result<Option<Batch>, StoreError>;

    /// Record a status transition against a batch
    async fn record_transition(
        &self,
        batch_id: &str,
        transition: StateTransition,
    ) -> Result<(), StoreError>;

    /// Transition history for a batch, in recording order
    async fn get_history(&self, batch_id: &str) -> Result<Vec<StateTransition>, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    batches: Arc<RwLock<HashMap<String, Batch>>>,
    transitions: Arc<RwLock<HashMap<String, Vec<StateTransition>>>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored batches (for testing)
    pub fn len(&self) -> usize {
        self.batches.read().unwrap().len()
    }

    /// Check if store is empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.batches.read().unwrap().is_empty()
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn create(&self, batch: &Batch) -> Result<(), StoreError> {
        let mut batches = self.batches.write().unwrap();
        if batches.contains_key(&batch.id) {
            return Err(StoreError::DuplicateId(batch.id.clone()));
        }
        batches.insert(batch.id.clone(), batch.clone());
        Ok(())
    }

    async fn update(&self, batch: &Batch) -> Result<(), StoreError> {
        let mut batches = self.batches.write().unwrap();
        if !batches.contains_key(&batch.id) {
            return Err(StoreError::NotFound(batch.id.clone()));
        }
        batches.insert(batch.id.clone(), batch.clone());
        Ok(())
    }

    async fn get(&self, batch_id: &str) -> Result<Option<Batch>, StoreError> {
        Ok(self.batches.read().unwrap().get(batch_id).cloned())
    }

    async fn record_transition(
        &self,
        batch_id: &str,
        transition: StateTransition,
    ) -> Result<(), StoreError> {
        if !self.batches.read().unwrap().contains_key(batch_id) {
            return Err(StoreError::NotFound(batch_id.to_string()));
        }

        self.transitions
            .write()
            .unwrap()
            .entry(batch_id.to_string())
            .or_default()
            .push(transition);

        Ok(())
    }

    async fn get_history(&self, batch_id: &str) -> Result<Vec<StateTransition>, StoreError> {
        Ok(self
            .transitions
            .read()
            .unwrap()
            .get(batch_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use sokoni_types::{OrderKind, SubOrder};

    fn create_test_batch() -> Batch {
        Batch::new(
            "batch-1",
            "customer-1",
            "addr-1",
            SubOrder::new("sub-1", "shop-a", OrderKind::Regular),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryBatchStore::new();
        let batch = create_test_batch();

        store.create(&batch).await.unwrap();

        let retrieved = store.get("batch-1").await.unwrap();
        assert_eq!(retrieved, Some(batch));
        assert!(store.get("batch-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_error() {
        let store = InMemoryBatchStore::new();
        let batch = create_test_batch();

        store.create(&batch).await.unwrap();
        let result = store.create(&batch).await;

        assert!(matches!(result, Err(StoreError::DuplicateId(_))));
    }

    #[tokio::test]
    async fn test_update_requires_existing() {
        let store = InMemoryBatchStore::new();
        let mut batch = create_test_batch();

        assert!(matches!(
            store.update(&batch).await,
            Err(StoreError::NotFound(_))
        ));

        store.create(&batch).await.unwrap();
        batch.primary.status = SubOrderStatus::Shopping;
        store.update(&batch).await.unwrap();

        let updated = store.get("batch-1").await.unwrap().unwrap();
        assert_eq!(updated.primary.status, SubOrderStatus::Shopping);
    }

    #[tokio::test]
    async fn test_transition_history() {
        let store = InMemoryBatchStore::new();
        let batch = create_test_batch();
        store.create(&batch).await.unwrap();

        let t1 = StateTransition::new(
            "sub-1",
            SubOrderStatus::Accepted,
            SubOrderStatus::Shopping,
            200,
        );
        store.record_transition("batch-1", t1).await.unwrap();

        let t2 = StateTransition::new(
            "sub-1",
            SubOrderStatus::Shopping,
            SubOrderStatus::Paid,
            300,
        )
        .with_details("payment settled".to_string());
        store.record_transition("batch-1", t2).await.unwrap();

        let history = store.get_history("batch-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].timestamp, 200);
        assert_eq!(history[1].details, Some("payment settled".to_string()));
    }

    #[tokio::test]
    async fn test_transition_requires_batch() {
        let store = InMemoryBatchStore::new();
        let t = StateTransition::new(
            "sub-1",
            SubOrderStatus::Accepted,
            SubOrderStatus::Shopping,
            100,
        );
        assert!(matches!(
            store.record_transition("missing", t).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
