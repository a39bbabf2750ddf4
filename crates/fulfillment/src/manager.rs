use chrono::Utc;
use sokoni_types::{Batch, BatchPhase};
use std::sync::Arc;
use tracing::info;

use crate::machine::{self, AppliedTransition, DepartureTicket, MarkOutcome, MarkRequest};
use crate::proof::{ProofGate, ProofRef, ProofStore};
use crate::store::{BatchStore, StateTransition, StoreError};
use crate::FulfillmentError;

/// Store-backed front of the fulfillment state machine.
///
/// Loads the batch, applies a pure transition from [`crate::machine`],
/// persists the result, and records the transition history. Reads always go
/// back to the store, so callers observe the latest committed state.
pub struct BatchManager<S: BatchStore, P: ProofStore> {
    store: Arc<S>,
    gate: ProofGate<P>,
}

impl<S: BatchStore, P: ProofStore> BatchManager<S, P> {
    pub fn new(store: Arc<S>, gate: ProofGate<P>) -> Self {
        Self { store, gate }
    }

    pub async fn create_batch(&self, batch: &Batch) -> Result<(), FulfillmentError> {
        self.store.create(batch).await?;
        info!(batch_id = %batch.id, sub_orders = batch.combined.len() + 1, "Batch created");
        Ok(())
    }

    pub async fn get_batch(&self, batch_id: &str) -> Result<Batch, FulfillmentError> {
        self.store
            .get(batch_id)
            .await?
            .ok_or_else(|| FulfillmentError::Store(StoreError::NotFound(batch_id.to_string())))
    }

    /// Derived trip phase, recomputed from the stored statuses.
    pub async fn phase(&self, batch_id: &str) -> Result<BatchPhase, FulfillmentError> {
        Ok(self.get_batch(batch_id).await?.phase())
    }

    pub async fn history(&self, batch_id: &str) -> Result<Vec<StateTransition>, FulfillmentError> {
        Ok(self.store.get_history(batch_id).await?)
    }

    pub async fn start_shopping(
        &self,
        batch_id: &str,
        sub_order_id: &str,
    ) -> Result<Batch, FulfillmentError> {
        let mut batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order_mut(sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: sub_order_id.to_string(),
            })?;
        let transition = machine::start_shopping(sub)?;

        self.persist(&batch, &[transition], None).await?;
        info!(batch_id = %batch_id, sub_order_id = %sub_order_id, "Shopping started");
        Ok(batch)
    }

    /// Toggle an item's found state; persists and reports the effective
    /// (possibly clamped) quantity.
    pub async fn mark_item(
        &self,
        batch_id: &str,
        sub_order_id: &str,
        item_id: &str,
        request: MarkRequest,
    ) -> Result<MarkOutcome, FulfillmentError> {
        let mut batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order_mut(sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: sub_order_id.to_string(),
            })?;
        let outcome = machine::mark_item(sub, item_id, request)?;

        self.store.update(&batch).await?;
        info!(
            batch_id = %batch_id,
            sub_order_id = %sub_order_id,
            item_id = %item_id,
            effective_quantity = %outcome.effective_quantity,
            clamped = outcome.clamped,
            "Item marked"
        );
        Ok(outcome)
    }

    /// Validate the payment-gated departure. Mutates nothing; the ticket is
    /// consumed by [`Self::commit_departure`] after settlement.
    pub async fn request_departure(
        &self,
        batch_id: &str,
        sub_order_id: &str,
    ) -> Result<DepartureTicket, FulfillmentError> {
        let batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order(sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: sub_order_id.to_string(),
            })?;
        machine::request_departure(sub)
    }

    /// Commit paid + departed in one store update after payment success.
    pub async fn commit_departure(
        &self,
        batch_id: &str,
        ticket: &DepartureTicket,
        details: Option<String>,
    ) -> Result<Batch, FulfillmentError> {
        let mut batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order_mut(&ticket.sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: ticket.sub_order_id.clone(),
            })?;
        let transitions = machine::commit_departure(sub, ticket)?;

        self.persist(&batch, &transitions, details).await?;
        info!(
            batch_id = %batch_id,
            sub_order_id = %ticket.sub_order_id,
            "Departure committed"
        );
        Ok(batch)
    }

    pub async fn arrive_at_customer(
        &self,
        batch_id: &str,
        sub_order_id: &str,
    ) -> Result<Batch, FulfillmentError> {
        let mut batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order_mut(sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: sub_order_id.to_string(),
            })?;
        let transition = machine::arrive_at_customer(sub)?;

        self.persist(&batch, &[transition], None).await?;
        Ok(batch)
    }

    /// Record proof of invoice for a departed sub-order.
    pub async fn record_proof(
        &self,
        batch_id: &str,
        sub_order_id: &str,
        image: &[u8],
    ) -> Result<ProofRef, FulfillmentError> {
        let batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order(sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: sub_order_id.to_string(),
            })?;
        let proof = self.gate.record(sub, image).await?;
        info!(batch_id = %batch_id, sub_order_id = %sub_order_id, "Proof recorded");
        Ok(proof)
    }

    /// Whether the proof gate is satisfied for a sub-order.
    pub async fn has_proof(
        &self,
        batch_id: &str,
        sub_order_id: &str,
    ) -> Result<bool, FulfillmentError> {
        let batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order(sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: sub_order_id.to_string(),
            })?;
        self.gate.is_satisfied(sub).await
    }

    /// Confirm delivery, consulting the proof gate first.
    pub async fn confirm_delivery(
        &self,
        batch_id: &str,
        sub_order_id: &str,
    ) -> Result<Batch, FulfillmentError> {
        let mut batch = self.get_batch(batch_id).await?;
        let sub = batch
            .sub_order_mut(sub_order_id)
            .ok_or_else(|| FulfillmentError::UnknownSubOrder {
                sub_order_id: sub_order_id.to_string(),
            })?;
        let has_proof = self.gate.is_satisfied(sub).await?;
        let transition = machine::confirm_delivery(sub, has_proof)?;

        self.persist(&batch, &[transition], None).await?;
        info!(batch_id = %batch_id, sub_order_id = %sub_order_id, "Delivery confirmed");
        Ok(batch)
    }

    async fn persist(
        &self,
        batch: &Batch,
        transitions: &[AppliedTransition],
        details: Option<String>,
    ) -> Result<(), FulfillmentError> {
        self.store.update(batch).await?;
        let now = Utc::now().timestamp() as u64;
        for t in transitions {
            let mut record = StateTransition::new(&t.sub_order_id, t.from, t.to, now);
            if let Some(d) = &details {
                record = record.with_details(d.clone());
            }
            self.store.record_transition(&batch.id, record).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::InMemoryProofStore;
    use crate::store::InMemoryBatchStore;
    use rust_decimal_macros::dec;
    use sokoni_types::{Item, OrderKind, SubOrder, SubOrderStatus};

    fn manager() -> BatchManager<InMemoryBatchStore, InMemoryProofStore> {
        BatchManager::new(
            Arc::new(InMemoryBatchStore::new()),
            ProofGate::new(Arc::new(InMemoryProofStore::new())),
        )
    }

    fn regular_batch() -> Batch {
        let sub = SubOrder::new("sub-1", "shop-a", OrderKind::Regular).with_items(vec![
            Item::new("item-a", "prod-a", dec!(1000), dec!(2), "sub-1"),
        ]);
        Batch::new("batch-1", "customer-1", "addr-1", sub)
    }

    #[tokio::test]
    async fn test_full_regular_flow() {
        let mgr = manager();
        mgr.create_batch(&regular_batch()).await.unwrap();

        mgr.start_shopping("batch-1", "sub-1").await.unwrap();
        mgr.mark_item(
            "batch-1",
            "sub-1",
            "item-a",
            MarkRequest::Found { quantity: Some(dec!(1)) },
        )
        .await
        .unwrap();

        let ticket = mgr.request_departure("batch-1", "sub-1").await.unwrap();
        let batch = mgr
            .commit_departure("batch-1", &ticket, Some("settled".to_string()))
            .await
            .unwrap();
        assert_eq!(batch.primary.status, SubOrderStatus::OnTheWay);

        mgr.record_proof("batch-1", "sub-1", b"invoice-photo")
            .await
            .unwrap();
        mgr.arrive_at_customer("batch-1", "sub-1").await.unwrap();
        let batch = mgr.confirm_delivery("batch-1", "sub-1").await.unwrap();
        assert_eq!(batch.primary.status, SubOrderStatus::Delivered);
        assert_eq!(batch.phase(), BatchPhase::Done);

        // accepted->shopping, ->paid, ->on_the_way, ->at_customer, ->delivered
        let history = mgr.history("batch-1").await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[1].to_status, SubOrderStatus::Paid);
        assert_eq!(history[1].details, Some("settled".to_string()));
        assert_eq!(history[4].to_status, SubOrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_delivery_without_proof_leaves_status() {
        let mgr = manager();
        mgr.create_batch(&regular_batch()).await.unwrap();
        mgr.start_shopping("batch-1", "sub-1").await.unwrap();
        mgr.mark_item("batch-1", "sub-1", "item-a", MarkRequest::Found { quantity: None })
            .await
            .unwrap();
        let ticket = mgr.request_departure("batch-1", "sub-1").await.unwrap();
        mgr.commit_departure("batch-1", &ticket, None).await.unwrap();

        let err = mgr.confirm_delivery("batch-1", "sub-1").await.unwrap_err();
        assert!(matches!(err, FulfillmentError::ProofRequired { .. }));

        let batch = mgr.get_batch("batch-1").await.unwrap();
        assert_eq!(batch.primary.status, SubOrderStatus::OnTheWay);
    }

    #[tokio::test]
    async fn test_failed_transition_records_nothing() {
        let mgr = manager();
        mgr.create_batch(&regular_batch()).await.unwrap();

        // Departure before shopping even started.
        assert!(mgr.request_departure("batch-1", "sub-1").await.is_err());
        assert!(mgr.history("batch-1").await.unwrap().is_empty());

        let batch = mgr.get_batch("batch-1").await.unwrap();
        assert_eq!(batch.primary.status, SubOrderStatus::Accepted);
    }

    #[tokio::test]
    async fn test_unknown_sub_order() {
        let mgr = manager();
        mgr.create_batch(&regular_batch()).await.unwrap();
        assert!(matches!(
            mgr.start_shopping("batch-1", "missing").await,
            Err(FulfillmentError::UnknownSubOrder { .. })
        ));
    }

    #[tokio::test]
    async fn test_has_proof_pre_departure_false() {
        let mgr = manager();
        mgr.create_batch(&regular_batch()).await.unwrap();
        assert!(!mgr.has_proof("batch-1", "sub-1").await.unwrap());
    }
}
