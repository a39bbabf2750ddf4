//! Proof-of-invoice gate.
//!
//! A sub-order cannot reach `delivered` until a captured purchase image has
//! been recorded for it. The gate never drives a transition itself; the
//! state machine consults it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sokoni_types::SubOrder;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::FulfillmentError;

/// Opaque reference to a stored proof image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRef(pub String);

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("proof storage unavailable: {0}")]
    Unavailable(String),

    #[error("empty proof image for sub-order {0}")]
    EmptyImage(String),
}

/// External proof storage (image blobs live elsewhere).
#[async_trait]
pub trait ProofStore: Send + Sync {
    async fn store(&self, sub_order_id: &str, image: &[u8]) -> Result<ProofRef, ProofError>;
    async fn has_proof(&self, sub_order_id: &str) -> Result<bool, ProofError>;
}

/// Gate enforcing proof before delivery.
pub struct ProofGate<S: ProofStore> {
    store: Arc<S>,
}

impl<S: ProofStore> ProofGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record proof for a sub-order.
    ///
    /// Legal only once the sub-order is past shopping; the invoice being
    /// photographed does not exist before payment.
    pub async fn record(
        &self,
        sub: &SubOrder,
        image: &[u8],
    ) -> Result<ProofRef, FulfillmentError> {
        if !sub.status.is_past_shopping() {
            return Err(FulfillmentError::ProofTooEarly {
                sub_order_id: sub.id.clone(),
                status: sub.status,
            });
        }
        if image.is_empty() {
            return Err(FulfillmentError::ProofStorage(format!(
                "empty proof image for sub-order {}",
                sub.id
            )));
        }
        self.store
            .store(&sub.id, image)
            .await
            .map_err(|e| FulfillmentError::ProofStorage(e.to_string()))
    }

    /// Whether proof exists for a sub-order.
    ///
    /// Sub-orders not yet past shopping report false without error.
    pub async fn is_satisfied(&self, sub: &SubOrder) -> Result<bool, FulfillmentError> {
        if !sub.status.is_past_shopping() {
            return Ok(false);
        }
        self.store
            .has_proof(&sub.id)
            .await
            .map_err(|e| FulfillmentError::ProofStorage(e.to_string()))
    }
}

/// In-memory proof storage for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryProofStore {
    proofs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryProofStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
    async fn store(&self, sub_order_id: &str, image: &[u8]) -> Result<ProofRef, ProofError> {
        if image.is_empty() {
            return Err(ProofError::EmptyImage(sub_order_id.to_string()));
        }
        self.proofs
            .write()
            .unwrap()
            .insert(sub_order_id.to_string(), image.to_vec());
        Ok(ProofRef(format!("proof-{sub_order_id}")))
    }

    async fn has_proof(&self, sub_order_id: &str) -> Result<bool, ProofError> {
        Ok(self.proofs.read().unwrap().contains_key(sub_order_id))
    }
}
