use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::PaymentError;

/// Invoice produced once per sub-order after a successful settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: String,
    pub sub_order_id: String,
    pub proof_ref: Option<String>,
    pub created_at: u64,
}

/// External invoice generation service.
///
/// Invoked after payment success; not part of the payment protocol steps
/// themselves, so a generation failure is reported but never unwinds the
/// settlement.
#[async_trait]
pub trait InvoiceGenerator: Send + Sync {
    async fn generate(
        &self,
        sub_order_id: &str,
        proof_ref: Option<&str>,
    ) -> Result<InvoiceRecord, PaymentError>;
}
