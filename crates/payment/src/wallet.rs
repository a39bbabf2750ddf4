use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PaymentError;

/// Atomic wallet movement: a debit of the reserved balance plus an optional
/// scheduled refund for the customer's shortfall, applied as one ledger
/// operation keyed by the payment session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub wallet_id: String,
    pub debit: Decimal,
    pub scheduled_refund: Option<Decimal>,
    /// Idempotency key: one settlement per payment session
    pub session_key: String,
    pub created_at: u64,
}

/// External wallet ledger.
#[async_trait]
pub trait WalletService: Send + Sync {
    /// Balance earmarked to cover pending order settlements.
    async fn reserved_balance(&self, shopper_id: &str) -> Result<Decimal, PaymentError>;

    /// Debit the reserved balance and schedule the refund atomically.
    ///
    /// Implementations must treat `session_key` as an idempotency key: a
    /// replayed settlement returns the original record without moving money
    /// again.
    async fn settle(
        &self,
        wallet_id: &str,
        debit: Decimal,
        scheduled_refund: Option<Decimal>,
        session_key: &str,
    ) -> Result<TransactionRecord, PaymentError>;
}
