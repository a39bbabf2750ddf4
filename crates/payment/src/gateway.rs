use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PaymentError;

/// Status of an initiated mobile-money transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Successful,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

/// External mobile-money gateway.
///
/// Transfers are asynchronous on the provider side: initiation returns a
/// reference id that callers poll until a terminal status arrives.
#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    async fn initiate_transfer(
        &self,
        amount: Decimal,
        currency: &str,
        payer_code: &str,
        external_id: &str,
    ) -> Result<String, PaymentError>;

    async fn transfer_status(&self, reference_id: &str) -> Result<TransferStatus, PaymentError>;
}
