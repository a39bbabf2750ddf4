//! Order fulfillment and settlement core for shopper-fulfilled delivery.
//!
//! The workspace crates each own one concern: `sokoni-types` the order
//! aggregate, `sokoni-pricing` the money arithmetic, `sokoni-fulfillment`
//! the status state machine and proof gate, `sokoni-payment` the OTP plus
//! mobile-money protocol, and `sokoni-routing` the combined-batch
//! resolution. [`TripService`] wires them into the surface a presentation
//! layer calls.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub use sokoni_config::{AppConfig, ConfigLoader, PaymentSettings};
pub use sokoni_fulfillment::{
    BatchManager, BatchStore, DepartureTicket, FulfillmentError, InMemoryBatchStore,
    InMemoryProofStore, MarkOutcome, MarkRequest, ProofGate, ProofRef, ProofStore,
    StateTransition,
};
pub use sokoni_payment::{
    InvoiceGenerator, MobileMoneyGateway, OtpChannel, PaymentConfig, PaymentCoordinator,
    PaymentError, PaymentRequest, SettlementRecord, WalletService,
};
pub use sokoni_pricing::{FeeKind, PricingError, Scope};
pub use sokoni_routing::{BatchSummary, RoutingError};
pub use sokoni_types::{
    Batch, BatchPhase, FoundMark, Item, OrderKind, SubOrder, SubOrderStatus,
};

use std::time::Duration;

#[derive(Debug, Error)]
pub enum TripError {
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// Build the protocol tuning from loaded configuration.
pub fn payment_config(settings: &PaymentSettings) -> PaymentConfig {
    PaymentConfig {
        currency: settings.currency.clone(),
        poll_interval: Duration::from_secs(settings.poll_interval_secs),
        max_poll_attempts: settings.max_poll_attempts,
        otp_length: settings.otp_length,
    }
}

/// One shopper trip end to end: fulfillment transitions, per-shop payment,
/// proof capture, and delivery confirmation.
///
/// Payment and departure stay coupled here: departure is validated before
/// the protocol opens, and the paid plus on-the-way statuses are committed
/// as one store update only after settlement succeeds.
pub struct TripService<S, P, W, G, O, I>
where
    S: BatchStore,
    P: ProofStore,
    W: WalletService,
    G: MobileMoneyGateway,
    O: OtpChannel,
    I: InvoiceGenerator,
{
    batches: BatchManager<S, P>,
    payments: PaymentCoordinator<W, G, O, I>,
}

impl<S, P, W, G, O, I> TripService<S, P, W, G, O, I>
where
    S: BatchStore,
    P: ProofStore,
    W: WalletService,
    G: MobileMoneyGateway,
    O: OtpChannel,
    I: InvoiceGenerator,
{
    pub fn new(batches: BatchManager<S, P>, payments: PaymentCoordinator<W, G, O, I>) -> Self {
        Self { batches, payments }
    }

    // ═══════════════════════════════════════════════════════════════════
    // FULFILLMENT
    // ═══════════════════════════════════════════════════════════════════

    pub async fn create_trip(&self, batch: &Batch) -> Result<(), TripError> {
        Ok(self.batches.create_batch(batch).await?)
    }

    pub async fn trip(&self, batch_id: &str) -> Result<Batch, TripError> {
        Ok(self.batches.get_batch(batch_id).await?)
    }

    pub async fn phase(&self, batch_id: &str) -> Result<BatchPhase, TripError> {
        Ok(self.batches.phase(batch_id).await?)
    }

    pub async fn history(&self, batch_id: &str) -> Result<Vec<StateTransition>, TripError> {
        Ok(self.batches.history(batch_id).await?)
    }

    pub async fn start_shopping(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
    ) -> Result<Batch, TripError> {
        let target = self.target(batch_id, shop_id).await?;
        Ok(self.batches.start_shopping(batch_id, &target).await?)
    }

    pub async fn mark_item(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
        item_id: &str,
        request: MarkRequest,
    ) -> Result<MarkOutcome, TripError> {
        let target = self.target(batch_id, shop_id).await?;
        Ok(self
            .batches
            .mark_item(batch_id, &target, item_id, request)
            .await?)
    }

    pub async fn record_proof(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
        image: &[u8],
    ) -> Result<ProofRef, TripError> {
        let target = self.target(batch_id, shop_id).await?;
        Ok(self.batches.record_proof(batch_id, &target, image).await?)
    }

    pub async fn arrive_at_customer(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
    ) -> Result<Batch, TripError> {
        let target = self.target(batch_id, shop_id).await?;
        Ok(self.batches.arrive_at_customer(batch_id, &target).await?)
    }

    pub async fn confirm_delivery(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
    ) -> Result<Batch, TripError> {
        let target = self.target(batch_id, shop_id).await?;
        Ok(self.batches.confirm_delivery(batch_id, &target).await?)
    }

    /// Batch-wide summary view, double-count safe.
    pub async fn summary(&self, batch_id: &str) -> Result<BatchSummary, TripError> {
        let batch = self.batches.get_batch(batch_id).await?;
        Ok(sokoni_routing::summarize(&batch))
    }

    /// Items of the active shop's sub-order.
    pub async fn items(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
    ) -> Result<Vec<Item>, TripError> {
        let batch = self.batches.get_batch(batch_id).await?;
        let items = sokoni_routing::items_for(&batch, shop_id)?;
        Ok(items.into_iter().cloned().collect())
    }

    // ═══════════════════════════════════════════════════════════════════
    // PAYMENT
    // ═══════════════════════════════════════════════════════════════════

    /// Open the payment protocol for the active shop's sub-order.
    ///
    /// Departure is validated first, so a sub-order that is not ready to
    /// leave the shop never reaches the wallet or receives a code. The
    /// debit amount is the found subtotal; the ordered value rides along
    /// for refund arithmetic.
    pub async fn begin_payment(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
        shopper_id: &str,
        wallet_id: &str,
    ) -> Result<String, TripError> {
        let batch = self.batches.get_batch(batch_id).await?;
        let target = sokoni_routing::operation_target(&batch, shop_id)?.to_string();
        self.batches.request_departure(batch_id, &target).await?;

        let scope = Scope::sub_order(&target);
        let found_subtotal = sokoni_pricing::found_subtotal(&batch, &scope)?;
        let original_subtotal = sokoni_pricing::original_subtotal(&batch, &scope)?;

        let session_id = self
            .payments
            .begin(PaymentRequest {
                sub_order_id: target,
                shopper_id: shopper_id.to_string(),
                wallet_id: wallet_id.to_string(),
                found_subtotal,
                original_subtotal,
            })
            .await?;
        Ok(session_id)
    }

    pub async fn verify_payment_code(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
        code: &str,
    ) -> Result<(), TripError> {
        let target = self.target(batch_id, shop_id).await?;
        Ok(self.payments.verify_otp(&target, code).await?)
    }

    /// Run the transfer to a terminal outcome and, on success, commit the
    /// paid and on-the-way statuses in one store update.
    pub async fn complete_payment(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
        payer_code: &str,
        cancel: &CancellationToken,
    ) -> Result<SettlementRecord, TripError> {
        let target = self.target(batch_id, shop_id).await?;
        let ticket = self.batches.request_departure(batch_id, &target).await?;

        let record = self
            .payments
            .execute_transfer(&target, payer_code, None, cancel)
            .await?;

        let details = format!("transaction {}", record.transaction.id);
        if let Err(e) = self
            .batches
            .commit_departure(batch_id, &ticket, Some(details))
            .await
        {
            // Wallet debited but status not advanced: reportable
            // inconsistency, surfaced loudly instead of swallowed.
            error!(
                batch_id = %batch_id,
                sub_order_id = %target,
                transaction_id = %record.transaction.id,
                error = %e,
                "Settlement applied but departure commit failed"
            );
            return Err(e.into());
        }

        info!(
            batch_id = %batch_id,
            sub_order_id = %target,
            amount = %record.amount,
            "Payment completed, sub-order on the way"
        );
        Ok(record)
    }

    pub async fn cancel_payment(
        &self,
        batch_id: &str,
        shop_id: Option<&str>,
    ) -> Result<bool, TripError> {
        let target = self.target(batch_id, shop_id).await?;
        Ok(self.payments.cancel(&target).await)
    }

    async fn target(&self, batch_id: &str, shop_id: Option<&str>) -> Result<String, TripError> {
        let batch = self.batches.get_batch(batch_id).await?;
        Ok(sokoni_routing::operation_target(&batch, shop_id)?.to_string())
    }
}
