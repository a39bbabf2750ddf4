use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::PaymentError;
use crate::gateway::MobileMoneyGateway;
use crate::invoice::{InvoiceGenerator, InvoiceRecord};
use crate::otp::{generate_code, OtpChannel, SessionContext};
use crate::poll::{poll_until_terminal, PaymentConfig, PollOutcome};
use crate::session::{derive_session_key, PaymentSession, SessionState};
use crate::wallet::{TransactionRecord, WalletService};

/// Inputs to open a payment session for one sub-order.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub sub_order_id: String,
    pub shopper_id: String,
    pub wallet_id: String,
    /// Amount to debit: value of found items only
    pub found_subtotal: Decimal,
    /// Ordered value; the difference becomes the scheduled refund
    pub original_subtotal: Decimal,
}

/// Everything produced by a completed payment.
#[derive(Debug, Clone)]
pub struct SettlementRecord {
    pub session_id: String,
    pub sub_order_id: String,
    pub amount: Decimal,
    pub refund: Option<Decimal>,
    pub transaction: TransactionRecord,
    /// Absent if invoice generation failed; settlement stands regardless.
    pub invoice: Option<InvoiceRecord>,
}

/// Drives the payment protocol for sub-orders, one session per sub-order.
///
/// Sessions live only in this coordinator's map and are removed on every
/// terminal outcome, so a failed or cancelled attempt leaves no residue and
/// a fresh session can be opened immediately.
pub struct PaymentCoordinator<W, G, O, I> {
    wallet: W,
    gateway: G,
    otp_channel: O,
    invoices: I,
    config: PaymentConfig,
    sessions: Mutex<HashMap<String, PaymentSession>>,
    next_session_id: Mutex<u64>,
}

impl<W, G, O, I> PaymentCoordinator<W, G, O, I>
where
    W: WalletService,
    G: MobileMoneyGateway,
    O: OtpChannel,
    I: InvoiceGenerator,
{
    pub fn new(wallet: W, gateway: G, otp_channel: O, invoices: I, config: PaymentConfig) -> Self {
        Self {
            wallet,
            gateway,
            otp_channel,
            invoices,
            config,
            sessions: Mutex::new(HashMap::new()),
            next_session_id: Mutex::new(0),
        }
    }

    /// Open a session: check the reserve, bind a one-time code, deliver it.
    ///
    /// The reserve check runs before any code is issued, so an underfunded
    /// shopper never receives an OTP for a payment that cannot proceed.
    pub async fn begin(&self, request: PaymentRequest) -> Result<String, PaymentError> {
        {
            let sessions = self.sessions.lock().await;
            if sessions.contains_key(&request.sub_order_id) {
                return Err(PaymentError::ConcurrentSessionConflict {
                    sub_order_id: request.sub_order_id,
                });
            }
        }

        let reserved = self.wallet.reserved_balance(&request.shopper_id).await?;
        if reserved < request.found_subtotal {
            warn!(
                sub_order_id = %request.sub_order_id,
                required = %request.found_subtotal,
                reserved = %reserved,
                "Rejecting payment: reserved balance too low"
            );
            return Err(PaymentError::InsufficientReserve {
                sub_order_id: request.sub_order_id,
                required: request.found_subtotal,
                reserved,
            });
        }

        let session_id = {
            let mut next = self.next_session_id.lock().await;
            *next += 1;
            format!("pay-{}", *next)
        };
        let created_at = Utc::now().timestamp() as u64;
        let otp = generate_code(self.config.otp_length);
        let session = PaymentSession {
            id: session_id.clone(),
            sub_order_id: request.sub_order_id.clone(),
            shopper_id: request.shopper_id.clone(),
            wallet_id: request.wallet_id,
            found_subtotal: request.found_subtotal,
            original_subtotal: request.original_subtotal,
            otp: otp.clone(),
            session_key: derive_session_key(&session_id, &request.sub_order_id, created_at),
            transfer_reference: None,
            state: SessionState::AwaitingOtp,
            created_at,
        };

        {
            let mut sessions = self.sessions.lock().await;
            // A racing begin may have won while the reserve check was in
            // flight; the first session keeps the slot.
            if sessions.contains_key(&request.sub_order_id) {
                return Err(PaymentError::ConcurrentSessionConflict {
                    sub_order_id: request.sub_order_id,
                });
            }
            sessions.insert(request.sub_order_id.clone(), session);
        }

        let ctx = SessionContext {
            session_id: session_id.clone(),
            sub_order_id: request.sub_order_id.clone(),
            shopper_id: request.shopper_id,
            amount: request.found_subtotal,
        };
        self.otp_channel.deliver(&otp, &ctx).await;

        info!(
            session_id = %session_id,
            sub_order_id = %request.sub_order_id,
            amount = %request.found_subtotal,
            "Payment session opened, code delivered"
        );
        Ok(session_id)
    }

    /// Check the submitted code against the session's bound code.
    ///
    /// A mismatch leaves the session awaiting verification, so the operator
    /// may retry for as long as the session lives. A match consumes the
    /// code: the session moves on and will never accept it again.
    pub async fn verify_otp(&self, sub_order_id: &str, code: &str) -> Result<(), PaymentError> {
        let mut sessions = self.sessions.lock().await;
        let session =
            sessions
                .get_mut(sub_order_id)
                .ok_or_else(|| PaymentError::SessionNotFound {
                    sub_order_id: sub_order_id.to_string(),
                })?;
        if session.state != SessionState::AwaitingOtp {
            return Err(PaymentError::InvalidSessionState {
                sub_order_id: sub_order_id.to_string(),
                state: session.state,
                expected: SessionState::AwaitingOtp,
            });
        }
        if session.otp != code {
            return Err(PaymentError::InvalidOtp {
                sub_order_id: sub_order_id.to_string(),
            });
        }
        session.state = SessionState::Verified;
        info!(session_id = %session.id, sub_order_id = %sub_order_id, "Code verified");
        Ok(())
    }

    /// Initiate the mobile-money transfer, poll to a terminal status, and on
    /// success settle the wallet and emit the invoice.
    ///
    /// Every failure path discards the session; the caller may open a new
    /// one. Settlement is keyed by the session's opaque key, so a replay
    /// against the wallet cannot double-debit.
    pub async fn execute_transfer(
        &self,
        sub_order_id: &str,
        payer_code: &str,
        proof_ref: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SettlementRecord, PaymentError> {
        let session = {
            let mut sessions = self.sessions.lock().await;
            let session =
                sessions
                    .get_mut(sub_order_id)
                    .ok_or_else(|| PaymentError::SessionNotFound {
                        sub_order_id: sub_order_id.to_string(),
                    })?;
            if session.state != SessionState::Verified {
                return Err(PaymentError::InvalidSessionState {
                    sub_order_id: sub_order_id.to_string(),
                    state: session.state,
                    expected: SessionState::Verified,
                });
            }
            session.state = SessionState::Polling;
            session.clone()
        };

        let reference_id = match self
            .gateway
            .initiate_transfer(
                session.found_subtotal,
                &self.config.currency,
                payer_code,
                &session.session_key,
            )
            .await
        {
            Ok(reference_id) => reference_id,
            Err(e) => {
                self.discard(sub_order_id, &session.id).await;
                return Err(e);
            }
        };

        {
            let mut sessions = self.sessions.lock().await;
            if let Some(live) = sessions.get_mut(sub_order_id) {
                if live.id == session.id {
                    live.transfer_reference = Some(reference_id.clone());
                }
            }
        }
        info!(
            session_id = %session.id,
            sub_order_id = %sub_order_id,
            reference_id = %reference_id,
            "Transfer initiated, polling for status"
        );

        match poll_until_terminal(&self.gateway, &reference_id, &self.config, cancel).await {
            PollOutcome::Successful => {
                self.settle(&session, &reference_id, proof_ref).await
            }
            PollOutcome::Failed => {
                self.discard(sub_order_id, &session.id).await;
                Err(PaymentError::TransferFailed {
                    sub_order_id: sub_order_id.to_string(),
                    reference_id,
                })
            }
            PollOutcome::Exhausted { attempts } => {
                self.discard(sub_order_id, &session.id).await;
                Err(PaymentError::TransferTimeout {
                    sub_order_id: sub_order_id.to_string(),
                    reference_id,
                    attempts,
                })
            }
            PollOutcome::Cancelled => {
                self.discard(sub_order_id, &session.id).await;
                Err(PaymentError::Cancelled {
                    sub_order_id: sub_order_id.to_string(),
                })
            }
        }
    }

    /// Drop the session for a sub-order, if any.
    ///
    /// Refused while a transfer run is polling for the session: that run
    /// owns the slot until it reaches a terminal outcome. Stop it by
    /// cancelling its token and it discards the session itself.
    pub async fn cancel(&self, sub_order_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(sub_order_id) {
            Some(session) if session.state == SessionState::Polling => {
                warn!(
                    session_id = %session.id,
                    sub_order_id = %sub_order_id,
                    "Refusing cancel while a transfer is polling"
                );
                false
            }
            Some(_) => {
                sessions.remove(sub_order_id);
                info!(sub_order_id = %sub_order_id, "Payment session cancelled");
                true
            }
            None => false,
        }
    }

    /// True if a session is currently open for the sub-order.
    pub async fn has_session(&self, sub_order_id: &str) -> bool {
        self.sessions.lock().await.contains_key(sub_order_id)
    }

    async fn settle(
        &self,
        session: &PaymentSession,
        reference_id: &str,
        proof_ref: Option<&str>,
    ) -> Result<SettlementRecord, PaymentError> {
        let refund = session.shortfall();
        let transaction = match self
            .wallet
            .settle(
                &session.wallet_id,
                session.found_subtotal,
                refund,
                &session.session_key,
            )
            .await
        {
            Ok(transaction) => transaction,
            Err(e) => {
                // Transfer already succeeded; this needs operator attention.
                error!(
                    session_id = %session.id,
                    sub_order_id = %session.sub_order_id,
                    reference_id = %reference_id,
                    error = %e,
                    "Wallet settlement failed after successful transfer"
                );
                self.discard(&session.sub_order_id, &session.id).await;
                return Err(e);
            }
        };

        // Invoice generation sits outside the protocol steps: a failure is
        // reported but never unwinds the settlement.
        let invoice = match self.invoices.generate(&session.sub_order_id, proof_ref).await {
            Ok(invoice) => Some(invoice),
            Err(e) => {
                error!(
                    session_id = %session.id,
                    sub_order_id = %session.sub_order_id,
                    error = %e,
                    "Invoice generation failed after settlement"
                );
                None
            }
        };

        self.discard(&session.sub_order_id, &session.id).await;
        info!(
            session_id = %session.id,
            sub_order_id = %session.sub_order_id,
            amount = %session.found_subtotal,
            refund = ?refund,
            transaction_id = %transaction.id,
            "Payment settled"
        );
        Ok(SettlementRecord {
            session_id: session.id.clone(),
            sub_order_id: session.sub_order_id.clone(),
            amount: session.found_subtotal,
            refund,
            transaction,
            invoice,
        })
    }

    /// Remove the session only if it is still the one this run opened,
    /// never a successor opened after this run's session went away.
    async fn discard(&self, sub_order_id: &str, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(sub_order_id)
            .is_some_and(|s| s.id == session_id)
        {
            sessions.remove(sub_order_id);
            true
        } else {
            false
        }
    }
}
