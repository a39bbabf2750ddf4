//! In-memory collaborators for tests and demos.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::gateway::{MobileMoneyGateway, TransferStatus};
use crate::invoice::{InvoiceGenerator, InvoiceRecord};
use crate::otp::{OtpChannel, SessionContext};
use crate::wallet::{TransactionRecord, WalletService};
use crate::PaymentError;

// ═══════════════════════════════════════════════════════════════════════════
// WALLET
// ═══════════════════════════════════════════════════════════════════════════

/// Wallet service with in-memory reserved balances and an idempotent ledger.
#[derive(Clone, Default)]
pub struct MockWallet {
    reserved: Arc<Mutex<HashMap<String, Decimal>>>,
    transactions: Arc<Mutex<Vec<TransactionRecord>>>,
    next_tx_id: Arc<Mutex<u64>>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reserved(&self, id: &str, amount: Decimal) {
        self.reserved.lock().unwrap().insert(id.to_string(), amount);
    }

    pub fn reserved(&self, id: &str) -> Decimal {
        self.reserved
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletService for MockWallet {
    async fn reserved_balance(&self, shopper_id: &str) -> Result<Decimal, PaymentError> {
        Ok(self.reserved(shopper_id))
    }

    async fn settle(
        &self,
        wallet_id: &str,
        debit: Decimal,
        scheduled_refund: Option<Decimal>,
        session_key: &str,
    ) -> Result<TransactionRecord, PaymentError> {
        let mut transactions = self.transactions.lock().unwrap();
        // Idempotent by session key: a replay returns the original record.
        if let Some(existing) = transactions.iter().find(|t| t.session_key == session_key) {
            return Ok(existing.clone());
        }

        let mut reserved = self.reserved.lock().unwrap();
        let balance = reserved.entry(wallet_id.to_string()).or_default();
        if *balance < debit {
            return Err(PaymentError::Wallet(format!(
                "reserved balance underflow for wallet {wallet_id}"
            )));
        }
        *balance -= debit;

        let mut next = self.next_tx_id.lock().unwrap();
        *next += 1;
        let record = TransactionRecord {
            id: format!("tx-{}", *next),
            wallet_id: wallet_id.to_string(),
            debit,
            scheduled_refund,
            session_key: session_key.to_string(),
            created_at: Utc::now().timestamp() as u64,
        };
        transactions.push(record.clone());
        Ok(record)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GATEWAY
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct InitiatedTransfer {
    pub reference_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payer_code: String,
    pub external_id: String,
}

/// Gateway whose status answers are scripted per test.
///
/// An empty script answers SUCCESSFUL, so happy-path tests need no setup.
#[derive(Clone, Default)]
pub struct MockGateway {
    scripted: Arc<Mutex<VecDeque<Result<TransferStatus, PaymentError>>>>,
    initiated: Arc<Mutex<Vec<InitiatedTransfer>>>,
    status_queries: Arc<Mutex<u32>>,
    next_ref_id: Arc<Mutex<u64>>,
    fail_initiation: Arc<Mutex<bool>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_statuses(&self, statuses: Vec<Result<TransferStatus, PaymentError>>) {
        *self.scripted.lock().unwrap() = statuses.into();
    }

    pub fn set_fail_initiation(&self, fail: bool) {
        *self.fail_initiation.lock().unwrap() = fail;
    }

    pub fn initiated_transfers(&self) -> Vec<InitiatedTransfer> {
        self.initiated.lock().unwrap().clone()
    }

    pub fn status_queries(&self) -> u32 {
        *self.status_queries.lock().unwrap()
    }
}

#[async_trait]
impl MobileMoneyGateway for MockGateway {
    async fn initiate_transfer(
        &self,
        amount: Decimal,
        currency: &str,
        payer_code: &str,
        external_id: &str,
    ) -> Result<String, PaymentError> {
        if *self.fail_initiation.lock().unwrap() {
            return Err(PaymentError::Gateway("initiation refused".to_string()));
        }
        let mut next = self.next_ref_id.lock().unwrap();
        *next += 1;
        let reference_id = format!("momo-{}", *next);
        self.initiated.lock().unwrap().push(InitiatedTransfer {
            reference_id: reference_id.clone(),
            amount,
            currency: currency.to_string(),
            payer_code: payer_code.to_string(),
            external_id: external_id.to_string(),
        });
        Ok(reference_id)
    }

    async fn transfer_status(&self, _reference_id: &str) -> Result<TransferStatus, PaymentError> {
        *self.status_queries.lock().unwrap() += 1;
        match self.scripted.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(TransferStatus::Successful),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// OTP CHANNEL
// ═══════════════════════════════════════════════════════════════════════════

/// Records every delivered code so tests can read it back.
#[derive(Clone, Default)]
pub struct RecordingOtpChannel {
    delivered: Arc<Mutex<Vec<(String, SessionContext)>>>,
}

impl RecordingOtpChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_code(&self) -> Option<String> {
        self.delivered
            .lock()
            .unwrap()
            .last()
            .map(|(code, _)| code.clone())
    }

    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl OtpChannel for RecordingOtpChannel {
    async fn deliver(&self, code: &str, ctx: &SessionContext) {
        self.delivered
            .lock()
            .unwrap()
            .push((code.to_string(), ctx.clone()));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// INVOICES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
pub struct MockInvoiceGenerator {
    generated: Arc<Mutex<Vec<InvoiceRecord>>>,
    next_id: Arc<Mutex<u64>>,
}

impl MockInvoiceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generated(&self) -> Vec<InvoiceRecord> {
        self.generated.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceGenerator for MockInvoiceGenerator {
    async fn generate(
        &self,
        sub_order_id: &str,
        proof_ref: Option<&str>,
    ) -> Result<InvoiceRecord, PaymentError> {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let record = InvoiceRecord {
            id: format!("invoice-{}", *next),
            sub_order_id: sub_order_id.to_string(),
            proof_ref: proof_ref.map(|p| p.to_string()),
            created_at: Utc::now().timestamp() as u64,
        };
        self.generated.lock().unwrap().push(record.clone());
        Ok(record)
    }
}
