use rust_decimal::Decimal;
use thiserror::Error;

use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(
        "reserved balance cannot cover found items for sub-order {sub_order_id}: \
         required {required}, reserved {reserved}"
    )]
    InsufficientReserve {
        sub_order_id: String,
        required: Decimal,
        reserved: Decimal,
    },

    #[error("one-time code mismatch for sub-order {sub_order_id}")]
    InvalidOtp { sub_order_id: String },

    #[error("transfer {reference_id} failed for sub-order {sub_order_id}")]
    TransferFailed {
        sub_order_id: String,
        reference_id: String,
    },

    #[error(
        "transfer {reference_id} still pending for sub-order {sub_order_id} \
         after {attempts} polls"
    )]
    TransferTimeout {
        sub_order_id: String,
        reference_id: String,
        attempts: u32,
    },

    #[error("a payment session is already active for sub-order {sub_order_id}")]
    ConcurrentSessionConflict { sub_order_id: String },

    #[error("no payment session for sub-order {sub_order_id}")]
    SessionNotFound { sub_order_id: String },

    #[error("payment session for sub-order {sub_order_id} is {state:?}, expected {expected:?}")]
    InvalidSessionState {
        sub_order_id: String,
        state: SessionState,
        expected: SessionState,
    },

    #[error("payment cancelled for sub-order {sub_order_id}")]
    Cancelled { sub_order_id: String },

    #[error("wallet service error: {0}")]
    Wallet(String),

    #[error("mobile-money gateway error: {0}")]
    Gateway(String),

    #[error("invoice generation error: {0}")]
    Invoice(String),
}
