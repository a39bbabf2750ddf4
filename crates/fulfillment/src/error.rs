use sokoni_types::SubOrderStatus;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("invalid transition for sub-order {sub_order_id}: {from} -> {requested}")]
    InvalidTransition {
        sub_order_id: String,
        from: SubOrderStatus,
        requested: SubOrderStatus,
    },

    #[error("delivery blocked for sub-order {sub_order_id}: proof of invoice required")]
    ProofRequired { sub_order_id: String },

    #[error("proof cannot be recorded for sub-order {sub_order_id} in status {status}")]
    ProofTooEarly {
        sub_order_id: String,
        status: SubOrderStatus,
    },

    #[error("items can only be marked while shopping: sub-order {sub_order_id} is {status}")]
    NotShopping {
        sub_order_id: String,
        status: SubOrderStatus,
    },

    #[error("unknown sub-order: {sub_order_id}")]
    UnknownSubOrder { sub_order_id: String },

    #[error("unknown item {item_id} in sub-order {sub_order_id}")]
    UnknownItem {
        sub_order_id: String,
        item_id: String,
    },

    #[error("proof storage error: {0}")]
    ProofStorage(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
