use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Protocol position of a payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Code issued, awaiting verification
    AwaitingOtp,

    /// Code verified, transfer may be initiated
    Verified,

    /// Transfer initiated, status polling in flight
    Polling,

    /// Settlement applied; terminal
    Settled,

    /// Aborted or cancelled; terminal
    Discarded,
}

/// Short-lived value object owning everything one payment attempt needs.
///
/// Bound to exactly one sub-order, destroyed on success, cancellation, or
/// terminal failure, and never reused. Nothing about the attempt lives in
/// ambient storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: String,
    pub sub_order_id: String,
    pub shopper_id: String,
    pub wallet_id: String,

    /// Amount to debit: value of found items only
    pub found_subtotal: Decimal,

    /// Ordered value, for refund-on-shortfall arithmetic
    pub original_subtotal: Decimal,

    /// The bound one-time code
    pub otp: String,

    /// Opaque single-transaction key; idempotency anchor for settlement
    pub session_key: String,

    /// Gateway reference id once the transfer is initiated
    pub transfer_reference: Option<String>,

    pub state: SessionState,
    pub created_at: u64,
}

impl PaymentSession {
    /// Refund owed to the customer if the shopper found less than ordered.
    pub fn shortfall(&self) -> Option<Decimal> {
        let diff = self.original_subtotal - self.found_subtotal;
        if diff > Decimal::ZERO {
            Some(diff)
        } else {
            None
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Settled | SessionState::Discarded)
    }
}

/// Derive the opaque session key from the session's identity.
pub fn derive_session_key(session_id: &str, sub_order_id: &str, created_at: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(sub_order_id.as_bytes());
    hasher.update(created_at.to_le_bytes());
    let hash: [u8; 32] = hasher.finalize().into();
    hex::encode(&hash[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn session(found: Decimal, original: Decimal) -> PaymentSession {
        PaymentSession {
            id: "pay-1".to_string(),
            sub_order_id: "sub-1".to_string(),
            shopper_id: "shopper-1".to_string(),
            wallet_id: "wallet-1".to_string(),
            found_subtotal: found,
            original_subtotal: original,
            otp: "12345".to_string(),
            session_key: derive_session_key("pay-1", "sub-1", 100),
            transfer_reference: None,
            state: SessionState::AwaitingOtp,
            created_at: 100,
        }
    }

    #[test]
    fn test_shortfall() {
        assert_eq!(session(dec!(1500), dec!(2500)).shortfall(), Some(dec!(1000)));
        assert_eq!(session(dec!(2500), dec!(2500)).shortfall(), None);
    }

    #[test]
    fn test_session_key_deterministic_and_distinct() {
        let a = derive_session_key("pay-1", "sub-1", 100);
        let b = derive_session_key("pay-1", "sub-1", 100);
        let c = derive_session_key("pay-2", "sub-1", 100);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
