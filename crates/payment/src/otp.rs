use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;

/// Context handed to the delivery channel alongside the code.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub sub_order_id: String,
    pub shopper_id: String,
    pub amount: Decimal,
}

/// Out-of-band delivery of the one-time code (SMS, push, in-app banner).
///
/// Fire-and-forget: the protocol never consumes a return value from
/// delivery; a dropped message surfaces as the operator re-requesting a
/// session, not as a protocol error.
#[async_trait]
pub trait OtpChannel: Send + Sync {
    async fn deliver(&self, code: &str, ctx: &SessionContext);
}

/// Generate a numeric one-time code of the given length, zero-padded.
pub fn generate_code(length: u32) -> String {
    let max = 10u32.pow(length);
    let value = rand::thread_rng().gen_range(0..max);
    format!("{value:0width$}", width = length as usize)
}
