use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::gateway::{MobileMoneyGateway, TransferStatus};

/// Protocol tuning.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// ISO currency code for transfers
    pub currency: String,

    /// Fixed pause between status polls
    pub poll_interval: Duration,

    /// Attempt budget; exhausting it while still pending is a timeout
    pub max_poll_attempts: u32,

    /// One-time code length in digits
    pub otp_length: u32,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency: "XAF".to_string(),
            poll_interval: Duration::from_secs(10), // 30 attempts = 5 minutes
            max_poll_attempts: 30,
            otp_length: 5,
        }
    }
}

/// Terminal outcome of a polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Successful,
    Failed,
    Exhausted { attempts: u32 },
    Cancelled,
}

/// Poll the gateway until the transfer is terminal, the attempt budget runs
/// out, or the caller cancels.
///
/// A transient gateway error consumes an attempt and the loop continues; it
/// is never treated as a terminal failure. Cancellation is only honored
/// between polls, so a SUCCESSFUL answer that has already arrived wins over
/// a racing cancel.
pub async fn poll_until_terminal<G: MobileMoneyGateway + ?Sized>(
    gateway: &G,
    reference_id: &str,
    config: &PaymentConfig,
    cancel: &CancellationToken,
) -> PollOutcome {
    if cancel.is_cancelled() {
        return PollOutcome::Cancelled;
    }

    for attempt in 1..=config.max_poll_attempts {
        if attempt > 1 {
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(config.poll_interval) => {}
            }
        }

        match gateway.transfer_status(reference_id).await {
            Ok(TransferStatus::Successful) => return PollOutcome::Successful,
            Ok(TransferStatus::Failed) => return PollOutcome::Failed,
            Ok(TransferStatus::Pending) => {
                debug!(reference_id = %reference_id, attempt, "Transfer still pending");
            }
            Err(e) => {
                warn!(
                    reference_id = %reference_id,
                    attempt,
                    error = %e,
                    "Transient error polling transfer status"
                );
            }
        }
    }

    PollOutcome::Exhausted {
        attempts: config.max_poll_attempts,
    }
}
