//! Paced sequential dispatch

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

use super::resolver::Recipient;
use crate::wa::WaGateway;

/// Bounds for the randomized inter-send delay
#[derive(Debug, Clone, Copy)]
pub struct PacingWindow {
    pub min: Duration,
    pub max: Duration,
}

impl PacingWindow {
    /// Create a window; a degenerate `min > max` input is normalized
    pub fn new(min: Duration, max: Duration) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Window from millisecond bounds
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    fn jitter(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let millis = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.min.as_millis()..=self.max.as_millis())
        };
        Duration::from_millis(millis as u64)
    }
}

impl Default for PacingWindow {
    /// The empirical human-cadence window: 2-5 seconds between sends
    fn default() -> Self {
        Self::from_millis(2000, 5000)
    }
}

/// Result of one send attempt
#[derive(Debug, Clone)]
pub enum DispatchResult {
    Sent {
        provider_message_id: Option<String>,
    },
    Failed {
        error: String,
    },
}

/// One outcome per input recipient, no drops, no duplicates
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub recipient: Recipient,
    pub result: DispatchResult,
}

impl DispatchOutcome {
    /// Whether the send was accepted by the gateway
    pub fn is_sent(&self) -> bool {
        matches!(self.result, DispatchResult::Sent { .. })
    }
}

/// Sends to recipients one at a time with a randomized pause in between.
///
/// Sequential on purpose: concurrent sends would defeat the human-cadence
/// pacing and risk provider-side throttling or bans. A failure on one
/// recipient never aborts the rest of the batch.
pub struct DispatchPacer {
    gateway: Arc<dyn WaGateway>,
    window: PacingWindow,
    send_timeout: Duration,
}

impl DispatchPacer {
    /// Create a new pacer
    pub fn new(gateway: Arc<dyn WaGateway>, window: PacingWindow, send_timeout: Duration) -> Self {
        Self {
            gateway,
            window,
            send_timeout,
        }
    }

    /// Send the payload to every recipient, in order
    pub async fn send_all(
        &self,
        recipients: &[Recipient],
        content: &str,
        media_url: Option<&str>,
    ) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(recipients.len());

        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 {
                let pause = self.window.jitter();
                if !pause.is_zero() {
                    sleep(pause).await;
                }
            }

            let result = match timeout(
                self.send_timeout,
                self.gateway
                    .send_message(&recipient.address, content, media_url),
            )
            .await
            {
                Ok(Ok(receipt)) => DispatchResult::Sent {
                    provider_message_id: receipt.provider_message_id,
                },
                Ok(Err(e)) => {
                    warn!(recipient = %recipient.address, error = %e, "Send failed");
                    DispatchResult::Failed {
                        error: e.to_string(),
                    }
                }
                Err(_) => {
                    warn!(recipient = %recipient.address, "Send timed out");
                    DispatchResult::Failed {
                        error: format!("send timed out after {:?}", self.send_timeout),
                    }
                }
            };

            outcomes.push(DispatchOutcome {
                recipient: recipient.clone(),
                result,
            });
        }

        outcomes
    }
}
