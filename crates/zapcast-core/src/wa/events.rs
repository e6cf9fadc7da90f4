//! Acknowledgement event stream

use tokio::sync::broadcast;
use zapcast_storage::models::MessageStatus;

/// Delivery acknowledgement level, as reported by the provider.
///
/// The provider also emits codes outside 1..=3 (errors, pending); those carry
/// no delivery-state transition and are not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckLevel {
    Sent,
    Delivered,
    Read,
}

impl AckLevel {
    /// Map a raw provider ack code to a level; unknown codes yield `None`
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(AckLevel::Sent),
            2 => Some(AckLevel::Delivered),
            3 => Some(AckLevel::Read),
            _ => None,
        }
    }

    /// The ledger status this acknowledgement targets
    pub fn message_status(self) -> MessageStatus {
        match self {
            AckLevel::Sent => MessageStatus::Sent,
            AckLevel::Delivered => MessageStatus::Delivered,
            AckLevel::Read => MessageStatus::Read,
        }
    }
}

/// One acknowledgement for one outbound message
#[derive(Debug, Clone)]
pub struct AckEvent {
    pub provider_message_id: String,
    pub level: AckLevel,
}

/// Broadcast channel carrying acknowledgement events from the gateway
/// webhook to the reconciler.
///
/// Delivery is at-most-once per physical ack and unordered across distinct
/// messages; subscribers must tolerate both.
#[derive(Clone)]
pub struct AckBus {
    tx: broadcast::Sender<AckEvent>,
}

impl AckBus {
    /// Create a bus with the given buffer capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event; dropped silently when nobody is subscribed
    pub fn publish(&self, event: AckEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<AckEvent> {
        self.tx.subscribe()
    }
}

impl Default for AckBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_level_from_code() {
        assert_eq!(AckLevel::from_code(1), Some(AckLevel::Sent));
        assert_eq!(AckLevel::from_code(2), Some(AckLevel::Delivered));
        assert_eq!(AckLevel::from_code(3), Some(AckLevel::Read));
        // error / pending codes carry no transition
        assert_eq!(AckLevel::from_code(0), None);
        assert_eq!(AckLevel::from_code(-1), None);
        assert_eq!(AckLevel::from_code(4), None);
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscriber() {
        let bus = AckBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(AckEvent {
            provider_message_id: "wa:1".to_string(),
            level: AckLevel::Delivered,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.provider_message_id, "wa:1");
        assert_eq!(event.level, AckLevel::Delivered);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = AckBus::new(8);
        bus.publish(AckEvent {
            provider_message_id: "wa:1".to_string(),
            level: AckLevel::Sent,
        });
    }
}
