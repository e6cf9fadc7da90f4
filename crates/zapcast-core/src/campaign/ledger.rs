//! Outbound message ledger

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;
use zapcast_common::types::CampaignId;
use zapcast_common::Result;
use zapcast_storage::models::{CreateOutboundMessage, MessageStatus, OutboundMessage};
use zapcast_storage::repository::OutboundMessageRepository;

use super::pacer::{DispatchOutcome, DispatchResult};

/// Append-only record of send attempts, later reconciled against
/// acknowledgement events.
///
/// Every entry carries a unique provider message id; attempts that never
/// produced one (failures, providers that do not echo an id) get a synthetic
/// id so the reconciliation join key is always populated.
pub struct MessageLedger {
    repo: Arc<dyn OutboundMessageRepository>,
}

impl MessageLedger {
    /// Create a new ledger over the given repository
    pub fn new(repo: Arc<dyn OutboundMessageRepository>) -> Self {
        Self { repo }
    }

    /// Record one send attempt
    pub async fn record(
        &self,
        campaign_id: CampaignId,
        outcome: &DispatchOutcome,
    ) -> Result<OutboundMessage> {
        let (status, provider_message_id) = match &outcome.result {
            DispatchResult::Sent {
                provider_message_id,
            } => (
                MessageStatus::Sent,
                provider_message_id
                    .clone()
                    .unwrap_or_else(|| format!("sent:{}", Uuid::new_v4())),
            ),
            DispatchResult::Failed { .. } => {
                (MessageStatus::Failed, format!("failed:{}", Uuid::new_v4()))
            }
        };

        self.repo
            .create(CreateOutboundMessage {
                campaign_id,
                provider_message_id,
                recipient: outcome.recipient.address.to_string(),
                status,
            })
            .await
    }

    /// Look up an entry by the provider message id
    pub async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<OutboundMessage>> {
        self.repo.find_by_provider_id(provider_id).await
    }

    /// Advance an entry's status.
    ///
    /// Writes only forward-valid transitions; superseded or out-of-order
    /// updates return false and leave the entry untouched.
    pub async fn advance(&self, entry: &OutboundMessage, next: MessageStatus) -> Result<bool> {
        let Some(current) = entry.status_enum() else {
            warn!(entry = %entry.id, status = %entry.status, "Ledger entry has unknown status");
            return Ok(false);
        };

        if !current.accepts(next) {
            return Ok(false);
        }

        self.repo.set_status(entry.id, next).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::testing::{outcome_failed, outcome_sent, MemBackend};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_record_sent_keeps_provider_id() {
        let backend = MemBackend::new();
        let ledger = MessageLedger::new(Arc::new(backend.clone()));
        let campaign_id = Uuid::new_v4();

        let entry = ledger
            .record(campaign_id, &outcome_sent("5511000000001", Some("wa:abc")))
            .await
            .unwrap();

        assert_eq!(entry.provider_message_id, "wa:abc");
        assert_eq!(entry.status, "sent");
        assert_eq!(entry.campaign_id, campaign_id);
        assert_eq!(entry.recipient, "5511000000001@c.us");
    }

    #[tokio::test]
    async fn test_record_synthesizes_missing_provider_ids() {
        let backend = MemBackend::new();
        let ledger = MessageLedger::new(Arc::new(backend.clone()));
        let campaign_id = Uuid::new_v4();

        let sent = ledger
            .record(campaign_id, &outcome_sent("5511000000001", None))
            .await
            .unwrap();
        let failed = ledger
            .record(campaign_id, &outcome_failed("5511000000002"))
            .await
            .unwrap();

        assert!(sent.provider_message_id.starts_with("sent:"));
        assert!(failed.provider_message_id.starts_with("failed:"));
        assert_ne!(sent.provider_message_id, failed.provider_message_id);
        assert_eq!(failed.status, "failed");
    }

    #[tokio::test]
    async fn test_advance_rejects_regressions() {
        let backend = MemBackend::new();
        let ledger = MessageLedger::new(Arc::new(backend.clone()));
        let campaign_id = Uuid::new_v4();

        let entry = ledger
            .record(campaign_id, &outcome_sent("5511000000001", Some("wa:abc")))
            .await
            .unwrap();

        assert!(ledger.advance(&entry, MessageStatus::Delivered).await.unwrap());

        let entry = ledger.find_by_provider_id("wa:abc").await.unwrap().unwrap();
        assert_eq!(entry.status, "delivered");

        // a stale "sent" ack after delivery is silently ignored
        assert!(!ledger.advance(&entry, MessageStatus::Sent).await.unwrap());
        let entry = ledger.find_by_provider_id("wa:abc").await.unwrap().unwrap();
        assert_eq!(entry.status, "delivered");
    }
}
