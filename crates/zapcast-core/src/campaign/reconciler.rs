//! Acknowledgement reconciliation

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use zapcast_common::Result;
use zapcast_storage::models::MessageStatus;
use zapcast_storage::repository::CampaignRepository;

use super::ledger::MessageLedger;
use crate::wa::{AckEvent, AckLevel};

/// What happened to one acknowledgement event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    /// The ledger entry advanced to this status
    Applied(MessageStatus),
    /// Unknown message, or a stale/duplicate ack; nothing changed
    Ignored,
}

/// Folds asynchronous delivery acknowledgements back into the ledger and the
/// owning campaign's counters.
///
/// Events arrive unordered across messages and at-most-once per physical
/// ack; the per-entry forward-only guard is the only synchronization needed.
pub struct AckReconciler {
    ledger: MessageLedger,
    campaigns: Arc<dyn CampaignRepository>,
}

impl AckReconciler {
    /// Create a new reconciler
    pub fn new(ledger: MessageLedger, campaigns: Arc<dyn CampaignRepository>) -> Self {
        Self { ledger, campaigns }
    }

    /// Consume the acknowledgement stream until it closes
    pub async fn run(&self, mut rx: broadcast::Receiver<AckEvent>) {
        info!("Ack reconciler started");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.apply(&event).await {
                        warn!(
                            provider_id = %event.provider_message_id,
                            error = %e,
                            "Failed to reconcile ack"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Ack stream lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Ack stream closed; reconciler stopping");
                    break;
                }
            }
        }
    }

    /// Apply one acknowledgement event
    pub async fn apply(&self, event: &AckEvent) -> Result<AckDisposition> {
        let Some(entry) = self
            .ledger
            .find_by_provider_id(&event.provider_message_id)
            .await?
        else {
            // not one of ours (inbound or manual message)
            debug!(provider_id = %event.provider_message_id, "Ack for untracked message");
            return Ok(AckDisposition::Ignored);
        };

        let target = event.level.message_status();
        if !self.ledger.advance(&entry, target).await? {
            return Ok(AckDisposition::Ignored);
        }

        // sent_count is owned by the scheduler at dispatch time; only the
        // delivered/read transitions move a campaign counter here
        let counted = match event.level {
            AckLevel::Sent => true,
            AckLevel::Delivered => self.campaigns.increment_delivered(entry.campaign_id).await?,
            AckLevel::Read => self.campaigns.increment_read(entry.campaign_id).await?,
        };

        if !counted {
            // the ledger update stands on its own when the campaign is gone
            debug!(campaign = %entry.campaign_id, "Ack for a deleted campaign");
        }

        Ok(AckDisposition::Applied(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::testing::{outcome_sent, MemBackend};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn ack(provider_id: &str, level: AckLevel) -> AckEvent {
        AckEvent {
            provider_message_id: provider_id.to_string(),
            level,
        }
    }

    async fn seed_entry(backend: &MemBackend, provider_id: &str) -> Uuid {
        let campaign = backend.add_campaign("seeded", &[], "scheduled");
        let ledger = MessageLedger::new(Arc::new(backend.clone()));
        ledger
            .record(campaign.id, &outcome_sent("5511000000001", Some(provider_id)))
            .await
            .unwrap();
        campaign.id
    }

    fn reconciler(backend: &MemBackend) -> AckReconciler {
        AckReconciler::new(
            MessageLedger::new(Arc::new(backend.clone())),
            Arc::new(backend.clone()),
        )
    }

    #[tokio::test]
    async fn test_delivered_ack_updates_entry_and_counter() {
        let backend = MemBackend::new();
        let campaign_id = seed_entry(&backend, "wa:1").await;
        let reconciler = reconciler(&backend);

        let disposition = reconciler
            .apply(&ack("wa:1", AckLevel::Delivered))
            .await
            .unwrap();

        assert_eq!(disposition, AckDisposition::Applied(MessageStatus::Delivered));
        assert_eq!(backend.message_status("wa:1"), Some("delivered".to_string()));
        let campaign = backend.campaign(campaign_id);
        assert_eq!(campaign.delivered_count, 1);
        assert_eq!(campaign.read_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_ack_leaves_state_unchanged() {
        let backend = MemBackend::new();
        let campaign_id = seed_entry(&backend, "wa:1").await;
        let reconciler = reconciler(&backend);

        reconciler
            .apply(&ack("wa:1", AckLevel::Delivered))
            .await
            .unwrap();
        let disposition = reconciler
            .apply(&ack("wa:1", AckLevel::Delivered))
            .await
            .unwrap();

        assert_eq!(disposition, AckDisposition::Ignored);
        assert_eq!(backend.campaign(campaign_id).delivered_count, 1);
    }

    #[tokio::test]
    async fn test_out_of_order_acks_converge_to_maximum() {
        let backend = MemBackend::new();
        let campaign_id = seed_entry(&backend, "wa:1").await;
        let reconciler = reconciler(&backend);

        // read arrives before delivered; the later delivered ack is stale
        reconciler.apply(&ack("wa:1", AckLevel::Read)).await.unwrap();
        let stale = reconciler
            .apply(&ack("wa:1", AckLevel::Delivered))
            .await
            .unwrap();
        let duplicate_sent = reconciler.apply(&ack("wa:1", AckLevel::Sent)).await.unwrap();

        assert_eq!(stale, AckDisposition::Ignored);
        assert_eq!(duplicate_sent, AckDisposition::Ignored);
        assert_eq!(backend.message_status("wa:1"), Some("read".to_string()));

        let campaign = backend.campaign(campaign_id);
        assert_eq!(campaign.read_count, 1);
        assert_eq!(campaign.delivered_count, 0);
    }

    #[tokio::test]
    async fn test_counters_match_entries_after_interleaving() {
        let backend = MemBackend::new();
        let campaign = backend.add_campaign("interleave", &[], "scheduled");
        let ledger = MessageLedger::new(Arc::new(backend.clone()));
        for (n, provider_id) in ["wa:1", "wa:2", "wa:3"].into_iter().enumerate() {
            ledger
                .record(
                    campaign.id,
                    &outcome_sent(&format!("551100000000{}", n), Some(provider_id)),
                )
                .await
                .unwrap();
        }
        let reconciler = reconciler(&backend);

        // interleaved, partially duplicated ack stream across three entries
        for event in [
            ack("wa:2", AckLevel::Delivered),
            ack("wa:1", AckLevel::Sent),
            ack("wa:3", AckLevel::Read),
            ack("wa:2", AckLevel::Read),
            ack("wa:2", AckLevel::Delivered),
            ack("wa:1", AckLevel::Delivered),
            ack("wa:3", AckLevel::Delivered),
        ] {
            reconciler.apply(&event).await.unwrap();
        }

        // delivered: wa:2 and wa:1 transitioned through delivered; wa:3
        // jumped straight to read
        let updated = backend.campaign(campaign.id);
        assert_eq!(updated.delivered_count, 2);
        assert_eq!(updated.read_count, 2);
        assert_eq!(backend.message_status("wa:1"), Some("delivered".to_string()));
        assert_eq!(backend.message_status("wa:2"), Some("read".to_string()));
        assert_eq!(backend.message_status("wa:3"), Some("read".to_string()));
    }

    #[tokio::test]
    async fn test_untracked_message_is_ignored() {
        let backend = MemBackend::new();
        let reconciler = reconciler(&backend);

        let disposition = reconciler
            .apply(&ack("wa:unknown", AckLevel::Delivered))
            .await
            .unwrap();

        assert_eq!(disposition, AckDisposition::Ignored);
    }

    #[tokio::test]
    async fn test_ledger_updates_survive_deleted_campaign() {
        let backend = MemBackend::new();
        let campaign_id = seed_entry(&backend, "wa:1").await;
        backend.remove_campaign(campaign_id);
        let reconciler = reconciler(&backend);

        let disposition = reconciler
            .apply(&ack("wa:1", AckLevel::Delivered))
            .await
            .unwrap();

        assert_eq!(disposition, AckDisposition::Applied(MessageStatus::Delivered));
        assert_eq!(backend.message_status("wa:1"), Some("delivered".to_string()));
    }

    #[tokio::test]
    async fn test_failed_entry_never_revives() {
        let backend = MemBackend::new();
        let campaign = backend.add_campaign("failed", &[], "scheduled");
        let ledger = MessageLedger::new(Arc::new(backend.clone()));
        let entry = ledger
            .record(
                campaign.id,
                &crate::campaign::testing::outcome_failed("5511000000001"),
            )
            .await
            .unwrap();
        let reconciler = reconciler(&backend);

        for level in [AckLevel::Sent, AckLevel::Delivered, AckLevel::Read] {
            let disposition = reconciler
                .apply(&ack(&entry.provider_message_id, level))
                .await
                .unwrap();
            assert_eq!(disposition, AckDisposition::Ignored);
        }

        assert_eq!(
            backend.message_status(&entry.provider_message_id),
            Some("failed".to_string())
        );
        assert_eq!(backend.campaign(campaign.id).delivered_count, 0);
    }
}
