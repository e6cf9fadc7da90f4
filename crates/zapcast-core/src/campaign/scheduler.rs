//! Campaign scheduler - the periodic tick that drives due campaigns

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use zapcast_common::config::SchedulerConfig;
use zapcast_common::{Error, Result};
use zapcast_storage::models::{Campaign, CampaignStatus};
use zapcast_storage::repository::CampaignRepository;

use super::ledger::MessageLedger;
use super::pacer::DispatchPacer;
use super::resolver::RecipientResolver;
use crate::wa::{SessionStatus, WaGateway};

/// What one tick did
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TickSummary {
    /// Campaigns that ran a send pass
    pub processed: usize,
    /// Due campaigns left untouched (gateway backpressure)
    pub skipped: usize,
    /// Stalled `running` campaigns put back on the schedule
    pub requeued: usize,
}

enum PassOutcome {
    Processed,
    Skipped,
}

/// Periodic scheduler that scans for due campaigns and runs their send
/// passes.
///
/// Ticks are serialized through a run-in-progress guard; a tick that outlives
/// the interval delays the next one instead of overlapping it (overlapping
/// ticks would double-send).
pub struct CampaignScheduler {
    campaigns: Arc<dyn CampaignRepository>,
    resolver: RecipientResolver,
    pacer: DispatchPacer,
    ledger: MessageLedger,
    gateway: Arc<dyn WaGateway>,
    tick_interval: Duration,
    lookahead: ChronoDuration,
    stall_after: ChronoDuration,
    tick_lock: Mutex<()>,
}

impl CampaignScheduler {
    /// Assemble the scheduler from its collaborators
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        resolver: RecipientResolver,
        pacer: DispatchPacer,
        ledger: MessageLedger,
        gateway: Arc<dyn WaGateway>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            campaigns,
            resolver,
            pacer,
            ledger,
            gateway,
            tick_interval: Duration::from_secs(config.tick_secs),
            lookahead: ChronoDuration::seconds(config.lookahead_secs as i64),
            stall_after: ChronoDuration::seconds(config.stall_after_secs as i64),
            tick_lock: Mutex::new(()),
        }
    }

    /// Run the scheduler loop
    pub async fn run(&self) {
        let mut ticker = interval(self.tick_interval);

        info!(
            interval_secs = self.tick_interval.as_secs(),
            "Campaign scheduler started"
        );

        loop {
            ticker.tick().await;

            match self.run_tick().await {
                Ok(summary) if summary.processed > 0 || summary.requeued > 0 => {
                    info!(
                        processed = summary.processed,
                        skipped = summary.skipped,
                        requeued = summary.requeued,
                        "Scheduler tick complete"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Scheduler tick failed"),
            }
        }
    }

    /// Run one tick now.
    ///
    /// Also the manual operational trigger; concurrent callers queue behind
    /// the in-progress tick rather than running alongside it.
    pub async fn run_tick(&self) -> Result<TickSummary> {
        let _guard = self.tick_lock.lock().await;

        let now = Utc::now();
        let mut summary = TickSummary {
            requeued: self.sweep_stalled(now).await,
            ..TickSummary::default()
        };

        // schedules due within the coming interval are due now; the engine
        // only wakes once per interval
        let horizon = now + self.lookahead;
        let due = self.campaigns.find_due(horizon).await?;

        for campaign in due {
            match self.process_campaign(&campaign, horizon).await {
                Ok(PassOutcome::Processed) => summary.processed += 1,
                Ok(PassOutcome::Skipped) => summary.skipped += 1,
                // one failing campaign must not take down the rest of the tick
                Err(e) => error!(
                    campaign = %campaign.id,
                    name = %campaign.name,
                    error = %e,
                    "Campaign pass failed"
                ),
            }
        }

        Ok(summary)
    }

    /// Put campaigns stuck in `running` back on the schedule.
    ///
    /// A crash between the `running` transition and the final schedule
    /// rewrite strands a campaign where the due-query no longer sees it.
    /// Stalled campaigns that still hold schedules are requeued (their due
    /// entries re-send: at-least-once); ones without schedules are failed.
    async fn sweep_stalled(&self, now: DateTime<Utc>) -> usize {
        let stalled = match self.campaigns.find_stalled(now - self.stall_after).await {
            Ok(stalled) => stalled,
            Err(e) => {
                error!(error = %e, "Stalled-campaign sweep failed");
                return 0;
            }
        };

        let mut requeued = 0;
        for campaign in stalled {
            let next = if campaign.schedules.is_empty() {
                CampaignStatus::Failed
            } else {
                CampaignStatus::Scheduled
            };

            warn!(
                campaign = %campaign.id,
                name = %campaign.name,
                next = %next,
                "Campaign stalled in running state"
            );

            match self.campaigns.update_status(campaign.id, next).await {
                Ok(_) if next == CampaignStatus::Scheduled => requeued += 1,
                Ok(_) => {}
                Err(e) => error!(campaign = %campaign.id, error = %e, "Failed to requeue campaign"),
            }
        }

        requeued
    }

    async fn process_campaign(
        &self,
        campaign: &Campaign,
        horizon: DateTime<Utc>,
    ) -> Result<PassOutcome> {
        // backpressure, not failure: due schedules stay pending and are
        // retried next tick
        if self.gateway.status().await != SessionStatus::Connected {
            debug!(
                campaign = %campaign.name,
                "Gateway not connected; leaving due schedules for the next tick"
            );
            return Ok(PassOutcome::Skipped);
        }

        let (due, future): (Vec<_>, Vec<_>) = campaign
            .schedules
            .iter()
            .copied()
            .partition(|s| *s <= horizon);

        if due.is_empty() {
            return Ok(PassOutcome::Skipped);
        }

        let target_type = campaign.target_type_enum().ok_or_else(|| {
            Error::Validation(format!(
                "Campaign {} has unknown target type {}",
                campaign.id, campaign.target_type
            ))
        })?;

        // resolve before any write: a lookup failure aborts the pass with the
        // campaign still scheduled and its schedules intact
        let recipients = self
            .resolver
            .resolve(target_type, &campaign.target_id)
            .await?;

        self.campaigns
            .update_status(campaign.id, CampaignStatus::Running)
            .await?;

        info!(
            campaign = %campaign.name,
            occurrences = due.len(),
            recipients = recipients.len(),
            "Running campaign pass"
        );

        // each due occurrence is a full re-send to every resolved recipient
        for _occurrence in &due {
            let outcomes = self
                .pacer
                .send_all(
                    &recipients,
                    &campaign.message_content,
                    campaign.media_url.as_deref(),
                )
                .await;

            let mut sent = 0;
            let mut failed = 0;
            for outcome in &outcomes {
                self.ledger.record(campaign.id, outcome).await?;
                if outcome.is_sent() {
                    sent += 1;
                } else {
                    failed += 1;
                }
            }

            if sent > 0 || failed > 0 {
                self.campaigns
                    .add_send_counts(campaign.id, sent, failed)
                    .await?;
            }
        }

        if future.is_empty() {
            self.campaigns
                .finalize_pass(campaign.id, CampaignStatus::Completed, &[])
                .await?;
        } else {
            self.campaigns
                .finalize_pass(campaign.id, CampaignStatus::Scheduled, &future)
                .await?;
        }

        Ok(PassOutcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::testing::{engine, FakeGateway, MemBackend};
    use crate::campaign::AckReconciler;
    use crate::wa::{AckEvent, AckLevel};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;
    use zapcast_storage::models::Contact;

    fn contacts(phones: &[&str]) -> Vec<Contact> {
        phones
            .iter()
            .map(|p| Contact {
                phone: p.to_string(),
                name: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_partitions_due_and_future_schedules() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let now = Utc::now();
        let future_at = now + ChronoDuration::hours(1);
        let list = backend.add_list("one", contacts(&["5511000000001"]));
        let campaign = backend.add_list_campaign(
            "partition",
            &[now - ChronoDuration::seconds(10), now - ChronoDuration::seconds(5), future_at],
            &list.id.to_string(),
        );

        let summary = engine(&backend, gateway).run_tick().await.unwrap();

        assert_eq!(summary.processed, 1);
        let updated = backend.campaign(campaign.id);
        assert_eq!(updated.status, "scheduled");
        assert_eq!(updated.schedules, vec![future_at]);
        // two due occurrences, one recipient each
        assert_eq!(updated.sent_count, 2);
        assert_eq!(backend.messages_for(campaign.id).len(), 2);
    }

    #[tokio::test]
    async fn test_last_schedule_completes_campaign() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let list = backend.add_list("one", contacts(&["5511000000001"]));
        let campaign = backend.add_list_campaign(
            "final",
            &[Utc::now() - ChronoDuration::seconds(1)],
            &list.id.to_string(),
        );

        engine(&backend, gateway).run_tick().await.unwrap();

        let updated = backend.campaign(campaign.id);
        assert_eq!(updated.status, "completed");
        assert!(updated.schedules.is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_gateway_leaves_campaign_untouched() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::with_status(SessionStatus::Scanning));
        let list = backend.add_list("one", contacts(&["5511000000001"]));
        let campaign = backend.add_list_campaign(
            "backpressure",
            &[Utc::now() - ChronoDuration::seconds(1)],
            &list.id.to_string(),
        );
        let before = backend.campaign(campaign.id);

        let summary = engine(&backend, gateway.clone()).run_tick().await.unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped, 1);
        let after = backend.campaign(campaign.id);
        assert_eq!(after.status, before.status);
        assert_eq!(after.schedules, before.schedules);
        assert_eq!(after.sent_count, before.sent_count);
        assert_eq!(after.updated_at, before.updated_at);
        assert!(gateway.sent_log().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_records_both_outcomes() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        gateway.fail_for("5511000000002@c.us");
        let list = backend.add_list("pair", contacts(&["5511000000001", "5511000000002"]));
        let campaign = backend.add_list_campaign(
            "partial",
            &[Utc::now() - ChronoDuration::seconds(1)],
            &list.id.to_string(),
        );

        engine(&backend, gateway).run_tick().await.unwrap();

        let updated = backend.campaign(campaign.id);
        assert_eq!(updated.status, "completed");
        assert!(updated.schedules.is_empty());
        assert_eq!(updated.sent_count, 1);
        assert_eq!(updated.failed_count, 1);

        let entries = backend.messages_for(campaign.id);
        assert_eq!(entries.len(), 2);
        let statuses: Vec<&str> = entries.iter().map(|m| m.status.as_str()).collect();
        assert!(statuses.contains(&"sent"));
        assert!(statuses.contains(&"failed"));
        assert!(entries.iter().all(|m| m.campaign_id == campaign.id));
    }

    #[tokio::test]
    async fn test_end_to_end_reconciliation_after_pass() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        gateway.fail_for("5511000000002@c.us");
        let list = backend.add_list("pair", contacts(&["5511000000001", "5511000000002"]));
        let campaign = backend.add_list_campaign(
            "e2e",
            &[Utc::now() - ChronoDuration::seconds(1)],
            &list.id.to_string(),
        );

        engine(&backend, gateway.clone()).run_tick().await.unwrap();

        let sent_entry = backend
            .messages_for(campaign.id)
            .into_iter()
            .find(|m| m.status == "sent")
            .unwrap();

        let reconciler = AckReconciler::new(
            MessageLedger::new(Arc::new(backend.clone())),
            Arc::new(backend.clone()),
        );
        let event = AckEvent {
            provider_message_id: sent_entry.provider_message_id.clone(),
            level: AckLevel::Delivered,
        };
        reconciler.apply(&event).await.unwrap();
        // duplicate must not double-count
        reconciler.apply(&event).await.unwrap();

        let updated = backend.campaign(campaign.id);
        assert_eq!(updated.delivered_count, 1);
        assert_eq!(
            backend.message_status(&sent_entry.provider_message_id),
            Some("delivered".to_string())
        );
    }

    #[tokio::test]
    async fn test_each_occurrence_resends_to_all_recipients() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let now = Utc::now();
        let list = backend.add_list("pair", contacts(&["5511000000001", "5511000000002"]));
        let campaign = backend.add_list_campaign(
            "repeat",
            &[now - ChronoDuration::minutes(2), now - ChronoDuration::minutes(1)],
            &list.id.to_string(),
        );

        engine(&backend, gateway.clone()).run_tick().await.unwrap();

        // 2 occurrences x 2 recipients
        assert_eq!(backend.messages_for(campaign.id).len(), 4);
        assert_eq!(backend.campaign(campaign.id).sent_count, 4);
        assert_eq!(gateway.sent_log().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_list_sends_to_nobody_but_completes() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let campaign = backend.add_list_campaign(
            "empty",
            &[Utc::now() - ChronoDuration::seconds(1)],
            &Uuid::new_v4().to_string(),
        );

        let summary = engine(&backend, gateway).run_tick().await.unwrap();

        assert_eq!(summary.processed, 1);
        let updated = backend.campaign(campaign.id);
        assert_eq!(updated.status, "completed");
        assert_eq!(updated.sent_count, 0);
        assert!(backend.messages_for(campaign.id).is_empty());
    }

    #[tokio::test]
    async fn test_resolution_failure_is_isolated_per_campaign() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let broken_list = backend.add_list("broken", contacts(&["5511000000001"]));
        backend.fail_list(broken_list.id);
        let good_list = backend.add_list("good", contacts(&["5511000000002"]));

        let at = Utc::now() - ChronoDuration::seconds(1);
        let broken = backend.add_list_campaign("broken", &[at], &broken_list.id.to_string());
        let good = backend.add_list_campaign("good", &[at], &good_list.id.to_string());

        let summary = engine(&backend, gateway).run_tick().await.unwrap();

        // the failing campaign stays scheduled with its schedules intact
        assert_eq!(summary.processed, 1);
        let broken_after = backend.campaign(broken.id);
        assert_eq!(broken_after.status, "scheduled");
        assert_eq!(broken_after.schedules, vec![at]);
        assert_eq!(backend.campaign(good.id).status, "completed");
    }

    #[tokio::test]
    async fn test_group_campaign_sends_single_group_message() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let campaign = backend.add_group_campaign(
            "group",
            &[Utc::now() - ChronoDuration::seconds(1)],
            "123-456@g.us",
        );

        engine(&backend, gateway.clone()).run_tick().await.unwrap();

        let log = gateway.sent_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].to, "123-456@g.us");
        assert_eq!(backend.campaign(campaign.id).sent_count, 1);
    }

    #[tokio::test]
    async fn test_stalled_running_campaign_is_requeued() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let at = Utc::now() + ChronoDuration::hours(2);
        let list = backend.add_list("one", contacts(&["5511000000001"]));
        let stalled = backend.add_list_campaign("stalled", &[at], &list.id.to_string());
        backend.set_campaign_status(stalled.id, "running");
        backend.age_campaign(stalled.id, ChronoDuration::hours(1));

        let summary = engine(&backend, gateway).run_tick().await.unwrap();

        assert_eq!(summary.requeued, 1);
        assert_eq!(backend.campaign(stalled.id).status, "scheduled");
    }

    #[tokio::test]
    async fn test_stalled_campaign_without_schedules_is_failed() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let list = backend.add_list("one", contacts(&["5511000000001"]));
        let stalled = backend.add_list_campaign("drained", &[], &list.id.to_string());
        backend.set_campaign_status(stalled.id, "running");
        backend.age_campaign(stalled.id, ChronoDuration::hours(1));

        let summary = engine(&backend, gateway).run_tick().await.unwrap();

        assert_eq!(summary.requeued, 0);
        assert_eq!(backend.campaign(stalled.id).status, "failed");
    }

    #[tokio::test]
    async fn test_fresh_running_campaign_is_left_alone() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let list = backend.add_list("one", contacts(&["5511000000001"]));
        let running = backend.add_list_campaign(
            "in-flight",
            &[Utc::now() - ChronoDuration::seconds(1)],
            &list.id.to_string(),
        );
        backend.set_campaign_status(running.id, "running");

        let summary = engine(&backend, gateway.clone()).run_tick().await.unwrap();

        // running campaigns are not matched by the due query and are too
        // young for the stall sweep
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.requeued, 0);
        assert_eq!(backend.campaign(running.id).status, "running");
        assert!(gateway.sent_log().is_empty());
    }

    #[tokio::test]
    async fn test_manual_trigger_reports_processed_count() {
        let backend = MemBackend::new();
        let gateway = Arc::new(FakeGateway::connected());
        let at = Utc::now() - ChronoDuration::seconds(1);
        let list = backend.add_list("one", contacts(&["5511000000001"]));
        backend.add_list_campaign("a", &[at], &list.id.to_string());
        backend.add_list_campaign("b", &[at], &list.id.to_string());

        let summary = engine(&backend, gateway).run_tick().await.unwrap();

        assert_eq!(summary.processed, 2);
    }
}
