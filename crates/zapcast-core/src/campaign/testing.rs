//! In-memory fakes for engine tests

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use zapcast_common::config::SchedulerConfig;
use zapcast_common::types::{CampaignId, ChatAddress, ContactListId, OutboundMessageId};
use zapcast_common::{Error, Result};
use zapcast_storage::models::{
    Campaign, CampaignMessageCounts, CampaignStatus, Contact, ContactList, CreateCampaign,
    CreateContactList, CreateOutboundMessage, DashboardTotals, MessageStatus, OutboundMessage,
};
use zapcast_storage::repository::{
    CampaignRepository, ContactListRepository, OutboundMessageRepository,
};

use super::ledger::MessageLedger;
use super::pacer::{DispatchOutcome, DispatchPacer, DispatchResult, PacingWindow};
use super::resolver::{Recipient, RecipientResolver};
use super::scheduler::CampaignScheduler;
use crate::wa::{GroupInfo, SendReceipt, SessionStatus, WaGateway};

#[derive(Default)]
struct MemInner {
    campaigns: Mutex<HashMap<CampaignId, Campaign>>,
    lists: Mutex<HashMap<ContactListId, ContactList>>,
    failing_lists: Mutex<HashSet<ContactListId>>,
    messages: Mutex<Vec<OutboundMessage>>,
}

/// Shared in-memory stand-in for all three repositories
#[derive(Clone, Default)]
pub(crate) struct MemBackend {
    inner: Arc<MemInner>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_list(&self, name: &str, contacts: Vec<Contact>) -> ContactList {
        let now = Utc::now();
        let list = ContactList {
            id: Uuid::new_v4(),
            name: name.to_string(),
            contacts: serde_json::to_value(contacts).unwrap(),
            created_at: now,
            updated_at: now,
        };
        self.inner
            .lists
            .lock()
            .unwrap()
            .insert(list.id, list.clone());
        list
    }

    /// Make lookups of one list fail with a database error
    pub fn fail_list(&self, id: ContactListId) {
        self.inner.failing_lists.lock().unwrap().insert(id);
    }

    fn insert_campaign(
        &self,
        name: &str,
        schedules: &[DateTime<Utc>],
        status: &str,
        target_type: &str,
        target_id: &str,
    ) -> Campaign {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: status.to_string(),
            message_content: "hello from zapcast".to_string(),
            media_url: None,
            target_type: target_type.to_string(),
            target_id: target_id.to_string(),
            target_name: None,
            target_count: 0,
            schedules: schedules.to_vec(),
            sent_count: 0,
            delivered_count: 0,
            read_count: 0,
            failed_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .campaigns
            .lock()
            .unwrap()
            .insert(campaign.id, campaign.clone());
        campaign
    }

    pub fn add_campaign(&self, name: &str, schedules: &[DateTime<Utc>], status: &str) -> Campaign {
        self.insert_campaign(name, schedules, status, "group", "999-888@g.us")
    }

    pub fn add_list_campaign(
        &self,
        name: &str,
        schedules: &[DateTime<Utc>],
        target_id: &str,
    ) -> Campaign {
        self.insert_campaign(name, schedules, "scheduled", "list", target_id)
    }

    pub fn add_group_campaign(
        &self,
        name: &str,
        schedules: &[DateTime<Utc>],
        group_id: &str,
    ) -> Campaign {
        self.insert_campaign(name, schedules, "scheduled", "group", group_id)
    }

    pub fn campaign(&self, id: CampaignId) -> Campaign {
        self.inner.campaigns.lock().unwrap()[&id].clone()
    }

    pub fn remove_campaign(&self, id: CampaignId) {
        self.inner.campaigns.lock().unwrap().remove(&id);
    }

    pub fn set_campaign_status(&self, id: CampaignId, status: &str) {
        let mut campaigns = self.inner.campaigns.lock().unwrap();
        let campaign = campaigns.get_mut(&id).unwrap();
        campaign.status = status.to_string();
    }

    /// Backdate a campaign's `updated_at`, as if it had been idle
    pub fn age_campaign(&self, id: CampaignId, age: ChronoDuration) {
        let mut campaigns = self.inner.campaigns.lock().unwrap();
        let campaign = campaigns.get_mut(&id).unwrap();
        campaign.updated_at = campaign.updated_at - age;
    }

    pub fn messages_for(&self, campaign_id: CampaignId) -> Vec<OutboundMessage> {
        self.inner
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.campaign_id == campaign_id)
            .cloned()
            .collect()
    }

    pub fn message_status(&self, provider_id: &str) -> Option<String> {
        self.inner
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.provider_message_id == provider_id)
            .map(|m| m.status.clone())
    }
}

#[async_trait]
impl CampaignRepository for MemBackend {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        Ok(self.insert_campaign(
            &input.name,
            &input.schedules,
            &input
                .status
                .unwrap_or(CampaignStatus::Draft)
                .to_string(),
            &input.target_type.to_string(),
            &input.target_id,
        ))
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        Ok(self.inner.campaigns.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, limit: i64) -> Result<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> =
            self.inner.campaigns.lock().unwrap().values().cloned().collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns.truncate(limit as usize);
        Ok(campaigns)
    }

    async fn delete(&self, id: CampaignId) -> Result<bool> {
        Ok(self.inner.campaigns.lock().unwrap().remove(&id).is_some())
    }

    async fn find_due(&self, horizon: DateTime<Utc>) -> Result<Vec<Campaign>> {
        let mut due: Vec<Campaign> = self
            .inner
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == "scheduled" && c.schedules.iter().any(|s| *s <= horizon))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(due)
    }

    async fn find_stalled(&self, cutoff: DateTime<Utc>) -> Result<Vec<Campaign>> {
        Ok(self
            .inner
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == "running" && c.updated_at < cutoff)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: CampaignId, status: CampaignStatus) -> Result<bool> {
        let mut campaigns = self.inner.campaigns.lock().unwrap();
        match campaigns.get_mut(&id) {
            Some(campaign) => {
                campaign.status = status.to_string();
                campaign.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn finalize_pass(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        schedules: &[DateTime<Utc>],
    ) -> Result<()> {
        let mut campaigns = self.inner.campaigns.lock().unwrap();
        if let Some(campaign) = campaigns.get_mut(&id) {
            campaign.status = status.to_string();
            campaign.schedules = schedules.to_vec();
            campaign.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn add_send_counts(&self, id: CampaignId, sent: i32, failed: i32) -> Result<()> {
        let mut campaigns = self.inner.campaigns.lock().unwrap();
        if let Some(campaign) = campaigns.get_mut(&id) {
            campaign.sent_count += sent;
            campaign.failed_count += failed;
            campaign.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn increment_delivered(&self, id: CampaignId) -> Result<bool> {
        let mut campaigns = self.inner.campaigns.lock().unwrap();
        match campaigns.get_mut(&id) {
            Some(campaign) => {
                campaign.delivered_count += 1;
                campaign.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_read(&self, id: CampaignId) -> Result<bool> {
        let mut campaigns = self.inner.campaigns.lock().unwrap();
        match campaigns.get_mut(&id) {
            Some(campaign) => {
                campaign.read_count += 1;
                campaign.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn dashboard_totals(&self) -> Result<DashboardTotals> {
        let campaigns = self.inner.campaigns.lock().unwrap();
        let mut totals = DashboardTotals::default();
        for campaign in campaigns.values() {
            totals.total_sent += campaign.sent_count as i64;
            totals.total_delivered += campaign.delivered_count as i64;
            totals.total_read += campaign.read_count as i64;
            totals.total_failed += campaign.failed_count as i64;
        }
        Ok(totals)
    }
}

#[async_trait]
impl ContactListRepository for MemBackend {
    async fn create(&self, input: CreateContactList) -> Result<ContactList> {
        Ok(self.add_list(&input.name, input.contacts))
    }

    async fn get(&self, id: ContactListId) -> Result<Option<ContactList>> {
        if self.inner.failing_lists.lock().unwrap().contains(&id) {
            return Err(Error::Database("contact list lookup failed".to_string()));
        }
        Ok(self.inner.lists.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, limit: i64) -> Result<Vec<ContactList>> {
        let mut lists: Vec<ContactList> =
            self.inner.lists.lock().unwrap().values().cloned().collect();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        lists.truncate(limit as usize);
        Ok(lists)
    }
}

#[async_trait]
impl OutboundMessageRepository for MemBackend {
    async fn create(&self, input: CreateOutboundMessage) -> Result<OutboundMessage> {
        let mut messages = self.inner.messages.lock().unwrap();
        if messages
            .iter()
            .any(|m| m.provider_message_id == input.provider_message_id)
        {
            return Err(Error::Database("duplicate provider message id".to_string()));
        }

        let now = Utc::now();
        let message = OutboundMessage {
            id: Uuid::now_v7(),
            campaign_id: input.campaign_id,
            provider_message_id: input.provider_message_id,
            recipient: input.recipient,
            status: input.status.to_string(),
            sent_at: now,
            updated_at: now,
        };
        messages.push(message.clone());
        Ok(message)
    }

    async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<OutboundMessage>> {
        Ok(self
            .inner
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.provider_message_id == provider_id)
            .cloned())
    }

    async fn set_status(&self, id: OutboundMessageId, status: MessageStatus) -> Result<()> {
        let mut messages = self.inner.messages.lock().unwrap();
        if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
            message.status = status.to_string();
            message.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_by_campaign(
        &self,
        campaign_id: CampaignId,
        limit: i64,
    ) -> Result<Vec<OutboundMessage>> {
        let mut messages = self.messages_for(campaign_id);
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn status_counts(&self, campaign_id: CampaignId) -> Result<CampaignMessageCounts> {
        let mut counts = CampaignMessageCounts::default();
        for message in self.messages_for(campaign_id) {
            match message.status.as_str() {
                "pending" => counts.pending += 1,
                "sent" => counts.sent += 1,
                "delivered" => counts.delivered += 1,
                "read" => counts.read += 1,
                "failed" => counts.failed += 1,
                _ => {}
            }
        }
        Ok(counts)
    }
}

/// One send the fake gateway accepted
#[derive(Debug, Clone)]
pub(crate) struct SentRecord {
    pub to: String,
    pub content: String,
    pub media_url: Option<String>,
    #[allow(dead_code)]
    pub provider_id: String,
}

/// Scripted gateway: configurable status, per-address failures, send log
pub(crate) struct FakeGateway {
    status: Mutex<SessionStatus>,
    failing: Mutex<HashSet<String>>,
    sent: Mutex<Vec<SentRecord>>,
    next_id: AtomicU64,
}

impl FakeGateway {
    pub fn with_status(status: SessionStatus) -> Self {
        Self {
            status: Mutex::new(status),
            failing: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn connected() -> Self {
        Self::with_status(SessionStatus::Connected)
    }

    /// Reject sends to this address
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn sent_log(&self) -> Vec<SentRecord> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WaGateway for FakeGateway {
    async fn status(&self) -> SessionStatus {
        *self.status.lock().unwrap()
    }

    async fn send_message(
        &self,
        to: &ChatAddress,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<SendReceipt> {
        if self.failing.lock().unwrap().contains(to.as_str()) {
            return Err(Error::Gateway("rejected by fake gateway".to_string()));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let provider_id = format!("wa:fake:{}", n);
        self.sent.lock().unwrap().push(SentRecord {
            to: to.as_str().to_string(),
            content: content.to_string(),
            media_url: media_url.map(str::to_string),
            provider_id: provider_id.clone(),
        });

        Ok(SendReceipt {
            provider_message_id: Some(provider_id),
        })
    }

    async fn groups(&self) -> Result<Vec<GroupInfo>> {
        Ok(Vec::new())
    }
}

pub(crate) fn recipients_for(phones: &[&str]) -> Vec<Recipient> {
    phones
        .iter()
        .map(|p| Recipient {
            address: ChatAddress::normalize(p),
            is_group: false,
        })
        .collect()
}

pub(crate) fn outcome_sent(phone: &str, provider_id: Option<&str>) -> DispatchOutcome {
    DispatchOutcome {
        recipient: Recipient {
            address: ChatAddress::normalize(phone),
            is_group: false,
        },
        result: DispatchResult::Sent {
            provider_message_id: provider_id.map(str::to_string),
        },
    }
}

pub(crate) fn outcome_failed(phone: &str) -> DispatchOutcome {
    DispatchOutcome {
        recipient: Recipient {
            address: ChatAddress::normalize(phone),
            is_group: false,
        },
        result: DispatchResult::Failed {
            error: "rejected by fake gateway".to_string(),
        },
    }
}

/// Scheduler wired to the in-memory backend with a zero-width pacing window
pub(crate) fn engine(backend: &MemBackend, gateway: Arc<FakeGateway>) -> CampaignScheduler {
    let config = SchedulerConfig {
        tick_secs: 60,
        lookahead_secs: 60,
        pace_min_ms: 0,
        pace_max_ms: 0,
        send_timeout_secs: 1,
        stall_after_secs: 900,
    };

    let gateway: Arc<dyn WaGateway> = gateway;
    CampaignScheduler::new(
        Arc::new(backend.clone()),
        RecipientResolver::new(Arc::new(backend.clone())),
        DispatchPacer::new(
            gateway.clone(),
            PacingWindow::from_millis(0, 0),
            Duration::from_secs(1),
        ),
        MessageLedger::new(Arc::new(backend.clone())),
        gateway,
        &config,
    )
}
