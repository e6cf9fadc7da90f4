//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use zapcast_common::types::{CampaignId, ContactListId, OutboundMessageId};

/// Campaign status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Running => write!(f, "running"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "running" => Ok(CampaignStatus::Running),
            "completed" => Ok(CampaignStatus::Completed),
            "failed" => Ok(CampaignStatus::Failed),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Campaign target kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    List,
    Group,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::List => write!(f, "list"),
            TargetType::Group => write!(f, "group"),
        }
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(TargetType::List),
            "group" => Ok(TargetType::Group),
            _ => Err(format!("Invalid target type: {}", s)),
        }
    }
}

/// Campaign model
///
/// `target_name` and `target_count` are display snapshots taken at creation
/// time; they are never re-validated against the live target. `schedules`
/// holds one timestamp per remaining send occurrence, in no particular order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub status: String,
    pub message_content: String,
    pub media_url: Option<String>,
    pub target_type: String,
    pub target_id: String,
    pub target_name: Option<String>,
    pub target_count: i32,
    pub schedules: Vec<DateTime<Utc>>,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub read_count: i32,
    pub failed_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }

    /// Get target type enum
    pub fn target_type_enum(&self) -> Option<TargetType> {
        self.target_type.parse().ok()
    }
}

/// Create campaign input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub name: String,
    pub message_content: String,
    pub media_url: Option<String>,
    pub target_type: TargetType,
    pub target_id: String,
    pub target_name: Option<String>,
    pub target_count: Option<i32>,
    #[serde(default)]
    pub schedules: Vec<DateTime<Utc>>,
    pub status: Option<CampaignStatus>,
}

/// A single contact inside a contact list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub name: Option<String>,
}

/// Contact list model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactList {
    pub id: ContactListId,
    pub name: String,
    pub contacts: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactList {
    /// Get contacts as a vector
    pub fn contacts_vec(&self) -> Vec<Contact> {
        serde_json::from_value(self.contacts.clone()).unwrap_or_default()
    }
}

/// Create contact list input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContactList {
    pub name: String,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// Outbound message status
///
/// The success chain is strictly ordered `pending < sent < delivered < read`;
/// `failed` is terminal and reachable only before a delivery was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    fn success_rank(self) -> Option<u8> {
        match self {
            MessageStatus::Pending => Some(0),
            MessageStatus::Sent => Some(1),
            MessageStatus::Delivered => Some(2),
            MessageStatus::Read => Some(3),
            MessageStatus::Failed => None,
        }
    }

    /// Whether a transition from `self` to `next` moves forward.
    ///
    /// Superseded and duplicate transitions return false and are ignored by
    /// callers rather than treated as errors.
    pub fn accepts(self, next: MessageStatus) -> bool {
        match (self.success_rank(), next.success_rank()) {
            // failed is sticky
            (None, _) => false,
            (Some(current), Some(target)) => target > current,
            // failure cannot supersede a confirmed delivery
            (Some(current), None) => current <= 1,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Delivered => write!(f, "delivered"),
            MessageStatus::Read => write!(f, "read"),
            MessageStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MessageStatus::Pending),
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            "failed" => Ok(MessageStatus::Failed),
            _ => Err(format!("Invalid message status: {}", s)),
        }
    }
}

/// Outbound message model (one ledger entry per send attempt)
///
/// `campaign_id` is a weak reference: entries outlive a deleted campaign.
/// `provider_message_id` is the reconciliation join key and is always
/// populated, with a synthetic value when the provider never issued one.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: OutboundMessageId,
    pub campaign_id: CampaignId,
    pub provider_message_id: String,
    pub recipient: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboundMessage {
    /// Get status enum
    pub fn status_enum(&self) -> Option<MessageStatus> {
        self.status.parse().ok()
    }
}

/// Create outbound message input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOutboundMessage {
    pub campaign_id: CampaignId,
    pub provider_message_id: String,
    pub recipient: String,
    pub status: MessageStatus,
}

/// Per-campaign message status counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignMessageCounts {
    pub pending: i64,
    pub sent: i64,
    pub delivered: i64,
    pub read: i64,
    pub failed: i64,
}

/// Aggregate counters across all campaigns, for the dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardTotals {
    pub total_sent: i64,
    pub total_delivered: i64,
    pub total_read: i64,
    pub total_failed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_status_roundtrip() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Scheduled,
            CampaignStatus::Running,
            CampaignStatus::Completed,
            CampaignStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<CampaignStatus>(), Ok(status));
        }
        assert!("paused".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn test_message_status_forward_only() {
        use MessageStatus::*;

        assert!(Pending.accepts(Sent));
        assert!(Pending.accepts(Delivered));
        assert!(Sent.accepts(Delivered));
        assert!(Delivered.accepts(Read));

        // duplicates and regressions are rejected
        assert!(!Sent.accepts(Sent));
        assert!(!Delivered.accepts(Sent));
        assert!(!Read.accepts(Delivered));
    }

    #[test]
    fn test_failed_is_terminal() {
        use MessageStatus::*;

        assert!(Pending.accepts(Failed));
        assert!(Sent.accepts(Failed));
        assert!(!Delivered.accepts(Failed));
        assert!(!Read.accepts(Failed));

        assert!(!Failed.accepts(Sent));
        assert!(!Failed.accepts(Delivered));
        assert!(!Failed.accepts(Read));
        assert!(!Failed.accepts(Failed));
    }

    #[test]
    fn test_contacts_vec() {
        let list = ContactList {
            id: uuid::Uuid::new_v4(),
            name: "VIP".to_string(),
            contacts: serde_json::json!([
                {"phone": "5511999999999", "name": "Ana"},
                {"phone": "5511888888888", "name": null}
            ]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let contacts = list.contacts_vec();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].phone, "5511999999999");
        assert_eq!(contacts[0].name.as_deref(), Some("Ana"));
        assert!(contacts[1].name.is_none());
    }

    #[test]
    fn test_contacts_vec_malformed_defaults_empty() {
        let list = ContactList {
            id: uuid::Uuid::new_v4(),
            name: "broken".to_string(),
            contacts: serde_json::json!({"not": "an array"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(list.contacts_vec().is_empty());
    }
}
