//! Outbound message (ledger) repository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use zapcast_common::types::{CampaignId, OutboundMessageId};
use zapcast_common::{Error, Result};

use crate::models::{CampaignMessageCounts, CreateOutboundMessage, MessageStatus, OutboundMessage};

/// Outbound message repository
#[async_trait]
pub trait OutboundMessageRepository: Send + Sync {
    /// Append one ledger entry
    async fn create(&self, input: CreateOutboundMessage) -> Result<OutboundMessage>;

    /// Look up an entry by the provider-assigned message id
    async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<OutboundMessage>>;

    /// Overwrite an entry's status and touch `updated_at`
    async fn set_status(&self, id: OutboundMessageId, status: MessageStatus) -> Result<()>;

    /// List a campaign's entries, newest first
    async fn list_by_campaign(
        &self,
        campaign_id: CampaignId,
        limit: i64,
    ) -> Result<Vec<OutboundMessage>>;

    /// Count a campaign's entries per status
    async fn status_counts(&self, campaign_id: CampaignId) -> Result<CampaignMessageCounts>;
}

/// PostgreSQL outbound message repository implementation
#[derive(Clone)]
pub struct DbOutboundMessageRepository {
    pool: PgPool,
}

impl DbOutboundMessageRepository {
    /// Create a new repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboundMessageRepository for DbOutboundMessageRepository {
    async fn create(&self, input: CreateOutboundMessage) -> Result<OutboundMessage> {
        // v7 keeps ledger ids time-ordered
        let id = Uuid::now_v7();

        sqlx::query_as::<_, OutboundMessage>(
            r#"
            INSERT INTO wa_messages (id, campaign_id, provider_message_id, recipient, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.campaign_id)
        .bind(&input.provider_message_id)
        .bind(&input.recipient)
        .bind(input.status.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn find_by_provider_id(&self, provider_id: &str) -> Result<Option<OutboundMessage>> {
        sqlx::query_as::<_, OutboundMessage>(
            "SELECT * FROM wa_messages WHERE provider_message_id = $1",
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn set_status(&self, id: OutboundMessageId, status: MessageStatus) -> Result<()> {
        sqlx::query("UPDATE wa_messages SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_by_campaign(
        &self,
        campaign_id: CampaignId,
        limit: i64,
    ) -> Result<Vec<OutboundMessage>> {
        sqlx::query_as::<_, OutboundMessage>(
            r#"
            SELECT * FROM wa_messages
            WHERE campaign_id = $1
            ORDER BY sent_at DESC
            LIMIT $2
            "#,
        )
        .bind(campaign_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn status_counts(&self, campaign_id: CampaignId) -> Result<CampaignMessageCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)::BIGINT
            FROM wa_messages
            WHERE campaign_id = $1
            GROUP BY status
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        let mut counts = CampaignMessageCounts::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => counts.pending = count,
                "sent" => counts.sent = count,
                "delivered" => counts.delivered = count,
                "read" => counts.read = count,
                "failed" => counts.failed = count,
                _ => {}
            }
        }

        Ok(counts)
    }
}
