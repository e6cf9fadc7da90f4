//! Campaign repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use zapcast_common::types::CampaignId;
use zapcast_common::{Error, Result};

use crate::models::{Campaign, CampaignStatus, CreateCampaign, DashboardTotals};

/// Campaign repository
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Create a new campaign with zeroed counters
    async fn create(&self, input: CreateCampaign) -> Result<Campaign>;

    /// Get a campaign by ID
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;

    /// List campaigns, newest first
    async fn list(&self, limit: i64) -> Result<Vec<Campaign>>;

    /// Delete a campaign; ledger entries are left in place
    async fn delete(&self, id: CampaignId) -> Result<bool>;

    /// Scheduled campaigns with at least one schedule entry at or before
    /// `horizon`
    async fn find_due(&self, horizon: DateTime<Utc>) -> Result<Vec<Campaign>>;

    /// Campaigns stuck in `running` that were last touched before `cutoff`
    async fn find_stalled(&self, cutoff: DateTime<Utc>) -> Result<Vec<Campaign>>;

    /// Update campaign status only
    async fn update_status(&self, id: CampaignId, status: CampaignStatus) -> Result<bool>;

    /// Persist the post-pass state: new status and the remaining schedules
    async fn finalize_pass(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        schedules: &[DateTime<Utc>],
    ) -> Result<()>;

    /// Atomically add to the send-time counters
    async fn add_send_counts(&self, id: CampaignId, sent: i32, failed: i32) -> Result<()>;

    /// Atomically increment `delivered_count`; false if the campaign is gone
    async fn increment_delivered(&self, id: CampaignId) -> Result<bool>;

    /// Atomically increment `read_count`; false if the campaign is gone
    async fn increment_read(&self, id: CampaignId) -> Result<bool>;

    /// Counter totals across all campaigns
    async fn dashboard_totals(&self) -> Result<DashboardTotals>;
}

/// PostgreSQL campaign repository implementation
#[derive(Clone)]
pub struct DbCampaignRepository {
    pool: PgPool,
}

impl DbCampaignRepository {
    /// Create a new repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for DbCampaignRepository {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let id = Uuid::new_v4();
        let status = input.status.unwrap_or(CampaignStatus::Draft);

        sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, name, status, message_content, media_url,
                target_type, target_id, target_name, target_count, schedules
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(status.to_string())
        .bind(&input.message_content)
        .bind(&input.media_url)
        .bind(input.target_type.to_string())
        .bind(&input.target_id)
        .bind(&input.target_name)
        .bind(input.target_count.unwrap_or(0))
        .bind(&input.schedules)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self, limit: i64) -> Result<Vec<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_due(&self, horizon: DateTime<Utc>) -> Result<Vec<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE status = 'scheduled'
              AND EXISTS (SELECT 1 FROM unnest(schedules) AS s WHERE s <= $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(horizon)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn find_stalled(&self, cutoff: DateTime<Utc>) -> Result<Vec<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE status = 'running' AND updated_at < $1
            ORDER BY updated_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update_status(&self, id: CampaignId, status: CampaignStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE campaigns SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn finalize_pass(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        schedules: &[DateTime<Utc>],
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE campaigns SET
                status = $2,
                schedules = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(schedules)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn add_send_counts(&self, id: CampaignId, sent: i32, failed: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE campaigns SET
                sent_count = sent_count + $2,
                failed_count = failed_count + $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(sent)
        .bind(failed)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn increment_delivered(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE campaigns SET delivered_count = delivered_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_read(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE campaigns SET read_count = read_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn dashboard_totals(&self) -> Result<DashboardTotals> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(sent_count), 0)::BIGINT,
                COALESCE(SUM(delivered_count), 0)::BIGINT,
                COALESCE(SUM(read_count), 0)::BIGINT,
                COALESCE(SUM(failed_count), 0)::BIGINT
            FROM campaigns
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(DashboardTotals {
            total_sent: row.0,
            total_delivered: row.1,
            total_read: row.2,
            total_failed: row.3,
        })
    }
}
