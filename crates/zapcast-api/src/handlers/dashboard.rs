//! Dashboard handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use zapcast_storage::models::Campaign;
use zapcast_storage::repository::{CampaignRepository, DbCampaignRepository};

use super::{error_response, ErrorResponse};
use crate::state::AppState;

/// One campaign's bar in the dashboard chart
#[derive(Debug, Serialize)]
pub struct ChartPoint {
    pub name: String,
    pub sent: i32,
    pub failed: i32,
}

/// Aggregate dashboard payload
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_sent: i64,
    pub total_delivered: i64,
    pub total_read: i64,
    pub total_failed: i64,
    pub recent_activity: Vec<Campaign>,
    pub chart_data: Vec<ChartPoint>,
}

/// GET /api/dashboard/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, (StatusCode, Json<ErrorResponse>)> {
    let repo = DbCampaignRepository::new(state.db_pool.pool().clone());

    let totals = repo.dashboard_totals().await.map_err(error_response)?;
    let recent = repo.list(5).await.map_err(error_response)?;

    // oldest first so the chart reads left to right
    let chart_data = recent
        .iter()
        .rev()
        .map(|c| ChartPoint {
            name: c.name.chars().take(15).collect(),
            sent: c.sent_count,
            failed: c.failed_count,
        })
        .collect();

    Ok(Json(DashboardStats {
        total_sent: totals.total_sent,
        total_delivered: totals.total_delivered,
        total_read: totals.total_read,
        total_failed: totals.total_failed,
        recent_activity: recent,
        chart_data,
    }))
}
