//! Campaign handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use zapcast_common::Error;
use zapcast_storage::models::{
    Campaign, CampaignMessageCounts, CampaignStatus, CreateCampaign, OutboundMessage,
};
use zapcast_storage::repository::{
    CampaignRepository, DbCampaignRepository, DbOutboundMessageRepository,
    OutboundMessageRepository,
};

use super::{error_response, not_found, ErrorResponse};
use crate::state::AppState;

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

fn campaigns_repo(state: &AppState) -> DbCampaignRepository {
    DbCampaignRepository::new(state.db_pool.pool().clone())
}

fn messages_repo(state: &AppState) -> DbOutboundMessageRepository {
    DbOutboundMessageRepository::new(state.db_pool.pool().clone())
}

/// GET /api/campaigns
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Campaign>>, (StatusCode, Json<ErrorResponse>)> {
    campaigns_repo(&state)
        .list(query.limit)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCampaign>,
) -> Result<Json<Campaign>, (StatusCode, Json<ErrorResponse>)> {
    // a scheduled campaign must carry at least one send occurrence
    if input.status == Some(CampaignStatus::Scheduled) && input.schedules.is_empty() {
        return Err(error_response(Error::Validation(
            "Scheduled campaigns must include at least one schedule entry".to_string(),
        )));
    }

    campaigns_repo(&state)
        .create(input)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /api/campaigns/:id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, (StatusCode, Json<ErrorResponse>)> {
    match campaigns_repo(&state).get(id).await {
        Ok(Some(campaign)) => Ok(Json(campaign)),
        Ok(None) => Err(not_found("Campaign")),
        Err(e) => Err(error_response(e)),
    }
}

/// DELETE /api/campaigns/:id
pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    match campaigns_repo(&state).delete(id).await {
        Ok(true) => Ok(Json(serde_json::json!({ "success": true }))),
        Ok(false) => Err(not_found("Campaign")),
        Err(e) => Err(error_response(e)),
    }
}

/// GET /api/campaigns/:id/messages
pub async fn list_campaign_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OutboundMessage>>, (StatusCode, Json<ErrorResponse>)> {
    messages_repo(&state)
        .list_by_campaign(id, query.limit)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /api/campaigns/:id/stats
pub async fn campaign_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignMessageCounts>, (StatusCode, Json<ErrorResponse>)> {
    messages_repo(&state)
        .status_counts(id)
        .await
        .map(Json)
        .map_err(error_response)
}
