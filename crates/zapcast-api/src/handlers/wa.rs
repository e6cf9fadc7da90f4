//! WhatsApp gateway handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use zapcast_common::types::ChatAddress;
use zapcast_core::{AckEvent, AckLevel, GroupInfo, SessionStatus};

use super::{error_response, ErrorResponse};
use crate::state::AppState;

/// Session status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: SessionStatus,
}

/// GET /api/wa/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.gateway.status().await,
    })
}

/// GET /api/wa/groups
pub async fn groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GroupInfo>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .gateway
        .groups()
        .await
        .map(Json)
        .map_err(error_response)
}

/// Manual send request
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub content: String,
    pub media_url: Option<String>,
}

/// Manual send response
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub provider_message_id: Option<String>,
}

/// POST /api/wa/send
pub async fn send(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let address = ChatAddress::normalize(&request.to);

    let receipt = state
        .gateway
        .send_message(&address, &request.content, request.media_url.as_deref())
        .await
        .map_err(error_response)?;

    Ok(Json(SendResponse {
        provider_message_id: receipt.provider_message_id,
    }))
}

/// Acknowledgement webhook payload from the bridge
#[derive(Debug, Deserialize)]
pub struct AckWebhook {
    pub provider_message_id: String,
    pub ack: i32,
}

/// POST /api/wa/ack
///
/// The bridge forwards every provider `message_ack` here; codes outside the
/// sent/delivered/read range carry no transition and are dropped.
pub async fn ack(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<AckWebhook>,
) -> StatusCode {
    match AckLevel::from_code(webhook.ack) {
        Some(level) => {
            state.acks.publish(AckEvent {
                provider_message_id: webhook.provider_message_id,
                level,
            });
            StatusCode::ACCEPTED
        }
        None => {
            debug!(
                provider_id = %webhook.provider_message_id,
                code = webhook.ack,
                "Ignoring ack code without a delivery transition"
            );
            StatusCode::ACCEPTED
        }
    }
}
