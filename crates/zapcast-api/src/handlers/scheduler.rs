//! Scheduler handlers

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;
use zapcast_core::TickSummary;

use super::{error_response, ErrorResponse};
use crate::state::AppState;

/// POST /api/scheduler/run
///
/// Operational trigger: runs one tick synchronously and reports what it did.
pub async fn run_tick(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TickSummary>, (StatusCode, Json<ErrorResponse>)> {
    let summary = state.scheduler.run_tick().await.map_err(error_response)?;

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        requeued = summary.requeued,
        "Manual scheduler tick"
    );

    Ok(Json(summary))
}
