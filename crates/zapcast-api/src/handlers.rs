//! Request handlers

pub mod campaigns;
pub mod contact_lists;
pub mod dashboard;
pub mod health;
pub mod scheduler;
pub mod wa;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use zapcast_common::Error;

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Map an engine error onto an HTTP response
pub fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.code().to_string(),
            message: err.to_string(),
        }),
    )
}

/// 404 response for a named resource
pub fn not_found(what: &str) -> (StatusCode, Json<ErrorResponse>) {
    error_response(Error::NotFound(what.to_string()))
}
