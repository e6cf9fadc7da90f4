//! Contact list handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use zapcast_storage::models::{ContactList, CreateContactList};
use zapcast_storage::repository::{ContactListRepository, DbContactListRepository};

use super::campaigns::ListQuery;
use super::{error_response, not_found, ErrorResponse};
use crate::state::AppState;

fn lists_repo(state: &AppState) -> DbContactListRepository {
    DbContactListRepository::new(state.db_pool.pool().clone())
}

/// GET /api/contacts
pub async fn list_contact_lists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContactList>>, (StatusCode, Json<ErrorResponse>)> {
    lists_repo(&state)
        .list(query.limit)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/contacts
pub async fn create_contact_list(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateContactList>,
) -> Result<Json<ContactList>, (StatusCode, Json<ErrorResponse>)> {
    lists_repo(&state)
        .create(input)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /api/contacts/:id
pub async fn get_contact_list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactList>, (StatusCode, Json<ErrorResponse>)> {
    match lists_repo(&state).get(id).await {
        Ok(Some(list)) => Ok(Json(list)),
        Ok(None) => Err(not_found("Contact list")),
        Err(e) => Err(error_response(e)),
    }
}
