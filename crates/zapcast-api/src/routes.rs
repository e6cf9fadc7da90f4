//! API routes

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{campaigns, contact_lists, dashboard, health, scheduler, wa};
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let campaign_routes = Router::new()
        .route("/", get(campaigns::list_campaigns))
        .route("/", post(campaigns::create_campaign))
        .route("/:campaign_id", get(campaigns::get_campaign))
        .route("/:campaign_id", delete(campaigns::delete_campaign))
        .route("/:campaign_id/messages", get(campaigns::list_campaign_messages))
        .route("/:campaign_id/stats", get(campaigns::campaign_stats));

    let contact_routes = Router::new()
        .route("/", get(contact_lists::list_contact_lists))
        .route("/", post(contact_lists::create_contact_list))
        .route("/:list_id", get(contact_lists::get_contact_list));

    let wa_routes = Router::new()
        .route("/status", get(wa::status))
        .route("/groups", get(wa::groups))
        .route("/send", post(wa::send))
        .route("/ack", post(wa::ack));

    let api_routes = Router::new()
        .nest("/campaigns", campaign_routes)
        .nest("/contacts", contact_routes)
        .nest("/wa", wa_routes)
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/scheduler/run", post(scheduler::run_tick));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
