//! ZapCast API - REST API server
//!
//! This crate provides the REST surface over the campaign engine: campaign
//! and contact-list management, gateway passthrough, the acknowledgement
//! webhook, and the manual scheduler trigger.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
