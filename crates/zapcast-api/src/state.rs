//! Shared application state

use std::sync::Arc;
use zapcast_core::{AckBus, CampaignScheduler, WaGateway};
use zapcast_storage::DatabasePool;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabasePool,
    pub gateway: Arc<dyn WaGateway>,
    pub scheduler: Arc<CampaignScheduler>,
    pub acks: AckBus,
}
