//! ZapCast - Campaign server entry point

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zapcast_api::AppState;
use zapcast_common::config::{Config, LoggingConfig};
use zapcast_core::{
    AckBus, AckReconciler, CampaignScheduler, DispatchPacer, HttpBridgeGateway, MessageLedger,
    PacingWindow, RecipientResolver, WaGateway,
};
use zapcast_storage::repository::{
    CampaignRepository, ContactListRepository, DbCampaignRepository, DbContactListRepository,
    DbOutboundMessageRepository, OutboundMessageRepository,
};
use zapcast_storage::DatabasePool;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting ZapCast server...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;

    // Run migrations
    db_pool.migrate().await?;

    let pool = db_pool.pool().clone();
    let campaigns: Arc<dyn CampaignRepository> =
        Arc::new(DbCampaignRepository::new(pool.clone()));
    let contact_lists: Arc<dyn ContactListRepository> =
        Arc::new(DbContactListRepository::new(pool.clone()));
    let outbound: Arc<dyn OutboundMessageRepository> =
        Arc::new(DbOutboundMessageRepository::new(pool));

    // WhatsApp bridge gateway and the acknowledgement stream
    let gateway: Arc<dyn WaGateway> = Arc::new(HttpBridgeGateway::new(&config.wa)?);
    let acks = AckBus::default();

    // Assemble the campaign engine
    let pacing = PacingWindow::from_millis(
        config.scheduler.pace_min_ms,
        config.scheduler.pace_max_ms,
    );
    let pacer = DispatchPacer::new(
        gateway.clone(),
        pacing,
        Duration::from_secs(config.scheduler.send_timeout_secs),
    );
    let scheduler = Arc::new(CampaignScheduler::new(
        campaigns.clone(),
        RecipientResolver::new(contact_lists),
        pacer,
        MessageLedger::new(outbound.clone()),
        gateway.clone(),
        &config.scheduler,
    ));

    // Start the acknowledgement reconciler
    let reconciler_handle = {
        let reconciler = AckReconciler::new(MessageLedger::new(outbound), campaigns);
        let rx = acks.subscribe();
        tokio::spawn(async move {
            reconciler.run(rx).await;
        })
    };

    // Start the scheduler loop
    let scheduler_handle = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler.run().await;
        })
    };

    // Start the API server
    let api_handle = {
        let state = AppState {
            db_pool: db_pool.clone(),
            gateway,
            scheduler,
            acks,
        };
        let bind = format!("{}:{}", config.server.bind_address, config.api.port);
        tokio::spawn(async move {
            let app = zapcast_api::create_router(state);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .expect("Failed to bind API server");
            info!("Starting API server on {}", bind);
            if let Err(e) = axum::serve(listener, app).await {
                error!("API server error: {}", e);
            }
        })
    };

    info!("ZapCast server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    scheduler_handle.abort();
    reconciler_handle.abort();
    api_handle.abort();

    info!("ZapCast server shutdown complete");

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},zapcast=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
