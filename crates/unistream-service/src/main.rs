//! Unistream Service - HTTP and WebSocket API for the streaming economy
//!
//! This is the main entry point for the unistream service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unistream_service::{create_router, AppState, ServiceConfig};
use unistream_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,unistream=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Unistream Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        simulated_payments = %config.allow_simulated_payments,
        chat_xp_cooldown_seconds = %config.chat_xp_cooldown_seconds,
        "Service configuration loaded"
    );

    // Initialize the store
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL");
            let store = PgStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set - using the in-memory store, data is lost on exit");
            Arc::new(MemoryStore::with_defaults())
        }
    };

    // Build app state
    let state = AppState::new(store, config.clone());
    tracing::info!(
        webhooks_verified = %state.verifies_webhooks(),
        "Payment gateway callbacks configured"
    );

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
