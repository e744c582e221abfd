//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    auth, gifts, health, messages, payments, store, streamer, streams, subscriptions, users,
    webhooks,
};
use crate::state::AppState;
use crate::ws;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for gift sending, the busiest write path
/// during a popular stream.
const GIFT_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/auth/register`, `POST /v1/auth/verify`, `POST /v1/auth/login` - Sessions
/// - `GET /v1/users/:id/public` - Public profile
/// - `GET /v1/store/gifts`, `GET /v1/store/packs` - Catalog
/// - `GET /v1/streams/live` - Live directory
/// - `GET /v1/messages` - Chat history
/// - `GET /ws` - Realtime events and chat
///
/// ## Authenticated (Bearer JWT)
/// - `GET/PUT/DELETE /v1/users/me` - Own account
/// - `GET /v1/users/me/community-progress` - Level per streamer
/// - `GET /v1/users/me/transactions` - Ledger history
/// - `POST /v1/gifts/send` - Send a gift (own concurrency limit)
/// - `POST /v1/store/redeem` - Points to coins
/// - `POST /v1/payments/checkout`, `POST /v1/payments/complete` - Payments
/// - `POST /v1/streams/start`, `POST /v1/streams/stop` - Live sessions
/// - `/v1/streamer/*` - Threshold, goodbye message and gift panel
/// - `GET/DELETE /v1/subscriptions/:streamer_id` - Subscriptions
///
/// ## Webhooks (Signature verification)
/// - `POST /webhooks/payments` - Payment gateway callback
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let gift_routes = Router::new()
        .route("/send", post(gifts::send_gift))
        .layer(ConcurrencyLimitLayer::new(GIFT_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", post(auth::verify))
        // Users
        .route(
            "/users/me",
            get(users::get_me)
                .put(users::update_me)
                .delete(users::delete_me),
        )
        .route(
            "/users/me/community-progress",
            get(users::get_community_progress),
        )
        .route("/users/me/transactions", get(users::list_transactions))
        .route("/users/:id/public", get(users::public_profile))
        // Shop
        .route("/store/gifts", get(store::list_gifts))
        .route("/store/packs", get(store::list_packs))
        .route("/store/redeem", post(store::redeem))
        // Payments
        .route("/payments/checkout", post(payments::checkout))
        .route("/payments/complete", post(payments::complete))
        // Live sessions
        .route("/streams/start", post(streams::start_stream))
        .route("/streams/stop", post(streams::stop_stream))
        .route("/streams/live", get(streams::live_streams))
        // Streamer settings
        .route("/streamer/settings", patch(streamer::update_settings))
        .route("/streamer/goodbye-message", put(streamer::set_goodbye_message))
        .route(
            "/streamer/gifts",
            get(streamer::gift_panel).post(streamer::create_gift),
        )
        .route("/streamer/gifts/:id", delete(streamer::delete_gift))
        .route("/streamer/gifts/:id/toggle", post(streamer::toggle_gift))
        // Subscriptions
        .route(
            "/subscriptions/:streamer_id",
            get(subscriptions::get_subscription).delete(subscriptions::unsubscribe),
        )
        // Chat history
        .route("/messages", get(messages::list_messages))
        // Gifts (with their own concurrency limit)
        .nest("/gifts", gift_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Realtime
        .route("/ws", get(ws::ws_handler))
        // Webhooks (no rate limit - controlled by the gateway)
        .route("/webhooks/payments", post(webhooks::payment_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
