//! Unistream HTTP and WebSocket API service.
//!
//! This crate provides the HTTP API for the streaming platform, including:
//!
//! - Registration, login and profiles
//! - The coin shop, gift sending and point redemption
//! - Checkout and payment completion (gateway webhook or simulated)
//! - Live session start/stop and the live directory
//! - Community progress (a fan's level with every streamer they support)
//! - Realtime events and chat over WebSocket
//!
//! # Authentication
//!
//! End-user requests carry an HS256 JWT issued by `POST /v1/auth/login`
//! in the `Authorization: Bearer` header. The WebSocket endpoint takes the
//! same token as a `token` query parameter; anonymous sockets may listen but
//! not chat.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod crypto;
pub mod economy;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod notifier;
pub mod progress;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod ws;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use mailer::{LogMailer, Mailer};
pub use notifier::{Hub, Notifier};
pub use routes::create_router;
pub use state::AppState;
