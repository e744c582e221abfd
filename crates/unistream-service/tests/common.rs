//! Common test utilities for unistream integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::{Arc, Mutex};

use axum::http::HeaderValue;
use axum::Router;
use axum_test::TestServer;

use unistream_core::{Role, User, UserId};
use unistream_service::auth::issue_token;
use unistream_service::mailer::MailError;
use unistream_service::{create_router, AppState, Hub, Mailer, ServiceConfig};
use unistream_store::{MemoryStore, Store};

/// Webhook secret configured on the default harness.
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// A seeded account with a valid session token.
pub struct TestUser {
    /// The user ID.
    pub id: UserId,
    /// Bearer token.
    pub token: String,
}

impl TestUser {
    /// Value for the `authorization` header.
    pub fn bearer(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", self.token)).expect("valid header value")
    }
}

/// Mailer that keeps every confirmation token it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    /// Latest token mailed to `email`.
    pub fn token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .expect("mailer lock")
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }

    /// Number of messages sent.
    pub fn sent(&self) -> usize {
        self.sent.lock().expect("mailer lock").len()
    }
}

impl Mailer for RecordingMailer {
    fn send_verification(&self, to: &str, _name: &str, token: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push((to.to_string(), token.to_string()));
        Ok(())
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for seeding and inspection.
    pub store: Arc<MemoryStore>,
    /// The realtime hub, for observing published events.
    pub hub: Arc<Hub>,
    /// Captured account emails.
    pub mailer: Arc<RecordingMailer>,
    /// Service configuration in use.
    pub config: ServiceConfig,
}

impl TestHarness {
    /// Create a new test harness with a freshly seeded in-memory store.
    pub fn new() -> Self {
        Self::with_config(Self::default_config())
    }

    /// Configuration used by [`TestHarness::new`].
    pub fn default_config() -> ServiceConfig {
        ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-jwt-secret".into(),
            payment_webhook_secret: Some(WEBHOOK_SECRET.into()),
            allow_simulated_payments: true,
            chat_xp_cooldown_seconds: 0,
            ..ServiceConfig::default()
        }
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::with_defaults());
        let dyn_store: Arc<dyn Store> = store.clone();

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(dyn_store, config.clone()).with_mailer(mailer.clone());
        let hub = Arc::clone(&state.hub);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            hub,
            mailer,
            config,
        }
    }

    /// Seed a verified user with the given balances and issue a token for them.
    pub async fn user(&self, name: &str, role: Role, coins: i64, points: i64) -> TestUser {
        let mut user = User::new(
            format!("{}-{}@ulima.edu.pe", name.to_lowercase(), UserId::generate()),
            name,
            "not-a-real-hash",
            role,
        );
        user.is_verified = true;
        self.store.create_user(&user).await.expect("Failed to seed user");
        self.store
            .set_balances(&user.id, coins, points)
            .expect("Failed to set balances");

        let token = issue_token(&user.id, &self.config.jwt_secret, 3600).expect("token");
        TestUser { id: user.id, token }
    }

    /// Seed a fan.
    pub async fn fan(&self, coins: i64) -> TestUser {
        self.user("Fan", Role::Fan, coins, 0).await
    }

    /// Seed a streamer.
    pub async fn streamer(&self) -> TestUser {
        self.user("Gozu", Role::Streamer, 0, 0).await
    }

    /// Current state of a user.
    pub async fn reload(&self, id: &UserId) -> User {
        self.store
            .get_user(id)
            .await
            .expect("store error")
            .expect("user exists")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
