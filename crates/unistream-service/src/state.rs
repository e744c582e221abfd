//! Application state.

use std::sync::Arc;
use std::time::Duration;

use unistream_store::Store;

use crate::config::ServiceConfig;
use crate::economy::ChatXpLimiter;
use crate::mailer::{LogMailer, Mailer};
use crate::notifier::{Hub, Notifier};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// WebSocket connection registry.
    pub hub: Arc<Hub>,

    /// Event publisher. Defaults to the hub.
    pub notifier: Arc<dyn Notifier>,

    /// Per-user throttle for chat XP.
    pub chat_xp: Arc<ChatXpLimiter>,

    /// Account email transport. Defaults to logging.
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let hub = Arc::new(Hub::new());
        let chat_xp = Arc::new(ChatXpLimiter::new(Duration::from_secs(
            config.chat_xp_cooldown_seconds,
        )));

        if config.allow_simulated_payments {
            tracing::warn!("Simulated payments enabled - checkouts can complete without the gateway");
        }
        if config.payment_webhook_secret.is_none() && config.allow_simulated_payments {
            tracing::warn!("Payment webhook secret not configured - unsigned callbacks accepted in simulated mode");
        } else if config.payment_webhook_secret.is_none() {
            tracing::warn!("Payment webhook secret not configured - gateway callbacks will be refused");
        }

        Self {
            mailer: Arc::new(LogMailer::new(config.frontend_url.clone())),
            store,
            config,
            notifier: hub.clone(),
            hub,
            chat_xp,
        }
    }

    /// Replace the account email transport.
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Check if the gateway callback is signature-checked.
    #[must_use]
    pub fn verifies_webhooks(&self) -> bool {
        self.config.payment_webhook_secret.is_some()
    }
}
