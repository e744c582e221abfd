//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// JWT secret used when none is configured. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "unistream-dev-secret";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL URL. When unset the service runs on the in-memory store.
    pub database_url: Option<String>,

    /// Maximum pooled database connections (default: 10).
    pub database_max_connections: u32,

    /// HS256 secret for session tokens.
    pub jwt_secret: String,

    /// Session token lifetime in seconds (default: 7 days).
    pub token_ttl_seconds: i64,

    /// Shared secret for the payment gateway callback signature (optional).
    pub payment_webhook_secret: Option<String>,

    /// Whether `POST /v1/payments/complete` may complete checkouts without
    /// the gateway (default: false).
    pub allow_simulated_payments: bool,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Minimum seconds between two XP-earning chat messages of one user.
    pub chat_xp_cooldown_seconds: u64,
}

/// Secrets file structure.
#[derive(Debug, Default, Deserialize)]
struct Secrets {
    #[serde(default)]
    jwt_secret: Option<String>,
    #[serde(default)]
    payment_webhook_secret: Option<String>,
    #[serde(default)]
    database_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and the secrets file.
    #[must_use]
    pub fn from_env() -> Self {
        let secrets = load_secrets();

        let jwt_secret = secrets
            .jwt_secret
            .or_else(|| std::env::var("JWT_SECRET").ok())
            .unwrap_or_else(|| {
                tracing::warn!("JWT_SECRET not configured - using the development secret");
                DEV_JWT_SECRET.into()
            });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: secrets
                .database_url
                .or_else(|| std::env::var("DATABASE_URL").ok()),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            jwt_secret,
            token_ttl_seconds: env_parse("TOKEN_TTL_SECONDS").unwrap_or(7 * 24 * 3600),
            payment_webhook_secret: secrets
                .payment_webhook_secret
                .or_else(|| std::env::var("PAYMENT_WEBHOOK_SECRET").ok()),
            allow_simulated_payments: std::env::var("ALLOW_SIMULATED_PAYMENTS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
            chat_xp_cooldown_seconds: env_parse("CHAT_XP_COOLDOWN_SECONDS").unwrap_or(5),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Load secrets from the first secrets file found, or empty secrets.
fn load_secrets() -> Secrets {
    let secret_paths = [
        ".secrets/unistream.json",
        "unistream/.secrets/unistream.json",
        "../.secrets/unistream.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<Secrets>(path) {
            tracing::info!(path = %path, "Loaded secrets from file");
            return secrets;
        }
    }

    tracing::debug!("Secrets file not found, using environment variables");
    Secrets::default()
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            database_max_connections: 10,
            jwt_secret: DEV_JWT_SECRET.into(),
            token_ttl_seconds: 7 * 24 * 3600,
            payment_webhook_secret: None,
            allow_simulated_payments: false,
            frontend_url: "http://localhost:5173".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            chat_xp_cooldown_seconds: 5,
        }
    }
}
