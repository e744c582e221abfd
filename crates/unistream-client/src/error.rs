//! Client error types.

/// Errors that can occur when using the unistream client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Not enough coins for a gift.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current coin balance.
        balance: i64,
        /// Required coins.
        required: i64,
    },

    /// Not enough points to redeem.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Current point balance.
        balance: i64,
        /// Required points.
        required: i64,
    },

    /// Missing, invalid or expired session token.
    #[error("unauthorized")]
    Unauthorized,

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The call needs a session token and the client has none.
    #[error("no session token configured")]
    MissingToken,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
