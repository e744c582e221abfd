//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use unistream_core::EconomyError;
use unistream_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but not allowed to act on the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The resource is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Not enough coins.
    #[error("insufficient coins: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current coin balance.
        balance: i64,
        /// Required coins.
        required: i64,
    },

    /// Not enough points.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Current point balance.
        balance: i64,
        /// Required points.
        required: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InvalidState(msg) => (StatusCode::CONFLICT, "invalid_state", msg.clone(), None),
            Self::InsufficientFunds { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::InsufficientPoints { balance, required } => (
                StatusCode::BAD_REQUEST,
                "insufficient_points",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EconomyError> for ApiError {
    fn from(err: EconomyError) -> Self {
        match err {
            EconomyError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            EconomyError::UserNotFound(id) => Self::NotFound(format!("user not found: {id}")),
            EconomyError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            EconomyError::InsufficientPoints { balance, required } => {
                Self::InsufficientPoints { balance, required }
            }
            EconomyError::InvalidState(msg) => Self::InvalidState(msg),
            EconomyError::InvalidInput(msg) => Self::BadRequest(msg),
            EconomyError::InvalidId(e) => Self::BadRequest(e.to_string()),
            EconomyError::Forbidden(msg) => Self::Forbidden(msg),
            EconomyError::Conflict(msg) => Self::Conflict(msg),
            EconomyError::Infrastructure(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        EconomyError::from(err).into()
    }
}
