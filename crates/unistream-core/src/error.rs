//! Error types for the streaming economy.

use crate::ids::IdError;

/// Result type for economy operations.
pub type Result<T> = std::result::Result<T, EconomyError>;

/// Errors that can occur in economy, leveling and session operations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (`gift`, `transaction`, ...).
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The acting or targeted user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Not enough coins for the operation.
    #[error("insufficient coins: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Coin balance observed.
        balance: i64,
        /// Coins required.
        required: i64,
    },

    /// Not enough points for a redemption.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Point balance observed.
        balance: i64,
        /// Points required.
        required: i64,
    },

    /// The record is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed or out-of-range input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller may not act on the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The operation collides with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Storage or other infrastructure failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl EconomyError {
    /// Shorthand for a missing record.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
