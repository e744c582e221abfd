//! Error types for unistream storage.

use unistream_core::EconomyError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Conditional coin debit matched no row.
    #[error("insufficient coins: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Coin balance at the time of the attempt.
        balance: i64,
        /// Coins required.
        required: i64,
    },

    /// Conditional point debit matched no row.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Point balance at the time of the attempt.
        balance: i64,
        /// Points required.
        required: i64,
    },

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Conflict(db.message().to_string());
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("migration failed: {err}"))
    }
}

impl From<StoreError> for EconomyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity: "user", id } => Self::UserNotFound(id),
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            StoreError::InsufficientPoints { balance, required } => {
                Self::InsufficientPoints { balance, required }
            }
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::InvalidState(msg) => Self::InvalidState(msg),
            StoreError::Database(msg) | StoreError::Corrupt(msg) => Self::Infrastructure(msg),
        }
    }
}
