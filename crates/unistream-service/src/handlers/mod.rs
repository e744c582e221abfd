//! API handlers.

pub mod auth;
pub mod gifts;
pub mod health;
pub mod messages;
pub mod payments;
pub mod store;
pub mod streamer;
pub mod streams;
pub mod subscriptions;
pub mod users;
pub mod webhooks;

use unistream_core::{GiftId, UserId};

use crate::error::ApiError;

/// Parse a user id taken from the path.
pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid user id: {raw}")))
}

/// Parse a gift id taken from the path.
pub(crate) fn parse_gift_id(raw: &str) -> Result<GiftId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid gift id: {raw}")))
}
