//! Persisted chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MessageId, UserId};

/// Longest chat message accepted, in characters.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 500;

/// A chat line posted in a stream room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique id (ULID).
    pub id: MessageId,
    /// Room the message was posted in (the streamer's id for channel rooms).
    pub stream_id: Option<String>,
    /// Author.
    pub user_id: UserId,
    /// Message body.
    pub text: String,
    /// When the message was posted.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message posted now. The text is trimmed.
    #[must_use]
    pub fn new(stream_id: Option<String>, user_id: UserId, text: &str) -> Self {
        Self {
            id: MessageId::generate(),
            stream_id,
            user_id,
            text: text.trim().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Whether the body is non-empty and within the length limit.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.text.is_empty() && self.text.chars().count() <= MAX_CHAT_MESSAGE_CHARS
    }
}

/// A chat message joined with its author's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatHistoryEntry {
    /// The message.
    #[serde(flatten)]
    pub message: ChatMessage,
    /// The author's display name.
    pub username: String,
}
