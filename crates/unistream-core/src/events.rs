//! Realtime events pushed to connected clients.
//!
//! Events serialize as `{"event": "<name>", "payload": {...}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A state-change notification for subscribed clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// A streamer went live.
    StreamStarted {
        /// The streamer.
        streamer_id: UserId,
        /// Streamer display name.
        name: String,
        /// Broadcast title.
        title: Option<String>,
        /// Broadcast category.
        category: Option<String>,
        /// Canonical server-side start time; viewers derive elapsed time from it.
        started_at: DateTime<Utc>,
    },

    /// A broadcast finished.
    StreamEnded {
        /// The streamer.
        streamer_id: UserId,
        /// Hours credited for the session.
        session_hours: f64,
        /// Cumulative broadcast hours.
        total_hours: f64,
    },

    /// A fan sent a gift on a channel.
    GiftAlert {
        /// The receiving streamer.
        streamer_id: UserId,
        /// Gift display name.
        gift_name: String,
        /// Gift emoji.
        gift_emoji: String,
        /// Sender display name.
        sender_name: String,
    },

    /// A chat line.
    ChatMessage {
        /// Room the line was posted in, if any.
        room_id: Option<String>,
        /// Author.
        user_id: UserId,
        /// Author display name.
        username: String,
        /// Message body.
        text: String,
        /// When it was posted.
        created_at: DateTime<Utc>,
    },
}

impl RealtimeEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StreamStarted { .. } => "stream_started",
            Self::StreamEnded { .. } => "stream_ended",
            Self::GiftAlert { .. } => "gift_alert",
            Self::ChatMessage { .. } => "chat_message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_is_tagged() {
        let streamer_id = UserId::generate();
        let event = RealtimeEvent::GiftAlert {
            streamer_id,
            gift_name: "Fuego".into(),
            gift_emoji: "🔥".into(),
            sender_name: "Ana".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "gift_alert");
        assert_eq!(json["payload"]["streamer_id"], streamer_id.to_string());
        assert_eq!(json["payload"]["sender_name"], "Ana");
        assert_eq!(event.name(), "gift_alert");
    }

    #[test]
    fn stream_ended_carries_hours() {
        let event = RealtimeEvent::StreamEnded {
            streamer_id: UserId::generate(),
            session_hours: 1.5,
            total_hours: 11.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stream_ended");
        assert_eq!(json["payload"]["session_hours"], 1.5);
    }
}
