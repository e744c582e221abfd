//! WebSocket endpoint for realtime events and chat.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "join_room", "room_id": "<streamer id>"}
//! {"type": "leave_room", "room_id": "<streamer id>"}
//! {"type": "message", "room_id": "<streamer id>", "text": "hola"}
//! ```
//!
//! Server -> Client frames are [`RealtimeEvent`]s.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use unistream_core::{ChatMessage, RealtimeEvent, User};

use crate::auth::decode_token;
use crate::economy::award_chat_xp;
use crate::error::ApiError;
use crate::notifier::{dispatch_all, dispatch_to_room};
use crate::state::AppState;

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Session token. Sockets without one can listen but not chat.
    pub token: Option<String>,
}

/// A frame sent by the client.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    JoinRoom {
        room_id: String,
    },
    LeaveRoom {
        room_id: String,
    },
    Message {
        #[serde(default)]
        room_id: Option<String>,
        text: String,
    },
}

/// `GET /ws` - upgrade to a WebSocket.
///
/// A present but invalid token is rejected before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let user = match params.token.as_deref() {
        Some(token) => {
            let user_id = decode_token(token, &state.config.jwt_secret)?;
            let user = state
                .store
                .get_user(&user_id)
                .await?
                .ok_or(ApiError::Unauthorized)?;
            Some(user)
        }
        None => None,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: Option<User>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (conn_id, mut rx) = state.hub.register();

    // Forward hub frames to the socket.
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let frame: ClientFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::debug!(connection_id = %conn_id, error = %e, "Invalid WebSocket frame");
                        continue;
                    }
                };
                match frame {
                    ClientFrame::JoinRoom { room_id } => {
                        state.hub.join(&conn_id, &room_id);
                    }
                    ClientFrame::LeaveRoom { room_id } => {
                        state.hub.leave(&conn_id, &room_id);
                    }
                    ClientFrame::Message { room_id, text } => match &user {
                        Some(user) => post_chat(&state, user, room_id, &text).await,
                        None => {
                            tracing::debug!(connection_id = %conn_id, "Anonymous socket tried to chat");
                        }
                    },
                }
            }
            Message::Close(_) => break,
            _ => {} // Ignore binary, ping (handled by tungstenite layer)
        }
    }

    // Cleanup.
    state.hub.unregister(&conn_id);
    sender_task.abort();
}

/// Persist a chat line, publish it and award chat XP in the background.
async fn post_chat(state: &Arc<AppState>, user: &User, room_id: Option<String>, text: &str) {
    let message = ChatMessage::new(room_id, user.id, text);
    if !message.is_valid() {
        tracing::debug!(user_id = %user.id, "Rejected empty or oversized chat message");
        return;
    }

    if let Err(e) = state.store.insert_message(&message).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to persist chat message");
        return;
    }

    let event = RealtimeEvent::ChatMessage {
        room_id: message.stream_id.clone(),
        user_id: user.id,
        username: user.name.clone(),
        text: message.text.clone(),
        created_at: message.created_at,
    };
    match message.stream_id.as_deref() {
        Some(room) => dispatch_to_room(state.notifier.as_ref(), room, &event),
        None => dispatch_all(state.notifier.as_ref(), &event),
    }

    let state = Arc::clone(state);
    let user_id = user.id;
    tokio::spawn(async move {
        match award_chat_xp(state.store.as_ref(), &state.chat_xp, &user_id).await {
            Ok(Some(points)) => tracing::trace!(user_id = %user_id, points, "Chat XP awarded"),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Failed to award chat XP"),
        }
    });
}
