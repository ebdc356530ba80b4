//! WebSocket handlers
//!
//! Upgrades a request into a session, registers it in the right hub and
//! serves it until it ends.

use crate::connection::{Hub, Session};
use crate::handlers::{ChatHandler, NotifyHandler};
use crate::protocol::Envelope;
use crate::server::response::ApiError;
use crate::server::GatewayState;
use axum::{
    extract::{ws::WebSocket, Path, Query, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use totalk_common::{AppError, KeyPolicy};

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub user_id: Option<String>,
}

impl ConnectParams {
    fn user_id(self) -> Option<String> {
        self.user_id.filter(|id| !id.trim().is_empty())
    }
}

/// Key a session is registered under
fn session_key(policy: KeyPolicy, user_id: Option<&str>, session_id: &str) -> String {
    match (policy, user_id) {
        (KeyPolicy::PerUser, Some(user_id)) => user_id.to_owned(),
        _ => session_id.to_owned(),
    }
}

/// Notification channel
///
/// GET /ws/notify?user_id=
pub async fn notify_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user_id = params
        .user_id()
        .ok_or_else(|| AppError::validation("user_id is required"))?;

    let max_size = state.config().session.max_message_size;
    Ok(ws
        .max_message_size(max_size)
        .on_upgrade(move |socket| serve_notify(state, socket, user_id))
        .into_response())
}

async fn serve_notify(state: GatewayState, socket: WebSocket, user_id: String) {
    let (session, handle) = Session::new(Some(user_id.clone()), &state.config().session);
    let key = session_key(
        state.config().hubs.notify_key_policy,
        Some(&user_id),
        session.id(),
    );

    let hub = Arc::clone(state.notify_hub());
    hub.register(key.clone(), handle);

    let handler = Arc::new(NotifyHandler::new(
        Arc::clone(&hub),
        key.clone(),
        Arc::clone(state.queues()),
    ));

    let (sink, stream) = socket.split();
    session.run(sink, stream, hub, key, handler).await;
}

/// Chat room channel
///
/// GET /ws/chat/{chat_id}?user_id=
pub async fn chat_handler(
    State(state): State<GatewayState>,
    Path(chat_id): Path<String>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_size = state.config().session.max_message_size;
    ws.max_message_size(max_size)
        .on_upgrade(move |socket| serve_chat(state, socket, chat_id, params.user_id()))
}

async fn serve_chat(state: GatewayState, socket: WebSocket, chat_id: String, user_id: Option<String>) {
    let (session, handle) = Session::new(user_id.clone(), &state.config().session);

    // Replay history into the buffer before the room can reach the session
    match state
        .messages()
        .load_history(&chat_id, state.config().hubs.history_limit)
        .await
    {
        Ok(history) => {
            for message in &history {
                if handle.try_send(Envelope::chat_message(message).to_bytes()).is_err() {
                    break;
                }
            }
        }
        Err(e) => {
            tracing::warn!(chat_id = %chat_id, error = %e, "Failed to load chat history");
        }
    }

    let key = session_key(
        state.config().hubs.chat_key_policy,
        user_id.as_deref(),
        session.id(),
    );
    let room: Arc<Hub> = state.rooms().register(&chat_id, key.clone(), handle);

    let handler = Arc::new(ChatHandler::new(
        chat_id.clone(),
        Arc::clone(&room),
        Arc::clone(state.messages()),
    ));

    let (sink, stream) = socket.split();
    session.run(sink, stream, room, key, handler).await;

    state.rooms().remove_if_empty(&chat_id);
}
