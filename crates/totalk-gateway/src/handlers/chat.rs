//! Chat room handler
//!
//! Every text frame is one chat line: it is flattened, persisted and then
//! broadcast to the room. A line that fails to persist is not broadcast.

use super::{HandlerError, HandlerResult, InboundHandler};
use crate::connection::{Hub, SessionShared};
use crate::protocol::Envelope;
use async_trait::async_trait;
use std::sync::Arc;
use totalk_core::{ChatMessage, MessageRepository};

pub struct ChatHandler {
    chat_id: String,
    room: Arc<Hub>,
    messages: Arc<dyn MessageRepository>,
}

impl ChatHandler {
    pub fn new(chat_id: impl Into<String>, room: Arc<Hub>, messages: Arc<dyn MessageRepository>) -> Self {
        Self {
            chat_id: chat_id.into(),
            room,
            messages,
        }
    }
}

#[async_trait]
impl InboundHandler for ChatHandler {
    async fn handle(&self, session: &SessionShared, text: &str) -> HandlerResult<()> {
        let content = ChatMessage::normalize(text)
            .ok_or_else(|| HandlerError::InvalidFrame("empty chat message".to_string()))?;

        let sender = session.user_id().unwrap_or(session.id());
        let message = ChatMessage::new(self.chat_id.clone(), sender, content);
        self.messages.save_message(&message).await?;

        let report = self.room.broadcast(Envelope::chat_message(&message).to_bytes());
        tracing::trace!(
            chat_id = %self.chat_id,
            message_id = %message.id,
            delivered = report.delivered,
            "Chat message broadcast"
        );
        Ok(())
    }
}
