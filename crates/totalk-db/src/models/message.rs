//! Chat message database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use totalk_core::ChatMessage;

/// Database model for the messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageModel> for ChatMessage {
    fn from(model: MessageModel) -> Self {
        ChatMessage {
            id: model.id,
            chat_id: model.chat_id,
            sender_id: model.sender_id,
            content: model.content,
            created_at: model.created_at,
        }
    }
}
