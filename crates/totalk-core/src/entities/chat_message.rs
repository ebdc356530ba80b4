//! Chat message entity - one line posted to a chat room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chat message entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message stamped with the current time
    pub fn new(chat_id: impl Into<String>, sender_id: impl Into<String>, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            content,
            created_at: Utc::now(),
        }
    }

    /// Flatten raw inbound text into a single trimmed line
    ///
    /// Returns `None` when nothing is left after trimming.
    pub fn normalize(raw: &str) -> Option<String> {
        let flattened = raw.replace(['\r', '\n'], " ");
        let trimmed = flattened.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
