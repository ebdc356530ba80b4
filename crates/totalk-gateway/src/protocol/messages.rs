//! Envelope format
//!
//! The hub treats payloads as opaque bytes; every frame the gateway produces
//! is one of these envelopes serialized to JSON.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use totalk_core::{ChatMessage, Notification};

/// Outbound message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type, e.g. `notification` or `chat.message`
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl Envelope {
    pub const NOTIFICATION: &'static str = "notification";
    pub const CHAT_MESSAGE: &'static str = "chat.message";
    pub const ERROR: &'static str = "error";
    pub const QUEUE_POSITION: &'static str = "queue.position";

    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Wrap a notification addressed to one user
    #[must_use]
    pub fn notification(notification: &Notification) -> Self {
        Self::new(
            Self::NOTIFICATION,
            serde_json::to_value(notification).unwrap_or_default(),
        )
    }

    /// Wrap a chat message for its room
    #[must_use]
    pub fn chat_message(message: &ChatMessage) -> Self {
        Self::new(
            Self::CHAT_MESSAGE,
            serde_json::to_value(message).unwrap_or_default(),
        )
    }

    /// Error reply to a client command
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(
            Self::ERROR,
            serde_json::json!({ "code": code, "message": message.into() }),
        )
    }

    /// Serialize into a hub payload
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(serde_json::to_vec(self).unwrap_or_default())
    }
}

/// Commands a client may send on the notification channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientCommand {
    #[serde(rename = "queue.join")]
    QueueJoin { resource_id: String },
    #[serde(rename = "queue.leave")]
    QueueLeave { resource_id: String },
    #[serde(rename = "queue.position")]
    QueuePosition { resource_id: String },
}

impl ClientCommand {
    /// Parse a text frame
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
