//! Domain events - already-deserialized events handed to the realtime core
//!
//! Events arrive from the message bus, the HTTP facade, or a live session and
//! are routed either to a hub (fan-out) or to the queue manager (state change).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{ChatMessage, Notification};

/// All events the dispatcher knows how to route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Deliver to one user's notification session(s)
    Notification(Notification),
    /// Deliver to every notification session
    Broadcast { kind: String, payload: Value },
    /// Fan a chat message out to its room
    ChatMessage(ChatMessage),
    /// Mutate a resource's queue
    Queue(QueueCommand),
}

impl DomainEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::Broadcast { .. } => "broadcast",
            Self::ChatMessage(_) => "chat_message",
            Self::Queue(_) => "queue",
        }
    }
}

/// A queue operation addressed to one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCommand {
    pub resource_id: String,
    #[serde(flatten)]
    pub action: QueueAction,
}

/// Queue operations that can travel as events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum QueueAction {
    Join { user_id: String },
    Leave { user_id: String },
    Complete { user_id: String },
    ProcessNext,
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_queue_command() {
        let raw = json!({
            "type": "queue",
            "data": {"resource_id": "event-1", "action": "join", "user_id": "alice"}
        });

        let event: DomainEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event,
            DomainEvent::Queue(QueueCommand {
                resource_id: "event-1".into(),
                action: QueueAction::Join { user_id: "alice".into() },
            })
        );
        assert_eq!(event.name(), "queue");
    }

    #[test]
    fn test_parse_unit_action() {
        let raw = json!({
            "type": "queue",
            "data": {"resource_id": "event-1", "action": "process_next"}
        });

        let event: DomainEvent = serde_json::from_value(raw).unwrap();
        match event {
            DomainEvent::Queue(cmd) => assert_eq!(cmd.action, QueueAction::ProcessNext),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_broadcast() {
        let raw = json!({
            "type": "broadcast",
            "data": {"kind": "maintenance", "payload": {"at": "22:00"}}
        });

        let event: DomainEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.name(), "broadcast");
    }

    #[test]
    fn test_reject_unknown_type() {
        let raw = json!({"type": "telepathy", "data": {}});
        assert!(serde_json::from_value::<DomainEvent>(raw).is_err());
    }
}
