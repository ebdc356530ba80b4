//! Request DTOs for API endpoints

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

/// Join a resource's queue
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JoinQueueRequest {
    #[validate(length(min = 1, max = 64, message = "user_id must be 1-64 characters"))]
    pub user_id: String,
}

/// Publish a notification to one user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PublishNotificationRequest {
    #[validate(length(min = 1, max = 64, message = "user_id must be 1-64 characters"))]
    pub user_id: String,

    #[validate(length(min = 1, max = 64, message = "kind must be 1-64 characters"))]
    pub kind: String,

    #[serde(default)]
    pub payload: Value,

    /// Deliver at this time instead of right away
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_request_validation() {
        let ok: JoinQueueRequest = serde_json::from_value(json!({"user_id": "alice"})).unwrap();
        assert!(ok.validate().is_ok());

        let empty: JoinQueueRequest = serde_json::from_value(json!({"user_id": ""})).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_notification_payload_defaults_to_null() {
        let req: PublishNotificationRequest =
            serde_json::from_value(json!({"user_id": "alice", "kind": "ticket.ready"})).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.payload.is_null());
        assert!(req.scheduled_at.is_none());
    }

    #[test]
    fn test_notification_schedule_parses_rfc3339() {
        let req: PublishNotificationRequest = serde_json::from_value(json!({
            "user_id": "alice",
            "kind": "reminder",
            "scheduled_at": "2030-05-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(req.scheduled_at.unwrap().to_rfc3339(), "2030-05-01T12:00:00+00:00");
    }
}
