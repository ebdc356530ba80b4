//! Notification entity - a typed payload addressed to one user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Delivery state of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Stored, not delivered yet (scheduled or in flight)
    #[default]
    Pending,
    /// Accepted by at least one live session
    Sent,
    /// No live session took it
    Failed,
    /// Withdrawn before its scheduled time
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown notification status: {other}")),
        }
    }
}

/// Notification entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub payload: Value,
    #[serde(default)]
    pub status: NotificationStatus,
    /// Deliver no earlier than this; `None` means right away
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Create a new notification for `user_id`
    pub fn new(user_id: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            kind: kind.into(),
            payload,
            status: NotificationStatus::Pending,
            scheduled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deliver at `at` instead of right away
    #[must_use]
    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Whether a pending notification may go out at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Pending && self.scheduled_at.is_none_or(|at| at <= now)
    }

    /// Move to `status`, bumping `updated_at`
    pub fn mark(&mut self, status: NotificationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_due_only_when_pending_and_scheduled_time_passed() {
        let now = Utc::now();
        let immediate = Notification::new("alice", "ping", json!({}));
        assert!(immediate.is_due(now));

        let later = immediate.clone().scheduled_for(now + Duration::minutes(5));
        assert!(!later.is_due(now));
        assert!(later.is_due(now + Duration::minutes(5)));

        let mut sent = immediate;
        sent.mark(NotificationStatus::Sent);
        assert!(!sent.is_due(now));
    }

    #[test]
    fn test_missing_fields_default_when_parsed() {
        let parsed: Notification = serde_json::from_value(json!({
            "id": "n1",
            "user_id": "alice",
            "kind": "ping",
            "payload": null,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(parsed.status, NotificationStatus::Pending);
        assert!(parsed.scheduled_at.is_none());
    }

    #[test]
    fn test_status_strings() {
        for status in [
            NotificationStatus::Pending,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
            NotificationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<NotificationStatus>(), Ok(status));
        }
        assert!("lost".parse::<NotificationStatus>().is_err());
    }
}
