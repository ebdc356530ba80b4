//! Response DTOs for API endpoints

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use totalk_core::{Notification, NotificationStatus, QueueEntry, QueueStatus};

/// One queue entry as seen by clients
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntryResponse {
    pub id: String,
    pub resource_id: String,
    pub user_id: String,
    pub status: QueueStatus,
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QueueEntry> for QueueEntryResponse {
    fn from(entry: QueueEntry) -> Self {
        Self {
            id: entry.id,
            resource_id: entry.resource_id,
            user_id: entry.user_id,
            status: entry.status,
            position: entry.position,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// A user's current rank
#[derive(Debug, Clone, Serialize)]
pub struct QueuePositionResponse {
    pub resource_id: String,
    pub user_id: String,
    pub position: u32,
}

/// Snapshot of a resource's queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusResponse {
    pub resource_id: String,
    pub waiting: usize,
    pub entries: Vec<QueueEntryResponse>,
}

impl QueueStatusResponse {
    pub fn new(resource_id: impl Into<String>, entries: Vec<QueueEntry>) -> Self {
        let waiting = entries.iter().filter(|e| e.is_waiting()).count();
        Self {
            resource_id: resource_id.into(),
            waiting,
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// A stored notification and its delivery state
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub payload: Value,
    pub status: NotificationStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            user_id: notification.user_id,
            kind: notification.kind,
            payload: notification.payload,
            status: notification.status,
            scheduled_at: notification.scheduled_at,
            created_at: notification.created_at,
            updated_at: notification.updated_at,
        }
    }
}
