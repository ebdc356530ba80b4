//! Queue entry entity - one user's place in a resource's waiting list

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Ranked, waiting for its turn
    Waiting,
    /// Admitted by `process_next`
    Active,
    /// Finished after being admitted
    Completed,
    /// Dropped when the queue was closed
    Cancelled,
}

impl QueueStatus {
    /// Terminal entries are never ranked or re-queued
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Wire/database name of the status
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown queue status: {other}")),
        }
    }
}

/// Queue entry entity
///
/// `position` is 1-based among waiting entries of the same resource and `0`
/// for every other status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub resource_id: String,
    pub user_id: String,
    pub status: QueueStatus,
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Create a new waiting entry at `position`
    pub fn waiting(resource_id: impl Into<String>, user_id: impl Into<String>, position: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            resource_id: resource_id.into(),
            user_id: user_id.into(),
            status: QueueStatus::Waiting,
            position,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the entry is waiting
    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.status == QueueStatus::Waiting
    }

    /// Move the entry to another waiting position
    pub fn reposition(&mut self, position: u32) {
        self.position = position;
        self.updated_at = Utc::now();
    }

    /// Change status; anything that is not waiting loses its rank
    pub fn transition(&mut self, status: QueueStatus) {
        self.status = status;
        if status != QueueStatus::Waiting {
            self.position = 0;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_waiting_entry() {
        let entry = QueueEntry::waiting("event-1", "alice", 3);
        assert_eq!(entry.status, QueueStatus::Waiting);
        assert_eq!(entry.position, 3);
        assert_eq!(entry.id.len(), 36);
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn test_transition_resets_position() {
        let mut entry = QueueEntry::waiting("event-1", "alice", 1);
        entry.transition(QueueStatus::Active);
        assert_eq!(entry.status, QueueStatus::Active);
        assert_eq!(entry.position, 0);
        assert!(entry.updated_at >= entry.created_at);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!QueueStatus::Waiting.is_terminal());
        assert!(!QueueStatus::Active.is_terminal());
        assert!(QueueStatus::Completed.is_terminal());
        assert!(QueueStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("active".parse::<QueueStatus>(), Ok(QueueStatus::Active));
        assert!("paused".parse::<QueueStatus>().is_err());
        assert_eq!(QueueStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_serialized_shape() {
        let entry = QueueEntry::waiting("event-1", "alice", 1);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["position"], 1);
        assert_eq!(json["resource_id"], "event-1");
    }
}
