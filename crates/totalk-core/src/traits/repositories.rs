//! Repository traits (ports) - define the interface for data access
//!
//! The realtime core keeps its state in memory; these traits are only used to
//! checkpoint that state and to rehydrate it after a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{ChatMessage, Notification, QueueEntry};
use crate::error::DomainError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Queue Repository
// ============================================================================

#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert or update an entry
    async fn save_entry(&self, entry: &QueueEntry) -> RepoResult<()>;

    /// Remove an entry (after Leave, or when a terminal entry is replaced)
    async fn delete_entry(&self, entry_id: &str) -> RepoResult<()>;

    /// Load every entry of a resource, in any order
    async fn load_entries_by_resource(&self, resource_id: &str) -> RepoResult<Vec<QueueEntry>>;

    /// Record that a resource no longer accepts joins
    async fn mark_closed(&self, resource_id: &str) -> RepoResult<()>;

    /// Whether a resource was closed, including one closed while empty
    async fn is_closed(&self, resource_id: &str) -> RepoResult<bool>;
}

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a chat message
    async fn save_message(&self, message: &ChatMessage) -> RepoResult<()>;

    /// Most recent `limit` messages of a chat, oldest first
    async fn load_history(&self, chat_id: &str, limit: usize) -> RepoResult<Vec<ChatMessage>>;
}

// ============================================================================
// Notification Repository
// ============================================================================

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Store a new notification
    async fn save_notification(&self, notification: &Notification) -> RepoResult<()>;

    /// Overwrite status and `updated_at` of a stored notification
    async fn update_notification(&self, notification: &Notification) -> RepoResult<()>;

    /// Find a notification by id
    async fn find_notification(&self, id: &str) -> RepoResult<Option<Notification>>;

    /// Pending notifications scheduled at or before `now`, oldest schedule first
    async fn load_due_notifications(&self, now: DateTime<Utc>) -> RepoResult<Vec<Notification>>;

    /// Move a pending notification to cancelled; `false` if it was not pending
    async fn cancel_pending(&self, id: &str) -> RepoResult<bool>;
}

// ============================================================================
// Notification delivery
// ============================================================================

/// Pushes a notification to a user's live sessions
///
/// Delivery is best effort: an offline user is not an error.
pub trait NotificationSink: Send + Sync {
    /// Returns the number of sessions that accepted the notification
    fn deliver(&self, user_id: &str, notification: &Notification) -> usize;
}
