//! In-memory repositories
//!
//! Used when no database is configured and throughout the test suites. They
//! follow the same rules as the PostgreSQL repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};

use totalk_core::{
    ChatMessage, DomainError, MessageRepository, Notification, NotificationRepository,
    NotificationStatus, QueueEntry, QueueRepository, RepoResult,
};

/// Queue entries kept in a process-local map
#[derive(Debug, Default)]
pub struct InMemoryQueueRepository {
    entries: DashMap<String, QueueEntry>,
    closed: DashSet<String>,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a stored entry by id
    pub fn get(&self, entry_id: &str) -> Option<QueueEntry> {
        self.entries.get(entry_id).map(|e| e.clone())
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn save_entry(&self, entry: &QueueEntry) -> RepoResult<()> {
        self.entries
            .entry(entry.id.clone())
            .and_modify(|stored| {
                if stored.updated_at <= entry.updated_at {
                    *stored = entry.clone();
                }
            })
            .or_insert_with(|| entry.clone());
        Ok(())
    }

    async fn delete_entry(&self, entry_id: &str) -> RepoResult<()> {
        self.entries.remove(entry_id);
        Ok(())
    }

    async fn load_entries_by_resource(&self, resource_id: &str) -> RepoResult<Vec<QueueEntry>> {
        let mut entries: Vec<QueueEntry> = self
            .entries
            .iter()
            .filter(|e| e.resource_id == resource_id)
            .map(|e| e.clone())
            .collect();
        entries.sort_by(|a, b| (a.position, a.created_at).cmp(&(b.position, b.created_at)));
        Ok(entries)
    }

    async fn mark_closed(&self, resource_id: &str) -> RepoResult<()> {
        self.closed.insert(resource_id.to_string());
        Ok(())
    }

    async fn is_closed(&self, resource_id: &str) -> RepoResult<bool> {
        Ok(self.closed.contains(resource_id))
    }
}

/// Chat history kept in a process-local map
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    chats: DashMap<String, Vec<ChatMessage>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn save_message(&self, message: &ChatMessage) -> RepoResult<()> {
        self.chats
            .entry(message.chat_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn load_history(&self, chat_id: &str, limit: usize) -> RepoResult<Vec<ChatMessage>> {
        Ok(self
            .chats
            .get(chat_id)
            .map(|messages| {
                let skip = messages.len().saturating_sub(limit);
                messages[skip..].to_vec()
            })
            .unwrap_or_default())
    }
}

/// Notifications kept in a process-local map
#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    notifications: DashMap<String, Notification>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save_notification(&self, notification: &Notification) -> RepoResult<()> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn update_notification(&self, notification: &Notification) -> RepoResult<()> {
        let mut stored = self
            .notifications
            .get_mut(&notification.id)
            .ok_or_else(|| DomainError::NotificationNotFound(notification.id.clone()))?;
        stored.status = notification.status;
        stored.updated_at = notification.updated_at;
        Ok(())
    }

    async fn find_notification(&self, id: &str) -> RepoResult<Option<Notification>> {
        Ok(self.notifications.get(id).map(|n| n.clone()))
    }

    async fn load_due_notifications(&self, now: DateTime<Utc>) -> RepoResult<Vec<Notification>> {
        let mut due: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.scheduled_at.is_some() && n.is_due(now))
            .map(|n| n.clone())
            .collect();
        due.sort_by_key(|n| n.scheduled_at);
        Ok(due)
    }

    async fn cancel_pending(&self, id: &str) -> RepoResult<bool> {
        Ok(self.notifications.get_mut(id).is_some_and(|mut n| {
            if n.status == NotificationStatus::Pending {
                n.mark(NotificationStatus::Cancelled);
                true
            } else {
                false
            }
        }))
    }
}
