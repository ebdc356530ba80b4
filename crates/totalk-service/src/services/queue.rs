//! Queue service
//!
//! Async facade over [`QueueManager`]. A resource is rehydrated from the
//! repository the first time it is touched, and each user whose entry changed
//! receives a `queue.update` notification.
//!
//! Mutations of one resource run one at a time under its commit lock, which is
//! held until the checkpoint has been written. Checkpoints of a resource
//! therefore reach the repository in the order the mutations happened.

use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use totalk_core::{
    Notification, NotificationSink, QueueAction, QueueCommand, QueueEntry, QueueRepository,
};

use super::queue_manager::{QueueManager, QueueOutcome, QueueResult};

/// Notification kind pushed to users whose entry changed
pub const QUEUE_UPDATE_KIND: &str = "queue.update";

/// Queue service
pub struct QueueService {
    manager: QueueManager,
    repository: Arc<dyn QueueRepository>,
    sink: Option<Arc<dyn NotificationSink>>,
    commit_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl QueueService {
    /// Create a service that checkpoints into `repository`
    pub fn new(repository: Arc<dyn QueueRepository>) -> Self {
        Self {
            manager: QueueManager::new(),
            repository,
            sink: None,
            commit_locks: DashMap::new(),
        }
    }

    /// Push entry changes to users through `sink`
    #[must_use]
    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn manager(&self) -> &QueueManager {
        &self.manager
    }

    /// Join the queue of `resource_id`
    #[instrument(skip(self))]
    pub async fn join(&self, resource_id: &str, user_id: &str) -> QueueResult<QueueEntry> {
        let _commit = self.lock_resource(resource_id).await;
        self.ensure_loaded(resource_id).await?;
        let outcome = self.manager.join(resource_id, user_id)?;
        info!(position = outcome.value.position, "User joined queue");
        Ok(self.commit(outcome).await)
    }

    /// Leave the queue; returns the removed entry
    #[instrument(skip(self))]
    pub async fn leave(&self, resource_id: &str, user_id: &str) -> QueueResult<QueueEntry> {
        let _commit = self.lock_resource(resource_id).await;
        self.ensure_loaded(resource_id).await?;
        let outcome = self.manager.leave(resource_id, user_id)?;
        info!(shifted = outcome.changed.len(), "User left queue");
        Ok(self.commit(outcome).await)
    }

    /// Position of a waiting user
    pub async fn position(&self, resource_id: &str, user_id: &str) -> QueueResult<u32> {
        self.load_for_read(resource_id).await?;
        self.manager.get_position(resource_id, user_id)
    }

    /// Admit the user at the head of the queue
    #[instrument(skip(self))]
    pub async fn process_next(&self, resource_id: &str) -> QueueResult<QueueEntry> {
        let _commit = self.lock_resource(resource_id).await;
        self.ensure_loaded(resource_id).await?;
        let outcome = self.manager.process_next(resource_id)?;
        info!(user_id = %outcome.value.user_id, "Admitted next user");
        Ok(self.commit(outcome).await)
    }

    /// Close the queue; returns the entries that were cancelled
    #[instrument(skip(self))]
    pub async fn close(&self, resource_id: &str) -> QueueResult<Vec<QueueEntry>> {
        let _commit = self.lock_resource(resource_id).await;
        self.ensure_loaded(resource_id).await?;
        let was_closed = self.manager.is_closed(resource_id);
        let outcome = self.manager.close_queue(resource_id);
        info!(cancelled = outcome.value.len(), "Queue closed");

        if !was_closed {
            if let Err(e) = self.repository.mark_closed(resource_id).await {
                warn!(resource_id, error = %e, "Failed to checkpoint queue closure");
            }
        }
        Ok(self.commit(outcome).await)
    }

    /// Mark an admitted user as finished
    #[instrument(skip(self))]
    pub async fn complete(&self, resource_id: &str, user_id: &str) -> QueueResult<QueueEntry> {
        let _commit = self.lock_resource(resource_id).await;
        self.ensure_loaded(resource_id).await?;
        let outcome = self.manager.complete(resource_id, user_id)?;
        Ok(self.commit(outcome).await)
    }

    /// Snapshot of every entry of a resource
    pub async fn status(&self, resource_id: &str) -> QueueResult<Vec<QueueEntry>> {
        self.load_for_read(resource_id).await?;
        Ok(self.manager.status(resource_id))
    }

    /// Apply a queue command received as an event
    pub async fn execute(&self, command: QueueCommand) -> QueueResult<()> {
        let resource = command.resource_id.as_str();
        match command.action {
            QueueAction::Join { user_id } => self.join(resource, &user_id).await.map(drop),
            QueueAction::Leave { user_id } => self.leave(resource, &user_id).await.map(drop),
            QueueAction::Complete { user_id } => self.complete(resource, &user_id).await.map(drop),
            QueueAction::ProcessNext => self.process_next(resource).await.map(drop),
            QueueAction::Close => self.close(resource).await.map(drop),
        }
    }

    async fn lock_resource(&self, resource_id: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(&*self.commit_locks.entry(resource_id.to_string()).or_default());
        lock.lock_owned().await
    }

    async fn load_for_read(&self, resource_id: &str) -> QueueResult<()> {
        if self.manager.is_loaded(resource_id) {
            return Ok(());
        }
        let _commit = self.lock_resource(resource_id).await;
        self.ensure_loaded(resource_id).await
    }

    /// Callers hold the resource's commit lock
    async fn ensure_loaded(&self, resource_id: &str) -> QueueResult<()> {
        if self.manager.is_loaded(resource_id) {
            return Ok(());
        }

        let entries = self.repository.load_entries_by_resource(resource_id).await?;
        let closed = self.repository.is_closed(resource_id).await?;
        let count = entries.len();
        let outcome = self.manager.hydrate(resource_id, entries, closed);
        if outcome.value {
            debug!(resource_id, entries = count, closed, "Queue rehydrated");
            self.checkpoint(&outcome).await;
        }
        Ok(())
    }

    async fn commit<T>(&self, outcome: QueueOutcome<T>) -> T {
        self.checkpoint(&outcome).await;
        self.notify(&outcome.changed);
        outcome.value
    }

    async fn checkpoint<T>(&self, outcome: &QueueOutcome<T>) {
        for entry in &outcome.removed {
            if let Err(e) = self.repository.delete_entry(&entry.id).await {
                warn!(entry_id = %entry.id, error = %e, "Failed to delete queue entry checkpoint");
            }
        }
        for entry in &outcome.changed {
            if let Err(e) = self.repository.save_entry(entry).await {
                warn!(entry_id = %entry.id, error = %e, "Failed to checkpoint queue entry");
            }
        }
    }

    fn notify(&self, changed: &[QueueEntry]) {
        let Some(sink) = &self.sink else {
            return;
        };

        for entry in changed {
            let notification = Notification::new(
                entry.user_id.clone(),
                QUEUE_UPDATE_KIND,
                json!({
                    "resource_id": entry.resource_id,
                    "status": entry.status,
                    "position": entry.position,
                }),
            );
            let delivered = sink.deliver(&entry.user_id, &notification);
            debug!(user_id = %entry.user_id, delivered, "Queue update pushed");
        }
    }
}
