//! Notification service
//!
//! Stores every published notification, delivers it through a
//! [`NotificationSink`] and records whether any live session took it.
//! Notifications scheduled for later stay pending until the scheduler finds
//! them due.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};
use totalk_core::{
    DomainError, Notification, NotificationRepository, NotificationSink, NotificationStatus,
};

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, DomainError>;

/// Notification service
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    sink: Arc<dyn NotificationSink>,
    /// Held while a notification changes state, so a cancel never races a delivery
    delivery: Mutex<()>,
    running: AtomicBool,
    shutdown: Notify,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn NotificationRepository>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            repository,
            sink,
            delivery: Mutex::new(()),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Store a notification and deliver it unless it is scheduled for later
    #[instrument(skip(self, notification), fields(notification_id = %notification.id, user_id = %notification.user_id))]
    pub async fn publish(&self, mut notification: Notification) -> NotificationResult<Notification> {
        notification.mark(NotificationStatus::Pending);

        let _delivery = self.delivery.lock().await;
        self.repository.save_notification(&notification).await?;

        if !notification.is_due(Utc::now()) {
            info!(scheduled_at = ?notification.scheduled_at, "Notification scheduled");
            return Ok(notification);
        }

        self.deliver(&mut notification).await;
        Ok(notification)
    }

    /// Deliver every scheduled notification that is due; returns how many went out
    pub async fn process_due(&self) -> NotificationResult<usize> {
        let _delivery = self.delivery.lock().await;
        let due = self.repository.load_due_notifications(Utc::now()).await?;
        let count = due.len();

        for mut notification in due {
            self.deliver(&mut notification).await;
        }
        if count > 0 {
            debug!(count, "Scheduled notifications processed");
        }
        Ok(count)
    }

    /// Withdraw a notification that has not been delivered yet
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: &str) -> NotificationResult<Notification> {
        let _delivery = self.delivery.lock().await;
        let mut notification = self.find(id).await?;

        if !self.repository.cancel_pending(id).await? {
            return Err(DomainError::NotCancellable(id.to_string()));
        }

        notification.mark(NotificationStatus::Cancelled);
        info!("Notification cancelled");
        Ok(notification)
    }

    /// Look up a stored notification
    pub async fn find(&self, id: &str) -> NotificationResult<Notification> {
        self.repository
            .find_notification(id)
            .await?
            .ok_or_else(|| DomainError::NotificationNotFound(id.to_string()))
    }

    /// Check for due notifications every `interval` until [`stop`](Self::stop)
    pub fn start_scheduler(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(interval_ms = interval.as_millis() as u64, "Notification scheduler started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = self.shutdown.notified() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.process_due().await {
                            warn!(error = %e, "Failed to load scheduled notifications");
                        }
                    }
                }
            }

            self.running.store(false, Ordering::SeqCst);
            info!("Notification scheduler stopped");
        })
    }

    /// Stop the scheduler loop
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Callers hold the delivery lock
    async fn deliver(&self, notification: &mut Notification) {
        let sessions = self.sink.deliver(&notification.user_id, notification);
        let status = if sessions > 0 {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        notification.mark(status);

        if let Err(e) = self.repository.update_notification(notification).await {
            warn!(notification_id = %notification.id, error = %e, "Failed to record notification status");
        }
        debug!(notification_id = %notification.id, sessions, status = %status, "Notification delivered");
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("running", &self.is_running())
            .finish()
    }
}
