//! Application services
//!
//! `QueueManager` holds the authoritative ordered state; `QueueService`
//! wraps it with rehydration, checkpointing and user notifications.
//! `NotificationService` stores notifications and tracks their delivery.

pub mod notification;
pub mod queue;
pub mod queue_manager;

pub use notification::{NotificationResult, NotificationService};
pub use queue::QueueService;
pub use queue_manager::{QueueManager, QueueOutcome, QueueResult};
