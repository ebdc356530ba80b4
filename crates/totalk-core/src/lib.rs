//! # totalk-core
//!
//! Domain layer containing queue entries, chat messages, notifications, domain events
//! and the traits the realtime core uses to reach its collaborators.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;

// Re-export commonly used types at crate root
pub use entities::{ChatMessage, Notification, NotificationStatus, QueueEntry, QueueStatus};
pub use error::DomainError;
pub use events::{DomainEvent, QueueAction, QueueCommand};
pub use traits::{
    MessageRepository, NotificationRepository, NotificationSink, QueueRepository, RepoResult,
};
