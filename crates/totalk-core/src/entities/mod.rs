//! Domain entities

mod chat_message;
mod notification;
mod queue_entry;

pub use chat_message::ChatMessage;
pub use notification::{Notification, NotificationStatus};
pub use queue_entry::{QueueEntry, QueueStatus};
