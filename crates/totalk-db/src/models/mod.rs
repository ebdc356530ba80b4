//! Database models

mod message;
mod notification;
mod queue_entry;

pub use message::MessageModel;
pub use notification::NotificationModel;
pub use queue_entry::QueueEntryModel;
