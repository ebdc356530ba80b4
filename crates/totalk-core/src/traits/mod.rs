//! Collaborator traits (ports)

mod repositories;

pub use repositories::{
    MessageRepository, NotificationRepository, NotificationSink, QueueRepository, RepoResult,
};
