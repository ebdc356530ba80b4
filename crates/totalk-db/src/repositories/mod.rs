//! Repository implementations
//!
//! PostgreSQL and in-memory implementations of the traits defined in totalk-core.

mod error;
mod memory;
mod message;
mod notification;
mod queue;

pub use memory::{
    InMemoryMessageRepository, InMemoryNotificationRepository, InMemoryQueueRepository,
};
pub use message::PgMessageRepository;
pub use notification::PgNotificationRepository;
pub use queue::PgQueueRepository;
