//! # totalk-db
//!
//! Persistence layer implementing the repository traits from `totalk-core`.
//!
//! ## Overview
//!
//! - PostgreSQL connection pool and migrations
//! - Database models with SQLx `FromRow` derives
//! - PostgreSQL repositories used for checkpointing queue state, chat history
//!   and notification delivery status
//! - In-memory repositories for single-process deployments and tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use totalk_db::{create_pool, PgQueueRepository};
//!
//! async fn example(config: &totalk_common::DatabaseConfig) -> Result<(), sqlx::Error> {
//!     let pool = create_pool(config).await?;
//!     let queue_repo = PgQueueRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, run_migrations, PgPool};
pub use repositories::{
    InMemoryMessageRepository, InMemoryNotificationRepository, InMemoryQueueRepository,
    PgMessageRepository, PgNotificationRepository, PgQueueRepository,
};
