//! PostgreSQL implementation of QueueRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use totalk_core::{DomainError, QueueEntry, QueueRepository, RepoResult};

use crate::models::QueueEntryModel;

use super::error::map_db_error;

/// PostgreSQL implementation of QueueRepository
#[derive(Clone)]
pub struct PgQueueRepository {
    pool: PgPool,
}

impl PgQueueRepository {
    /// Create a new PgQueueRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueRepository for PgQueueRepository {
    // Checkpoints of the same entry may land out of order; the newer
    // `updated_at` wins.
    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn save_entry(&self, entry: &QueueEntry) -> RepoResult<()> {
        let position = i32::try_from(entry.position)
            .map_err(|_| DomainError::DatabaseError("queue position overflow".to_string()))?;

        sqlx::query(
            r"
            INSERT INTO event_queues (id, event_id, user_id, status, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status,
                position = EXCLUDED.position,
                updated_at = EXCLUDED.updated_at
            WHERE event_queues.updated_at <= EXCLUDED.updated_at
            ",
        )
        .bind(&entry.id)
        .bind(&entry.resource_id)
        .bind(&entry.user_id)
        .bind(entry.status.as_str())
        .bind(position)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_entry(&self, entry_id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM event_queues WHERE id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_entries_by_resource(&self, resource_id: &str) -> RepoResult<Vec<QueueEntry>> {
        let rows = sqlx::query_as::<_, QueueEntryModel>(
            r"
            SELECT id, event_id, user_id, status, position, created_at, updated_at
            FROM event_queues
            WHERE event_id = $1
            ORDER BY position ASC, created_at ASC
            ",
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(QueueEntry::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn mark_closed(&self, resource_id: &str) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO event_queue_state (event_id, closed, closed_at)
            VALUES ($1, TRUE, NOW())
            ON CONFLICT (event_id) DO NOTHING
            ",
        )
        .bind(resource_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_closed(&self, resource_id: &str) -> RepoResult<bool> {
        let closed: Option<bool> =
            sqlx::query_scalar("SELECT closed FROM event_queue_state WHERE event_id = $1")
                .bind(resource_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(closed.unwrap_or(false))
    }
}
