//! PostgreSQL implementation of NotificationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use totalk_core::{Notification, NotificationRepository, NotificationStatus, RepoResult};

use crate::models::NotificationModel;

use super::error::map_db_error;

const COLUMNS: &str = "id, user_id, kind, payload, status, scheduled_at, created_at, updated_at";

/// PostgreSQL implementation of NotificationRepository
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    /// Create a new PgNotificationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    #[instrument(skip(self, notification), fields(notification_id = %notification.id))]
    async fn save_notification(&self, notification: &Notification) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO notifications (id, user_id, kind, payload, status, scheduled_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.kind)
        .bind(&notification.payload)
        .bind(notification.status.as_str())
        .bind(notification.scheduled_at)
        .bind(notification.created_at)
        .bind(notification.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, notification), fields(notification_id = %notification.id))]
    async fn update_notification(&self, notification: &Notification) -> RepoResult<()> {
        sqlx::query("UPDATE notifications SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(notification.status.as_str())
            .bind(notification.updated_at)
            .bind(&notification.id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_notification(&self, id: &str) -> RepoResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationModel>(&format!(
            "SELECT {COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Notification::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn load_due_notifications(&self, now: DateTime<Utc>) -> RepoResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationModel>(&format!(
            r"
            SELECT {COLUMNS}
            FROM notifications
            WHERE status = $1 AND scheduled_at IS NOT NULL AND scheduled_at <= $2
            ORDER BY scheduled_at ASC
            "
        ))
        .bind(NotificationStatus::Pending.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn cancel_pending(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE notifications
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            ",
        )
        .bind(NotificationStatus::Cancelled.as_str())
        .bind(id)
        .bind(NotificationStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }
}
