//! Queue entry database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use totalk_core::{DomainError, QueueEntry};

/// Database model for the event_queues table
#[derive(Debug, Clone, FromRow)]
pub struct QueueEntryModel {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QueueEntryModel> for QueueEntry {
    type Error = DomainError;

    fn try_from(model: QueueEntryModel) -> Result<Self, Self::Error> {
        let status = model.status.parse().map_err(DomainError::DatabaseError)?;
        let position = u32::try_from(model.position).map_err(|_| {
            DomainError::DatabaseError(format!("negative queue position for entry {}", model.id))
        })?;

        Ok(QueueEntry {
            id: model.id,
            resource_id: model.event_id,
            user_id: model.user_id,
            status,
            position,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
