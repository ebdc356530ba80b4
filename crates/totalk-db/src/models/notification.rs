//! Notification database model

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use totalk_core::{DomainError, Notification};

/// Database model for the notifications table
#[derive(Debug, Clone, FromRow)]
pub struct NotificationModel {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub payload: Value,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<NotificationModel> for Notification {
    type Error = DomainError;

    fn try_from(model: NotificationModel) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            payload: model.payload,
            status: model.status.parse().map_err(DomainError::DatabaseError)?,
            scheduled_at: model.scheduled_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
