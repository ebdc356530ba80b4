//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    // =========================================================================
    // Queue Errors
    // =========================================================================
    #[error("User {user_id} is already queued for {resource_id}")]
    AlreadyQueued { resource_id: String, user_id: String },

    #[error("User {user_id} is not queued for {resource_id}")]
    NotQueued { resource_id: String, user_id: String },

    #[error("No one is waiting in the queue for {0}")]
    EmptyQueue(String),

    #[error("Queue for {0} is closed")]
    ResourceClosed(String),

    // =========================================================================
    // Notification Errors
    // =========================================================================
    #[error("Notification {0} not found")]
    NotificationNotFound(String),

    #[error("Notification {0} is no longer pending")]
    NotCancellable(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyQueued { .. } => "ALREADY_QUEUED",
            Self::NotQueued { .. } => "NOT_QUEUED",
            Self::EmptyQueue(_) => "EMPTY_QUEUE",
            Self::ResourceClosed(_) => "RESOURCE_CLOSED",
            Self::NotificationNotFound(_) => "NOTIFICATION_NOT_FOUND",
            Self::NotCancellable(_) => "NOT_CANCELLABLE",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotQueued { .. } | Self::NotificationNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    /// Check if this is a conflict with the queue's current state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyQueued { .. }
                | Self::EmptyQueue(_)
                | Self::ResourceClosed(_)
                | Self::NotCancellable(_)
        )
    }

    /// Create an `AlreadyQueued` error
    pub fn already_queued(resource_id: &str, user_id: &str) -> Self {
        Self::AlreadyQueued {
            resource_id: resource_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    /// Create a `NotQueued` error
    pub fn not_queued(resource_id: &str, user_id: &str) -> Self {
        Self::NotQueued {
            resource_id: resource_id.to_string(),
            user_id: user_id.to_string(),
        }
    }
}
