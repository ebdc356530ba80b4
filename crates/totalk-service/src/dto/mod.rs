//! Data transfer objects for the HTTP facade
//!
//! Request DTOs implement `Validate`; response DTOs are built from domain
//! entities.

pub mod requests;
pub mod responses;

pub use requests::{JoinQueueRequest, PublishNotificationRequest};
pub use responses::{
    NotificationResponse, QueueEntryResponse, QueuePositionResponse, QueueStatusResponse,
};
