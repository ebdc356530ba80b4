//! # totalk-service
//!
//! Application layer: the in-memory ordered queue manager, the async service
//! that checkpoints it, stored notification delivery, and the request/response
//! DTOs of the HTTP facade.

pub mod dto;
pub mod services;

pub use services::{
    NotificationResult, NotificationService, QueueManager, QueueOutcome, QueueResult,
    QueueService,
};
