//! Event broadcasting
//!
//! Routes domain events from the HTTP facade and Redis Pub/Sub to the hubs
//! and the queue service.

mod dispatcher;
mod redis_source;
mod sink;

pub use dispatcher::Dispatcher;
pub use redis_source::{parse_event, EventSourceError, RedisEventSource};
pub use sink::HubNotificationSink;
