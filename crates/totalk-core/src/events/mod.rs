//! Domain events routed by the dispatcher

mod domain_event;

pub use domain_event::{DomainEvent, QueueAction, QueueCommand};
