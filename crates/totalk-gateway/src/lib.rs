//! # totalk-gateway
//!
//! Realtime gateway: WebSocket sessions registered in connection hubs, the
//! event dispatcher that feeds them, and the HTTP facade over the ordered
//! queues.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, run, GatewayState};
