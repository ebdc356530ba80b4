//! Integration test utilities for the gateway
//!
//! Spawns a real gateway on an ephemeral port with in-memory repositories
//! and drives it over HTTP and WebSocket.

pub mod helpers;

pub use helpers::*;
