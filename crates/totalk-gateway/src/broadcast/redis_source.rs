//! Redis Pub/Sub event source
//!
//! Subscribes to one channel and forwards every payload that parses as a
//! `DomainEvent` to the dispatcher. Reconnects after a fixed delay whenever
//! the connection drops.

use futures_util::StreamExt;
use redis::Client;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use totalk_common::RedisConfig;
use totalk_core::DomainEvent;

/// Error type for the event source
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Dispatcher channel closed")]
    ChannelClosed,
}

/// Redis Pub/Sub listener feeding the dispatcher
pub struct RedisEventSource {
    config: RedisConfig,
    events: mpsc::Sender<DomainEvent>,
}

impl RedisEventSource {
    pub fn new(config: RedisConfig, events: mpsc::Sender<DomainEvent>) -> Self {
        Self { config, events }
    }

    /// Run the listener in a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let delay = Duration::from_millis(self.config.reconnect_delay_ms);
        loop {
            match self.listen().await {
                Ok(()) => tracing::warn!("Pub/Sub stream ended, reconnecting..."),
                Err(EventSourceError::ChannelClosed) => {
                    tracing::info!("Dispatcher gone, event source stopping");
                    return;
                }
                Err(e) => tracing::error!(error = %e, "Event source error, reconnecting..."),
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Listen until the stream ends or fails
    async fn listen(&self) -> Result<(), EventSourceError> {
        let client = Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&self.config.channel).await?;

        tracing::info!(channel = %self.config.channel, "Event source subscribed");

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable Pub/Sub payload");
                    continue;
                }
            };

            if let Some(event) = parse_event(&payload) {
                self.events
                    .send(event)
                    .await
                    .map_err(|_| EventSourceError::ChannelClosed)?;
            }
        }

        Ok(())
    }
}

/// Parse a Pub/Sub payload; malformed payloads are logged and skipped
pub fn parse_event(payload: &str) -> Option<DomainEvent> {
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed event payload");
            None
        }
    }
}
