//! Inbound frame handlers
//!
//! Each channel interprets the text frames of its sessions differently: chat
//! rooms treat them as messages, the notification channel as queue commands.

mod chat;
mod error;
mod notify;

pub use chat::ChatHandler;
pub use error::{HandlerError, HandlerResult};
pub use notify::NotifyHandler;

use crate::connection::SessionShared;
use async_trait::async_trait;

/// Handles one inbound text frame of a session
///
/// An error rejects that frame only; the session keeps running.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, session: &SessionShared, text: &str) -> HandlerResult<()>;
}
