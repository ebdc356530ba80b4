//! Session error types

use thiserror::Error;

/// Session error type
///
/// `InvalidFrame` is recovered inside the session; every other variant ends
/// that one session only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Outbound buffer was full at delivery time
    #[error("Outbound buffer full")]
    SlowConsumer,

    /// The peer or the transport went away
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    /// Nothing was read within the read deadline
    #[error("No traffic within {0:?}")]
    KeepaliveTimeout(std::time::Duration),

    /// Frame could not be interpreted
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

impl SessionError {
    /// Whether the session keeps running after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidFrame(_))
    }
}
