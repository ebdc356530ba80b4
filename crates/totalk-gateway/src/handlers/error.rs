//! Handler error types

use thiserror::Error;
use totalk_core::DomainError;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame could not be interpreted
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Command needs a user id the session does not have
    #[error("Anonymous session")]
    Anonymous,

    /// Domain error (queue state, persistence)
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl HandlerError {
    /// Error code sent back to the client
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFrame(_) => "INVALID_FRAME",
            Self::Anonymous => "ANONYMOUS_SESSION",
            Self::Domain(e) => e.code(),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFrame(err.to_string())
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
