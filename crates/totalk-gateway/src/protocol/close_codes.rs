//! WebSocket close codes sent when the server ends a session

use axum::extract::ws::CloseFrame;
use std::fmt;

/// Close codes used by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Session ended normally
    Normal = 1000,
    /// Server is shutting down
    GoingAway = 1001,
    /// A newer session registered under the same key
    SessionReplaced = 4000,
    /// Outbound buffer overflowed
    SlowConsumer = 4001,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            4000 => Some(Self::SessionReplaced),
            4001 => Some(Self::SlowConsumer),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(self, Self::GoingAway | Self::SlowConsumer)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "Session closed",
            Self::GoingAway => "Server shutting down",
            Self::SessionReplaced => "Replaced by a newer session",
            Self::SlowConsumer => "Outbound buffer overflow",
        }
    }

    /// Close frame carrying this code and its description
    #[must_use]
    pub fn to_frame(self) -> CloseFrame<'static> {
        CloseFrame {
            code: self.as_u16(),
            reason: self.description().into(),
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}
