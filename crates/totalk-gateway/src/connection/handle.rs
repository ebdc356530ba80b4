//! Session handle
//!
//! The part of a session the hub owns: its id, its user and the only sender
//! of its outbound buffer. Dropping the handle closes the buffer, which makes
//! the session's write loop send a close frame and exit.

use super::SessionError;
use crate::protocol::CloseCode;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Created, not yet serving its socket
    Connecting = 0,
    /// Read and write loops running
    Open = 1,
    /// Teardown started
    Closing = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// State shared between a session's loops and its hub handle
pub struct SessionShared {
    id: String,
    user_id: Option<String>,
    state: AtomicU8,
    /// Single-fire teardown guard
    torn_down: AtomicBool,
    close_code: AtomicU16,
    last_activity: Mutex<Instant>,
    created_at: Instant,
}

impl SessionShared {
    pub fn new(user_id: Option<String>) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            state: AtomicU8::new(SessionState::Connecting as u8),
            torn_down: AtomicBool::new(false),
            close_code: AtomicU16::new(CloseCode::Normal.as_u16()),
            last_activity: Mutex::new(now),
            created_at: now,
        })
    }

    /// Connection id
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Fire the teardown guard
    ///
    /// Returns `true` for exactly one caller; that caller's `code` is the one
    /// sent in the final close frame.
    pub fn begin_teardown(&self, code: CloseCode) -> bool {
        let first = !self.torn_down.swap(true, Ordering::AcqRel);
        if first {
            self.close_code.store(code.as_u16(), Ordering::Release);
            self.set_state(SessionState::Closing);
        }
        first
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    pub fn close_code(&self) -> CloseCode {
        CloseCode::from_u16(self.close_code.load(Ordering::Acquire)).unwrap_or(CloseCode::Normal)
    }

    /// Record inbound traffic
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for SessionShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionShared")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

/// Hub-side handle of a session
#[derive(Debug)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
    sender: mpsc::Sender<Bytes>,
}

impl SessionHandle {
    pub(crate) fn new(shared: Arc<SessionShared>, sender: mpsc::Sender<Bytes>) -> Self {
        Self { shared, sender }
    }

    pub fn id(&self) -> &str {
        self.shared.id()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.shared.user_id()
    }

    pub fn shared(&self) -> &Arc<SessionShared> {
        &self.shared
    }

    /// Queue a payload without waiting
    pub fn try_send(&self, payload: Bytes) -> Result<(), SessionError> {
        self.sender.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::SlowConsumer,
            TrySendError::Closed(_) => {
                SessionError::TransportClosed("outbound buffer closed".to_string())
            }
        })
    }

    /// Free slots in the outbound buffer
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }

    /// Fire the teardown guard and drop the sender
    pub fn close(self, code: CloseCode) {
        self.shared.begin_teardown(code);
    }
}
