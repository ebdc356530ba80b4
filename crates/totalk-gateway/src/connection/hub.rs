//! Connection hub
//!
//! Registry of live sessions for one logical channel, keyed either by user id
//! or by connection id. Shard locks are only held for map access; handles
//! found slow or closed during a fan-out are evicted after the pass.

use super::{SessionError, SessionHandle};
use crate::protocol::CloseCode;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions whose buffer accepted the payload
    pub delivered: usize,
    /// Sessions evicted because their buffer was full or closed
    pub dropped: usize,
}

/// Result of a unicast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// No live session under the key
    NotConnected,
    /// The session's buffer was full; it has been evicted
    SlowConsumer,
}

impl SendOutcome {
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Manages the sessions of one channel
pub struct Hub {
    /// Channel label used in logs
    name: String,

    /// Session handles by key
    sessions: DashMap<String, SessionHandle>,

    /// User ID to session keys mapping
    user_sessions: DashMap<String, HashSet<String>>,
}

impl Hub {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sessions: DashMap::new(),
            user_sessions: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a session under `key`, closing any session it replaces
    ///
    /// The user's index entry stays locked until the handle is published, so
    /// the index never points at a key another call has already cleared.
    pub fn register(&self, key: impl Into<String>, handle: SessionHandle) {
        let key = key.into();
        let user_id = handle.user_id().map(str::to_owned);
        let session_id = handle.id().to_owned();

        let previous = match &user_id {
            Some(user) => {
                let mut keys = self.user_sessions.entry(user.clone()).or_default();
                let previous = self.sessions.insert(key.clone(), handle);
                keys.insert(key.clone());
                previous
            }
            None => self.sessions.insert(key.clone(), handle),
        };

        if let Some(previous) = previous {
            if previous.user_id() != user_id.as_deref() {
                self.forget_user_key(previous.user_id(), &key);
            }
            tracing::debug!(
                hub = %self.name,
                key = %key,
                replaced = %previous.id(),
                "Session replaced"
            );
            previous.close(CloseCode::SessionReplaced);
        }

        tracing::debug!(hub = %self.name, key = %key, session_id = %session_id, "Session registered");
    }

    /// Remove and close the session under `key`
    ///
    /// Returns `false` when nothing was registered under it.
    pub fn unregister(&self, key: &str) -> bool {
        self.remove(key, None, CloseCode::Normal)
    }

    /// Remove the session under `key` only if it is still `session_id`
    pub fn unregister_connection(&self, key: &str, session_id: &str) -> bool {
        self.remove(key, Some(session_id), CloseCode::Normal)
    }

    fn remove(&self, key: &str, session_id: Option<&str>, code: CloseCode) -> bool {
        let removed = match session_id {
            Some(id) => self.sessions.remove_if(key, |_, handle| handle.id() == id),
            None => self.sessions.remove(key),
        };

        let Some((_, handle)) = removed else {
            return false;
        };

        self.forget_user_key(handle.user_id(), key);
        tracing::debug!(
            hub = %self.name,
            key = %key,
            session_id = %handle.id(),
            code = code.as_u16(),
            "Session unregistered"
        );
        handle.close(code);
        true
    }

    // Lock order is user index, then sessions; `register` nests the same way.
    fn forget_user_key(&self, user_id: Option<&str>, key: &str) {
        let Some(user_id) = user_id else {
            return;
        };

        self.user_sessions.remove_if_mut(user_id, |_, keys| {
            let still_owned = self
                .sessions
                .get(key)
                .is_some_and(|handle| handle.user_id() == Some(user_id));
            if !still_owned {
                keys.remove(key);
            }
            keys.is_empty()
        });
    }

    /// Offer `payload` to every registered session
    ///
    /// Never waits on a session. Sessions that cannot take the payload are
    /// unregistered once the pass is over.
    pub fn broadcast(&self, payload: Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut rejected = Vec::new();

        for entry in self.sessions.iter() {
            match entry.value().try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => rejected.push((entry.key().clone(), entry.value().id().to_owned(), e)),
            }
        }

        for (key, session_id, error) in rejected {
            if self.evict(&key, &session_id, &error) {
                report.dropped += 1;
            }
        }

        tracing::trace!(
            hub = %self.name,
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast"
        );

        report
    }

    /// Offer `payload` to the session under `key`
    pub fn send_to_one(&self, key: &str, payload: Bytes) -> SendOutcome {
        self.send_checked(key, None, payload)
    }

    /// Offer `payload` to the session under `key` only while it is still `session_id`
    pub fn send_to_connection(&self, key: &str, session_id: &str, payload: Bytes) -> SendOutcome {
        self.send_checked(key, Some(session_id), payload)
    }

    fn send_checked(&self, key: &str, session_id: Option<&str>, payload: Bytes) -> SendOutcome {
        let attempt = match self.sessions.get(key) {
            Some(handle) if session_id.is_none_or(|id| handle.id() == id) => handle
                .try_send(payload)
                .map_err(|e| (handle.id().to_owned(), e)),
            _ => return SendOutcome::NotConnected,
        };

        match attempt {
            Ok(()) => SendOutcome::Delivered,
            Err((session_id, error)) => {
                self.evict(key, &session_id, &error);
                match error {
                    SessionError::SlowConsumer => SendOutcome::SlowConsumer,
                    _ => SendOutcome::NotConnected,
                }
            }
        }
    }

    /// Offer `payload` to every session of `user_id`; returns the delivered count
    pub fn send_to_user(&self, user_id: &str, payload: Bytes) -> usize {
        let keys: Vec<String> = self
            .user_sessions
            .get(user_id)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();

        let sent = keys
            .iter()
            .filter(|key| self.send_to_one(key, payload.clone()).is_delivered())
            .count();

        tracing::trace!(hub = %self.name, user_id = %user_id, sent, "Message sent to user sessions");
        sent
    }

    fn evict(&self, key: &str, session_id: &str, error: &SessionError) -> bool {
        let code = match error {
            SessionError::SlowConsumer => CloseCode::SlowConsumer,
            _ => CloseCode::Normal,
        };
        let evicted = self.remove(key, Some(session_id), code);
        if evicted {
            tracing::warn!(
                hub = %self.name,
                key = %key,
                session_id = %session_id,
                error = %error,
                "Session evicted"
            );
        }
        evicted
    }

    /// Unregister and close every session; returns how many were closed
    pub fn shutdown(&self) -> usize {
        let keys: Vec<String> = self.sessions.iter().map(|r| r.key().clone()).collect();
        let closed = keys
            .iter()
            .filter(|key| self.remove(key, None, CloseCode::GoingAway))
            .count();

        if closed > 0 {
            tracing::info!(hub = %self.name, closed, "Hub drained");
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    /// Connection id registered under `key`
    pub fn session_id(&self, key: &str) -> Option<String> {
        self.sessions.get(key).map(|h| h.id().to_owned())
    }

    /// Number of distinct users with at least one session
    pub fn user_count(&self) -> usize {
        self.user_sessions.len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("name", &self.name)
            .field("sessions", &self.sessions.len())
            .field("users", &self.user_sessions.len())
            .finish()
    }
}
