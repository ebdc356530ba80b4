//! Chat room registry
//!
//! One hub per chat id, created on first join and dropped once its last
//! session is gone. Registration and removal both run under the room's map
//! entry, so a session can never land in a hub that was just discarded.

use super::{Hub, SessionHandle};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ChatRooms {
    rooms: DashMap<String, Arc<Hub>>,
}

impl ChatRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session in the room's hub, creating the room if needed
    pub fn register(&self, chat_id: &str, key: impl Into<String>, handle: SessionHandle) -> Arc<Hub> {
        let room = self
            .rooms
            .entry(chat_id.to_string())
            .or_insert_with(|| Hub::new_shared(format!("chat:{chat_id}")));
        room.register(key, handle);
        Arc::clone(room.value())
    }

    pub fn get(&self, chat_id: &str) -> Option<Arc<Hub>> {
        self.rooms.get(chat_id).map(|r| Arc::clone(r.value()))
    }

    /// Drop the room if nobody is left in it
    pub fn remove_if_empty(&self, chat_id: &str) -> bool {
        let removed = self.rooms.remove_if(chat_id, |_, hub| hub.is_empty()).is_some();
        if removed {
            tracing::debug!(chat_id = %chat_id, "Chat room dropped");
        }
        removed
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Close every session of every room
    pub fn shutdown(&self) -> usize {
        let rooms: Vec<Arc<Hub>> = self.rooms.iter().map(|r| Arc::clone(r.value())).collect();
        self.rooms.clear();
        rooms.iter().map(|hub| hub.shutdown()).sum()
    }
}

impl std::fmt::Debug for ChatRooms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRooms")
            .field("rooms", &self.rooms.len())
            .finish()
    }
}
