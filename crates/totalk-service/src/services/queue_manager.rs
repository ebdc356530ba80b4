//! Ordered queue manager
//!
//! Keeps one FIFO waiting list per resource. Waiting entries of a resource
//! always carry positions `1..=N`; every other entry carries position `0`.
//! Each resource sits behind its own mutex, so operations on one resource are
//! linearized while different resources never contend.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use totalk_core::{DomainError, QueueEntry, QueueStatus};

/// Result type for queue operations
pub type QueueResult<T> = Result<T, DomainError>;

/// Value of a queue operation plus the entries it touched
///
/// `changed` entries must be saved and `removed` entries deleted to bring a
/// checkpoint in line with the in-memory state.
#[derive(Debug, Clone)]
pub struct QueueOutcome<T> {
    pub value: T,
    pub changed: Vec<QueueEntry>,
    pub removed: Vec<QueueEntry>,
}

impl<T> QueueOutcome<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            changed: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// True when nothing needs to be checkpointed
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueueOutcome<U> {
        QueueOutcome {
            value: f(self.value),
            changed: self.changed,
            removed: self.removed,
        }
    }
}

#[derive(Debug, Default)]
struct ResourceQueue {
    /// Latest entry of every user, keyed by user id
    entries: HashMap<String, QueueEntry>,
    /// Waiting user ids; index `i` holds position `i + 1`
    waiting: VecDeque<String>,
    closed: bool,
}

impl ResourceQueue {
    fn from_entries(entries: Vec<QueueEntry>, closed: bool, removed: &mut Vec<QueueEntry>) -> Self {
        let mut by_user: HashMap<String, QueueEntry> = HashMap::new();
        for entry in entries {
            match by_user.entry(entry.user_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    if supersedes(&entry, slot.get()) {
                        removed.push(slot.insert(entry));
                    } else {
                        removed.push(entry);
                    }
                }
            }
        }

        let mut ranked: Vec<_> = by_user
            .values()
            .filter(|e| e.is_waiting())
            .map(|e| (e.position, e.created_at, e.user_id.clone()))
            .collect();
        ranked.sort();

        Self {
            entries: by_user,
            waiting: ranked.into_iter().map(|(_, _, user)| user).collect(),
            closed,
        }
    }

    fn live_entry(&self, user_id: &str) -> Option<&QueueEntry> {
        self.entries
            .get(user_id)
            .filter(|e| !e.status.is_terminal())
    }

    /// Re-rank waiting entries from index `from` on, collecting the ones that moved
    fn renumber_from(&mut self, from: usize, changed: &mut Vec<QueueEntry>) {
        for (idx, user_id) in self.waiting.iter().enumerate().skip(from) {
            if let Some(entry) = self.entries.get_mut(user_id) {
                let position = idx as u32 + 1;
                if entry.position != position {
                    entry.reposition(position);
                    changed.push(entry.clone());
                }
            }
        }
    }

    fn snapshot(&self) -> Vec<QueueEntry> {
        let mut entries: Vec<QueueEntry> = self
            .waiting
            .iter()
            .filter_map(|user_id| self.entries.get(user_id).cloned())
            .collect();

        let mut rest: Vec<QueueEntry> = self
            .entries
            .values()
            .filter(|e| !e.is_waiting())
            .cloned()
            .collect();
        rest.sort_by_key(|e| e.created_at);

        entries.extend(rest);
        entries
    }
}

/// Live entries win over terminal ones; otherwise the most recently updated
fn supersedes(candidate: &QueueEntry, current: &QueueEntry) -> bool {
    (!candidate.status.is_terminal(), candidate.updated_at)
        > (!current.status.is_terminal(), current.updated_at)
}

/// In-memory ordered queues, one per resource id
#[derive(Default)]
pub struct QueueManager {
    queues: DashMap<String, Arc<Mutex<ResourceQueue>>>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    // The map shard is released before the resource lock is taken.
    fn slot(&self, resource_id: &str) -> Arc<Mutex<ResourceQueue>> {
        Arc::clone(self.queues.entry(resource_id.to_string()).or_default().value())
    }

    fn existing(&self, resource_id: &str) -> Option<Arc<Mutex<ResourceQueue>>> {
        self.queues.get(resource_id).map(|q| Arc::clone(q.value()))
    }

    /// Whether the resource has state in memory
    pub fn is_loaded(&self, resource_id: &str) -> bool {
        self.queues.contains_key(resource_id)
    }

    /// Number of resources held in memory
    pub fn resource_count(&self) -> usize {
        self.queues.len()
    }

    /// Install persisted state for a resource that is not loaded yet
    ///
    /// Returns `false` in the value when the resource was already present, in
    /// which case `entries` and `closed` are ignored. Waiting entries are
    /// re-ranked in their stored order; duplicates per user are reported as
    /// removed.
    pub fn hydrate(
        &self,
        resource_id: &str,
        entries: Vec<QueueEntry>,
        closed: bool,
    ) -> QueueOutcome<bool> {
        if self.is_loaded(resource_id) {
            return QueueOutcome::new(false);
        }

        let mut outcome = QueueOutcome::new(true);
        let mut queue = ResourceQueue::from_entries(entries, closed, &mut outcome.removed);
        queue.renumber_from(0, &mut outcome.changed);

        match self.queues.entry(resource_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => QueueOutcome::new(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(queue)));
                outcome
            }
        }
    }

    /// Append a user at the back of the waiting list
    pub fn join(&self, resource_id: &str, user_id: &str) -> QueueResult<QueueOutcome<QueueEntry>> {
        if resource_id.trim().is_empty() {
            return Err(DomainError::ValidationError("resource id must not be blank".into()));
        }
        if user_id.trim().is_empty() {
            return Err(DomainError::ValidationError("user id must not be blank".into()));
        }

        let slot = self.slot(resource_id);
        let mut queue = slot.lock();

        if queue.live_entry(user_id).is_some() {
            return Err(DomainError::already_queued(resource_id, user_id));
        }
        if queue.closed {
            return Err(DomainError::ResourceClosed(resource_id.to_string()));
        }

        let position = queue.waiting.len() as u32 + 1;
        let entry = QueueEntry::waiting(resource_id, user_id, position);

        let mut outcome = QueueOutcome::new(entry.clone());
        if let Some(previous) = queue.entries.insert(user_id.to_string(), entry.clone()) {
            outcome.removed.push(previous);
        }
        queue.waiting.push_back(user_id.to_string());
        outcome.changed.push(entry);

        Ok(outcome)
    }

    /// Remove a waiting or active entry, closing the gap it leaves
    pub fn leave(&self, resource_id: &str, user_id: &str) -> QueueResult<QueueOutcome<QueueEntry>> {
        let slot = self
            .existing(resource_id)
            .ok_or_else(|| DomainError::not_queued(resource_id, user_id))?;
        let mut queue = slot.lock();

        if queue.live_entry(user_id).is_none() {
            return Err(DomainError::not_queued(resource_id, user_id));
        }
        let Some(entry) = queue.entries.remove(user_id) else {
            return Err(DomainError::not_queued(resource_id, user_id));
        };

        let mut outcome = QueueOutcome::new(entry.clone());
        if entry.is_waiting() {
            if let Some(idx) = queue.waiting.iter().position(|u| u == user_id) {
                queue.waiting.remove(idx);
                queue.renumber_from(idx, &mut outcome.changed);
            }
        }
        outcome.removed.push(entry);

        Ok(outcome)
    }

    /// Current position of a waiting user
    pub fn get_position(&self, resource_id: &str, user_id: &str) -> QueueResult<u32> {
        self.existing(resource_id)
            .and_then(|slot| {
                slot.lock()
                    .entries
                    .get(user_id)
                    .filter(|e| e.is_waiting())
                    .map(|e| e.position)
            })
            .ok_or_else(|| DomainError::not_queued(resource_id, user_id))
    }

    /// Admit the entry at position 1
    pub fn process_next(&self, resource_id: &str) -> QueueResult<QueueOutcome<QueueEntry>> {
        let empty = || DomainError::EmptyQueue(resource_id.to_string());
        let slot = self.existing(resource_id).ok_or_else(empty)?;
        let mut queue = slot.lock();

        let user_id = queue.waiting.pop_front().ok_or_else(empty)?;
        let Some(entry) = queue.entries.get_mut(&user_id) else {
            return Err(DomainError::InternalError(format!(
                "waiting user {user_id} has no entry in {resource_id}"
            )));
        };
        entry.transition(QueueStatus::Active);
        let admitted = entry.clone();

        let mut outcome = QueueOutcome::new(admitted.clone());
        outcome.changed.push(admitted);
        queue.renumber_from(0, &mut outcome.changed);

        Ok(outcome)
    }

    /// Cancel every waiting entry and refuse further joins
    ///
    /// Closing an already closed queue cancels nothing and changes nothing.
    pub fn close_queue(&self, resource_id: &str) -> QueueOutcome<Vec<QueueEntry>> {
        let slot = self.slot(resource_id);
        let mut queue = slot.lock();
        queue.closed = true;

        let waiting: Vec<String> = queue.waiting.drain(..).collect();
        let mut cancelled = Vec::with_capacity(waiting.len());
        for user_id in waiting {
            if let Some(entry) = queue.entries.get_mut(&user_id) {
                entry.transition(QueueStatus::Cancelled);
                cancelled.push(entry.clone());
            }
        }

        let mut outcome = QueueOutcome::new(cancelled.clone());
        outcome.changed = cancelled;
        outcome
    }

    /// Mark an admitted user as done
    pub fn complete(&self, resource_id: &str, user_id: &str) -> QueueResult<QueueOutcome<QueueEntry>> {
        let slot = self
            .existing(resource_id)
            .ok_or_else(|| DomainError::not_queued(resource_id, user_id))?;
        let mut queue = slot.lock();

        let entry = queue
            .entries
            .get_mut(user_id)
            .filter(|e| e.status == QueueStatus::Active)
            .ok_or_else(|| DomainError::not_queued(resource_id, user_id))?;
        entry.transition(QueueStatus::Completed);
        let completed = entry.clone();

        let mut outcome = QueueOutcome::new(completed.clone());
        outcome.changed.push(completed);
        Ok(outcome)
    }

    /// All entries of a resource: waiting by position, then the rest by age
    pub fn status(&self, resource_id: &str) -> Vec<QueueEntry> {
        self.existing(resource_id)
            .map(|slot| slot.lock().snapshot())
            .unwrap_or_default()
    }

    pub fn is_closed(&self, resource_id: &str) -> bool {
        self.existing(resource_id)
            .is_some_and(|slot| slot.lock().closed)
    }
}

impl fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueManager")
            .field("resources", &self.queues.len())
            .finish()
    }
}
