//! Pulse-driven event scheduler.
//!
//! Events are typed payloads queued by due pulse. Events due on the same
//! pulse fire in insertion order. An event is removed from the queue before
//! it is handed out, so a firing handler may schedule, cancel, or re-arm
//! freely, including under the handle it was fired with.
//!
//! # Determinism
//!
//! Handles are allocated from a counter and queues are ordered maps, so the
//! same sequence of calls always yields the same firing order.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::components::CharId;

/// Identifies a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventHandle(u64);

impl EventHandle {
    /// Raw counter value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// What a fired event wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Fire again after this many pulses. Zero is treated as finished.
    Reschedule(u64),
    /// Done; the handle is released.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Entry<E> {
    owner: Option<CharId>,
    due: u64,
    payload: E,
}

/// An event handed out by [`Scheduler::pop_due`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<E> {
    /// Handle it was scheduled under.
    pub handle: EventHandle,
    /// Owning character, if any.
    pub owner: Option<CharId>,
    /// Pulse it was due on.
    pub due: u64,
    /// Payload.
    pub payload: E,
}

/// Queue of future events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler<E> {
    now: u64,
    next_handle: u64,
    queue: BTreeMap<u64, VecDeque<EventHandle>>,
    entries: BTreeMap<EventHandle, Entry<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            now: 0,
            next_handle: 1,
            queue: BTreeMap::new(),
            entries: BTreeMap::new(),
        }
    }
}

impl<E> Scheduler<E> {
    /// Empty scheduler at pulse zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pulse.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue `payload` to fire `delay` pulses from now.
    pub fn schedule(&mut self, owner: Option<CharId>, payload: E, delay: u64) -> EventHandle {
        let handle = EventHandle(self.next_handle);
        self.next_handle += 1;
        self.insert(handle, owner, payload, delay);
        handle
    }

    /// Queue `payload` again under an existing handle, typically the one an
    /// event was just fired with.
    pub fn rearm(&mut self, handle: EventHandle, owner: Option<CharId>, payload: E, delay: u64) {
        self.cancel(handle);
        self.insert(handle, owner, payload, delay);
    }

    fn insert(&mut self, handle: EventHandle, owner: Option<CharId>, payload: E, delay: u64) {
        let due = self.now.saturating_add(delay);
        self.queue.entry(due).or_default().push_back(handle);
        self.entries.insert(handle, Entry { owner, due, payload });
    }

    /// Cancel a pending event, returning its payload.
    pub fn cancel(&mut self, handle: EventHandle) -> Option<E> {
        let entry = self.entries.remove(&handle)?;
        if let Some(slot) = self.queue.get_mut(&entry.due) {
            slot.retain(|h| *h != handle);
            if slot.is_empty() {
                self.queue.remove(&entry.due);
            }
        }
        Some(entry.payload)
    }

    /// Cancel every event owned by `owner`. Returns how many were cancelled.
    pub fn cancel_owned_by(&mut self, owner: CharId) -> usize {
        self.cancel_where(|o, _| o == Some(owner))
    }

    /// Cancel every event matching `pred(owner, payload)`.
    pub fn cancel_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(Option<CharId>, &E) -> bool,
    {
        let doomed: Vec<EventHandle> = self
            .entries
            .iter()
            .filter(|(_, e)| pred(e.owner, &e.payload))
            .map(|(h, _)| *h)
            .collect();
        for handle in &doomed {
            self.cancel(*handle);
        }
        doomed.len()
    }

    /// Whether a handle is still pending.
    #[must_use]
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Payload of a pending event.
    #[must_use]
    pub fn payload(&self, handle: EventHandle) -> Option<&E> {
        self.entries.get(&handle).map(|e| &e.payload)
    }

    /// Pulse a pending event is due on.
    #[must_use]
    pub fn due_at(&self, handle: EventHandle) -> Option<u64> {
        self.entries.get(&handle).map(|e| e.due)
    }

    /// Pending events owned by `owner`, in handle order.
    pub fn owned_by(&self, owner: CharId) -> impl Iterator<Item = (EventHandle, &E)> {
        self.entries
            .iter()
            .filter(move |(_, e)| e.owner == Some(owner))
            .map(|(h, e)| (*h, &e.payload))
    }

    /// Advance the clock to `now` and pop the earliest event due by then.
    ///
    /// Call repeatedly until it returns `None`; events scheduled with zero
    /// delay while draining are returned in the same drain.
    pub fn pop_due(&mut self, now: u64) -> Option<Fired<E>> {
        self.now = self.now.max(now);
        loop {
            let (&due, slot) = self.queue.iter_mut().next()?;
            if due > self.now {
                return None;
            }
            let Some(handle) = slot.pop_front() else {
                self.queue.remove(&due);
                continue;
            };
            if slot.is_empty() {
                self.queue.remove(&due);
            }
            if let Some(entry) = self.entries.remove(&handle) {
                return Some(Fired {
                    handle,
                    owner: entry.owner,
                    due: entry.due,
                    payload: entry.payload,
                });
            }
        }
    }
}
