//! Time-ordered queue of pending notes.

use alloc::vec::Vec;
use tw_ir::MusicalTime;

use crate::keys::TrackKey;

/// A note waiting for the transport to reach `start`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledNote {
    pub track: TrackKey,
    pub frequency: f32,
    pub velocity: f32,
    pub start: MusicalTime,
    pub duration_beats: f64,
}

/// Pending notes sorted by start time, ties in enqueue order.
///
/// Storage is reserved up front; `push` refuses rather than grow, and
/// consumed notes are dropped from the front without reallocating, so every
/// operation is safe in the render context.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<ScheduledNote>,
    /// Next event index to dispatch.
    cursor: usize,
    limit: usize,
}

impl EventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { events: Vec::with_capacity(capacity), cursor: 0, limit: capacity }
    }

    pub fn capacity(&self) -> usize {
        self.limit
    }

    /// Insert after every event with `start <= note.start`, so equal start
    /// times keep enqueue order. Hands the note back when full.
    pub fn push(&mut self, note: ScheduledNote) -> Result<(), ScheduledNote> {
        self.compact();
        if self.events.len() >= self.limit {
            return Err(note);
        }
        let pos = self.events.partition_point(|e| e.start <= note.start);
        self.events.insert(pos, note);
        Ok(())
    }

    /// Next undispatched event.
    pub fn peek(&self) -> Option<&ScheduledNote> {
        self.events.get(self.cursor)
    }

    /// Take the next event if `due` accepts it.
    pub fn pop_if(&mut self, due: impl FnOnce(&ScheduledNote) -> bool) -> Option<ScheduledNote> {
        let next = *self.events.get(self.cursor)?;
        if !due(&next) {
            return None;
        }
        self.cursor += 1;
        Some(next)
    }

    /// Drop dispatched events from the front.
    pub fn compact(&mut self) {
        if self.cursor > 0 {
            self.events.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Undispatched events.
    pub fn len(&self) -> usize {
        self.events.len() - self.cursor
    }
}
