//! Scheduler: turns queued notes into sample-accurate triggers.
//!
//! Each block the scheduler looks one block ahead: every pending note whose
//! start falls before the end of the block's beat window fires now, at the
//! exact frame offset where its start lands. Notes leave the queue in start
//! order, ties in the order they were enqueued.

use tw_ir::MusicalTime;

use crate::event_queue::{EventQueue, ScheduledNote};
use crate::transport::Transport;

/// Outcome of handing a note to the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Enqueued {
    OnTime,
    /// Start had already passed, within tolerance; moved to now.
    Clamped { late_beats: f64 },
    /// Start had passed by more than the tolerance.
    Dropped { late_beats: f64 },
    /// The queue is at capacity.
    Full,
}

/// Where inside the current block a note starts, and how long its gate is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub offset: u32,
    pub gate: u32,
}

pub struct Scheduler {
    queue: EventQueue,
    late_tolerance_samples: u32,
}

impl Scheduler {
    pub fn new(capacity: usize, late_tolerance_samples: u32) -> Self {
        Self { queue: EventQueue::with_capacity(capacity), late_tolerance_samples }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue a note, clamping or dropping it if its start is already behind
    /// the transport.
    pub fn enqueue(&mut self, mut note: ScheduledNote, transport: &impl Transport) -> Enqueued {
        let now = transport.position_beats();
        let late_beats = now - note.start.as_beats_f64();
        let mut outcome = Enqueued::OnTime;
        if late_beats > 0.0 {
            let tolerance = self.late_tolerance_samples as f64 * transport.beats_per_sample();
            if late_beats > tolerance {
                return Enqueued::Dropped { late_beats };
            }
            note.start = MusicalTime::from_beats_f64(now);
            outcome = Enqueued::Clamped { late_beats };
        }
        match self.queue.push(note) {
            Ok(()) => outcome,
            Err(_) => Enqueued::Full,
        }
    }

    /// Queue a note at the transport's current position. It has no earlier
    /// start to miss, so it is never late.
    pub fn enqueue_now(&mut self, mut note: ScheduledNote, transport: &impl Transport) -> Enqueued {
        note.start = MusicalTime::from_beats_f64(transport.position_beats());
        match self.queue.push(note) {
            Ok(()) => Enqueued::OnTime,
            Err(_) => Enqueued::Full,
        }
    }

    /// Fire every note due within the next `frames` samples.
    ///
    /// Does nothing unless the transport is running. Gate lengths use the
    /// tempo in force now.
    pub fn dispatch<T: Transport>(
        &mut self,
        transport: &T,
        frames: usize,
        mut fire: impl FnMut(&ScheduledNote, Placement),
    ) {
        let Some(window) = transport.window(frames) else { return };
        let last_frame = frames.saturating_sub(1) as f64;
        while let Some(note) = self.queue.pop_if(|n| n.start.as_beats_f64() < window.end) {
            let start = note.start.as_beats_f64();
            let offset = libm::round(transport.beats_to_samples(start - window.start)).clamp(0.0, last_frame);
            let gate = libm::round(transport.beats_to_samples(note.duration_beats.max(0.0)));
            let placement = Placement {
                offset: offset as u32,
                gate: gate.min(u32::MAX as f64) as u32,
            };
            fire(&note, placement);
        }
        self.queue.compact();
    }

    /// Drop every pending note.
    pub fn flush(&mut self) {
        self.queue.clear();
    }
}
