//! Note events as collaborators describe them.

use crate::ids::TrackId;
use crate::musical_time::MusicalTime;
use crate::pitch::Pitch;

/// Note length used when a caller does not give one: an eighth note.
pub const DEFAULT_NOTE_BEATS: f64 = 0.5;

/// Velocity used by `play_note`.
pub const DEFAULT_VELOCITY: f32 = 1.0;

/// A note to be played on a track at a transport position.
///
/// Immutable once scheduled; the scheduler consumes each event exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteEvent {
    pub track: TrackId,
    pub pitch: Pitch,
    /// 0..=1
    pub velocity: f32,
    pub start: MusicalTime,
    /// Gate length in beats.
    pub duration_beats: f64,
}

impl NoteEvent {
    pub fn new(track: impl Into<TrackId>, pitch: Pitch, start: MusicalTime) -> Self {
        Self {
            track: track.into(),
            pitch,
            velocity: DEFAULT_VELOCITY,
            start,
            duration_beats: DEFAULT_NOTE_BEATS,
        }
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_duration(mut self, beats: f64) -> Self {
        self.duration_beats = beats;
        self
    }

    /// Transport position at which the gate closes.
    pub fn end_beats(&self) -> f64 {
        self.start.as_beats_f64() + self.duration_beats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let ev = NoteEvent::new("t1", "A4".parse().unwrap(), MusicalTime::from_beats(2));
        assert_eq!(ev.velocity, DEFAULT_VELOCITY);
        assert_eq!(ev.duration_beats, DEFAULT_NOTE_BEATS);
        assert_eq!(ev.end_beats(), 2.5);
    }

    #[test]
    fn builder_overrides() {
        let ev = NoteEvent::new("t1", "C4".parse().unwrap(), MusicalTime::zero())
            .with_velocity(0.25)
            .with_duration(4.0);
        assert_eq!(ev.velocity, 0.25);
        assert_eq!(ev.end_beats(), 4.0);
    }
}
