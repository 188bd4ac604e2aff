//! Transport clock: tempo, run state and the beat position, advanced by
//! rendered samples.

use core::ops::Range;

use tw_ir::{RunState, TransportAction};

/// Slowest and fastest tempo the clock accepts.
pub const MIN_BPM: f64 = 1.0;
pub const MAX_BPM: f64 = 999.0;

/// Musical-time source the scheduler plans against.
pub trait Transport {
    fn bpm(&self) -> f64;
    fn run_state(&self) -> RunState;
    fn position_beats(&self) -> f64;
    fn sample_rate(&self) -> u32;

    /// Beats advanced per rendered sample at the current tempo.
    fn beats_per_sample(&self) -> f64 {
        self.bpm() / 60.0 / self.sample_rate().max(1) as f64
    }

    /// Beat range the next `frames` samples will cover, if running.
    fn window(&self, frames: usize) -> Option<Range<f64>> {
        if !self.run_state().is_running() {
            return None;
        }
        let start = self.position_beats();
        Some(start..start + frames as f64 * self.beats_per_sample())
    }

    /// Samples spanning `beats` at the current tempo.
    fn beats_to_samples(&self, beats: f64) -> f64 {
        beats / self.beats_per_sample()
    }
}

/// The engine's transport.
///
/// ```text
/// Stopped --start--> Running --pause--> Paused --start--> Running
/// Running/Paused --stop--> Stopped (position reset to 0)
/// ```
///
/// A tempo change rescales how fast beats accrue from that moment on and
/// never touches the position already reached.
#[derive(Clone, Debug)]
pub struct TransportClock {
    sample_rate: u32,
    bpm: f64,
    beats_per_sample: f64,
    position: f64,
    state: RunState,
}

impl TransportClock {
    pub fn new(sample_rate: u32, bpm: f64) -> Self {
        let mut clock = Self {
            sample_rate: sample_rate.max(1),
            bpm: 120.0,
            beats_per_sample: 0.0,
            position: 0.0,
            state: RunState::Stopped,
        };
        clock.set_bpm(bpm);
        clock
    }

    /// Apply a new tempo immediately. Non-finite values are ignored and the
    /// rest clamped to `MIN_BPM..=MAX_BPM`.
    pub fn set_bpm(&mut self, bpm: f64) {
        if !bpm.is_finite() {
            return;
        }
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.beats_per_sample = self.bpm / 60.0 / self.sample_rate as f64;
    }

    /// Run the state machine. Stopping always rewinds to zero.
    pub fn apply(&mut self, action: TransportAction) -> RunState {
        self.state = self.state.apply(action);
        if action == TransportAction::Stop {
            self.position = 0.0;
        }
        self.state
    }

    /// Move the position forward by `frames` samples when running.
    pub fn advance(&mut self, frames: usize) {
        if self.state.is_running() {
            self.position += frames as f64 * self.beats_per_sample;
        }
    }
}

impl Transport for TransportClock {
    fn bpm(&self) -> f64 {
        self.bpm
    }

    fn run_state(&self) -> RunState {
        self.state
    }

    fn position_beats(&self) -> f64 {
        self.position
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn beats_per_sample(&self) -> f64 {
        self.beats_per_sample
    }
}
