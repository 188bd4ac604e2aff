//! Engine configuration.

use tw_ir::BLOCK_SIZE;

use crate::error::{EngineError, Result};

/// Knobs fixed for the lifetime of a [`Controller`](crate::Controller).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Sample rate for offline rendering, and the fallback before a device
    /// reports its own.
    pub sample_rate: u32,
    /// Frames rendered per block.
    pub block_size: u16,
    pub initial_bpm: f64,
    /// Voices per instrument.
    pub polyphony: usize,
    pub max_tracks: usize,
    pub max_pending_events: usize,
    /// Slots in each of the command and report rings.
    pub command_capacity: usize,
    /// How late a note may arrive and still be played (clamped to now).
    /// Later notes are dropped.
    pub late_tolerance_ms: u32,
    /// Queue length between the render thread and the device.
    pub output_buffer_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 256,
            initial_bpm: 120.0,
            polyphony: 16,
            max_tracks: 64,
            max_pending_events: 4096,
            command_capacity: 1024,
            late_tolerance_ms: 100,
            output_buffer_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(EngineError::InvalidConfig(msg));
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return fail(format!("sample_rate {} outside 8000..=192000", self.sample_rate));
        }
        if self.block_size == 0 || self.block_size as usize > BLOCK_SIZE {
            return fail(format!("block_size {} outside 1..={BLOCK_SIZE}", self.block_size));
        }
        if !self.initial_bpm.is_finite() || self.initial_bpm <= 0.0 {
            return fail(format!("initial_bpm {} must be positive", self.initial_bpm));
        }
        if self.polyphony == 0 {
            return fail("polyphony must be at least 1".into());
        }
        if self.max_tracks == 0 {
            return fail("max_tracks must be at least 1".into());
        }
        if self.max_pending_events == 0 || self.command_capacity == 0 {
            return fail("queue capacities must be at least 1".into());
        }
        if self.output_buffer_ms == 0 {
            return fail("output_buffer_ms must be at least 1".into());
        }
        Ok(())
    }

    /// Late tolerance in samples at `sample_rate`.
    pub fn late_tolerance_samples(&self, sample_rate: u32) -> u32 {
        (sample_rate as u64 * self.late_tolerance_ms as u64 / 1000) as u32
    }
}
