//! An output that discards audio at real-time pace.
//!
//! Useful on headless machines and in tests: the render thread behaves as
//! if a device were consuming its blocks, without any hardware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tw_engine::Frame;

use crate::traits::{AudioError, AudioOutput, OutputDevice};

#[derive(Clone, Debug)]
pub struct NullDevice {
    sample_rate: u32,
    opened: Arc<AtomicUsize>,
}

impl NullDevice {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate: sample_rate.max(1), opened: Arc::new(AtomicUsize::new(0)) }
    }

    /// How many times [`open`](OutputDevice::open) has succeeded.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

impl OutputDevice for NullDevice {
    fn name(&self) -> String {
        format!("null ({} Hz)", self.sample_rate)
    }

    fn open(&self, buffer_ms: u32) -> Result<Box<dyn AudioOutput>, AudioError> {
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(NullOutput {
            sample_rate: self.sample_rate,
            slack: Duration::from_millis(buffer_ms as u64),
            started: None,
            written: 0,
        }))
    }
}

pub struct NullOutput {
    sample_rate: u32,
    /// How far ahead of the wall clock writes may run.
    slack: Duration,
    started: Option<Instant>,
    written: u64,
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.written += frames.len() as u64;
        let due = Duration::from_secs_f64(self.written as f64 / self.sample_rate as f64);
        let ahead = due.saturating_sub(started.elapsed());
        if ahead > self.slack {
            std::thread::sleep(ahead - self.slack);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.started = None;
        self.written = 0;
        Ok(())
    }
}
