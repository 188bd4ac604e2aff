//! Output device traits and error types.

use tw_engine::Frame;

/// Error type for audio device operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// No output device is available on this host.
    #[error("no audio output device available")]
    NoDevice,
    /// Failed to query or configure the device.
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create the output stream.
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
}

/// An opened output stream fed one block at a time.
///
/// Outputs are created and used on the render thread; some backends (cpal)
/// cannot move between threads once open.
pub trait AudioOutput {
    /// Device sample rate.
    fn sample_rate(&self) -> u32;

    /// Queue frames for playback, waiting until there is room for all of
    /// them. Pacing the render loop is this method's job.
    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError>;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}

/// Something that can open an [`AudioOutput`].
pub trait OutputDevice: Send + Sync {
    /// Human-readable device name for logs.
    fn name(&self) -> String;

    /// Acquire the device. `buffer_ms` sizes the queue between the render
    /// thread and the device.
    fn open(&self, buffer_ms: u32) -> Result<Box<dyn AudioOutput>, AudioError>;
}
