//! Audio output devices for the tonewright audio engine.

mod cpal_backend;
mod null;
mod traits;

pub use cpal_backend::{CpalDevice, CpalOutput};
pub use null::{NullDevice, NullOutput};
pub use traits::{AudioError, AudioOutput, OutputDevice};
