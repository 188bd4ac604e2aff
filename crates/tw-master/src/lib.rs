//! Engine facade for the tonewright audio engine.
//!
//! [`Controller`] is the one entry point collaborators use: lifecycle,
//! track and effect registries, note scheduling, transport, and offline
//! rendering. It hosts the render context from `tw-engine` on a dedicated
//! thread feeding a `tw-audio` output device, or renders on demand when
//! built offline.

mod config;
mod controller;
mod error;
mod playback;
mod registry;
mod report;
mod wav;

pub use config::EngineConfig;
pub use controller::Controller;
pub use error::{EngineError, Result};
pub use registry::{EffectSnapshot, InstrumentInfo, TrackInfo};
pub use report::EngineReport;
pub use wav::{frames_to_wav, write_wav};

// Re-export common types so callers don't need tw-ir/tw-engine/tw-audio directly.
pub use tw_audio::{AudioError, AudioOutput, CpalDevice, NullDevice, OutputDevice};
pub use tw_engine::{Frame, RenderBackend, SoftwareBackend};
pub use tw_ir::{
    AdsrParams, ChannelControls, EffectId, EffectKind, InstrumentId, InstrumentKind,
    InstrumentSpec, MusicalTime, NoteEvent, Pitch, RunState, TrackId, DEFAULT_NOTE_BEATS,
};
