//! Core data types for the tonewright audio engine.
//!
//! Everything the facade hands to the render context, and everything the
//! render context reports back, is built from the types in this crate.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod controls;
mod event;
mod ids;
mod instrument;
mod kinds;
mod musical_time;
mod pitch;
mod transport;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE, MAX_CHANNELS};
pub use controls::{constant_power_gains, ChannelControls};
pub use event::{NoteEvent, DEFAULT_NOTE_BEATS, DEFAULT_VELOCITY};
pub use ids::{EffectId, InstrumentId, TrackId};
pub use instrument::{AdsrParams, InstrumentSpec};
pub use kinds::{EffectKind, EffectKindError, InstrumentKind, InstrumentKindError};
pub use musical_time::{MusicalTime, SUB_BEAT_UNIT};
pub use pitch::{Pitch, PitchError, A4_FREQUENCY};
pub use transport::{RunState, TransportAction};
