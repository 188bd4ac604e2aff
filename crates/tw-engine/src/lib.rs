//! Render context for the tonewright audio engine.
//!
//! Synthesizes voices, runs effect chains, mixes the master bus and keeps
//! the transport clock. Everything in here is driven one block at a time by
//! a [`Renderer`] and never allocates while rendering.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
pub mod command;
mod effect_chain;
pub mod effects;
mod envelope;
mod event_queue;
mod frame;
mod keys;
mod master;
mod oscillator;
mod processor;
mod renderer;
pub mod scheduler;
mod synth;
pub mod transport;
mod voice;
mod voice_pool;

pub use channel::TrackChannel;
pub use command::{Audition, ChainTarget, Command, Report, Retired};
pub use effect_chain::{EffectChain, EffectNode, MAX_CHAIN_LEN};
pub use envelope::{Envelope, Stage};
pub use event_queue::{EventQueue, ScheduledNote};
pub use frame::Frame;
pub use keys::{EffectKey, TrackKey};
pub use master::MasterBus;
pub use oscillator::Oscillator;
pub use processor::{Effect, EffectInfo, Instrument, ParamInfo, RenderBackend, SoftwareBackend};
pub use renderer::{RenderSettings, Renderer, SharedState};
pub use scheduler::{Enqueued, Placement, Scheduler};
pub use synth::SynthInstrument;
pub use transport::{Transport, TransportClock, MAX_BPM, MIN_BPM};
pub use voice::{NoteTrigger, Voice, VoiceState, VOICE_GAIN};
pub use voice_pool::{VoiceId, VoicePool};
