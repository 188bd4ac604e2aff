//! Facade error taxonomy.

use std::convert::Infallible;

use thiserror::Error;
use tw_audio::AudioError;
use tw_ir::{EffectId, EffectKind, EffectKindError, InstrumentKindError, PitchError, TrackId};

/// Everything a [`Controller`](crate::Controller) call can be refused with.
///
/// No variant ever originates in the render context; degraded render-time
/// outcomes arrive as [`EngineReport`](crate::EngineReport)s instead.
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration: the caller must correct the input. No state changed.
    #[error(transparent)]
    InvalidInstrumentKind(#[from] InstrumentKindError),
    #[error(transparent)]
    InvalidEffectKind(#[from] EffectKindError),
    #[error("invalid tempo {0} (must be a positive number of beats per minute)")]
    InvalidTempo(f64),
    #[error("invalid pitch: {0}")]
    InvalidPitch(#[from] PitchError),
    #[error("invalid duration {0} (must be a finite, non-negative length within limits)")]
    InvalidDuration(f64),
    #[error("invalid value {value} for {name}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("{kind} effect has no parameter named '{name}'")]
    UnknownParameter { kind: EffectKind, name: String },
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    // Resource.
    #[error("engine failed to initialize: {0}")]
    EngineInit(#[source] AudioError),

    // Lifecycle.
    #[error("engine is not initialized")]
    NotReady,
    #[error("operation needs an offline engine")]
    NotOffline,

    // Referential: nothing was mutated.
    #[error("unknown track id '{0}'")]
    UnknownTrackId(TrackId),
    #[error("unknown effect id '{0}'")]
    UnknownEffectId(EffectId),
    #[error("track id '{0}' is already in use or was used earlier in this session")]
    DuplicateTrackId(TrackId),
    #[error("effect id '{0}' is already in use or was used earlier in this session")]
    DuplicateEffectId(EffectId),
    #[error("index {index} is out of range for a chain of {len} effects")]
    EffectOutOfRange { index: usize, len: usize },

    // Degraded, non-fatal.
    #[error("track '{0}' has no instrument; the note was not played")]
    UnboundTrackEvent(TrackId),

    // Back-pressure.
    #[error("command queue is full; the render context is not keeping up")]
    CommandQueueFull,
    #[error("{what} capacity of {limit} exceeded")]
    CapacityExceeded { what: &'static str, limit: usize },
}

impl From<Infallible> for EngineError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
