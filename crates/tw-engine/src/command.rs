//! Messages between the control context and the renderer.
//!
//! Commands flow control → render over one SPSC ring and are applied only at
//! block boundaries. Reports flow back over another. Anything the renderer
//! removes from its graph travels back as [`Retired`] so it is freed on the
//! control side, never in the render context.

use alloc::boxed::Box;
use core::fmt;

use tw_ir::{AdsrParams, ChannelControls, TransportAction};

use crate::channel::TrackChannel;
use crate::event_queue::ScheduledNote;
use crate::keys::{EffectKey, TrackKey};
use crate::processor::{Effect, Instrument};

/// Which effect chain a command addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainTarget {
    Track(TrackKey),
    Master,
}

/// An immediate, transport-independent note.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Audition {
    pub track: TrackKey,
    pub frequency: f32,
    pub velocity: f32,
    pub gate_samples: u32,
}

pub enum Command {
    AddTrack { key: TrackKey, channel: Box<TrackChannel> },
    RemoveTrack(TrackKey),
    SetControls { track: TrackKey, controls: ChannelControls },
    SetMasterControls(ChannelControls),
    /// `None` unbinds the track's instrument.
    SetInstrument { track: TrackKey, instrument: Option<Box<dyn Instrument>> },
    SetEnvelope { track: TrackKey, envelope: AdsrParams },
    InsertEffect { target: ChainTarget, key: EffectKey, effect: Box<dyn Effect>, index: usize },
    RemoveEffect { target: ChainTarget, key: EffectKey },
    MoveEffect { target: ChainTarget, key: EffectKey, index: usize },
    SetEffectParam { target: ChainTarget, key: EffectKey, param: u16, value: f32 },
    SetEffectEnabled { target: ChainTarget, key: EffectKey, enabled: bool },
    /// Queue at the note's own start time.
    Schedule(ScheduledNote),
    /// Queue at whatever the transport position is when the command lands.
    ScheduleNow(ScheduledNote),
    Audition(Audition),
    Transport(TransportAction),
    SetBpm(f64),
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddTrack { key, .. } => write!(f, "AddTrack({key:?})"),
            Command::RemoveTrack(key) => write!(f, "RemoveTrack({key:?})"),
            Command::SetControls { track, controls } => write!(f, "SetControls({track:?}, {controls:?})"),
            Command::SetMasterControls(c) => write!(f, "SetMasterControls({c:?})"),
            Command::SetInstrument { track, instrument } => {
                write!(f, "SetInstrument({track:?}, bound: {})", instrument.is_some())
            }
            Command::SetEnvelope { track, envelope } => write!(f, "SetEnvelope({track:?}, {envelope:?})"),
            Command::InsertEffect { target, key, index, .. } => {
                write!(f, "InsertEffect({target:?}, {key:?}, at {index})")
            }
            Command::RemoveEffect { target, key } => write!(f, "RemoveEffect({target:?}, {key:?})"),
            Command::MoveEffect { target, key, index } => write!(f, "MoveEffect({target:?}, {key:?}, to {index})"),
            Command::SetEffectParam { target, key, param, value } => {
                write!(f, "SetEffectParam({target:?}, {key:?}, {param} = {value})")
            }
            Command::SetEffectEnabled { target, key, enabled } => {
                write!(f, "SetEffectEnabled({target:?}, {key:?}, {enabled})")
            }
            Command::Schedule(n) => write!(f, "Schedule({n:?})"),
            Command::ScheduleNow(n) => write!(f, "ScheduleNow({n:?})"),
            Command::Audition(a) => write!(f, "Audition({a:?})"),
            Command::Transport(a) => write!(f, "Transport({a:?})"),
            Command::SetBpm(bpm) => write!(f, "SetBpm({bpm})"),
        }
    }
}

/// Graph pieces removed by the renderer, handed back for deallocation.
pub enum Retired {
    Track(Box<TrackChannel>),
    Instrument(Box<dyn Instrument>),
    Effect(Box<dyn Effect>),
}

impl fmt::Debug for Retired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Retired::Track(_) => "Retired::Track",
            Retired::Instrument(_) => "Retired::Instrument",
            Retired::Effect(_) => "Retired::Effect",
        })
    }
}

/// Something the renderer wants the control side to know.
#[derive(Debug)]
pub enum Report {
    /// A note reached a track with no instrument; it was discarded.
    UnboundTrackEvent { track: TrackKey, start_beats: f64 },
    /// A note arrived after its start time and was moved to now.
    LateEventClamped { track: TrackKey, late_beats: f64 },
    /// A note arrived too late to play and was discarded.
    LateEventDropped { track: TrackKey, late_beats: f64 },
    /// Polyphony was exhausted; an older voice was cut.
    VoiceStolen { track: TrackKey },
    /// The pending-event queue was full; the note was discarded.
    EventQueueFull { track: TrackKey },
    Retired(Retired),
}
