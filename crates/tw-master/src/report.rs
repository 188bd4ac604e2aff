//! Degraded render-time outcomes, translated for collaborators.

use std::collections::VecDeque;
use std::fmt;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;
use tw_engine::Report;
use tw_ir::TrackId;

use crate::registry::Registry;

/// A non-fatal event from the render context.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineReport {
    /// A note reached a track with no instrument and was discarded.
    UnboundTrackEvent { track: TrackId, start_beats: f64 },
    /// A note arrived late and was played immediately instead.
    LateEventClamped { track: TrackId, late_beats: f64 },
    /// A note arrived too late to play and was discarded.
    LateEventDropped { track: TrackId, late_beats: f64 },
    /// Polyphony ran out and an older voice was cut short.
    VoiceStolen { track: TrackId },
    /// The pending-event queue was full and the note was discarded.
    EventQueueFull { track: TrackId },
}

impl EngineReport {
    pub fn track(&self) -> &TrackId {
        match self {
            Self::UnboundTrackEvent { track, .. }
            | Self::LateEventClamped { track, .. }
            | Self::LateEventDropped { track, .. }
            | Self::VoiceStolen { track }
            | Self::EventQueueFull { track } => track,
        }
    }
}

impl fmt::Display for EngineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnboundTrackEvent { track, start_beats } => {
                write!(f, "track '{track}' has no instrument; note at beat {start_beats:.3} dropped")
            }
            Self::LateEventClamped { track, late_beats } => {
                write!(f, "note on '{track}' arrived {late_beats:.3} beats late; played now")
            }
            Self::LateEventDropped { track, late_beats } => {
                write!(f, "note on '{track}' arrived {late_beats:.3} beats late; dropped")
            }
            Self::VoiceStolen { track } => write!(f, "voice stolen on '{track}'"),
            Self::EventQueueFull { track } => write!(f, "event queue full; note on '{track}' dropped"),
        }
    }
}

/// Drain the renderer's report ring: free retired graph pieces, log and
/// keep the rest. At most `limit` reports are kept, oldest dropped first.
pub(crate) fn drain(
    reports: &mut HeapCons<Report>,
    registry: &Registry,
    pending: &mut VecDeque<EngineReport>,
    limit: usize,
) {
    while let Some(report) = reports.try_pop() {
        let Some(report) = translate(report, registry) else { continue };
        match &report {
            EngineReport::LateEventClamped { .. } | EngineReport::VoiceStolen { .. } => {
                tracing::debug!("{report}")
            }
            _ => tracing::warn!("{report}"),
        }
        if pending.len() >= limit {
            pending.pop_front();
        }
        pending.push_back(report);
    }
}

/// `None` for retired pieces (dropped here) and for tracks deleted since.
fn translate(report: Report, registry: &Registry) -> Option<EngineReport> {
    let id = |key| registry.track_id(key).cloned();
    Some(match report {
        Report::Retired(retired) => {
            drop(retired);
            return None;
        }
        Report::UnboundTrackEvent { track, start_beats } => {
            EngineReport::UnboundTrackEvent { track: id(track)?, start_beats }
        }
        Report::LateEventClamped { track, late_beats } => {
            EngineReport::LateEventClamped { track: id(track)?, late_beats }
        }
        Report::LateEventDropped { track, late_beats } => {
            EngineReport::LateEventDropped { track: id(track)?, late_beats }
        }
        Report::VoiceStolen { track } => EngineReport::VoiceStolen { track: id(track)? },
        Report::EventQueueFull { track } => EngineReport::EventQueueFull { track: id(track)? },
    })
}
