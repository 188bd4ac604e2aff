//! Transport run-state machine.
//!
//! ```text
//! Stopped --Start--> Running --Pause--> Paused --Start--> Running
//! Running/Paused --Stop--> Stopped   (position resets to zero)
//! ```
//!
//! Any transition not drawn above leaves the state unchanged.

use core::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RunState {
    #[default]
    Stopped = 0,
    Running = 1,
    Paused = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportAction {
    Start,
    Pause,
    Stop,
}

impl RunState {
    /// Next state after `action`.
    pub fn apply(self, action: TransportAction) -> RunState {
        use RunState::*;
        use TransportAction::*;
        match (self, action) {
            (Stopped | Paused, Start) => Running,
            (Running, Pause) => Paused,
            (Running | Paused, Stop) => Stopped,
            (state, _) => state,
        }
    }

    pub fn is_running(self) -> bool {
        self == RunState::Running
    }

    /// Inverse of `self as u8`, for publishing through an atomic.
    pub fn from_u8(v: u8) -> RunState {
        match v {
            1 => RunState::Running,
            2 => RunState::Paused,
            _ => RunState::Stopped,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
            RunState::Paused => "paused",
        })
    }
}
