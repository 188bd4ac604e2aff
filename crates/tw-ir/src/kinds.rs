//! Instrument and effect kinds, parsed from the names collaborators send.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Unrecognized instrument kind name.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown instrument kind (expected basic, fm or am)")]
pub struct InstrumentKindError;

/// Unrecognized effect kind name.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown effect kind (expected filter, delay, distortion or reverb)")]
pub struct EffectKindError;

/// Oscillator topology of a synthesized instrument.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Single triangle oscillator.
    #[default]
    Basic,
    /// Two-operator frequency modulation.
    Fm,
    /// Amplitude modulation by a square modulator.
    Am,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 3] = [Self::Basic, Self::Fm, Self::Am];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Fm => "fm",
            Self::Am => "am",
        }
    }
}

impl FromStr for InstrumentKind {
    type Err = InstrumentKindError;

    /// Accepts the short names and the `synth` / `fmSynth` / `amSynth`
    /// spellings, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let is = |name: &str| s.eq_ignore_ascii_case(name);
        if is("basic") || is("synth") {
            Ok(Self::Basic)
        } else if is("fm") || is("fmsynth") {
            Ok(Self::Fm)
        } else if is("am") || is("amsynth") {
            Ok(Self::Am)
        } else {
            Err(InstrumentKindError)
        }
    }
}

impl TryFrom<&str> for InstrumentKind {
    type Error = InstrumentKindError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// DSP transform carried by an effect node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Filter,
    Delay,
    Distortion,
    Reverb,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [Self::Filter, Self::Delay, Self::Distortion, Self::Reverb];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Delay => "delay",
            Self::Distortion => "distortion",
            Self::Reverb => "reverb",
        }
    }
}

impl FromStr for EffectKind {
    type Err = EffectKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        EffectKind::ALL
            .into_iter()
            .find(|k| s.eq_ignore_ascii_case(k.name()))
            .ok_or(EffectKindError)
    }
}

impl TryFrom<&str> for EffectKind {
    type Error = EffectKindError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
