//! Instrument definitions handed from the facade to the render backend.

use crate::kinds::InstrumentKind;

/// Longest accepted envelope segment, in seconds.
const MAX_SEGMENT_SECS: f32 = 30.0;

/// ADSR envelope parameters.
///
/// `attack`, `decay` and `release` are in seconds; `sustain` is a level
/// in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl AdsrParams {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self { attack, decay, sustain, release }
    }

    /// Factory envelope for each instrument kind.
    pub const fn default_for(kind: InstrumentKind) -> Self {
        match kind {
            InstrumentKind::Basic => Self::new(0.005, 0.1, 0.3, 1.0),
            InstrumentKind::Fm | InstrumentKind::Am => Self::new(0.01, 0.01, 1.0, 0.5),
        }
    }

    /// True if every field is finite and within range.
    pub fn is_valid(&self) -> bool {
        self.invalid_field().is_none()
    }

    /// First field that is non-finite or out of range, with its value.
    pub fn invalid_field(&self) -> Option<(&'static str, f32)> {
        let fields = [
            ("attack", self.attack, MAX_SEGMENT_SECS),
            ("decay", self.decay, MAX_SEGMENT_SECS),
            ("sustain", self.sustain, 1.0),
            ("release", self.release, MAX_SEGMENT_SECS),
        ];
        fields
            .into_iter()
            .find(|(_, v, max)| !(v.is_finite() && (0.0..=*max).contains(v)))
            .map(|(name, v, _)| (name, v))
    }

    /// Replace non-finite fields with `fallback`'s and clamp the rest.
    pub fn sanitized(self, fallback: AdsrParams) -> Self {
        let fix = |v: f32, d: f32, max: f32| if v.is_finite() { v.clamp(0.0, max) } else { d };
        Self {
            attack: fix(self.attack, fallback.attack, MAX_SEGMENT_SECS),
            decay: fix(self.decay, fallback.decay, MAX_SEGMENT_SECS),
            sustain: fix(self.sustain, fallback.sustain, 1.0),
            release: fix(self.release, fallback.release, MAX_SEGMENT_SECS),
        }
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::default_for(InstrumentKind::Basic)
    }
}

/// Everything needed to build one instrument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstrumentSpec {
    pub kind: InstrumentKind,
    pub envelope: AdsrParams,
    /// Modulator to carrier frequency ratio (FM and AM).
    pub harmonicity: f32,
    /// Peak FM deviation as a multiple of the modulator frequency.
    pub modulation_index: f32,
}

impl InstrumentSpec {
    pub fn new(kind: InstrumentKind) -> Self {
        Self {
            kind,
            envelope: AdsrParams::default_for(kind),
            harmonicity: 3.0,
            modulation_index: 10.0,
        }
    }

    pub fn with_envelope(mut self, envelope: AdsrParams) -> Self {
        self.envelope = envelope;
        self
    }
}
