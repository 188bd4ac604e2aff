//! Per-channel mixer controls and the constant-power pan law.

use core::f32::consts::FRAC_PI_4;

/// Volume, pan, mute and solo for one track (or the master bus, which
/// ignores mute and solo).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelControls {
    /// Linear gain, 0..=1.
    pub volume: f32,
    /// -1 (hard left) ..= 1 (hard right).
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
}

impl Default for ChannelControls {
    fn default() -> Self {
        Self { volume: 1.0, pan: 0.0, muted: false, solo: false }
    }
}

impl ChannelControls {
    /// Whether this channel reaches the master bus.
    ///
    /// While any channel is soloed only soloed channels play, whatever
    /// their mute flag; otherwise every unmuted channel plays.
    pub fn is_audible(&self, any_solo: bool) -> bool {
        if any_solo {
            self.solo
        } else {
            !self.muted
        }
    }

    /// Left and right gains with volume folded in.
    pub fn stereo_gains(&self) -> (f32, f32) {
        let (l, r) = constant_power_gains(self.pan);
        let v = sanitize_unit(self.volume, 1.0, 0.0, 1.0);
        (l * v, r * v)
    }
}

fn sanitize_unit(v: f32, fallback: f32, lo: f32, hi: f32) -> f32 {
    if v.is_finite() {
        v.clamp(lo, hi)
    } else {
        fallback
    }
}

/// Constant-power pan law: `angle = (pan + 1) * π/4`, gains `(cos, sin)`.
///
/// Centre yields `√½` on both sides so `l² + r² == 1` across the field.
pub fn constant_power_gains(pan: f32) -> (f32, f32) {
    let pan = sanitize_unit(pan, 0.0, -1.0, 1.0);
    let angle = (pan + 1.0) * FRAC_PI_4;
    (libm::cosf(angle), libm::sinf(angle))
}
