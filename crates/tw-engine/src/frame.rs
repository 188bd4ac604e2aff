//! Audio frame type.

/// A stereo output frame. Samples are nominally in `-1.0..=1.0`; the master
/// bus guarantees that range before frames leave the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: f32) -> Self {
        Self { left: value, right: value }
    }

    /// Both channels as signed 16-bit PCM.
    pub fn to_i16(self) -> (i16, i16) {
        (to_pcm16(self.left), to_pcm16(self.right))
    }

    /// Largest absolute sample in this frame.
    pub fn peak(self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}

fn to_pcm16(s: f32) -> i16 {
    let s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
    (s * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_conversion_saturates() {
        assert_eq!(Frame { left: 2.0, right: -2.0 }.to_i16(), (32767, -32767));
        assert_eq!(Frame::mono(f32::NAN).to_i16(), (0, 0));
        assert_eq!(Frame::silence().to_i16(), (0, 0));
    }

    #[test]
    fn peak_is_absolute() {
        assert_eq!(Frame { left: 0.1, right: -0.6 }.peak(), 0.6);
    }
}
