//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Maximum number of audio channels per buffer.
pub const MAX_CHANNELS: u16 = 8;

/// Largest block the renderer processes in one pass.
pub const BLOCK_SIZE: usize = 256;

/// A multichannel f32 audio buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
/// Buffers are sized once in the control context and reused by the render
/// context; no method here reallocates.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: u16,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: u16) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        Self {
            data: vec![0.0; channels as usize * frames as usize],
            channels,
            frames,
        }
    }

    /// Create a silent stereo buffer.
    pub fn stereo(frames: u16) -> Self {
        Self::new(2, frames)
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> u16 {
        self.frames
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames as usize;
        &self.data[start..start + self.frames as usize]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames as usize;
        let len = self.frames as usize;
        &mut self.data[start..start + len]
    }

    /// Split-borrow the first two channels as (left, right).
    ///
    /// A mono buffer yields its single plane on the left and an empty
    /// slice on the right.
    pub fn stereo_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let len = self.frames as usize;
        if self.channels < 2 {
            return (&mut self.data[..len], &mut []);
        }
        let (left, rest) = self.data.split_at_mut(len);
        (left, &mut rest[..len])
    }

    /// Overwrite this buffer with `source` where the shapes overlap.
    pub fn copy_from(&mut self, source: &AudioBuffer) {
        let chs = self.channels.min(source.channels);
        let frs = self.frames.min(source.frames) as usize;
        for ch in 0..chs {
            self.channel_mut(ch)[..frs].copy_from_slice(&source.channel(ch)[..frs]);
        }
    }

    /// Sum overlapping channels from `source` into this buffer.
    pub fn mix_from(&mut self, source: &AudioBuffer) {
        self.mix_from_scaled(source, 1.0);
    }

    /// Sum overlapping channels from `source` into this buffer with gain.
    pub fn mix_from_scaled(&mut self, source: &AudioBuffer, gain: f32) {
        let chs = self.channels.min(source.channels);
        let frs = self.frames.min(source.frames) as usize;
        for ch in 0..chs {
            let dst = self.channel_mut(ch);
            let src = source.channel(ch);
            for i in 0..frs {
                dst[i] += src[i] * gain;
            }
        }
    }

    /// Scale all samples by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for s in &mut self.data {
            *s *= gain;
        }
    }

    /// Scale the left and right planes independently.
    pub fn apply_stereo_gain(&mut self, left_gain: f32, right_gain: f32) {
        let (left, right) = self.stereo_mut();
        for s in left.iter_mut() {
            *s *= left_gain;
        }
        for s in right.iter_mut() {
            *s *= right_gain;
        }
    }

    /// True when every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.data.iter().all(|&s| s == 0.0)
    }

    /// Peak absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_silent() {
        let buf = AudioBuffer::new(2, 4);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 4);
        assert!(buf.is_silent());
    }

    #[test]
    fn channel_mut_writes_correctly() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[1] = -0.5;
        assert_eq!(buf.channel(0), &[1.0, 0.0]);
        assert_eq!(buf.channel(1), &[0.0, -0.5]);
    }

    #[test]
    fn stereo_mut_splits_planes() {
        let mut buf = AudioBuffer::stereo(3);
        {
            let (l, r) = buf.stereo_mut();
            l[2] = 0.25;
            r[0] = -0.75;
        }
        assert_eq!(buf.channel(0), &[0.0, 0.0, 0.25]);
        assert_eq!(buf.channel(1), &[-0.75, 0.0, 0.0]);
    }

    #[test]
    fn stereo_mut_on_mono_gives_empty_right() {
        let mut buf = AudioBuffer::new(1, 4);
        let (l, r) = buf.stereo_mut();
        assert_eq!(l.len(), 4);
        assert!(r.is_empty());
    }

    #[test]
    fn copy_from_overwrites() {
        let mut dst = AudioBuffer::stereo(2);
        dst.channel_mut(0)[0] = 9.0;
        let mut src = AudioBuffer::stereo(2);
        src.channel_mut(0)[1] = 0.5;
        dst.copy_from(&src);
        assert_eq!(dst, src);
    }

    #[test]
    fn mix_from_scaled_applies_gain() {
        let mut dst = AudioBuffer::new(1, 2);
        let mut src = AudioBuffer::new(1, 2);
        src.channel_mut(0)[0] = 1.0;
        src.channel_mut(0)[1] = -1.0;

        dst.mix_from_scaled(&src, 0.5);
        assert!((dst.channel(0)[0] - 0.5).abs() < 1e-6);
        assert!((dst.channel(0)[1] - -0.5).abs() < 1e-6);
    }

    #[test]
    fn apply_stereo_gain_scales_each_side() {
        let mut buf = AudioBuffer::stereo(1);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[0] = 1.0;
        buf.apply_stereo_gain(0.25, 0.5);
        assert_eq!(buf.channel(0)[0], 0.25);
        assert_eq!(buf.channel(1)[0], 0.5);
    }

    #[test]
    fn mix_from_mismatched_sizes_uses_minimum() {
        let mut dst = AudioBuffer::new(2, 4);
        let mut src = AudioBuffer::new(1, 2);
        src.channel_mut(0)[0] = 1.0;
        src.channel_mut(0)[1] = 2.0;

        dst.mix_from(&src);
        assert!((dst.channel(0)[0] - 1.0).abs() < 1e-6);
        assert!((dst.channel(0)[1] - 2.0).abs() < 1e-6);
        assert_eq!(dst.channel(0)[2], 0.0);
        assert_eq!(dst.channel(1)[0], 0.0);
    }

    #[test]
    fn peak_tracks_largest_magnitude() {
        let mut buf = AudioBuffer::stereo(2);
        buf.channel_mut(1)[1] = -0.8;
        buf.channel_mut(0)[0] = 0.3;
        assert_eq!(buf.peak(), 0.8);
    }
}
