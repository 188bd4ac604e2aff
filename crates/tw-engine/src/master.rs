//! Master bus: sums eligible track channels, runs the master chain, applies
//! master pan and volume, then hard-limits to the output range.

use tw_ir::{AudioBuffer, ChannelControls};

use crate::channel::TrackChannel;
use crate::effect_chain::EffectChain;
use crate::frame::Frame;

pub struct MasterBus {
    pub chain: EffectChain,
    /// Only `volume` and `pan` apply; mute and solo are ignored.
    pub controls: ChannelControls,
    buffer: AudioBuffer,
}

impl MasterBus {
    pub fn new(block_size: u16) -> Self {
        Self {
            chain: EffectChain::new(),
            controls: ChannelControls::default(),
            buffer: AudioBuffer::stereo(block_size),
        }
    }

    /// Mix one block from already-processed channels into `out`.
    ///
    /// While `any_solo` holds only soloed channels are summed; otherwise
    /// every unmuted channel is.
    pub fn mix<'a>(
        &mut self,
        channels: impl IntoIterator<Item = &'a TrackChannel>,
        any_solo: bool,
        out: &mut [Frame],
    ) {
        self.buffer.silence();
        for ch in channels.into_iter().filter(|c| c.controls.is_audible(any_solo)) {
            self.buffer.mix_from(ch.output());
        }

        self.chain.process(&mut self.buffer);
        let (gl, gr) = self.controls.stereo_gains();
        self.buffer.apply_stereo_gain(gl, gr);

        let left = self.buffer.channel(0);
        let right = self.buffer.channel(1);
        for (i, frame) in out.iter_mut().enumerate() {
            *frame = Frame {
                left: limit(left.get(i).copied().unwrap_or(0.0)),
                right: limit(right.get(i).copied().unwrap_or(0.0)),
            };
        }
    }
}

/// True if any of `channels` is soloed.
pub fn any_solo<'a>(channels: impl IntoIterator<Item = &'a TrackChannel>) -> bool {
    channels.into_iter().any(|c| c.controls.solo)
}

/// Hard limit to `-1..=1`; NaN and infinities become silence.
#[inline]
fn limit(s: f32) -> f32 {
    if s.is_finite() {
        s.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
