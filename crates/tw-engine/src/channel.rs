//! Track channel: instrument → effect chain → pan → volume.

use alloc::boxed::Box;

use tw_ir::{AudioBuffer, ChannelControls};

use crate::effect_chain::EffectChain;
use crate::processor::Instrument;

/// Render state for one track. Owns its instrument, chain and scratch
/// buffer; shares nothing with other channels.
pub struct TrackChannel {
    pub instrument: Option<Box<dyn Instrument>>,
    pub chain: EffectChain,
    pub controls: ChannelControls,
    buffer: AudioBuffer,
}

impl TrackChannel {
    /// Allocate a channel whose scratch buffer holds `block_size` frames.
    pub fn new(block_size: u16) -> Self {
        Self {
            instrument: None,
            chain: EffectChain::new(),
            controls: ChannelControls::default(),
            buffer: AudioBuffer::stereo(block_size),
        }
    }

    /// Swap in a new instrument, handing back the previous one.
    pub fn replace_instrument(
        &mut self,
        instrument: Option<Box<dyn Instrument>>,
    ) -> Option<Box<dyn Instrument>> {
        core::mem::replace(&mut self.instrument, instrument)
    }

    /// Render one block into the channel buffer.
    ///
    /// Always runs, even when the channel is not audible, so voices and
    /// effect tails keep time with the transport.
    pub fn process(&mut self) {
        self.buffer.silence();
        if let Some(inst) = self.instrument.as_mut() {
            inst.render(&mut self.buffer);
        }
        self.chain.process(&mut self.buffer);
        let (l, r) = self.controls.stereo_gains();
        self.buffer.apply_stereo_gain(l, r);
    }

    /// Output of the last [`process`](Self::process) call.
    pub fn output(&self) -> &AudioBuffer {
        &self.buffer
    }
}
