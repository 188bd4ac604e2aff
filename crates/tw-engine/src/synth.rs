//! Software polyphonic synthesizer: the default [`Instrument`].

use tw_ir::{AdsrParams, AudioBuffer, InstrumentSpec};

use crate::processor::Instrument;
use crate::voice::{NoteTrigger, Voice};
use crate::voice_pool::VoicePool;

pub struct SynthInstrument {
    spec: InstrumentSpec,
    pool: VoicePool,
    sample_rate: u32,
    next_age: u64,
}

impl SynthInstrument {
    pub fn new(spec: InstrumentSpec, polyphony: usize, sample_rate: u32) -> Self {
        Self {
            spec,
            pool: VoicePool::new(polyphony),
            sample_rate,
            next_age: 0,
        }
    }

    pub fn spec(&self) -> &InstrumentSpec {
        &self.spec
    }
}

impl Instrument for SynthInstrument {
    fn note_on(&mut self, trigger: NoteTrigger) -> bool {
        let voice = Voice::new(&self.spec, &self.spec.envelope, trigger, self.sample_rate, self.next_age);
        self.next_age += 1;
        let (_, stolen) = self.pool.allocate(voice);
        stolen
    }

    fn set_envelope(&mut self, envelope: AdsrParams) {
        self.spec.envelope = envelope.sanitized(self.spec.envelope);
    }

    fn render(&mut self, output: &mut AudioBuffer) {
        let (left, right) = output.stereo_mut();
        self.pool.render_all(left, right);
    }

    fn active_voices(&self) -> usize {
        self.pool.active_count()
    }
}
