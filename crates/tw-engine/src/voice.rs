//! Voice: one sounding note of a synthesized instrument.

use tw_ir::{AdsrParams, InstrumentSpec};

use crate::envelope::Envelope;
use crate::oscillator::Oscillator;

/// Headroom per voice so a handful of overlapping notes stay below full scale.
pub const VOICE_GAIN: f32 = 0.5;

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Gate open (or waiting for its start offset).
    #[default]
    Active,
    /// Gate closed; envelope releasing.
    Released,
}

/// Sample-accurate note request handed to an instrument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteTrigger {
    pub frequency: f32,
    /// 0..=1
    pub velocity: f32,
    /// Frames into the current block before the note starts.
    pub offset: u32,
    /// Frames the gate stays open, counted from the note start.
    pub gate: u32,
}

/// A single voice producing audio from an oscillator and envelope.
#[derive(Clone, Debug)]
pub struct Voice {
    osc: Oscillator,
    env: Envelope,
    velocity: f32,
    delay: u32,
    gate: u32,
    pub state: VoiceState,
    /// Allocation order, used to pick the oldest voice when stealing.
    pub age: u64,
}

impl Voice {
    pub fn new(
        spec: &InstrumentSpec,
        envelope: &AdsrParams,
        trigger: NoteTrigger,
        sample_rate: u32,
        age: u64,
    ) -> Self {
        let osc = Oscillator::new(
            spec.kind,
            trigger.frequency,
            spec.harmonicity,
            spec.modulation_index,
            sample_rate,
        );
        let mut env = Envelope::new(envelope, sample_rate);
        env.gate_on();
        let velocity = if trigger.velocity.is_finite() { trigger.velocity.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            osc,
            env,
            velocity,
            delay: trigger.offset,
            gate: trigger.gate,
            state: VoiceState::Active,
            age,
        }
    }

    /// True once the release has fully decayed.
    pub fn is_finished(&self) -> bool {
        self.delay == 0 && self.env.is_finished()
    }

    /// Sum this voice into `left` / `right` (equal level, panning happens
    /// on the channel).
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        for i in 0..left.len() {
            if self.delay > 0 {
                self.delay -= 1;
                continue;
            }
            if self.state == VoiceState::Active {
                if self.gate == 0 {
                    self.state = VoiceState::Released;
                    self.env.gate_off();
                } else {
                    self.gate -= 1;
                }
            }
            if self.env.is_finished() {
                return;
            }
            let s = self.osc.next_sample() * self.env.next_level() * self.velocity * VOICE_GAIN;
            left[i] += s;
            if let Some(r) = right.get_mut(i) {
                *r += s;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_ir::InstrumentKind;

    const SR: u32 = 1000;

    fn voice(offset: u32, gate: u32) -> Voice {
        let spec = InstrumentSpec::new(InstrumentKind::Basic);
        let env = AdsrParams::new(0.0, 0.0, 1.0, 0.01);
        let trigger = NoteTrigger { frequency: 50.0, velocity: 1.0, offset, gate };
        Voice::new(&spec, &env, trigger, SR, 0)
    }

    fn render(v: &mut Voice, n: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0; n];
        let mut r = vec![0.0; n];
        v.render(&mut l, &mut r);
        (l, r)
    }

    #[test]
    fn start_offset_is_sample_accurate() {
        let mut v = voice(10, 100);
        let (l, r) = render(&mut v, 20);
        assert!(l[..11].iter().all(|s| *s == 0.0), "silent through offset");
        assert!(l[11] != 0.0);
        assert_eq!(l, r);
    }

    #[test]
    fn gate_closes_after_duration() {
        let mut v = voice(0, 30);
        render(&mut v, 30);
        assert_eq!(v.state, VoiceState::Active);
        render(&mut v, 1);
        assert_eq!(v.state, VoiceState::Released);
    }

    #[test]
    fn finishes_after_release() {
        let mut v = voice(0, 5);
        render(&mut v, 5 + 1 + 10);
        assert!(v.is_finished());
        let (l, _) = render(&mut v, 8);
        assert!(l.iter().all(|s| *s == 0.0));
    }
}
