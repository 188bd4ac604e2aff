//! Freeverb-style stereo reverb: eight damped combs in parallel feeding
//! four allpasses in series, per side.

use alloc::vec;
use alloc::vec::Vec;

use tw_ir::{AudioBuffer, EffectKind};

use super::blend;
use crate::processor::{Effect, EffectInfo, ParamInfo};

pub const PARAM_DECAY: u16 = 0;
pub const PARAM_DAMPING: u16 = 1;
pub const PARAM_WET: u16 = 2;

static PARAMS: &[ParamInfo] = &[
    ParamInfo { id: PARAM_DECAY, name: "decay", min: 0.1, max: 10.0, default: 2.0 },
    ParamInfo { id: PARAM_DAMPING, name: "damping", min: 0.0, max: 1.0, default: 0.5 },
    ParamInfo { id: PARAM_WET, name: "wet", min: 0.0, max: 1.0, default: 1.0 },
];

pub(super) static INFO: EffectInfo = EffectInfo {
    name: "Reverb",
    kind: EffectKind::Reverb,
    params: PARAMS,
};

// Tunings in samples at 44.1 kHz.
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const INPUT_GAIN: f32 = 0.015;
const WET_SCALE: f32 = 3.0;
const MAX_FEEDBACK: f32 = 0.98;

struct Comb {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self { buffer: vec![0.0; len.max(1)], index: 0, feedback: 0.0, store: 0.0 }
    }

    /// Feedback giving a 60 dB decay over `decay_secs`.
    fn set_decay(&mut self, decay_secs: f32, sample_rate: u32) {
        let loop_secs = self.buffer.len() as f32 / sample_rate.max(1) as f32;
        self.feedback = libm::powf(10.0, -3.0 * loop_secs / decay_secs).min(MAX_FEEDBACK);
    }

    #[inline]
    fn tick(&mut self, input: f32, damp: f32) -> f32 {
        let out = self.buffer[self.index];
        self.store = out * (1.0 - damp) + self.store * damp;
        self.buffer[self.index] = input + self.store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.store = 0.0;
    }
}

struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self { buffer: vec![0.0; len.max(1)], index: 0 }
    }

    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        self.buffer[self.index] = input + buffered * 0.5;
        self.index = (self.index + 1) % self.buffer.len();
        buffered - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

#[derive(Default)]
struct Side {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Side {
    fn build(sample_rate: u32, spread: usize) -> Self {
        let scale = sample_rate as f32 / 44_100.0;
        let len = |t: usize| (t as f32 * scale) as usize + spread;
        Self {
            combs: COMB_TUNING.iter().map(|&t| Comb::new(len(t))).collect(),
            allpasses: ALLPASS_TUNING.iter().map(|&t| Allpass::new(len(t))).collect(),
        }
    }

    #[inline]
    fn tick(&mut self, input: f32, damp: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.tick(input, damp);
        }
        for ap in &mut self.allpasses {
            out = ap.tick(out);
        }
        out
    }
}

pub struct Reverb {
    left: Side,
    right: Side,
    sample_rate: u32,
    decay: f32,
    damping: f32,
    wet: f32,
}

impl Reverb {
    pub fn new() -> Self {
        Self {
            left: Side::default(),
            right: Side::default(),
            sample_rate: 0,
            decay: PARAMS[0].default,
            damping: PARAMS[1].default,
            wet: PARAMS[2].default,
        }
    }

    fn update_feedback(&mut self) {
        let (decay, sr) = (self.decay, self.sample_rate);
        for comb in self.left.combs.iter_mut().chain(self.right.combs.iter_mut()) {
            comb.set_decay(decay, sr);
        }
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Reverb {
    fn info(&self) -> &'static EffectInfo {
        &INFO
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.left = Side::build(sample_rate, 0);
        self.right = Side::build(sample_rate, STEREO_SPREAD);
        self.update_feedback();
    }

    fn set_param(&mut self, param: u16, value: f32) {
        let Some(info) = PARAMS.get(param as usize) else { return };
        let value = info.sanitize(value);
        match param {
            PARAM_DECAY => {
                self.decay = value;
                self.update_feedback();
            }
            PARAM_DAMPING => self.damping = value,
            PARAM_WET => self.wet = value,
            _ => {}
        }
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.left.combs.is_empty() {
            return;
        }
        let damp = self.damping * 0.4;
        let (left, right) = buffer.stereo_mut();
        for i in 0..left.len() {
            let xl = left[i];
            let xr = right.get(i).copied().unwrap_or(xl);
            let input = (xl + xr) * INPUT_GAIN;
            let wl = self.left.tick(input, damp) * WET_SCALE;
            let wr = self.right.tick(input, damp) * WET_SCALE;
            left[i] = blend(xl, wl, self.wet);
            if let Some(r) = right.get_mut(i) {
                *r = blend(xr, wr, self.wet);
            }
        }
    }

    fn reset(&mut self) {
        for side in [&mut self.left, &mut self.right] {
            side.combs.iter_mut().for_each(Comb::clear);
            side.allpasses.iter_mut().for_each(Allpass::clear);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(buf: &AudioBuffer) -> f32 {
        buf.channel(0).iter().map(|s| s * s).sum()
    }

    fn tail_energy(decay: f32) -> f32 {
        let mut r = Reverb::new();
        r.init(44_100);
        r.set_param(PARAM_DECAY, decay);
        let mut buf = AudioBuffer::stereo(256);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[0] = 1.0;
        r.process(&mut buf);
        let mut total = 0.0;
        for block in 0..200 {
            let mut b = AudioBuffer::stereo(256);
            r.process(&mut b);
            if block >= 100 {
                total += energy(&b);
            }
        }
        total
    }

    #[test]
    fn longer_decay_rings_longer() {
        assert!(tail_energy(5.0) > tail_energy(0.5) * 10.0);
    }

    #[test]
    fn feedback_matches_rt60() {
        let mut c = Comb::new(441);
        c.set_decay(1.0, 44_100);
        // 100 trips around a 10 ms loop is one second: -60 dB.
        let after_one_second = libm::powf(c.feedback, 100.0);
        assert!((after_one_second - 0.001).abs() < 1e-5);
    }

    #[test]
    fn reset_silences_tail() {
        let mut r = Reverb::new();
        r.init(44_100);
        let mut buf = AudioBuffer::stereo(256);
        buf.channel_mut(0)[0] = 1.0;
        r.process(&mut buf);
        r.reset();
        let mut next = AudioBuffer::stereo(4096);
        r.process(&mut next);
        assert!(next.is_silent());
    }

    #[test]
    fn sides_are_decorrelated() {
        let mut r = Reverb::new();
        r.init(44_100);
        let mut buf = AudioBuffer::stereo(4096);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[0] = 1.0;
        r.process(&mut buf);
        assert_ne!(buf.channel(0), buf.channel(1));
    }
}
