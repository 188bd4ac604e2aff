//! RBJ cookbook biquad, Direct Form II Transposed, one state pair per side.

use core::f32::consts::TAU;

use tw_ir::{AudioBuffer, EffectKind};

use crate::processor::{Effect, EffectInfo, ParamInfo};

pub const PARAM_FREQUENCY: u16 = 0;
pub const PARAM_Q: u16 = 1;
pub const PARAM_MODE: u16 = 2;

static PARAMS: &[ParamInfo] = &[
    ParamInfo { id: PARAM_FREQUENCY, name: "frequency", min: 20.0, max: 20_000.0, default: 1000.0 },
    ParamInfo { id: PARAM_Q, name: "q", min: 0.1, max: 20.0, default: 1.0 },
    ParamInfo { id: PARAM_MODE, name: "mode", min: 0.0, max: 2.0, default: 0.0 },
];

pub(super) static INFO: EffectInfo = EffectInfo {
    name: "Filter",
    kind: EffectKind::Filter,
    params: PARAMS,
};

/// Response shape, selected by the `mode` parameter (0, 1, 2).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
}

impl FilterMode {
    fn from_param(v: f32) -> Self {
        match libm::roundf(v) as i32 {
            1 => FilterMode::Highpass,
            2 => FilterMode::Bandpass,
            _ => FilterMode::Lowpass,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct State {
    z1: f32,
    z2: f32,
}

pub struct Biquad {
    mode: FilterMode,
    frequency: f32,
    q: f32,
    sample_rate: u32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    left: State,
    right: State,
}

impl Biquad {
    pub fn new() -> Self {
        let mut f = Self {
            mode: FilterMode::Lowpass,
            frequency: PARAMS[0].default,
            q: PARAMS[1].default,
            sample_rate: 44_100,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            left: State::default(),
            right: State::default(),
        };
        f.update_coefficients();
        f
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    fn update_coefficients(&mut self) {
        let nyquist_guard = self.sample_rate as f32 * 0.45;
        let freq = self.frequency.min(nyquist_guard);
        let w0 = TAU * freq / self.sample_rate as f32;
        let (sin_w0, cos_w0) = (libm::sinf(w0), libm::cosf(w0));
        let alpha = sin_w0 / (2.0 * self.q);

        let (b0, b1, b2) = match self.mode {
            FilterMode::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterMode::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
            FilterMode::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    fn tick(&self, s: &mut State, x: f32) -> f32 {
        let y = self.b0 * x + s.z1;
        s.z1 = self.b1 * x - self.a1 * y + s.z2;
        s.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Biquad {
    fn info(&self) -> &'static EffectInfo {
        &INFO
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
        self.update_coefficients();
    }

    fn set_param(&mut self, param: u16, value: f32) {
        let Some(info) = PARAMS.get(param as usize) else { return };
        let value = info.sanitize(value);
        match param {
            PARAM_FREQUENCY => self.frequency = value,
            PARAM_Q => self.q = value,
            PARAM_MODE => self.mode = FilterMode::from_param(value),
            _ => return,
        }
        self.update_coefficients();
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let mut left_state = self.left;
        let mut right_state = self.right;
        let (left, right) = buffer.stereo_mut();
        for x in left.iter_mut() {
            *x = self.tick(&mut left_state, *x);
        }
        for x in right.iter_mut() {
            *x = self.tick(&mut right_state, *x);
        }
        self.left = left_state;
        self.right = right_state;
    }

    fn reset(&mut self) {
        self.left = State::default();
        self.right = State::default();
    }
}
