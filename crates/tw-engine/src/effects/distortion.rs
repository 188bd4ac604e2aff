//! Memoryless waveshaping distortion.

use core::f32::consts::PI;

use tw_ir::{AudioBuffer, EffectKind};

use super::blend;
use crate::processor::{Effect, EffectInfo, ParamInfo};

pub const PARAM_AMOUNT: u16 = 0;
pub const PARAM_WET: u16 = 1;

static PARAMS: &[ParamInfo] = &[
    ParamInfo { id: PARAM_AMOUNT, name: "amount", min: 0.0, max: 1.0, default: 0.4 },
    ParamInfo { id: PARAM_WET, name: "wet", min: 0.0, max: 1.0, default: 1.0 },
];

pub(super) static INFO: EffectInfo = EffectInfo {
    name: "Distortion",
    kind: EffectKind::Distortion,
    params: PARAMS,
};

const DEG: f32 = PI / 180.0;

/// `y = (3 + k) · x · 20° / (π + k·|x|)` with `k = amount · 100`, input
/// clamped to the curve's `-1..=1` domain.
#[inline]
fn shape(x: f32, k: f32) -> f32 {
    let x = x.clamp(-1.0, 1.0);
    (3.0 + k) * x * 20.0 * DEG / (PI + k * x.abs())
}

pub struct Distortion {
    k: f32,
    wet: f32,
}

impl Distortion {
    pub fn new() -> Self {
        Self { k: PARAMS[0].default * 100.0, wet: PARAMS[1].default }
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Distortion {
    fn info(&self) -> &'static EffectInfo {
        &INFO
    }

    fn init(&mut self, _sample_rate: u32) {}

    fn set_param(&mut self, param: u16, value: f32) {
        let Some(info) = PARAMS.get(param as usize) else { return };
        let value = info.sanitize(value);
        match param {
            PARAM_AMOUNT => self.k = value * 100.0,
            PARAM_WET => self.wet = value,
            _ => {}
        }
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let (left, right) = buffer.stereo_mut();
        for x in left.iter_mut().chain(right.iter_mut()) {
            *x = blend(*x, shape(*x, self.k), self.wet);
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_is_odd_and_bounded() {
        for k in [0.0, 40.0, 100.0] {
            for i in -20..=20 {
                let x = i as f32 / 10.0;
                assert!((shape(x, k) + shape(-x, k)).abs() < 1e-6);
                assert!(shape(x, k).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn more_amount_saturates_harder() {
        // Small signals get more gain as k grows.
        assert!(shape(0.1, 100.0) > shape(0.1, 40.0));
        assert!(shape(0.1, 40.0) > shape(0.1, 0.0));
    }

    #[test]
    fn zero_wet_is_transparent() {
        let mut d = Distortion::new();
        d.set_param(PARAM_WET, 0.0);
        let mut buf = AudioBuffer::stereo(4);
        buf.channel_mut(0).copy_from_slice(&[0.1, -0.5, 0.9, 0.0]);
        let before = buf.clone();
        d.process(&mut buf);
        assert_eq!(buf, before);
    }
}
