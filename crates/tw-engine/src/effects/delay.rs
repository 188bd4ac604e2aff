//! Stereo feedback delay.

use alloc::vec;
use alloc::vec::Vec;

use tw_ir::{AudioBuffer, EffectKind};

use super::blend;
use crate::processor::{Effect, EffectInfo, ParamInfo};

pub const PARAM_TIME: u16 = 0;
pub const PARAM_FEEDBACK: u16 = 1;
pub const PARAM_WET: u16 = 2;

/// Longest delay the line is sized for, in seconds.
const MAX_TIME: f32 = 2.0;

static PARAMS: &[ParamInfo] = &[
    // Default is an eighth note at 120 BPM.
    ParamInfo { id: PARAM_TIME, name: "time", min: 0.001, max: MAX_TIME, default: 0.25 },
    ParamInfo { id: PARAM_FEEDBACK, name: "feedback", min: 0.0, max: 0.95, default: 0.3 },
    ParamInfo { id: PARAM_WET, name: "wet", min: 0.0, max: 1.0, default: 1.0 },
];

pub(super) static INFO: EffectInfo = EffectInfo {
    name: "Feedback Delay",
    kind: EffectKind::Delay,
    params: PARAMS,
};

pub struct FeedbackDelay {
    line_l: Vec<f32>,
    line_r: Vec<f32>,
    write_pos: usize,
    sample_rate: u32,
    time: f32,
    delay_samples: usize,
    feedback: f32,
    wet: f32,
}

impl FeedbackDelay {
    pub fn new() -> Self {
        Self {
            line_l: Vec::new(),
            line_r: Vec::new(),
            write_pos: 0,
            sample_rate: 0,
            time: PARAMS[0].default,
            delay_samples: 1,
            feedback: PARAMS[1].default,
            wet: PARAMS[2].default,
        }
    }

    fn update_delay(&mut self) {
        let len = self.line_l.len().max(2);
        let samples = libm::roundf(self.time * self.sample_rate as f32) as usize;
        self.delay_samples = samples.clamp(1, len - 1);
    }
}

impl Default for FeedbackDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for FeedbackDelay {
    fn info(&self) -> &'static EffectInfo {
        &INFO
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        let len = (MAX_TIME * sample_rate as f32) as usize + 1;
        self.line_l = vec![0.0; len];
        self.line_r = vec![0.0; len];
        self.write_pos = 0;
        self.update_delay();
    }

    fn set_param(&mut self, param: u16, value: f32) {
        let Some(info) = PARAMS.get(param as usize) else { return };
        let value = info.sanitize(value);
        match param {
            PARAM_TIME => {
                self.time = value;
                self.update_delay();
            }
            PARAM_FEEDBACK => self.feedback = value,
            PARAM_WET => self.wet = value,
            _ => {}
        }
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let len = self.line_l.len();
        if len < 2 {
            return;
        }
        let (left, right) = buffer.stereo_mut();
        let mut pos = self.write_pos;
        for i in 0..left.len() {
            let read = (pos + len - self.delay_samples) % len;
            let (dl, dr) = (self.line_l[read], self.line_r[read]);
            let (xl, xr) = (left[i], right.get(i).copied().unwrap_or(0.0));
            self.line_l[pos] = xl + dl * self.feedback;
            self.line_r[pos] = xr + dr * self.feedback;
            left[i] = blend(xl, dl, self.wet);
            if let Some(r) = right.get_mut(i) {
                *r = blend(xr, dr, self.wet);
            }
            pos = (pos + 1) % len;
        }
        self.write_pos = pos;
    }

    fn reset(&mut self) {
        self.line_l.fill(0.0);
        self.line_r.fill(0.0);
        self.write_pos = 0;
    }
}
