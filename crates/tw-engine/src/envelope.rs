//! Sample-rate ADSR envelope generator.

use tw_ir::AdsrParams;

/// Current envelope segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Linear-segment ADSR evaluated one sample at a time.
///
/// `Attack` ramps 0 → 1, `Decay` ramps 1 → sustain, `Sustain` holds until
/// [`gate_off`](Self::gate_off), then `Release` ramps from whatever level
/// was reached down to 0 and the envelope returns to `Idle`.
#[derive(Clone, Debug)]
pub struct Envelope {
    stage: Stage,
    level: f32,
    attack_step: f32,
    decay_step: f32,
    sustain: f32,
    release_samples: f32,
    release_step: f32,
}

fn samples(secs: f32, sample_rate: u32) -> f32 {
    (secs * sample_rate as f32).max(0.0)
}

impl Envelope {
    pub fn new(params: &AdsrParams, sample_rate: u32) -> Self {
        let params = params.sanitized(AdsrParams::default());
        let attack = samples(params.attack, sample_rate);
        let decay = samples(params.decay, sample_rate);
        Self {
            stage: Stage::Idle,
            level: 0.0,
            attack_step: if attack >= 1.0 { 1.0 / attack } else { 1.0 },
            decay_step: if decay >= 1.0 { (1.0 - params.sustain) / decay } else { 1.0 },
            sustain: params.sustain,
            release_samples: samples(params.release, sample_rate),
            release_step: 0.0,
        }
    }

    /// Start the attack from silence.
    pub fn gate_on(&mut self) {
        self.level = 0.0;
        self.stage = Stage::Attack;
    }

    /// Enter release from the current level. No-op when idle or releasing.
    pub fn gate_off(&mut self) {
        if matches!(self.stage, Stage::Idle | Stage::Release) {
            return;
        }
        self.stage = Stage::Release;
        self.release_step = if self.release_samples >= 1.0 {
            self.level / self.release_samples
        } else {
            self.level
        };
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// True once release has completed (or the envelope never started).
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn next_level(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => {}
            Stage::Attack => {
                self.level += self.attack_step;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level -= self.decay_step;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {}
            Stage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }
}
