//! Capability traits for sound sources and effects, plus the backend that
//! builds them.
//!
//! The scheduler and mixer only ever see `dyn Instrument` and `dyn Effect`,
//! so an alternative synthesis backend can be dropped in through
//! [`RenderBackend`] without touching either.

use alloc::boxed::Box;

use tw_ir::{AdsrParams, AudioBuffer, EffectKind, InstrumentSpec};

use crate::effects;
use crate::synth::SynthInstrument;
use crate::voice::NoteTrigger;

/// Metadata describing one effect parameter.
#[derive(Debug)]
pub struct ParamInfo {
    pub id: u16,
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamInfo {
    /// Clamp into range; non-finite values fall back to the default.
    pub fn sanitize(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

/// Static metadata about an effect processor.
#[derive(Debug)]
pub struct EffectInfo {
    pub name: &'static str,
    pub kind: EffectKind,
    pub params: &'static [ParamInfo],
}

impl EffectInfo {
    pub fn param(&self, name: &str) -> Option<&'static ParamInfo> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// A polyphonic sound source owned by one track.
///
/// `note_on` and `render` run in the render context and must not allocate.
pub trait Instrument: Send {
    /// Start a note. Returns `true` if a sounding voice had to be stolen.
    fn note_on(&mut self, trigger: NoteTrigger) -> bool;

    /// Replace the envelope used by subsequent notes.
    fn set_envelope(&mut self, envelope: AdsrParams);

    /// Sum this instrument's voices into `output`.
    fn render(&mut self, output: &mut AudioBuffer);

    /// Voices currently sounding (including releasing ones).
    fn active_voices(&self) -> usize;
}

/// One in-place stereo DSP transform.
pub trait Effect: Send {
    fn info(&self) -> &'static EffectInfo;

    /// Size internal state for `sample_rate`. Called once, before the
    /// processor reaches the render context; may allocate.
    fn init(&mut self, sample_rate: u32);

    /// Set a parameter by id. Out-of-range values are clamped.
    fn set_param(&mut self, param: u16, value: f32);

    /// Transform `buffer` in place.
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Clear internal state (delay lines, filter memory).
    fn reset(&mut self);
}

/// Factory for the processors a session uses.
pub trait RenderBackend: Send + Sync {
    fn create_instrument(
        &self,
        spec: &InstrumentSpec,
        polyphony: usize,
        sample_rate: u32,
    ) -> Box<dyn Instrument>;

    fn create_effect(&self, kind: EffectKind, sample_rate: u32) -> Box<dyn Effect>;
}

/// Pure software synthesis and DSP.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareBackend;

impl RenderBackend for SoftwareBackend {
    fn create_instrument(
        &self,
        spec: &InstrumentSpec,
        polyphony: usize,
        sample_rate: u32,
    ) -> Box<dyn Instrument> {
        Box::new(SynthInstrument::new(*spec, polyphony, sample_rate))
    }

    fn create_effect(&self, kind: EffectKind, sample_rate: u32) -> Box<dyn Effect> {
        let mut effect = effects::new_effect(kind);
        effect.init(sample_rate);
        effect
    }
}
