//! Built-in effect processors.

mod delay;
mod distortion;
mod filter;
mod reverb;

use alloc::boxed::Box;

use tw_ir::EffectKind;

use crate::processor::{Effect, EffectInfo};

pub use delay::FeedbackDelay;
pub use distortion::Distortion;
pub use filter::{Biquad, FilterMode};
pub use reverb::Reverb;

/// Uninitialized processor for `kind`; call [`Effect::init`] before use.
pub fn new_effect(kind: EffectKind) -> Box<dyn Effect> {
    match kind {
        EffectKind::Filter => Box::new(Biquad::new()),
        EffectKind::Delay => Box::new(FeedbackDelay::new()),
        EffectKind::Distortion => Box::new(Distortion::new()),
        EffectKind::Reverb => Box::new(Reverb::new()),
    }
}

/// Parameter table for `kind`, available without an instance.
pub fn info_for(kind: EffectKind) -> &'static EffectInfo {
    match kind {
        EffectKind::Filter => &filter::INFO,
        EffectKind::Delay => &delay::INFO,
        EffectKind::Distortion => &distortion::INFO,
        EffectKind::Reverb => &reverb::INFO,
    }
}

/// Linear dry/wet blend.
#[inline]
fn blend(dry: f32, wet: f32, amount: f32) -> f32 {
    dry + (wet - dry) * amount
}
