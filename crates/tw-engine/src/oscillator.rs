//! Phase-accumulator oscillators for the three instrument topologies.

use core::f32::consts::TAU;

use tw_ir::InstrumentKind;

/// Normalized phase in `0.0..1.0` advanced by `freq / sample_rate` per sample.
#[derive(Clone, Copy, Debug, Default)]
struct Phase {
    value: f32,
    increment: f32,
}

impl Phase {
    fn new(freq: f32, sample_rate: u32) -> Self {
        let increment = if sample_rate == 0 { 0.0 } else { freq / sample_rate as f32 };
        Self { value: 0.0, increment }
    }

    #[inline]
    fn tick(&mut self) -> f32 {
        let p = self.value;
        self.value += self.increment;
        if self.value >= 1.0 {
            self.value -= libm::floorf(self.value);
        }
        p
    }
}

/// Triangle starting at zero, rising first.
#[inline]
fn triangle(p: f32) -> f32 {
    if p < 0.25 {
        4.0 * p
    } else if p < 0.75 {
        2.0 - 4.0 * p
    } else {
        4.0 * p - 4.0
    }
}

#[inline]
fn square(p: f32) -> f32 {
    if p < 0.5 {
        1.0
    } else {
        -1.0
    }
}

/// Per-voice tone generator.
///
/// - `Basic`: triangle carrier.
/// - `Fm`: sine carrier phase-modulated by a sine at `freq * harmonicity`,
///   deviation `modulation_index`.
/// - `Am`: sine carrier scaled by a unipolar square at `freq * harmonicity`.
#[derive(Clone, Debug)]
pub struct Oscillator {
    kind: InstrumentKind,
    carrier: Phase,
    modulator: Phase,
    modulation_index: f32,
}

impl Oscillator {
    pub fn new(
        kind: InstrumentKind,
        freq: f32,
        harmonicity: f32,
        modulation_index: f32,
        sample_rate: u32,
    ) -> Self {
        Self {
            kind,
            carrier: Phase::new(freq, sample_rate),
            modulator: Phase::new(freq * harmonicity, sample_rate),
            modulation_index,
        }
    }

    /// Next sample in `-1.0..=1.0`.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.kind {
            InstrumentKind::Basic => triangle(self.carrier.tick()),
            InstrumentKind::Fm => {
                let m = libm::sinf(TAU * self.modulator.tick());
                libm::sinf(TAU * self.carrier.tick() + self.modulation_index * m)
            }
            InstrumentKind::Am => {
                let gain = 0.5 + 0.5 * square(self.modulator.tick());
                libm::sinf(TAU * self.carrier.tick()) * gain
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_crossings(kind: InstrumentKind, freq: f32, sr: u32, n: usize) -> usize {
        let mut osc = Oscillator::new(kind, freq, 3.0, 0.0, sr);
        let mut prev = osc.next_sample();
        let mut count = 0;
        for _ in 1..n {
            let s = osc.next_sample();
            if (prev < 0.0) != (s < 0.0) {
                count += 1;
            }
            prev = s;
        }
        count
    }

    #[test]
    fn triangle_shape() {
        assert_eq!(triangle(0.0), 0.0);
        assert_eq!(triangle(0.25), 1.0);
        assert_eq!(triangle(0.5), 0.0);
        assert_eq!(triangle(0.75), -1.0);
    }

    #[test]
    fn basic_period_matches_frequency() {
        // 100 Hz at 48 kHz for one second: two crossings per cycle.
        let crossings = zero_crossings(InstrumentKind::Basic, 100.0, 48_000, 48_000);
        assert!((198..=202).contains(&crossings), "crossings = {crossings}");
    }

    #[test]
    fn fm_with_zero_index_is_a_sine() {
        let mut osc = Oscillator::new(InstrumentKind::Fm, 1000.0, 3.0, 0.0, 4000);
        let got: Vec<f32> = (0..4).map(|_| osc.next_sample()).collect();
        assert!(got[0].abs() < 1e-6);
        assert!((got[1] - 1.0).abs() < 1e-5);
        assert!(got[2].abs() < 1e-5);
        assert!((got[3] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn all_kinds_stay_in_range() {
        for kind in InstrumentKind::ALL {
            let mut osc = Oscillator::new(kind, 440.0, 3.0, 10.0, 44_100);
            for _ in 0..10_000 {
                let s = osc.next_sample();
                assert!((-1.0..=1.0).contains(&s), "{kind}: {s}");
            }
        }
    }

    #[test]
    fn am_gates_carrier() {
        // Modulator low half-cycle silences the carrier entirely.
        let mut osc = Oscillator::new(InstrumentKind::Am, 100.0, 1.0, 0.0, 1000);
        let samples: Vec<f32> = (0..10).map(|_| osc.next_sample()).collect();
        assert!(samples[6..].iter().all(|s| *s == 0.0));
        assert!(samples[1..5].iter().any(|s| *s > 0.1));
    }
}
