//! Beat-based time representation.
//!
//! `MusicalTime` is the transport coordinate every scheduled event is
//! stamped with. Positions are exact (integer beats plus a fixed-point
//! fraction) so that events enqueued at "the same" time compare equal.

use core::fmt;

/// Subdivisions per beat. LCM(1..16) = 720720, so any grid from whole
/// beats down to sixteenths (and triplets) lands on an exact sub-beat.
pub const SUB_BEAT_UNIT: u32 = 720_720;

/// A position in musical time (beats + fractional sub-beat).
///
/// Ordering: beat is primary, sub_beat is secondary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MusicalTime {
    /// Whole beats from transport zero
    pub beat: u64,
    /// Fraction of a beat: 0..SUB_BEAT_UNIT
    pub sub_beat: u32,
}

impl MusicalTime {
    /// Transport zero.
    pub const fn zero() -> Self {
        Self { beat: 0, sub_beat: 0 }
    }

    /// Create a time at an exact beat boundary.
    pub const fn from_beats(beat: u64) -> Self {
        Self { beat, sub_beat: 0 }
    }

    /// Quantize a fractional beat position to the nearest sub-beat.
    ///
    /// Negative and non-finite inputs map to zero.
    pub fn from_beats_f64(beats: f64) -> Self {
        if !beats.is_finite() || beats <= 0.0 {
            return Self::zero();
        }
        let whole = libm::floor(beats);
        let frac = libm::round((beats - whole) * SUB_BEAT_UNIT as f64) as u64;
        // Rounding can carry a full beat.
        let carry = frac / SUB_BEAT_UNIT as u64;
        Self {
            beat: whole as u64 + carry,
            sub_beat: (frac % SUB_BEAT_UNIT as u64) as u32,
        }
    }

    /// This position as fractional beats.
    pub fn as_beats_f64(self) -> f64 {
        self.beat as f64 + self.sub_beat as f64 / SUB_BEAT_UNIT as f64
    }

    /// Advance by `steps` subdivisions of a beat (e.g. 2 per beat for
    /// eighth notes in 4/4).
    pub fn add_steps(self, steps: u32, steps_per_beat: u32) -> Self {
        if steps_per_beat == 0 {
            return self;
        }
        let sub_per_step = SUB_BEAT_UNIT / steps_per_beat;
        let total_sub = self.sub_beat as u64 + steps as u64 * sub_per_step as u64;
        Self {
            beat: self.beat + total_sub / SUB_BEAT_UNIT as u64,
            sub_beat: (total_sub % SUB_BEAT_UNIT as u64) as u32,
        }
    }
}

impl PartialOrd for MusicalTime {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MusicalTime {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.beat.cmp(&other.beat).then(self.sub_beat.cmp(&other.sub_beat))
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} beats", self.as_beats_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_default() {
        assert_eq!(MusicalTime::zero(), MusicalTime::default());
    }

    #[test]
    fn ordering() {
        let t0 = MusicalTime::zero();
        let t1 = MusicalTime::from_beats(1);
        let t_half = MusicalTime { beat: 0, sub_beat: SUB_BEAT_UNIT / 2 };
        assert!(t0 < t_half);
        assert!(t_half < t1);
    }

    #[test]
    fn from_beats_f64_exact_halves() {
        let t = MusicalTime::from_beats_f64(2.5);
        assert_eq!(t.beat, 2);
        assert_eq!(t.sub_beat, SUB_BEAT_UNIT / 2);
        assert_eq!(t.as_beats_f64(), 2.5);
    }

    #[test]
    fn from_beats_f64_equal_inputs_compare_equal() {
        assert_eq!(MusicalTime::from_beats_f64(0.5), MusicalTime::from_beats_f64(0.5));
    }

    #[test]
    fn from_beats_f64_rounding_carries() {
        let t = MusicalTime::from_beats_f64(0.999_999_999_9);
        assert_eq!(t, MusicalTime::from_beats(1));
    }

    #[test]
    fn from_beats_f64_rejects_negative_and_nan() {
        assert_eq!(MusicalTime::from_beats_f64(-3.0), MusicalTime::zero());
        assert_eq!(MusicalTime::from_beats_f64(f64::NAN), MusicalTime::zero());
    }

    #[test]
    fn add_steps_crosses_beat_boundary() {
        // 4 steps/beat, add 6 steps = 1 beat + 2 steps
        let t = MusicalTime::zero().add_steps(6, 4);
        assert_eq!(t.beat, 1);
        assert_eq!(t.sub_beat, 2 * (SUB_BEAT_UNIT / 4));
    }

    #[test]
    fn add_steps_zero_resolution_is_noop() {
        let t = MusicalTime::from_beats(5);
        assert_eq!(t.add_steps(10, 0), t);
    }

    #[test]
    fn sub_beat_unit_divisibility() {
        for n in 1..=16 {
            assert_eq!(SUB_BEAT_UNIT % n, 0, "SUB_BEAT_UNIT not divisible by {}", n);
        }
    }
}
