//! Scientific pitch notation ("C4", "F#3", "Bb5") and twelve-tone equal
//! temperament frequency conversion.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// Reference tuning: A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

const LOWEST_OCTAVE: i8 = -1;
const HIGHEST_OCTAVE: i8 = 9;

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Failure to parse a pitch name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PitchError {
    #[error("empty pitch name")]
    Empty,
    #[error("invalid note letter '{0}' (expected A-G)")]
    InvalidLetter(char),
    #[error("missing octave number")]
    MissingOctave,
    #[error("invalid octave (expected {LOWEST_OCTAVE}..={HIGHEST_OCTAVE})")]
    InvalidOctave,
}

/// A pitch: a semitone class within an octave plus the octave number.
///
/// C4 is middle C, A4 is the 440 Hz reference. Enharmonic spellings
/// ("C#4", "Db4") parse to the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pitch {
    octave: i8,
    /// Semitones above C within the octave (0..12).
    class: u8,
}

impl Pitch {
    /// Build from a semitone class above C and an octave.
    pub fn new(class: u8, octave: i8) -> Option<Self> {
        if class < 12 && (LOWEST_OCTAVE..=HIGHEST_OCTAVE).contains(&octave) {
            Some(Self { octave, class })
        } else {
            None
        }
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// Semitone class above C (0..12).
    pub fn class(&self) -> u8 {
        self.class
    }

    /// Semitones relative to A within the same octave (C = -9, B = 2).
    pub fn semitone_from_a(&self) -> i32 {
        self.class as i32 - 9
    }

    /// Signed semitone distance from A4.
    pub fn offset_from_a4(&self) -> i32 {
        12 * (self.octave as i32 - 4) + self.semitone_from_a()
    }

    /// Frequency in Hz: `440 * 2^(offset / 12)`.
    pub fn frequency(&self) -> f32 {
        A4_FREQUENCY * libm::exp2f(self.offset_from_a4() as f32 / 12.0)
    }
}

fn letter_class(letter: char) -> Result<i32, PitchError> {
    match letter.to_ascii_uppercase() {
        'C' => Ok(0),
        'D' => Ok(2),
        'E' => Ok(4),
        'F' => Ok(5),
        'G' => Ok(7),
        'A' => Ok(9),
        'B' => Ok(11),
        other => Err(PitchError::InvalidLetter(other)),
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(PitchError::Empty)?;
        let mut class = letter_class(letter)?;

        let mut rest = chars.as_str();
        loop {
            if let Some(r) = rest.strip_prefix('#') {
                class += 1;
                rest = r;
            } else if let Some(r) = rest.strip_prefix('b') {
                class -= 1;
                rest = r;
            } else {
                break;
            }
        }
        if rest.is_empty() {
            return Err(PitchError::MissingOctave);
        }
        let mut octave: i32 = rest.parse().map_err(|_| PitchError::InvalidOctave)?;

        // B#3 is C4, Cb4 is B3.
        octave += class.div_euclid(12);
        let class = class.rem_euclid(12) as u8;
        let octave = i8::try_from(octave).map_err(|_| PitchError::InvalidOctave)?;
        Self::new(class, octave).ok_or(PitchError::InvalidOctave)
    }
}

impl TryFrom<&str> for Pitch {
    type Error = PitchError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NAMES[self.class as usize], self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn a4_is_reference() {
        assert_eq!(p("A4").frequency(), 440.0);
        assert_eq!(p("A4").offset_from_a4(), 0);
    }

    #[test]
    fn middle_c() {
        let c4 = p("C4");
        assert_eq!(c4.offset_from_a4(), -9);
        assert!((c4.frequency() - 261.6256).abs() < 0.01);
    }

    #[test]
    fn octaves_double() {
        assert!((p("A5").frequency() - 880.0).abs() < 1e-3);
        assert!((p("A3").frequency() - 220.0).abs() < 1e-3);
    }

    #[test]
    fn every_name_matches_formula() {
        for octave in 0..=8i32 {
            for (semi, name) in NAMES.iter().enumerate() {
                let text = format!("{name}{octave}");
                let expected =
                    440.0f64 * 2f64.powf((12 * (octave - 4) + semi as i32 - 9) as f64 / 12.0);
                let got = p(&text).frequency() as f64;
                assert!(
                    (got - expected).abs() / expected < 1e-5,
                    "{text}: got {got}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn enharmonics_are_equal() {
        assert_eq!(p("C#4"), p("Db4"));
        assert_eq!(p("B#3"), p("C4"));
        assert_eq!(p("Cb4"), p("B3"));
    }

    #[test]
    fn lowercase_letter_accepted() {
        assert_eq!(p("e2"), p("E2"));
    }

    #[test]
    fn negative_octave() {
        let c = p("C-1");
        assert_eq!((c.class(), c.octave()), (0, -1));
        assert_eq!(c.offset_from_a4(), -69);
    }

    #[test]
    fn display_uses_sharps() {
        let pitch = Pitch::new(1, 4).unwrap();
        assert_eq!(pitch.to_string(), "C#4");
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<Pitch>(), Err(PitchError::Empty));
        assert_eq!("H4".parse::<Pitch>(), Err(PitchError::InvalidLetter('H')));
        assert_eq!("C#".parse::<Pitch>(), Err(PitchError::MissingOctave));
        assert_eq!("C10".parse::<Pitch>(), Err(PitchError::InvalidOctave));
        assert_eq!("Cx".parse::<Pitch>(), Err(PitchError::InvalidOctave));
    }
}
