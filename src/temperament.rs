//! Named microtonal tunings applied to pitch space values at realization time.

use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;

use crate::seed::RandomStream;

// -------------------------------------------------------------------------------------------------

const PYTHAGOREAN: [f64; 12] = [
    0.00, 0.90, 2.04, 2.94, 4.08, 4.98, 6.00, 7.02, 7.92, 9.06, 9.96, 11.09,
];
const JUST: [f64; 12] = [
    0.00, 1.12, 2.04, 3.16, 3.86, 4.98, 6.00, 7.02, 8.14, 8.84, 10.18, 10.88,
];
const MEAN_TONE: [f64; 12] = [
    0.00, 1.17, 1.93, 3.10, 3.86, 5.03, 5.80, 6.97, 8.14, 8.90, 10.07, 10.83,
];

/// A tuning map from pitch class to a real pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Temperament {
    #[default]
    TwelveEqual,
    Pythagorean,
    Just,
    MeanTone,
    Split24Upper,
    Split24Lower,
    Interleave24Even,
    Interleave24Odd,
    NoiseLight,
    NoiseMedium,
    NoiseHeavy,
    NoiseUser,
}

lazy_static! {
    static ref TEMPERAMENT_NAMES: HashMap<&'static str, Temperament> = {
        use Temperament::*;
        HashMap::from([
            ("twelveequal", TwelveEqual),
            ("12equal", TwelveEqual),
            ("12", TwelveEqual),
            ("te", TwelveEqual),
            ("pythagorean", Pythagorean),
            ("12pythagorean", Pythagorean),
            ("p", Pythagorean),
            ("just", Just),
            ("12just", Just),
            ("j", Just),
            ("meantone", MeanTone),
            ("12meantone", MeanTone),
            ("mean", MeanTone),
            ("mt", MeanTone),
            ("split24upper", Split24Upper),
            ("24splitupper", Split24Upper),
            ("su", Split24Upper),
            ("split24lower", Split24Lower),
            ("24splitlower", Split24Lower),
            ("sl", Split24Lower),
            ("interleave24even", Interleave24Even),
            ("24interleaveeven", Interleave24Even),
            ("ie", Interleave24Even),
            ("interleave24odd", Interleave24Odd),
            ("24interleaveodd", Interleave24Odd),
            ("io", Interleave24Odd),
            ("noiselight", NoiseLight),
            ("12noiselight", NoiseLight),
            ("nl", NoiseLight),
            ("noisemedium", NoiseMedium),
            ("12noisemedium", NoiseMedium),
            ("nm", NoiseMedium),
            ("noiseheavy", NoiseHeavy),
            ("12noiseheavy", NoiseHeavy),
            ("nh", NoiseHeavy),
            ("noiseuser", NoiseUser),
            ("12noiseuser", NoiseUser),
            ("nu", NoiseUser),
        ])
    };
}

impl Temperament {
    pub const ALL: [Temperament; 12] = [
        Temperament::TwelveEqual,
        Temperament::Pythagorean,
        Temperament::Just,
        Temperament::MeanTone,
        Temperament::Split24Upper,
        Temperament::Split24Lower,
        Temperament::Interleave24Even,
        Temperament::Interleave24Odd,
        Temperament::NoiseLight,
        Temperament::NoiseMedium,
        Temperament::NoiseHeavy,
        Temperament::NoiseUser,
    ];

    /// Maximum noise deviation in semitones, for the noise temperaments.
    fn max_noise(&self) -> Option<f64> {
        match self {
            Temperament::NoiseLight => Some(0.05),
            Temperament::NoiseMedium => Some(0.10),
            Temperament::NoiseHeavy => Some(0.15),
            Temperament::NoiseUser => Some(0.50),
            _ => None,
        }
    }

    /// True when the temperament draws random values.
    pub fn is_random(&self) -> bool {
        self.max_noise().is_some()
    }

    /// Map a pitch space value (octave and transposition already applied). The octave is
    /// kept, the integer pitch class is remapped and microtones are passed through.
    pub fn apply(&self, ps: f64, rand: &mut RandomStream) -> f64 {
        let octave = ps.div_euclid(12.0);
        let pitch = ps.rem_euclid(12.0);
        let pc = pitch.floor();
        let micro = pitch - pc;
        let index = (pc as usize).min(11);
        let mapped = match self {
            Temperament::TwelveEqual | Temperament::Interleave24Even => pc,
            Temperament::Pythagorean => PYTHAGOREAN[index],
            Temperament::Just => JUST[index],
            Temperament::MeanTone => MEAN_TONE[index],
            Temperament::Split24Lower => pc * 0.5,
            Temperament::Split24Upper => pc * 0.5 + 6.0,
            Temperament::Interleave24Odd => pc + 0.5,
            Temperament::NoiseLight
            | Temperament::NoiseMedium
            | Temperament::NoiseHeavy
            | Temperament::NoiseUser => {
                let max = self.max_noise().unwrap_or(0.0);
                pc + rand.uniform(-max, max)
            }
        };
        octave * 12.0 + mapped + micro
    }
}

impl TryFrom<&str> for Temperament {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        TEMPERAMENT_NAMES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| format!("invalid temperament name '{}'", s))
    }
}

impl Display for Temperament {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// -------------------------------------------------------------------------------------------------
