//! Pitches in pitch space (semitones from middle C = 0) and conversions to MIDI note
//! numbers, frequencies, Csound pch values and note names.

use std::fmt::Display;

// -------------------------------------------------------------------------------------------------

const PC_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Split a pitch space value into octave (0 = middle C octave), integer pitch class and
/// microtonal remainder.
pub fn split_ps(ps: f64) -> (i32, i32, f64) {
    let octave = ps.div_euclid(12.0);
    let pitch = ps.rem_euclid(12.0);
    let pc = pitch.floor();
    (octave as i32, pc as i32, pitch - pc)
}

/// Pitch space to MIDI note number, rounded half away from zero and clamped to 0..=127.
pub fn ps_to_midi(ps: f64) -> u8 {
    (60.0 + ps).round().clamp(0.0, 127.0) as u8
}

/// Pitch space to MIDI note number without rounding or limiting.
pub fn ps_to_midi_real(ps: f64) -> f64 {
    60.0 + ps
}

pub fn midi_to_ps(midi: f64) -> f64 {
    midi - 60.0
}

/// Pitch space to frequency in Hz, with A4 (ps 9) at 440 Hz.
pub fn ps_to_frequency(ps: f64) -> f64 {
    440.0 * 2f64.powf((ps - 9.0) / 12.0)
}

pub fn frequency_to_ps(frequency: f64) -> f64 {
    12.0 * (frequency / 440.0).log2() + 9.0
}

fn round_digits(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Pitch space to Csound pch notation, where 8.00 is middle C.
pub fn ps_to_pch(ps: f64) -> f64 {
    let (octave, pc, micro) = split_ps(ps);
    (octave + 8) as f64 + (pc as f64 + round_digits(micro, 6)) / 100.0
}

/// Csound pch notation to pitch space. Pitch classes beyond 11 roll into the next octave.
pub fn pch_to_ps(pch: f64) -> f64 {
    let octave = pch.trunc();
    let pc_micro = round_digits((pch - octave) * 100.0, 6);
    (octave - 8.0) * 12.0 + pc_micro
}

/// Pitch space to a note name such as `C4`, `A#4` or `C~4` (quarter tone raised).
pub fn ps_to_name(ps: f64) -> String {
    let (octave, pc, micro) = split_ps(ps);
    let (quarter, offset) = if micro < 0.25 {
        ("", 0)
    } else if micro < 0.75 {
        ("~", 0)
    } else {
        ("", 1)
    };
    let octave_offset = if pc + offset > 11 { 1 } else { 0 };
    format!(
        "{}{}{}",
        PC_NAMES[((pc + offset) % 12) as usize],
        quarter,
        octave + octave_offset + 4
    )
}

/// Parse a note name into pitch space. Supports `#` sharps, `$` flats, `~` quarter tone
/// raises and optional, possibly negative, octave numbers (4 is the middle C octave).
pub fn name_to_ps(name: &str) -> Result<f64, String> {
    let lower = name.trim().to_ascii_lowercase();
    let mut chars = lower.chars();
    let base = match chars.next() {
        Some('c') => 0.0,
        Some('d') => 2.0,
        Some('e') => 4.0,
        Some('f') => 5.0,
        Some('g') => 7.0,
        Some('a') => 9.0,
        Some('b') => 11.0,
        _ => return Err(format!("invalid pitch name '{}'", name)),
    };
    let mut pitch = base;
    let mut octave = String::new();
    for c in chars {
        match c {
            '#' => pitch += 1.0,
            '$' => pitch -= 1.0,
            '~' => pitch += 0.5,
            '-' | '0'..='9' => octave.push(c),
            _ => {
                return Err(format!(
                    "invalid pitch name '{}': unexpected character '{}'",
                    name, c
                ))
            }
        }
    }
    let octave = if octave.is_empty() {
        4
    } else {
        octave
            .parse::<i32>()
            .map_err(|err| format!("invalid pitch name '{}': {}", name, err))?
    };
    Ok(pitch + ((octave - 4) * 12) as f64)
}

// -------------------------------------------------------------------------------------------------

/// The representation a pitch was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchFormat {
    PitchSpace,
    Midi,
    Name,
    Pch,
    Frequency,
}

/// A single pitch. Internally always kept as pitch space real, along with the format it
/// was created from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pitch {
    ps: f64,
    format: PitchFormat,
}

impl Pitch {
    pub fn from_ps(ps: f64) -> Self {
        Self {
            ps,
            format: PitchFormat::PitchSpace,
        }
    }

    pub fn from_midi(midi: f64) -> Self {
        Self {
            ps: midi_to_ps(midi),
            format: PitchFormat::Midi,
        }
    }

    pub fn from_frequency(frequency: f64) -> Result<Self, String> {
        if frequency <= 0.0 {
            return Err(format!("invalid frequency '{}'", frequency));
        }
        Ok(Self {
            ps: frequency_to_ps(frequency),
            format: PitchFormat::Frequency,
        })
    }

    pub fn from_pch(pch: f64) -> Self {
        Self {
            ps: pch_to_ps(pch),
            format: PitchFormat::Pch,
        }
    }

    pub fn format(&self) -> PitchFormat {
        self.format
    }

    pub fn ps(&self) -> f64 {
        self.ps
    }

    /// Pitch class, including microtones, in `[0, 12)`.
    pub fn pc(&self) -> f64 {
        self.ps.rem_euclid(12.0)
    }

    pub fn midi(&self) -> u8 {
        ps_to_midi(self.ps)
    }

    pub fn frequency(&self) -> f64 {
        ps_to_frequency(self.ps)
    }

    pub fn pch(&self) -> f64 {
        ps_to_pch(self.ps)
    }

    pub fn name(&self) -> String {
        ps_to_name(self.ps)
    }

    #[must_use]
    pub fn transposed(&self, semitones: f64) -> Self {
        Self {
            ps: self.ps + semitones,
            format: self.format,
        }
    }

    /// Invert around the given axis in pitch space.
    #[must_use]
    pub fn inverted(&self, axis: f64) -> Self {
        Self {
            ps: 2.0 * axis - self.ps,
            format: self.format,
        }
    }
}

impl TryFrom<&str> for Pitch {
    type Error = String;

    /// Parse a pitch from a string: note names (`c#4`, `e$3`), MIDI numbers prefixed with
    /// `m` (`m60`), pch values with a `pch` suffix, frequencies with a `hz` or `fq` suffix,
    /// and plain numbers as pitch space values.
    fn try_from(s: &str) -> Result<Self, String> {
        let lower = s.trim().to_ascii_lowercase();
        let number = |text: &str| -> Result<f64, String> {
            text.trim()
                .parse::<f64>()
                .map_err(|err| format!("invalid pitch '{}': {}", s, err))
        };
        match lower.chars().next() {
            None => Err("invalid pitch: empty string".to_string()),
            Some('a'..='g') => Ok(Self {
                ps: name_to_ps(&lower)?,
                format: PitchFormat::Name,
            }),
            Some(_) => {
                if let Some(midi) = lower
                    .strip_prefix("midi")
                    .or_else(|| lower.strip_prefix('m'))
                {
                    Ok(Self::from_midi(number(midi)?))
                } else if let Some(pch) = lower.strip_suffix("pch") {
                    Ok(Self::from_pch(number(pch)?))
                } else if let Some(fq) = lower
                    .strip_suffix("hz")
                    .or_else(|| lower.strip_suffix("fq"))
                {
                    Self::from_frequency(number(fq)?)
                } else {
                    Ok(Self::from_ps(number(&lower)?))
                }
            }
        }
    }
}

impl Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(ps_to_midi(0.0), 60);
        assert_eq!(ps_to_midi(0.5), 61);
        assert_eq!(ps_to_midi(-0.5), 60);
        assert_eq!(ps_to_midi(100.0), 127);
        assert_eq!(ps_to_frequency(9.0), 440.0);
        assert!((ps_to_frequency(0.0) - 261.6255).abs() < 1e-3);
        assert!((frequency_to_ps(440.0) - 9.0).abs() < 1e-9);
        assert_eq!(ps_to_pch(0.0), 8.0);
        assert!((ps_to_pch(-1.0) - 7.11).abs() < 1e-9);
        assert!((pch_to_ps(7.11) + 1.0).abs() < 1e-9);
        assert_eq!(ps_to_name(0.5), "C~4");
        assert_eq!(ps_to_name(10.0), "A#4");
        assert_eq!(ps_to_name(-1.0), "B3");
        assert_eq!(ps_to_name(11.8), "C5");
    }

    #[test]
    fn names() -> Result<(), String> {
        assert_eq!(name_to_ps("c4")?, 0.0);
        assert_eq!(name_to_ps("C")?, 0.0);
        assert_eq!(name_to_ps("c#4")?, 1.0);
        assert_eq!(name_to_ps("e$3")?, -9.0);
        assert_eq!(name_to_ps("a~5")?, 21.5);
        assert_eq!(name_to_ps("d-1")?, -58.0);
        assert!(name_to_ps("h4").is_err());
        assert!(name_to_ps("c4x").is_err());
        Ok(())
    }

    #[test]
    fn pitch_from_str() -> Result<(), String> {
        assert_eq!(Pitch::try_from("g4")?.ps(), 7.0);
        assert_eq!(Pitch::try_from("m72")?.ps(), 12.0);
        assert_eq!(Pitch::try_from("-3.5")?.ps(), -3.5);
        assert_eq!(Pitch::try_from("440hz")?.midi(), 69);
        assert_eq!(Pitch::try_from("9.00pch")?.ps(), 12.0);
        assert_eq!(Pitch::try_from("m72")?.format(), PitchFormat::Midi);
        assert!(Pitch::try_from("").is_err());
        assert!(Pitch::try_from("xyz").is_err());
        let pitch = Pitch::from_ps(4.0);
        assert_eq!(pitch.transposed(3.0).ps(), 7.0);
        assert_eq!(pitch.inverted(0.0).ps(), -4.0);
        assert_eq!(Pitch::from_ps(-13.0).pc(), 11.0);
        Ok(())
    }
}
