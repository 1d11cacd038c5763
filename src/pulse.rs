//! Symbolic rhythmic atoms (divisor, multiplier, accent) and their realization to seconds.

use std::fmt::Display;

use num_rational::Ratio;
use num_traits::ToPrimitive;

// -------------------------------------------------------------------------------------------------

/// Symbolic durations as (divisor, multiplier) of a beat.
const DURATION_NAMES: [(&str, (u64, u64)); 18] = [
    ("w", (1, 4)),
    ("h", (1, 2)),
    ("q", (1, 1)),
    ("e", (2, 1)),
    ("s", (4, 1)),
    ("t", (8, 1)),
    ("tw", (3, 8)),
    ("th", (3, 4)),
    ("tq", (3, 2)),
    ("te", (3, 1)),
    ("ts", (6, 1)),
    ("tt", (12, 1)),
    ("dw", (1, 6)),
    ("dh", (1, 3)),
    ("dq", (2, 3)),
    ("de", (4, 3)),
    ("ds", (8, 3)),
    ("dt", (16, 3)),
];

/// Dynamic symbols and the accent range they cover.
const DYNAMIC_NAMES: [(&str, (f64, f64)); 10] = [
    ("+", (1.0, 1.0)),
    ("fff", (0.95, 1.0)),
    ("ff", (0.9, 0.95)),
    ("f", (0.8, 0.9)),
    ("mf", (0.6, 0.8)),
    ("mp", (0.4, 0.6)),
    ("p", (0.3, 0.4)),
    ("pp", (0.15, 0.3)),
    ("ppp", (0.0001, 0.15)),
    ("o", (0.0, 0.0)),
];

/// Convert a tempo to the duration of a beat in seconds.
pub fn bpm_to_beat_time(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Convert a beat duration in seconds to a tempo.
pub fn beat_time_to_bpm(beat_time: f64) -> f64 {
    60.0 / beat_time
}

/// Accent value of a dynamic symbol: the middle of its range.
pub fn dynamic_to_accent(name: &str) -> Option<f64> {
    let name = name.trim().to_ascii_lowercase();
    DYNAMIC_NAMES
        .iter()
        .find(|(dynamic, _)| *dynamic == name)
        .map(|(_, (min, max))| (min + max) / 2.0)
}

/// Dynamic symbol whose range contains the given accent.
pub fn accent_to_dynamic(accent: f64) -> &'static str {
    if accent >= 0.9999 {
        return "+";
    }
    if accent < 0.0001 {
        return "o";
    }
    let accent = (accent * 10000.0).round() / 10000.0;
    DYNAMIC_NAMES
        .iter()
        .find(|(_, (min, max))| accent >= *min && accent <= *max)
        .map(|(name, _)| *name)
        .unwrap_or("+")
}

// -------------------------------------------------------------------------------------------------

/// Realized numeric form of a pulse: duration and sustain in seconds, and the accent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealizedPulse {
    pub dur: f64,
    pub sus: f64,
    pub acc: f64,
}

impl From<RealizedPulse> for (f64, f64, f64) {
    fn from(value: RealizedPulse) -> Self {
        (value.dur, value.sus, value.acc)
    }
}

// -------------------------------------------------------------------------------------------------

/// A symbolic rhythmic atom: `multiplier / divisor` beats with an accent in range
/// \[0 - 1\], where 0 is a rest. The sustain scalar scales the sounding duration.
///
/// # Examples:
///
/// ```rust
/// use athenacl::Pulse;
/// let pulse = Pulse::try_from("(4,3,1)").unwrap();
/// assert_eq!(pulse.realize(120.0).dur, 0.375);
/// assert_eq!(Pulse::try_from("dq").unwrap(), Pulse::new(2, 3, 1.0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    divisor: u64,
    multiplier: u64,
    accent: f64,
    sustain: f64,
}

impl Pulse {
    /// Create a new pulse. Divisor and multiplier are made absolute and must not be 0;
    /// the accent is clamped into \[0 - 1\].
    pub fn new(divisor: i64, multiplier: i64, accent: f64) -> Result<Self, String> {
        if divisor == 0 || multiplier == 0 {
            return Err(format!(
                "invalid pulse '({},{},{})': divisor and multiplier must not be 0",
                divisor, multiplier, accent
            ));
        }
        Ok(Self {
            divisor: divisor.unsigned_abs(),
            multiplier: multiplier.unsigned_abs(),
            accent: accent.clamp(0.0, 1.0),
            sustain: 1.0,
        })
    }

    /// Create a pulse from a numeric beat ratio. Integral ratios yield `(1, n, 1)`, other
    /// values the reduced ratio in thousandths.
    pub fn from_ratio(ratio: f64) -> Result<Self, String> {
        if !ratio.is_finite() || ratio.abs() < 0.001 {
            return Err(format!("invalid pulse ratio '{}'", ratio));
        }
        let ratio = ratio.abs();
        if ratio.fract() == 0.0 {
            return Self::new(1, ratio as i64, 1.0);
        }
        let exact = Ratio::new((ratio * 1000.0).round() as u64, 1000);
        Self::new(*exact.denom() as i64, *exact.numer() as i64, 1.0)
    }

    pub fn divisor(&self) -> u64 {
        self.divisor
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }

    pub fn accent(&self) -> f64 {
        self.accent
    }

    pub fn sustain(&self) -> f64 {
        self.sustain
    }

    /// True when the pulse is a rest.
    pub fn is_rest(&self) -> bool {
        self.accent == 0.0
    }

    /// Exact beat ratio of the pulse.
    pub fn ratio(&self) -> Ratio<u64> {
        Ratio::new(self.multiplier, self.divisor)
    }

    /// Dynamic symbol of the accent.
    pub fn dynamic(&self) -> &'static str {
        accent_to_dynamic(self.accent)
    }

    pub fn set_accent(&mut self, accent: f64) {
        self.accent = accent.clamp(0.0, 1.0);
    }

    pub fn set_sustain(&mut self, sustain: f64) {
        self.sustain = sustain;
    }

    #[must_use]
    pub fn with_accent(mut self, accent: f64) -> Self {
        self.set_accent(accent);
        self
    }

    #[must_use]
    pub fn with_sustain(mut self, sustain: f64) -> Self {
        self.set_sustain(sustain);
        self
    }

    /// Multiply the multiplier, stretching the duration by `factor`. Fails when the
    /// multiplier would overflow.
    pub fn scale(&mut self, factor: u64) -> Result<(), String> {
        self.multiplier = self
            .multiplier
            .checked_mul(factor.max(1))
            .ok_or_else(|| format!("pulse '{}' can not be scaled by {}", self, factor))?;
        Ok(())
    }

    /// Multiply divisor and multiplier, keeping the ratio. Fails when either would
    /// overflow.
    pub fn ratio_raise(&mut self, factor: u64) -> Result<(), String> {
        let factor = factor.max(1);
        match (
            self.divisor.checked_mul(factor),
            self.multiplier.checked_mul(factor),
        ) {
            (Some(divisor), Some(multiplier)) => {
                self.divisor = divisor;
                self.multiplier = multiplier;
                Ok(())
            }
            _ => Err(format!("pulse '{}' can not be raised by {}", self, factor)),
        }
    }

    /// Change the divisor to `divisor` while keeping the ratio. Fails when the new
    /// multiplier would not be integral.
    pub fn ratio_target(&mut self, divisor: u64) -> Result<(), String> {
        if divisor == 0 || divisor % self.divisor != 0 {
            return Err(format!(
                "invalid pulse ratio target '{}' for pulse '{}'",
                divisor, self
            ));
        }
        let factor = divisor / self.divisor;
        self.ratio_raise(factor)
    }

    /// Duration in beats.
    pub fn beats(&self) -> f64 {
        let ratio = self.ratio();
        match (ratio.numer().to_f64(), ratio.denom().to_f64()) {
            (Some(numer), Some(denom)) => numer / denom,
            _ => self.multiplier as f64 / self.divisor as f64,
        }
    }

    /// Realize the pulse at the given tempo.
    pub fn realize(&self, bpm: f64) -> RealizedPulse {
        let dur = bpm_to_beat_time(bpm) * self.beats();
        RealizedPulse {
            dur,
            sus: dur * self.sustain,
            acc: self.accent,
        }
    }
}

impl Default for Pulse {
    fn default() -> Self {
        Self {
            divisor: 1,
            multiplier: 1,
            accent: 1.0,
            sustain: 1.0,
        }
    }
}

impl TryFrom<&str> for Pulse {
    type Error = String;

    /// Parse a pulse from triples `(d,m,a)`, pairs `(d,m)`, symbolic durations (`q`, `te`,
    /// `dq`...), dynamic symbols (`mf`, `o`...) or numeric beat ratios.
    fn try_from(s: &str) -> Result<Self, String> {
        let text = s.trim().to_ascii_lowercase();
        if text.is_empty() {
            return Err("invalid pulse: empty string".to_string());
        }
        if text.starts_with(['(', '[']) || text.contains(',') {
            let inner = text.trim_start_matches(['(', '[']).trim_end_matches([')', ']']);
            let parts = inner.split(',').map(str::trim).collect::<Vec<_>>();
            if parts.len() < 2 || parts.len() > 3 {
                return Err(format!(
                    "invalid pulse '{}': expecting two or three values",
                    s
                ));
            }
            let integer = |part: &str| -> Result<i64, String> {
                let value = part
                    .parse::<f64>()
                    .map_err(|err| format!("invalid pulse '{}': {}", s, err))?;
                if value.fract() != 0.0 {
                    return Err(format!(
                        "invalid pulse '{}': '{}' is not an integer",
                        s, part
                    ));
                }
                Ok(value as i64)
            };
            let divisor = integer(parts[0])?;
            let multiplier = integer(parts[1])?;
            let accent = match parts.get(2) {
                None => 1.0,
                Some(part) => match dynamic_to_accent(part) {
                    Some(accent) => accent,
                    None => part
                        .parse::<f64>()
                        .map_err(|err| format!("invalid pulse '{}': {}", s, err))?,
                },
            };
            Self::new(divisor, multiplier, accent)
        } else if text.starts_with(|c: char| c.is_ascii_lowercase()) || text == "+" {
            if let Some((_, (divisor, multiplier))) =
                DURATION_NAMES.iter().find(|(name, _)| *name == text)
            {
                Self::new(*divisor as i64, *multiplier as i64, 1.0)
            } else if let Some(accent) = dynamic_to_accent(&text) {
                Self::new(1, 1, accent)
            } else {
                Err(format!("invalid pulse '{}': unknown symbol", s))
            }
        } else {
            let ratio = text
                .parse::<f64>()
                .map_err(|err| format!("invalid pulse '{}': {}", s, err))?;
            Self::from_ratio(ratio)
        }
    }
}

impl TryFrom<String> for Pulse {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        Self::try_from(s.as_str())
    }
}

impl Display for Pulse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.divisor, self.multiplier, self.accent)
    }
}

// -------------------------------------------------------------------------------------------------

/// An ordered sequence of pulses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rhythm {
    pulses: Vec<Pulse>,
}

impl Rhythm {
    pub fn new(pulses: Vec<Pulse>) -> Self {
        Self { pulses }
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn get(&self, index: usize) -> Option<&Pulse> {
        self.pulses.get(index)
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pulse> {
        self.pulses.iter()
    }

    pub fn set_sustain(&mut self, sustain: f64) {
        self.pulses.iter_mut().for_each(|p| p.set_sustain(sustain));
    }

    pub fn set_accent(&mut self, accent: f64) {
        self.pulses.iter_mut().for_each(|p| p.set_accent(accent));
    }

    pub fn ratio_raise(&mut self, factor: u64) -> Result<(), String> {
        self.pulses
            .iter_mut()
            .try_for_each(|p| p.ratio_raise(factor))
    }

    pub fn ratio_target(&mut self, divisor: u64) -> Result<(), String> {
        self.pulses
            .iter_mut()
            .try_for_each(|p| p.ratio_target(divisor))
    }

    /// Sum of all pulse durations in beats.
    pub fn beats(&self) -> f64 {
        self.pulses.iter().map(Pulse::beats).sum()
    }

    /// Realize all pulses at the given tempo.
    pub fn realize(&self, bpm: f64) -> Vec<RealizedPulse> {
        self.pulses.iter().map(|p| p.realize(bpm)).collect()
    }
}

impl From<Vec<Pulse>> for Rhythm {
    fn from(pulses: Vec<Pulse>) -> Self {
        Self::new(pulses)
    }
}

impl IntoIterator for Rhythm {
    type Item = Pulse;
    type IntoIter = std::vec::IntoIter<Pulse>;

    fn into_iter(self) -> Self::IntoIter {
        self.pulses.into_iter()
    }
}

impl TryFrom<&str> for Rhythm {
    type Error = String;

    /// Parse a comma separated list of pulses, e.g. `(4,1,1),(4,3,0),q,e`. An enclosing
    /// pair of brackets is optional.
    fn try_from(s: &str) -> Result<Self, String> {
        let mut text = s.trim();
        if text.starts_with(['(', '[']) && text.ends_with([')', ']']) {
            let inner = &text[1..text.len() - 1];
            if inner.trim_start().starts_with(['(', '[']) {
                text = inner;
            }
        }
        let mut pulses = Vec::new();
        let mut depth = 0;
        let mut start = 0;
        for (index, c) in text.char_indices() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                ',' if depth == 0 => {
                    pulses.push(Pulse::try_from(&text[start..index])?);
                    start = index + 1;
                }
                _ => (),
            }
        }
        if depth != 0 {
            return Err(format!("invalid rhythm '{}': unbalanced brackets", s));
        }
        if !text[start..].trim().is_empty() {
            pulses.push(Pulse::try_from(&text[start..])?);
        }
        if pulses.is_empty() {
            return Err(format!("invalid rhythm '{}': no pulses", s));
        }
        Ok(Self::new(pulses))
    }
}

impl Display for Rhythm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pulses = self
            .pulses
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>();
        write!(f, "({})", pulses.join(","))
    }
}

// -------------------------------------------------------------------------------------------------
