//! Ordered pitch collections with duplicates and set class analysis.

use std::fmt::Display;

use crate::{
    pitch::{name_to_ps, Pitch},
    sieve::Sieve,
};

// -------------------------------------------------------------------------------------------------

pub mod set_class;

pub use set_class::{Inversion, SetClass};

// -------------------------------------------------------------------------------------------------

/// Pitch set input syntax, as detected from a user string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultisetInput {
    Forte,
    Names,
    Numbers,
    Midi,
    Frequency,
    Sieve,
}

impl MultisetInput {
    fn detect(text: &str) -> Self {
        if text.contains(['@', '&', '|']) {
            Self::Sieve
        } else if text.contains('m') {
            Self::Midi
        } else if text.contains("hz") || text.contains("fq") {
            Self::Frequency
        } else if text.starts_with(|c: char| ('1'..='9').contains(&c))
            && text.contains('-')
            && !text.contains([',', '.'])
        {
            Self::Forte
        } else if text.contains(|c: char| ('a'..='g').contains(&c)) {
            Self::Names
        } else {
            Self::Numbers
        }
    }
}

/// Split a list string into its non empty elements.
fn split_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace() || "()[]".contains(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// -------------------------------------------------------------------------------------------------

/// An ordered collection of pitches. Duplicates are permitted and order is significant.
///
/// # Examples:
///
/// ```rust
/// use athenacl::Multiset;
/// let multiset = Multiset::try_from("3-11B").unwrap();
/// assert_eq!(multiset.ps(), vec![0.0, 4.0, 7.0]);
/// assert_eq!(Multiset::try_from("c,e,g").unwrap().ps(), multiset.ps());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Multiset {
    pitches: Vec<Pitch>,
}

impl Multiset {
    /// Create a new multiset from the given pitches. Must not be empty.
    pub fn new(pitches: Vec<Pitch>) -> Result<Self, String> {
        if pitches.is_empty() {
            return Err("invalid multiset: no pitches".to_string());
        }
        Ok(Self { pitches })
    }

    /// Create a new multiset from pitch space values.
    pub fn from_ps(ps: &[f64]) -> Result<Self, String> {
        Self::new(ps.iter().map(|ps| Pitch::from_ps(*ps)).collect())
    }

    /// Create a multiset from the normal form pitch classes of a set class.
    pub fn from_set_class(set_class: SetClass) -> Result<Self, String> {
        let pcs = set_class.pcs();
        Self::from_ps(&pcs.into_iter().map(f64::from).collect::<Vec<_>>())
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }

    /// Pitch space values in order.
    pub fn ps(&self) -> Vec<f64> {
        self.pitches.iter().map(Pitch::ps).collect()
    }

    /// Pitch classes in order, microtones retained.
    pub fn pcs(&self) -> Vec<f64> {
        self.pitches.iter().map(Pitch::pc).collect()
    }

    /// Set class under Tn (`tni = false`) or TnI (`tni = true`) classification.
    pub fn set_class(&self, tni: bool) -> SetClass {
        let (set_class, _) = SetClass::analyze(self.ps());
        if tni {
            set_class.to_tni()
        } else {
            set_class
        }
    }

    /// Transposition of the pitches relative to the normal form of their set class.
    pub fn transposition(&self) -> u8 {
        SetClass::analyze(self.ps()).1
    }

    /// Pitch classes of the set class' normal form.
    pub fn normal_form(&self) -> Vec<u8> {
        self.set_class(false).pcs()
    }

    /// Pitch classes of the set class' prime form.
    pub fn prime_form(&self) -> Vec<u8> {
        self.set_class(false).prime()
    }

    #[must_use]
    pub fn transposed(&self, semitones: f64) -> Self {
        Self {
            pitches: self.pitches.iter().map(|p| p.transposed(semitones)).collect(),
        }
    }

    /// Invert all pitches around the given axis, or around the first pitch when None.
    #[must_use]
    pub fn inverted(&self, axis: Option<f64>) -> Self {
        let axis = axis.unwrap_or_else(|| self.pitches.first().map_or(0.0, Pitch::ps));
        Self {
            pitches: self.pitches.iter().map(|p| p.inverted(axis)).collect(),
        }
    }

    #[must_use]
    pub fn retrograde(&self) -> Self {
        Self {
            pitches: self.pitches.iter().rev().copied().collect(),
        }
    }

    /// Rotate pitch order so that the pitch at `index` comes first. Negative values
    /// rotate from the end.
    #[must_use]
    pub fn rotated(&self, index: i64) -> Self {
        let mut pitches = self.pitches.clone();
        if !pitches.is_empty() {
            let shift = index.rem_euclid(pitches.len() as i64) as usize;
            pitches.rotate_left(shift);
        }
        Self { pitches }
    }

    fn parse_forte(text: &str) -> Result<Vec<f64>, String> {
        let set_class = SetClass::try_from(text)?;
        Ok(set_class.pcs().into_iter().map(f64::from).collect())
    }

    fn parse_numbers(
        text: &str,
        convert: impl Fn(f64) -> Result<f64, String>,
    ) -> Result<Vec<f64>, String> {
        split_list(text)
            .map(|element| {
                let number = element
                    .trim_matches(|c: char| c.is_ascii_alphabetic())
                    .parse::<f64>()
                    .map_err(|err| format!("invalid multiset '{}': {}", text, err))?;
                convert(number)
            })
            .collect()
    }

    fn parse_names(text: &str) -> Result<Vec<f64>, String> {
        split_list(text).map(name_to_ps).collect()
    }

    /// Parse a pitch sieve: `logical string, lower, upper, origin`. The range defaults to
    /// c3 to c5, the origin to the lower bound.
    fn parse_sieve(text: &str) -> Result<Vec<f64>, String> {
        let mut elements = text.split(',').map(str::trim);
        let logic = elements.next().unwrap_or_default();
        let bound = |element: Option<&str>, default: f64| -> Result<f64, String> {
            match element.filter(|e| !e.is_empty()) {
                Some(element) => Ok(Pitch::try_from(element)?.ps()),
                None => Ok(default),
            }
        };
        let lower = bound(elements.next(), -12.0)?;
        let upper = bound(elements.next(), 12.0)?;
        let origin = bound(elements.next(), lower)?;
        let sieve = Sieve::try_from(logic)?;
        let values = sieve.integers(origin as i64, lower as i64..upper as i64 + 1);
        if values.is_empty() {
            return Err(format!("invalid multiset '{}': empty sieve segment", text));
        }
        Ok(values.into_iter().map(|v| v as f64).collect())
    }
}

impl TryFrom<&str> for Multiset {
    type Error = String;

    /// Parse a multiset from a Forte name (`3-11B`, `4-z15`), a list of pitch names
    /// (`c4,e4,g4`), MIDI note numbers (`m60,m64`), frequencies (`440hz,550hz`), a pitch
    /// sieve (`3@0|4@1,c4,c5`) or a list of pitch space numbers (`0,4,7`).
    fn try_from(s: &str) -> Result<Self, String> {
        let text = s.trim().to_ascii_lowercase();
        if text.is_empty() {
            return Err("invalid multiset: empty string".to_string());
        }
        let ps = match MultisetInput::detect(&text) {
            MultisetInput::Forte => Self::parse_forte(&text)?,
            MultisetInput::Names => Self::parse_names(&text)?,
            MultisetInput::Numbers => Self::parse_numbers(&text, Ok)?,
            MultisetInput::Midi => {
                Self::parse_numbers(&text, |midi| Ok(Pitch::from_midi(midi).ps()))?
            }
            MultisetInput::Frequency => {
                Self::parse_numbers(&text, |fq| Ok(Pitch::from_frequency(fq)?.ps()))?
            }
            MultisetInput::Sieve => Self::parse_sieve(&text)?,
        };
        Self::from_ps(&ps).map_err(|err| format!("{} from '{}'", err, s))
    }
}

impl Display for Multiset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ps = self.ps().iter().map(|ps| ps.to_string()).collect::<Vec<_>>();
        write!(f, "({})", ps.join(","))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() -> Result<(), String> {
        assert_eq!(Multiset::try_from("3-2")?.ps(), vec![0.0, 1.0, 3.0]);
        assert_eq!(Multiset::try_from("4-z15")?.ps(), vec![0.0, 1.0, 4.0, 6.0]);
        assert_eq!(Multiset::try_from("c4,e4,g4")?.ps(), vec![0.0, 4.0, 7.0]);
        assert_eq!(Multiset::try_from("c e$ g")?.ps(), vec![0.0, 3.0, 7.0]);
        assert_eq!(Multiset::try_from("(8,12,21,34)")?.ps(), vec![8.0, 12.0, 21.0, 34.0]);
        assert_eq!(Multiset::try_from("-1.5,2")?.ps(), vec![-1.5, 2.0]);
        assert_eq!(Multiset::try_from("m60,m72")?.ps(), vec![0.0, 12.0]);
        assert_eq!(Multiset::try_from("440hz")?.ps(), vec![9.0]);
        assert_eq!(Multiset::try_from("4@7&5@4")?.ps(), vec![7.0]);
        assert_eq!(Multiset::try_from("6@0,c4,c5")?.ps(), vec![0.0, 6.0, 12.0]);
        assert!(Multiset::try_from("").is_err());
        assert!(Multiset::try_from("3-99").is_err());
        assert!(Multiset::try_from("c4,x").is_err());
        assert!(Multiset::try_from("5@1&5@2").is_err());
        Ok(())
    }

    #[test]
    fn analysis() -> Result<(), String> {
        let multiset = Multiset::from_ps(&[16.0, 7.0, 12.0, 4.0])?;
        assert_eq!(multiset.set_class(false).to_string(), "3-11B");
        assert_eq!(multiset.set_class(true).to_string(), "3-11");
        assert_eq!(multiset.transposition(), 0);
        assert_eq!(multiset.normal_form(), vec![0, 4, 7]);
        assert_eq!(multiset.prime_form(), vec![0, 3, 7]);
        assert_eq!(Multiset::from_ps(&[2.0, 6.0, 9.0])?.transposition(), 2);
        Ok(())
    }

    #[test]
    fn transformations() -> Result<(), String> {
        let multiset = Multiset::from_ps(&[0.0, 4.0, 7.0])?;
        assert_eq!(multiset.transposed(2.0).ps(), vec![2.0, 6.0, 9.0]);
        assert_eq!(multiset.inverted(Some(0.0)).ps(), vec![0.0, -4.0, -7.0]);
        assert_eq!(multiset.inverted(None).set_class(false).to_string(), "3-11A");
        assert_eq!(multiset.retrograde().ps(), vec![7.0, 4.0, 0.0]);
        assert_eq!(multiset.rotated(1).ps(), vec![4.0, 7.0, 0.0]);
        assert_eq!(multiset.rotated(-1).ps(), vec![7.0, 0.0, 4.0]);
        assert_eq!(multiset.rotated(3), multiset);
        assert_eq!(multiset.to_string(), "(0,4,7)");
        Ok(())
    }
}
