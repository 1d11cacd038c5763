//! Selection disciplines for traversing a finite list as an infinite stream.

use std::fmt::Display;

use crate::seed::RandomStream;

// -------------------------------------------------------------------------------------------------

/// How a [`Selector`] walks through its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    RandomChoice,
    RandomWalk,
    RandomPermutate,
    #[default]
    OrderedCyclic,
    OrderedCyclicRetrograde,
    OrderedOscillate,
    /// Cyclic traversal from a random start position, drawn on each reset.
    RingRandom,
}

impl SelectionMode {
    pub const ALL: [SelectionMode; 7] = [
        SelectionMode::RandomChoice,
        SelectionMode::RandomWalk,
        SelectionMode::RandomPermutate,
        SelectionMode::OrderedCyclic,
        SelectionMode::OrderedCyclicRetrograde,
        SelectionMode::OrderedOscillate,
        SelectionMode::RingRandom,
    ];

    /// True when the mode draws random values.
    pub fn is_random(&self) -> bool {
        matches!(
            self,
            Self::RandomChoice | Self::RandomWalk | Self::RandomPermutate | Self::RingRandom
        )
    }
}

impl TryFrom<&str> for SelectionMode {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "randomchoice" | "rc" => Ok(Self::RandomChoice),
            "randomwalk" | "rw" => Ok(Self::RandomWalk),
            "randompermutate" | "rp" => Ok(Self::RandomPermutate),
            "orderedcyclic" | "oc" => Ok(Self::OrderedCyclic),
            "orderedcyclicretrograde" | "ocr" => Ok(Self::OrderedCyclicRetrograde),
            "orderedoscillate" | "oo" => Ok(Self::OrderedOscillate),
            "ringrandom" | "rr" => Ok(Self::RingRandom),
            _ => Err(format!(
                "invalid selection string '{}': expecting one of randomChoice, randomWalk, \
                randomPermutate, orderedCyclic, orderedCyclicRetrograde, orderedOscillate, ringRandom",
                s
            )),
        }
    }
}

impl Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RandomChoice => "randomChoice",
            Self::RandomWalk => "randomWalk",
            Self::RandomPermutate => "randomPermutate",
            Self::OrderedCyclic => "orderedCyclic",
            Self::OrderedCyclicRetrograde => "orderedCyclicRetrograde",
            Self::OrderedOscillate => "orderedOscillate",
            Self::RingRandom => "ringRandom",
        };
        write!(f, "{}", name)
    }
}

// -------------------------------------------------------------------------------------------------

/// Selects items from a list following a [`SelectionMode`]. Random modes draw from the
/// random stream that is passed to [`Selector::select`].
///
/// A selector may be created with an empty list, but selecting from it fails.
#[derive(Debug, Clone)]
pub struct Selector<T: Clone> {
    items: Vec<T>,
    mode: SelectionMode,
    index: i64,
    scratch: Vec<usize>,
    start: Option<usize>,
}

impl<T: Clone> Selector<T> {
    pub fn new(items: Vec<T>, mode: SelectionMode) -> Self {
        let mut selector = Self {
            items,
            mode,
            index: 0,
            scratch: Vec::new(),
            start: None,
        };
        selector.reset();
        selector
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Restart the discipline.
    pub fn reset(&mut self) {
        self.scratch.clear();
        self.start = None;
        self.index = match self.mode {
            SelectionMode::OrderedCyclicRetrograde => self.items.len() as i64 - 1,
            _ => 0,
        };
    }

    /// Replace the items. The discipline is restarted when the number of items changed.
    pub fn update(&mut self, items: Vec<T>) {
        let changed = items.len() != self.items.len();
        self.items = items;
        if changed {
            self.reset();
        }
    }

    /// Oscillating index sequence, e.g. `0,1,2,1` for three items.
    fn oscillate_index(&self, step: usize) -> usize {
        let len = self.items.len();
        if len <= 2 {
            return step % len;
        }
        let period = 2 * len - 2;
        let position = step % period;
        if position < len {
            position
        } else {
            period - position
        }
    }

    /// Select the next item.
    pub fn select(&mut self, rand: &mut RandomStream) -> Result<T, String> {
        let len = self.items.len();
        if len == 0 {
            return Err("selector has no values".to_string());
        }
        if len == 1 {
            return Ok(self.items[0].clone());
        }
        let index = match self.mode {
            SelectionMode::RandomChoice => rand.index(len),
            SelectionMode::RandomWalk => {
                let index = self.index.rem_euclid(len as i64) as usize;
                self.index = index as i64 + if rand.unit() < 0.5 { 1 } else { -1 };
                index
            }
            SelectionMode::RandomPermutate => {
                if self.scratch.is_empty() {
                    self.scratch = (0..len).collect();
                }
                let pick = rand.index(self.scratch.len());
                self.scratch.remove(pick)
            }
            SelectionMode::OrderedCyclic => {
                let index = self.index.rem_euclid(len as i64) as usize;
                self.index = index as i64 + 1;
                index
            }
            SelectionMode::OrderedCyclicRetrograde => {
                let index = self.index.rem_euclid(len as i64) as usize;
                self.index = index as i64 - 1;
                index
            }
            SelectionMode::OrderedOscillate => {
                let index = self.oscillate_index(self.index as usize);
                self.index += 1;
                index
            }
            SelectionMode::RingRandom => {
                let start = match self.start {
                    Some(start) => start,
                    None => {
                        let start = rand.index(len);
                        self.start = Some(start);
                        start
                    }
                };
                let index = (start + self.index as usize) % len;
                self.index += 1;
                index
            }
        };
        Ok(self.items[index].clone())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn take(mode: &str, count: usize) -> Result<Vec<i32>, String> {
        let mut rand = RandomStream::new(Some(42));
        let mut selector = Selector::new(vec![3, 4, 5], SelectionMode::try_from(mode)?);
        (0..count).map(|_| selector.select(&mut rand)).collect()
    }

    #[test]
    fn modes() -> Result<(), String> {
        assert_eq!(take("oc", 4)?, vec![3, 4, 5, 3]);
        assert_eq!(take("OCR", 4)?, vec![5, 4, 3, 5]);
        assert_eq!(take("orderedOscillate", 6)?, vec![3, 4, 5, 4, 3, 4]);
        let mut permutation = take("rp", 3)?;
        permutation.sort();
        assert_eq!(permutation, vec![3, 4, 5]);
        let ring = take("rr", 6)?;
        assert_eq!(ring[..3], ring[3..]);
        assert!(take("rc", 100)?.iter().all(|v| (3..=5).contains(v)));
        let walk = take("rw", 100)?;
        assert_eq!(walk[0], 3);
        assert!(walk.windows(2).all(|w| w[0] != w[1]));
        assert!(SelectionMode::try_from("xx").is_err());
        for mode in SelectionMode::ALL {
            assert_eq!(SelectionMode::try_from(mode.to_string().as_str())?, mode);
        }
        Ok(())
    }

    #[test]
    fn cyclic_completeness() -> Result<(), String> {
        let mut rand = RandomStream::new(None);
        let items = (0..7).collect::<Vec<_>>();
        let mut selector = Selector::new(items, SelectionMode::OrderedCyclic);
        let mut counts = [0; 7];
        for _ in 0..7 * 5 {
            counts[selector.select(&mut rand)?] += 1;
        }
        assert!(counts.iter().all(|c| *c == 5));
        Ok(())
    }

    #[test]
    fn edge_cases() -> Result<(), String> {
        let mut rand = RandomStream::new(Some(1));
        let mut single = Selector::new(vec!["a"], SelectionMode::RandomWalk);
        assert_eq!(single.select(&mut rand)?, "a");
        let mut empty = Selector::<f64>::new(vec![], SelectionMode::OrderedCyclic);
        assert!(empty.select(&mut rand).is_err());
        let mut selector = Selector::new(vec![1, 2], SelectionMode::OrderedCyclic);
        selector.select(&mut rand)?;
        selector.reset();
        assert_eq!(selector.select(&mut rand)?, 1);
        Ok(())
    }
}
