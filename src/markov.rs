//! Markov transition tables of arbitrary order, parsed from transition strings or built by
//! analysis of a sequence.
//!
//! Transition strings define symbols as `name{value}` and weights as
//! `source:sequence:{dst=weight|dst=weight}`, where a single `:` denotes the zeroth order.
//! Weight keys may use `*` (any symbol), `-a` (any symbol but `a`) and `a|b`
//! (either symbol), one operator per key segment.

use std::{collections::BTreeMap, fmt::Display};

use crate::{
    seed::RandomStream,
    unit::{boundary_position, boundary_proportion},
};

// -------------------------------------------------------------------------------------------------

/// One segment of a weight key.
#[derive(Debug, Clone, PartialEq)]
enum KeySegment {
    Symbol(String),
    Any,
    Not(String),
    Or(Vec<String>),
}

impl KeySegment {
    fn parse(segment: &str) -> Result<Self, String> {
        let operators = ['*', '-', '|']
            .iter()
            .filter(|op| segment.contains(**op))
            .count();
        if operators > 1 {
            return Err(format!(
                "invalid weight key '{}': only one operator may be used per key segment",
                segment
            ));
        }
        Ok(if segment.contains('*') {
            Self::Any
        } else if segment.contains('|') {
            Self::Or(segment.split('|').map(str::to_string).collect())
        } else if let Some(symbol) = segment.strip_prefix('-') {
            Self::Not(symbol.to_string())
        } else {
            Self::Symbol(segment.to_string())
        })
    }

    fn matches(&self, symbol: &str) -> bool {
        match self {
            Self::Symbol(s) => s == symbol,
            Self::Any => true,
            Self::Not(s) => s != symbol,
            Self::Or(symbols) => symbols.iter().any(|s| s == symbol),
        }
    }
}

impl Display for KeySegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symbol(s) => write!(f, "{}", s),
            Self::Any => write!(f, "*"),
            Self::Not(s) => write!(f, "-{}", s),
            Self::Or(symbols) => write!(f, "{}", symbols.join("|")),
        }
    }
}

type WeightKey = Vec<KeySegment>;
type Weights = Vec<(String, f64)>;

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Alphabetic labels: `a` ... `z`, then `aa`, `ab` ...
fn alpha_label(index: usize) -> String {
    let mut label = Vec::new();
    let mut index = index;
    loop {
        label.push((b'a' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.iter().rev().collect()
}

/// Round a fractional order to one of its neighbouring integers, weighted by the fraction.
pub fn weighted_order(order: f64, rand: &mut RandomStream) -> usize {
    let order = order.max(0.0);
    let base = order.floor();
    if rand.unit() < order - base {
        base as usize + 1
    } else {
        base as usize
    }
}

// -------------------------------------------------------------------------------------------------

/// A Markov transition table.
///
/// # Examples:
///
/// ```rust
/// use athenacl::markov::Transition;
/// let transition = Transition::try_from("a{1}b{2}:{a=1|b=3}a:{b=1}").unwrap();
/// assert_eq!(transition.max_order(), 1);
/// assert_eq!(transition.next(0.1, &["1".to_string()], 1).unwrap(), "2");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    symbols: BTreeMap<String, String>,
    weights: Vec<(WeightKey, Weights)>,
    orders: Vec<usize>,
}

impl Transition {
    /// Build a transition table from an analysis of the given sequence, for all orders
    /// from zero up to `order`. Transitions wrap around from the end to the start.
    pub fn from_analysis<S: AsRef<str>>(sequence: &[S], order: usize) -> Result<Self, String> {
        if sequence.is_empty() {
            return Err("invalid transition analysis: empty sequence".to_string());
        }
        let data = sequence
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>();
        let order = order.min(data.len() - 1);
        let mut unique: Vec<String> = Vec::new();
        for value in &data {
            if !unique.contains(value) {
                unique.push(value.clone());
            }
        }
        let symbols = unique
            .iter()
            .enumerate()
            .map(|(index, value)| (alpha_label(index), value.clone()))
            .collect::<BTreeMap<_, _>>();
        let label_of = |value: &String| -> String {
            symbols
                .iter()
                .find(|(_, v)| *v == value)
                .map(|(s, _)| s.clone())
                .unwrap_or_default()
        };
        let labels = data.iter().map(label_of).collect::<Vec<_>>();
        let mut weights: Vec<(WeightKey, Weights)> = Vec::new();
        // zeroth order: symbol counts
        let zero = symbols
            .keys()
            .map(|s| (s.clone(), labels.iter().filter(|l| *l == s).count() as f64))
            .collect::<Weights>();
        weights.push((vec![], zero));
        for n in 1..=order {
            let mut wrapped = labels.clone();
            wrapped.extend_from_slice(&labels[..n]);
            let mut table: Vec<(Vec<String>, Weights)> = Vec::new();
            for window in wrapped.windows(n + 1) {
                let (source, destination) = window.split_at(n);
                let destination = &destination[0];
                let position = match table.iter().position(|(key, _)| key == source) {
                    Some(position) => position,
                    None => {
                        table.push((source.to_vec(), Vec::new()));
                        table.len() - 1
                    }
                };
                match table[position].1.iter_mut().find(|(s, _)| s == destination) {
                    Some((_, weight)) => *weight += 1.0,
                    None => table[position].1.push((destination.clone(), 1.0)),
                }
            }
            weights.extend(table.into_iter().map(|(key, w)| {
                (key.into_iter().map(KeySegment::Symbol).collect(), w)
            }));
        }
        Ok(Self {
            symbols,
            weights,
            orders: (0..=order).collect(),
        })
    }

    /// Symbol values in symbol label order.
    pub fn values(&self) -> Vec<&str> {
        self.symbols.values().map(String::as_str).collect()
    }

    /// Symbol label and value pairs.
    pub fn symbols(&self) -> &BTreeMap<String, String> {
        &self.symbols
    }

    /// Highest defined order.
    pub fn max_order(&self) -> usize {
        self.orders.last().copied().unwrap_or(0)
    }

    fn symbol_of(&self, value: &str) -> Result<&str, String> {
        self.symbols
            .iter()
            .find(|(_, v)| v.as_str() == value)
            .map(|(s, _)| s.as_str())
            .ok_or_else(|| format!("value '{}' is not a known transition symbol", value))
    }

    fn find_weights(&self, source: &[&str]) -> Option<&Weights> {
        let exact = self.weights.iter().find(|(key, _)| {
            key.len() == source.len()
                && key
                    .iter()
                    .zip(source)
                    .all(|(k, s)| {
                        matches!(k, KeySegment::Symbol(symbol) if symbol.as_str() == *s)
                    })
        });
        exact
            .or_else(|| {
                self.weights.iter().find(|(key, _)| {
                    key.len() == source.len()
                        && key.iter().zip(source).all(|(k, s)| k.matches(s))
                })
            })
            .map(|(_, weights)| weights)
    }

    /// Select the next value. `unit` is a value in \[0, 1\] that picks from the weight
    /// distribution, `previous` the values produced so far. When fewer previous values
    /// than `order` exist, the available length is used as order. Missing transitions
    /// fall back to an equal distribution over all symbols.
    pub fn next(&self, unit: f64, previous: &[String], order: usize) -> Result<String, String> {
        let order = if order > self.max_order() {
            self.max_order()
        } else {
            order
        };
        let source = if order == 0 {
            vec![]
        } else {
            let start = previous.len().saturating_sub(order);
            previous[start..]
                .iter()
                .map(|v| self.symbol_of(v))
                .collect::<Result<Vec<_>, _>>()?
        };
        let (weights, symbols): (Vec<f64>, Vec<&str>) = match self.find_weights(&source) {
            Some(weights) => weights.iter().map(|(s, w)| (*w, s.as_str())).unzip(),
            None => self.symbols.keys().map(|s| (1.0, s.as_str())).unzip(),
        };
        let bounds = boundary_proportion(&weights)?;
        let index = boundary_position(unit.clamp(0.0, 1.0), &bounds)?;
        self.symbols
            .get(symbols[index])
            .cloned()
            .ok_or_else(|| format!("undefined transition symbol '{}'", symbols[index]))
    }
}

impl TryFrom<&str> for Transition {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        if s.matches('{').count() != s.matches('}').count() {
            return Err(format!("invalid transition string '{}': braces not paired", s));
        }
        let text = s.replace(['"', '\''], "");
        let mut symbols = BTreeMap::new();
        let mut weight_defs = Vec::new();
        for group in text.split('}') {
            if !group.contains('{') {
                continue;
            }
            let (key, value) = group.split_once('{').ok_or_else(|| {
                format!("invalid transition string '{}': badly placed delimiters", s)
            })?;
            if value.contains('{') {
                return Err(format!(
                    "invalid transition string '{}': badly placed delimiters",
                    s
                ));
            }
            let key = key.to_ascii_lowercase().replace(' ', "");
            if key.contains(':') || value.contains('=') {
                if let Some(c) = key.chars().find(|c| !is_symbol_char(*c) && !":*-|".contains(*c)) {
                    return Err(format!(
                        "invalid transition string '{}': weight key uses illegal character '{}'",
                        s, c
                    ));
                }
                weight_defs.push((key, value.to_ascii_lowercase().replace(' ', "")));
            } else {
                if key.is_empty() || key.chars().any(|c| !is_symbol_char(c)) {
                    return Err(format!(
                        "invalid transition string '{}': illegal symbol name '{}'",
                        s, key
                    ));
                }
                symbols.insert(key, value.replace(' ', ""));
            }
        }
        if symbols.is_empty() {
            return Err(format!("invalid transition string '{}': no symbols defined", s));
        }
        if weight_defs.is_empty() {
            return Err(format!("invalid transition string '{}': no weights defined", s));
        }
        let mut weights = Vec::new();
        let mut orders = Vec::new();
        for (key, value) in weight_defs {
            let key = key
                .split(':')
                .filter(|segment| !segment.is_empty())
                .map(KeySegment::parse)
                .collect::<Result<WeightKey, _>>()?;
            let mut list = Weights::new();
            for assign in value.split('|').filter(|a| a.contains('=')) {
                let (symbol, weight) = assign
                    .split_once('=')
                    .filter(|(_, w)| !w.contains('='))
                    .ok_or_else(|| format!("incorrect weight specification '{}'", assign))?;
                let weight = weight
                    .parse::<f64>()
                    .ok()
                    .filter(|w| *w > 0.0)
                    .ok_or_else(|| format!("bad weight value given '{}'", assign))?;
                if !symbols.contains_key(symbol) {
                    return Err(format!(
                        "weight specified for undefined symbol '{}'",
                        symbol
                    ));
                }
                list.push((symbol.to_string(), weight));
            }
            if !orders.contains(&key.len()) {
                orders.push(key.len());
            }
            weights.push((key, list));
        }
        orders.sort();
        Ok(Self {
            symbols,
            weights,
            orders,
        })
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (symbol, value) in &self.symbols {
            write!(f, "{}{{{}}}", symbol, value)?;
        }
        let mut weights = self.weights.iter().collect::<Vec<_>>();
        weights.sort_by_key(|(key, _)| key.len());
        for (key, list) in weights {
            let key = key.iter().map(|s| s.to_string()).collect::<Vec<_>>();
            let mut list = list.iter().filter(|(_, w)| *w > 0.0).collect::<Vec<_>>();
            list.sort_by(|a, b| a.0.cmp(&b.0));
            let list = list
                .iter()
                .map(|(s, w)| format!("{}={}", s, w))
                .collect::<Vec<_>>();
            write!(f, "{}:{{{}}}", key.join(":"), list.join("|"))?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() -> Result<(), String> {
        let transition = Transition::try_from("a{3,1,1}b{2,1,1}c{3,2,0}:{a=3|b=4|c=1}")?;
        assert_eq!(transition.values(), vec!["3,1,1", "2,1,1", "3,2,0"]);
        assert_eq!(transition.max_order(), 0);
        assert_eq!(
            transition.to_string(),
            "a{3,1,1}b{2,1,1}c{3,2,0}:{a=3|b=4|c=1}"
        );
        let transition = Transition::try_from("x{a}y{b} :{x=1} x:{y=1} y:*:{x=2} -x:y:{y=1}")?;
        assert_eq!(transition.max_order(), 2);
        assert!(Transition::try_from("a{1}b{2").is_err());
        assert!(Transition::try_from("a{1}").is_err());
        assert!(Transition::try_from(":{a=1}").is_err());
        assert!(Transition::try_from("a{1}:{b=1}").is_err());
        assert!(Transition::try_from("a{1}:{a=0}").is_err());
        assert!(Transition::try_from("a{1}b{2}a:*|b:{a=1}").is_err());
        Ok(())
    }

    #[test]
    fn next() -> Result<(), String> {
        let transition = Transition::try_from("a{1}b{2}c{3}:{a=1|b=1|c=2}a:{c=1}b:*:{a=1}")?;
        let previous = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        assert_eq!(transition.next(0.9, &[], 0)?, "3");
        assert_eq!(transition.next(0.1, &[], 0)?, "1");
        assert_eq!(transition.next(0.1, &previous(&["1"]), 1)?, "3");
        assert_eq!(transition.next(0.1, &previous(&["2", "3"]), 2)?, "1");
        // no transition defined for c: equal distribution
        assert_eq!(transition.next(0.9, &previous(&["3"]), 1)?, "3");
        assert!(transition.next(0.5, &previous(&["7"]), 1).is_err());
        Ok(())
    }

    #[test]
    fn weighted_frequencies() -> Result<(), String> {
        let transition = Transition::try_from("a{3,1,1}b{2,1,1}c{3,2,0}:{a=3|b=4|c=1}")?;
        let mut rand = RandomStream::new(Some(7));
        let mut counts = BTreeMap::new();
        for _ in 0..8000 {
            let value = transition.next(rand.unit(), &[], 0)?;
            *counts.entry(value).or_insert(0) += 1;
        }
        assert!((counts["3,1,1"] as f64 / 8000.0 - 3.0 / 8.0).abs() < 0.03);
        assert!((counts["2,1,1"] as f64 / 8000.0 - 4.0 / 8.0).abs() < 0.03);
        assert!((counts["3,2,0"] as f64 / 8000.0 - 1.0 / 8.0).abs() < 0.03);
        Ok(())
    }

    #[test]
    fn analysis() -> Result<(), String> {
        let transition = Transition::from_analysis(&["x", "y", "x", "x"], 1)?;
        assert_eq!(transition.values(), vec!["x", "y"]);
        assert_eq!(transition.to_string(), "a{x}b{y}:{a=3|b=1}a:{a=2|b=1}b:{a=1}");
        assert_eq!(transition.next(0.9, &["y".to_string()], 1)?, "x");
        assert_eq!(alpha_label(27), "ab");
        Ok(())
    }
}
