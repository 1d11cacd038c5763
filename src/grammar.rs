//! Lindenmayer style rewrite grammars over single character symbols.
//!
//! Grammar strings have the form `symbols@rules@axiom`, e.g.
//! `a{.2}b{.5}@a{ba}b{a=2|bb=1}@a`. Rules map a source to one or more weighted
//! replacements. Sources may contain `*` to match any symbol. The axiom is optional:
//! without one, a random symbol starts the derivation.

use std::fmt::Display;

use crate::{
    seed::RandomStream,
    unit::{boundary_position, boundary_proportion},
};

// -------------------------------------------------------------------------------------------------

const SPLIT: char = '@';
const ANY: char = '*';

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// A production rule: source pattern and weighted replacements.
#[derive(Debug, Clone, PartialEq)]
struct Rule {
    source: Vec<char>,
    replacements: Vec<(String, f64)>,
}

impl Rule {
    fn matches(&self, state: &[char]) -> bool {
        self.source.len() <= state.len()
            && self
                .source
                .iter()
                .zip(state)
                .all(|(s, c)| *s == ANY || s == c)
    }

    /// Sort key: longer sources first, exact matches before wildcards.
    fn priority(&self) -> (usize, usize) {
        let wildcards = self.source.iter().filter(|c| **c == ANY).count();
        (usize::MAX - self.source.len(), wildcards)
    }

    fn parse(key: &str, value: &str) -> Result<Self, String> {
        if let Some(c) = key.chars().find(|c| !is_symbol_char(*c) && *c != ANY) {
            return Err(format!("rule definition uses illegal characters ({})", c));
        }
        if key.is_empty() {
            return Err("rule definition does not define source symbol".to_string());
        }
        let options = value.split('|').collect::<Vec<_>>();
        let replacements = if options.len() == 1 {
            let option = options[0].split('=').next().unwrap_or_default();
            vec![(option.to_string(), 1.0)]
        } else {
            options
                .into_iter()
                .map(|assign| {
                    let (option, weight) = assign.split_once('=').unwrap_or((assign, "1"));
                    weight
                        .parse::<f64>()
                        .ok()
                        .filter(|w| *w > 0.0)
                        .map(|w| (option.to_string(), w))
                        .ok_or_else(|| format!("bad weight value given: {}", assign))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(Self {
            source: key.chars().collect(),
            replacements,
        })
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = self.source.iter().collect::<String>();
        let replacements = if self.replacements.len() == 1 {
            self.replacements[0].0.clone()
        } else {
            self.replacements
                .iter()
                .map(|(option, weight)| format!("{}={}", option, weight))
                .collect::<Vec<_>>()
                .join("|")
        };
        write!(f, "{}{{{}}}", source, replacements)
    }
}

// -------------------------------------------------------------------------------------------------

/// A rewrite grammar with its current derivation state.
///
/// # Examples:
///
/// ```rust
/// use athenacl::{grammar::Grammar, seed::RandomStream};
/// let mut grammar = Grammar::try_from("a{3}b{4}@a{bab}b{aab}@abaa").unwrap();
/// grammar.step(&mut RandomStream::new(Some(1))).unwrap();
/// assert_eq!(grammar.state(), "babaabbabbab");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    symbols: Vec<(char, String)>,
    rules: Vec<Rule>,
    axiom: Option<String>,
    state: String,
}

impl Grammar {
    /// The current derivation, as symbols.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// The current derivation, as symbol values.
    pub fn values(&self) -> Vec<String> {
        self.state
            .chars()
            .filter_map(|c| self.value_of(c))
            .map(str::to_string)
            .collect()
    }

    fn value_of(&self, symbol: char) -> Option<&str> {
        self.symbols
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, v)| v.as_str())
    }

    /// Forget the derivation: the next step restarts from the axiom, or from a random
    /// symbol when there is no axiom.
    pub fn reset(&mut self) {
        self.state.clear();
    }

    /// Apply all rules once to the current state. Positions without a matching rule keep
    /// their symbol.
    pub fn step(&mut self, rand: &mut RandomStream) -> Result<(), String> {
        if self.state.is_empty() {
            self.state = match &self.axiom {
                Some(axiom) => axiom.clone(),
                None => self.symbols[rand.index(self.symbols.len())].0.to_string(),
            };
        }
        let state = self.state.chars().collect::<Vec<_>>();
        let mut next = String::with_capacity(state.len() * 2);
        let mut position = 0;
        while position < state.len() {
            match self.rules.iter().find(|r| r.matches(&state[position..])) {
                Some(rule) => {
                    let replacement = if rule.replacements.len() == 1 {
                        &rule.replacements[0].0
                    } else {
                        let weights = rule
                            .replacements
                            .iter()
                            .map(|(_, w)| *w)
                            .collect::<Vec<_>>();
                        let bounds = boundary_proportion(&weights)?;
                        &rule.replacements[boundary_position(rand.unit(), &bounds)?].0
                    };
                    next.push_str(replacement);
                    position += rule.source.len();
                }
                None => {
                    next.push(state[position]);
                    position += 1;
                }
            }
        }
        self.state = next;
        Ok(())
    }

    fn parse_groups(part: &str) -> Result<Vec<(String, String)>, String> {
        part.split('}')
            .filter(|group| group.contains('{'))
            .map(|group| {
                let (key, value) = group
                    .split_once('{')
                    .filter(|(_, value)| !value.contains('{'))
                    .ok_or_else(|| "badly placed delimiters".to_string())?;
                Ok((
                    key.replace(' ', "").to_ascii_lowercase(),
                    value.replace(' ', ""),
                ))
            })
            .collect()
    }
}

impl TryFrom<&str> for Grammar {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        let invalid = |msg: String| format!("invalid grammar '{}': {}", s, msg);
        if s.matches('{').count() != s.matches('}').count() {
            return Err(invalid("all braces not paired".to_string()));
        }
        let text = s.replace(['"', '\''], "");
        let parts = text.split(SPLIT).collect::<Vec<_>>();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid(format!(
                "must include one or two split delimiters ({})",
                SPLIT
            )));
        }
        let mut symbols = Vec::new();
        for (key, value) in Self::parse_groups(parts[0]).map_err(invalid)? {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if is_symbol_char(c) => symbols.push((c, value)),
                _ => {
                    return Err(invalid(format!(
                        "symbol definition '{}' must be a single letter or digit",
                        key
                    )))
                }
            }
        }
        if symbols.is_empty() {
            return Err(invalid("no symbols defined".to_string()));
        }
        let known = |c: char| symbols.iter().any(|(s, _)| *s == c);
        let mut rules = Vec::new();
        for (key, value) in Self::parse_groups(parts[1]).map_err(invalid)? {
            let rule = Rule::parse(&key, &value.to_ascii_lowercase()).map_err(invalid)?;
            if rule.source.iter().any(|c| *c != ANY && !known(*c)) {
                return Err(invalid(format!(
                    "source rule component ({}) references an undefined symbol",
                    key
                )));
            }
            if rule
                .replacements
                .iter()
                .any(|(option, _)| option.chars().any(|c| !known(c)))
            {
                return Err(invalid(format!(
                    "destination rule component ({}) references an undefined symbol",
                    value
                )));
            }
            rules.push(rule);
        }
        if rules.is_empty() {
            return Err(invalid("no rules defined".to_string()));
        }
        // stable: keeps definition order within equal priorities
        rules.sort_by_key(Rule::priority);
        let axiom = match parts.get(2).map(|a| a.trim().to_ascii_lowercase()) {
            Some(axiom) if !axiom.is_empty() => {
                if let Some(c) = axiom.chars().find(|c| !known(*c)) {
                    return Err(invalid(format!("bad axiom value given: {}", c)));
                }
                Some(axiom)
            }
            _ => None,
        };
        symbols.sort_by_key(|(s, _)| *s);
        let state = axiom.clone().unwrap_or_default();
        Ok(Self {
            symbols,
            rules,
            axiom,
            state,
        })
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (symbol, value) in &self.symbols {
            write!(f, "{}{{{}}}", symbol, value)?;
        }
        write!(f, "{}", SPLIT)?;
        for rule in &self.rules {
            write!(f, "{}", rule)?;
        }
        if let Some(axiom) = &self.axiom {
            write!(f, "{}{}", SPLIT, axiom)?;
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
        let grammar = Grammar::try_from("a{3}b{4} @ a{b}b{a|b} @ a")?;
        assert_eq!(grammar.to_string(), "a{3}b{4}@a{b}b{a=1|b=1}@a");
        assert!(Grammar::try_from("a{3}b{4} @ a{b}b{a|b|c}").is_err());
        assert!(Grammar::try_from("a{3}b{4}c{3} @ a{b}d{a|b|c}").is_err());
        assert!(Grammar::try_from("a{3}b{4} @ a{*} @ baab").is_err());
        assert!(Grammar::try_from("a{3}b{4} @ *{b} @ baab").is_ok());
        assert!(Grammar::try_from("a{3}b{4} @ a{b}b{a=0|b=1}").is_err());
        assert!(Grammar::try_from("a{3}b{4} @ a{b}b{a} @ c").is_err());
        assert!(Grammar::try_from("a{3}b{4} a{b}").is_err());
        assert!(Grammar::try_from("a{3}b{4} @ a{b}}").is_err());
        Ok(())
    }

    #[test]
    fn derivation() -> Result<(), String> {
        let mut rand = RandomStream::new(Some(3));
        let mut grammar = Grammar::try_from("a{3}b{4}c{20}d{2} @ a{bab}b{acb}c{ac}d{cd} @ abd")?;
        grammar.step(&mut rand)?;
        assert_eq!(grammar.state(), "babacbcd");
        grammar.step(&mut rand)?;
        assert_eq!(grammar.state(), "acbbabacbbabacacbaccd");

        let mut grammar = Grammar::try_from("a{a}b{b} @ a{ab}b{a} @ b")?;
        let mut states = Vec::new();
        for _ in 0..5 {
            grammar.step(&mut rand)?;
            states.push(grammar.state().to_string());
        }
        assert_eq!(states, vec!["a", "ab", "aba", "abaab", "abaababa"]);
        assert_eq!(grammar.values(), vec!["a", "b", "a", "a", "b", "a", "b", "a"]);
        grammar.reset();
        assert_eq!(grammar.state(), "");
        Ok(())
    }

    #[test]
    fn context_rules() -> Result<(), String> {
        let mut rand = RandomStream::new(Some(3));
        let mut grammar = Grammar::try_from("a{1}b{2}c{3}@ab{c}a{b}b{a}c{a}@aab")?;
        grammar.step(&mut rand)?;
        assert_eq!(grammar.state(), "bc");
        grammar.step(&mut rand)?;
        assert_eq!(grammar.state(), "aa");
        let mut grammar = Grammar::try_from("a{1}b{2}@a*{b}b{a}@aabb")?;
        grammar.step(&mut rand)?;
        assert_eq!(grammar.state(), "baa");
        grammar.step(&mut rand)?;
        assert_eq!(grammar.state(), "ab");
        let mut grammar = Grammar::try_from("a{1}b{2}@a{b|ab}b{a}")?;
        assert_eq!(grammar.state(), "");
        grammar.step(&mut rand)?;
        assert!(!grammar.state().is_empty());
        Ok(())
    }
}
