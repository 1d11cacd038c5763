//! Textual argument trees of parameter objects.

use std::fmt::Display;

use derive_more::From;
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

// -------------------------------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "parameter/args.pest"]
struct ArgumentParser {}

// -------------------------------------------------------------------------------------------------

/// A single node of a parameter object argument tree.
///
/// A list whose first element is text denotes a nested parameter object, e.g.
/// `(ru, 0, 1)`. Serializes untagged, so an argument tree is a plain JSON array.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Number(f64),
    Text(String),
    List(Vec<Argument>),
}

impl Argument {
    /// Parse a comma separated argument text. A single enclosing list is unwrapped, so
    /// `(ru,0,1)` and `ru,0,1` are equivalent.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use athenacl::parameter::Argument;
    /// let args = Argument::parse("bg, rc, (1, 3, 5)").unwrap();
    /// assert_eq!(args.len(), 3);
    /// assert_eq!(args[2], Argument::from(vec![1.0.into(), 3.0.into(), 5.0.into()]));
    /// ```
    pub fn parse(text: &str) -> Result<Vec<Argument>, String> {
        let mut values = Self::parse_list(text)?;
        if values.len() == 1 {
            if let Argument::List(_) = values[0] {
                if let Some(Argument::List(items)) = values.pop() {
                    return Ok(items);
                }
            }
        }
        Ok(values)
    }

    /// Parse a comma separated argument text as is: a single enclosing list stays a list.
    /// Used for argument lists which are not a parameter object on their own, such as
    /// default arguments.
    pub fn parse_list(text: &str) -> Result<Vec<Argument>, String> {
        let mut pairs = ArgumentParser::parse(Rule::arguments, text)
            .map_err(|err| format!("invalid argument string '{}': {}", text, err))?;
        let root = pairs
            .next()
            .ok_or_else(|| format!("invalid argument string '{}'", text))?;
        root.into_inner()
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(Self::from_pair)
            .collect()
    }

    fn from_pair(pair: Pair<Rule>) -> Result<Argument, String> {
        match pair.as_rule() {
            Rule::number => pair
                .as_str()
                .parse::<f64>()
                .map(Argument::Number)
                .map_err(|err| format!("invalid number '{}': {}", pair.as_str(), err)),
            Rule::text => Ok(Argument::Text(pair.as_str().to_string())),
            Rule::quoted => Ok(Argument::Text(
                pair.into_inner()
                    .next()
                    .map(|inner| inner.as_str().to_string())
                    .unwrap_or_default(),
            )),
            Rule::list => pair
                .into_inner()
                .map(Self::from_pair)
                .collect::<Result<Vec<_>, _>>()
                .map(Argument::List),
            rule => Err(format!("unexpected argument rule: {:?}", rule)),
        }
    }

    /// Name of the argument's data type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Argument::Number(_) => "number",
            Argument::Text(_) => "string",
            Argument::List(_) => "list",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Argument::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Argument::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Argument]> {
        match self {
            Argument::List(values) => Some(values),
            _ => None,
        }
    }

    /// True for lists starting with a text, the notation of a nested parameter object.
    pub fn is_parameter_object(&self) -> bool {
        matches!(self, Argument::List(items) if matches!(items.first(), Some(Argument::Text(_))))
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Text(value.to_string())
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Number(value as f64)
    }
}

// -------------------------------------------------------------------------------------------------

/// Format a number in its shortest round trip form, without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoids printing negative zeros
        return "0".to_string();
    }
    format!("{}", value)
}

fn needs_quotes(text: &str) -> bool {
    match ArgumentParser::parse(Rule::arguments, text) {
        Ok(mut pairs) => match pairs.next() {
            Some(root) => {
                let inner = root
                    .into_inner()
                    .filter(|pair| pair.as_rule() != Rule::EOI)
                    .collect::<Vec<_>>();
                !(inner.len() == 1
                    && inner[0].as_rule() == Rule::text
                    && inner[0].as_str() == text)
            }
            None => true,
        },
        Err(_) => true,
    }
}

/// Format an argument list as comma separated text.
pub fn format_arguments(args: &[Argument]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Number(value) => write!(f, "{}", format_number(*value)),
            Argument::Text(text) => {
                if !needs_quotes(text) {
                    write!(f, "{}", text)
                } else if text.contains('"') {
                    write!(f, "'{}'", text)
                } else {
                    write!(f, "\"{}\"", text)
                }
            }
            Argument::List(values) => write!(f, "({})", format_arguments(values)),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Argument {
        Argument::Text(s.to_string())
    }

    #[test]
    fn parse_list() -> Result<(), String> {
        assert_eq!(
            Argument::parse_list("(ru, 0, 1)")?,
            vec![Argument::List(vec![text("ru"), 0.0.into(), 1.0.into()])]
        );
        assert_eq!(
            Argument::parse_list("((3, 1, 1), (3, 2, 1))")?.len(),
            1
        );
        assert_eq!(Argument::parse_list("0, 20")?, vec![0.0.into(), 20.0.into()]);
        Ok(())
    }

    #[test]
    fn parse() -> Result<(), String> {
        assert_eq!(
            Argument::parse("pt,(c,4),(bg,rp,(1,1,2,3)),(c,1),(c,.75)")?,
            vec![
                text("pt"),
                Argument::List(vec![text("c"), 4.0.into()]),
                Argument::List(vec![
                    text("bg"),
                    text("rp"),
                    Argument::List(vec![1.0.into(), 1.0.into(), 2.0.into(), 3.0.into()])
                ]),
                Argument::List(vec![text("c"), 1.0.into()]),
                Argument::List(vec![text("c"), 0.75.into()]),
            ]
        );
        assert_eq!(
            Argument::parse("(ru, -1, 1e2)")?,
            vec![text("ru"), (-1.0).into(), 100.0.into()]
        );
        assert_eq!(
            Argument::parse("sl, 3|4, -12, 12, int, oc")?,
            vec![
                text("sl"),
                text("3|4"),
                (-12.0).into(),
                12.0.into(),
                text("int"),
                text("oc")
            ]
        );
        assert_eq!(
            Argument::parse("mp, a{3,1,1}b{2,1,1}:{a=3|b=4}, (c, 0)")?,
            vec![
                text("mp"),
                text("a{3,1,1}b{2,1,1}:{a=3|b=4}"),
                Argument::List(vec![text("c"), 0.0.into()])
            ]
        );
        assert_eq!(
            Argument::parse("cf, '/tmp/a sample.aif'")?,
            vec![text("cf"), text("/tmp/a sample.aif")]
        );
        assert_eq!(Argument::parse("bg,rc,[1,2],")?.len(), 3);
        assert_eq!(Argument::parse("")?, vec![]);
        assert!(Argument::parse("ru,(0,1").is_err());
        assert!(Argument::parse("ru,a{b").is_err());
        Ok(())
    }

    #[test]
    fn display() -> Result<(), String> {
        for input in [
            "randomUniform, (constant, 0), (constant, 1)",
            "sieveList, 3|4, -12, 12, integer, orderedCyclic",
            "markovPulse, a{3,1,1}b{2,1,1}:{a=3|b=4}, (constant, 0)",
            "constantFile, \"/tmp/a sample.aif\"",
            "constant, \"12\"",
            "basketGen, randomChoice, (0.25, -3, 1000000)",
        ] {
            let args = Argument::parse(input)?;
            assert_eq!(format_arguments(&args), input);
        }
        assert_eq!(Argument::from(-0.0).to_string(), "0");
        assert_eq!(Argument::from("a b").to_string(), "\"a b\"");
        Ok(())
    }

    #[test]
    fn serialize() -> Result<(), String> {
        let args = Argument::parse("ru, (c, 0), (c, 1)")?;
        let json = serde_json::to_string(&args).map_err(|err| err.to_string())?;
        assert_eq!(json, r#"["ru",["c",0.0],["c",1.0]]"#);
        let loaded: Vec<Argument> = serde_json::from_str(&json).map_err(|err| err.to_string())?;
        assert_eq!(loaded, args);
        Ok(())
    }
}
