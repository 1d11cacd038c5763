//! Xenakis residual class sieves, parsed from logical strings such as `3@2&4@1|-5`.

use std::{collections::HashSet, fmt::Display, ops::Range};

use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use crate::unit;

// -------------------------------------------------------------------------------------------------

/// Segments of sieves with periods larger than this are not compressed.
const MAX_COMPRESSION_PERIOD: u64 = 100_000;

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        0
    } else {
        (a / gcd(a, b)).saturating_mul(b)
    }
}

// Bachet de Meziriac: find g with (g * c1) % c2 == 1 for coprime c1, c2
fn meziriac(c1: u64, c2: u64) -> u64 {
    if c2 == 1 {
        return 1;
    }
    if c1 == c2 {
        return 0;
    }
    (0..c2).find(|g| (g * c1) % c2 == 1).unwrap_or(0)
}

// -------------------------------------------------------------------------------------------------

/// Output format of a sieve or prime segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentFormat {
    /// The integer points.
    Integer,
    /// Distances between adjacent points.
    Width,
    /// Points normalized within the segment range.
    Unit,
    /// 1 for each point in the range which is part of the segment, else 0.
    Binary,
}

impl TryFrom<&str> for SegmentFormat {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Integer),
            "wid" | "width" => Ok(Self::Width),
            "unit" => Ok(Self::Unit),
            "bin" | "binary" => Ok(Self::Binary),
            _ => Err(format!(
                "invalid sieve format '{}': expected integer, width, unit or binary",
                s
            )),
        }
    }
}

impl Display for SegmentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "int",
            Self::Width => "wid",
            Self::Unit => "unit",
            Self::Binary => "bin",
        };
        write!(f, "{}", name)
    }
}

/// Convert a sorted integer segment into the given format. `z` is the inclusive range the
/// segment was drawn from.
pub fn format_segment(segment: &[i64], z: (i64, i64), format: SegmentFormat) -> Vec<f64> {
    match format {
        SegmentFormat::Integer => segment.iter().map(|v| *v as f64).collect(),
        SegmentFormat::Width => segment.windows(2).map(|w| (w[1] - w[0]) as f64).collect(),
        SegmentFormat::Unit => {
            if segment.len() <= 1 {
                vec![0.0; segment.len()]
            } else {
                let (min, max) = (z.0 as f64, z.1 as f64);
                segment.iter().map(|v| unit::norm(*v as f64, min, max)).collect()
            }
        }
        SegmentFormat::Binary => {
            let members = segment.iter().copied().collect::<HashSet<_>>();
            (z.0..=z.1)
                .map(|v| if members.contains(&v) { 1.0 } else { 0.0 })
                .collect()
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A residual class: all integers `x` with `x % modulus == shift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Residual {
    modulus: u64,
    shift: u64,
}

impl Residual {
    /// Create a new residual. The shift is reduced by the modulus.
    pub fn new(modulus: u64, shift: u64) -> Result<Self, String> {
        if modulus == 0 {
            return Err("residual modulus must be greater than 0".to_string());
        }
        Ok(Self {
            modulus,
            shift: shift % modulus,
        })
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn shift(&self) -> u64 {
        self.shift
    }

    /// True when `value`, shifted by `n`, is part of the class.
    pub fn contains(&self, value: i64, n: i64) -> bool {
        let m = self.modulus as i64;
        value.rem_euclid(m) == (n + self.shift as i64).rem_euclid(m)
    }

    /// Reduce the intersection of two residuals to a single residual. Returns `None` when
    /// the intersection is empty.
    pub fn intersection(&self, other: &Residual) -> Option<Residual> {
        let (m1, m2) = (self.modulus, other.modulus);
        let (n1, n2) = (self.shift as i64, other.shift as i64);
        let d = gcd(m1, m2);
        if (n1 - n2).rem_euclid(d as i64) != 0 {
            return None;
        }
        let (c1, c2) = (m1 / d, m2 / d);
        let m3 = c1 * c2 * d;
        let g = meziriac(c1, c2) as i64;
        let n3 = (n1 + g * (n2 - n1) * c1 as i64).rem_euclid(m3 as i64);
        Residual::new(m3, n3 as u64).ok()
    }
}

impl Display for Residual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.modulus, self.shift)
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "sieve.pest"]
struct SieveParser {}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Residual(Residual),
    Complement(Box<Node>),
    Intersection(Vec<Node>),
    Exclusive(Vec<Node>),
    Union(Vec<Node>),
}

impl Node {
    fn parse(pair: Pair<Rule>) -> Result<Node, String> {
        match pair.as_rule() {
            Rule::union | Rule::exclusive | Rule::intersection => {
                let rule = pair.as_rule();
                let mut nodes = pair
                    .into_inner()
                    .map(Node::parse)
                    .collect::<Result<Vec<_>, _>>()?;
                if nodes.len() == 1 {
                    return Ok(nodes.remove(0));
                }
                Ok(match rule {
                    Rule::union => Node::Union(nodes),
                    Rule::exclusive => Node::Exclusive(nodes),
                    _ => Node::Intersection(nodes),
                })
            }
            Rule::term => {
                let mut complements = 0;
                let mut node = None;
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::complement => complements += 1,
                        _ => node = Some(Node::parse(inner)?),
                    }
                }
                let mut node = node.ok_or_else(|| "empty sieve term".to_string())?;
                for _ in 0..complements {
                    node = Node::Complement(Box::new(node));
                }
                Ok(node)
            }
            Rule::group => match pair.into_inner().next() {
                Some(inner) => Node::parse(inner),
                None => Err("empty sieve group".to_string()),
            },
            Rule::residual => {
                let mut inner = pair.into_inner();
                let mut next_int = || -> Result<Option<u64>, String> {
                    inner
                        .next()
                        .map(|p| {
                            p.as_str()
                                .parse::<u64>()
                                .map_err(|err| format!("invalid residual '{}': {}", p.as_str(), err))
                        })
                        .transpose()
                };
                let modulus = next_int()?.ok_or_else(|| "missing residual modulus".to_string())?;
                let shift = next_int()?.unwrap_or(0);
                Ok(Node::Residual(Residual::new(modulus, shift)?))
            }
            rule => Err(format!("unexpected sieve rule: {:?}", rule)),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Node::Union(_) => 0,
            Node::Exclusive(_) => 1,
            Node::Intersection(_) => 2,
            Node::Complement(_) | Node::Residual(_) => 3,
        }
    }

    fn moduli(&self, moduli: &mut Vec<u64>) {
        match self {
            Node::Residual(residual) => moduli.push(residual.modulus),
            Node::Complement(node) => node.moduli(moduli),
            Node::Intersection(nodes) | Node::Exclusive(nodes) | Node::Union(nodes) => {
                nodes.iter().for_each(|node| node.moduli(moduli))
            }
        }
    }

    fn contains(&self, value: i64, n: i64) -> bool {
        match self {
            Node::Residual(residual) => residual.contains(value, n),
            Node::Complement(node) => !node.contains(value, n),
            Node::Intersection(nodes) => nodes.iter().all(|node| node.contains(value, n)),
            Node::Exclusive(nodes) => nodes
                .iter()
                .fold(false, |acc, node| acc ^ node.contains(value, n)),
            Node::Union(nodes) => nodes.iter().any(|node| node.contains(value, n)),
        }
    }

    // union of intersections of plain residuals, if the node has that shape
    fn intersection_groups(&self) -> Option<Vec<Vec<Residual>>> {
        fn group(node: &Node) -> Option<Vec<Residual>> {
            match node {
                Node::Residual(residual) => Some(vec![*residual]),
                Node::Intersection(nodes) => nodes
                    .iter()
                    .map(|node| match node {
                        Node::Residual(residual) => Some(*residual),
                        _ => None,
                    })
                    .collect(),
                _ => None,
            }
        }
        match self {
            Node::Union(nodes) => nodes.iter().map(group).collect(),
            node => group(node).map(|group| vec![group]),
        }
    }

    fn write(&self, f: &mut std::fmt::Formatter<'_>, parent_precedence: u8) -> std::fmt::Result {
        fn write_list(
            f: &mut std::fmt::Formatter<'_>,
            nodes: &[Node],
            op: &str,
            precedence: u8,
        ) -> std::fmt::Result {
            for (index, node) in nodes.iter().enumerate() {
                if index > 0 {
                    write!(f, "{}", op)?;
                }
                node.write(f, precedence + 1)?;
            }
            Ok(())
        }
        let precedence = self.precedence();
        let braces = precedence < parent_precedence;
        if braces {
            write!(f, "{{")?;
        }
        match self {
            Node::Residual(residual) => write!(f, "{}", residual)?,
            Node::Complement(node) => {
                write!(f, "-")?;
                node.write(f, precedence)?;
            }
            Node::Intersection(nodes) => write_list(f, nodes, "&", precedence)?,
            Node::Exclusive(nodes) => write_list(f, nodes, "^", precedence)?,
            Node::Union(nodes) => write_list(f, nodes, "|", precedence)?,
        }
        if braces {
            write!(f, "}}")?;
        }
        Ok(())
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write(f, 0)
    }
}

// -------------------------------------------------------------------------------------------------

/// Representation state of a sieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SieveState {
    /// The logical string as parsed.
    Expanded,
    /// A union of residuals, reduced by intersection or by segment analysis.
    Compressed,
}

/// A sieve: a logical combination of residual classes.
///
/// Supported syntax: residuals as `M@N`, `M,N` or `M`; `|` (or `+`, `or`) for union,
/// `&` (or `*`, `and`) for intersection, `^` (or `xor`) for symmetric difference, and a
/// `-` (or `not`) prefix for the complement. Groups use `{}`, `[]` or `()`.
/// Complement binds tighter than `&`, which binds tighter than `^` and `|`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sieve {
    expanded: Node,
    compressed: Option<Vec<Residual>>,
}

impl Sieve {
    fn normalize(input: &str) -> String {
        let mut normalized = input.to_ascii_lowercase();
        for (from, to) in [
            ("xor", "^"),
            ("and", "&"),
            ("or", "|"),
            ("not", "-"),
            ("sub", "@"),
            ("*", "&"),
            ("+", "|"),
            ("[", "{"),
            ("(", "{"),
            ("]", "}"),
            (")", "}"),
        ] {
            normalized = normalized.replace(from, to);
        }
        normalized
    }

    fn compress(expanded: &Node, period: u64) -> Option<Vec<Residual>> {
        // intersection by reduction when no complement or grouping is involved
        if let Some(groups) = expanded.intersection_groups() {
            let mut residuals = Vec::new();
            for group in groups {
                let mut iter = group.into_iter();
                let first = iter.next();
                let reduced = iter.fold(first, |acc, residual| {
                    acc.and_then(|acc| acc.intersection(&residual))
                });
                if let Some(reduced) = reduced {
                    if !residuals.contains(&reduced) {
                        residuals.push(reduced);
                    }
                }
            }
            if !residuals.is_empty() {
                return Some(residuals);
            }
        }
        // else analyze a single period of the segment
        if period == 0 || period > MAX_COMPRESSION_PERIOD {
            return None;
        }
        let members = (0..period as i64)
            .map(|value| expanded.contains(value, 0))
            .collect::<Vec<_>>();
        let mut remaining = (0..period as i64)
            .filter(|value| members[*value as usize])
            .collect::<Vec<_>>();
        if remaining.is_empty() {
            return None;
        }
        let divisors = (1..=period).filter(|m| period % m == 0).collect::<Vec<_>>();
        let mut residuals = Vec::new();
        while let Some(&n) = remaining.first() {
            let residual = divisors.iter().find_map(|m| {
                let shift = n as u64 % m;
                let fits = (shift..period)
                    .step_by(*m as usize)
                    .all(|value| members[value as usize]);
                if fits {
                    Residual::new(*m, shift).ok()
                } else {
                    None
                }
            })?;
            remaining.retain(|value| !residual.contains(*value, 0));
            if !residuals.contains(&residual) {
                residuals.push(residual);
            }
        }
        residuals.sort();
        Some(residuals)
    }

    /// True when a compressed representation is available.
    pub fn is_compressible(&self) -> bool {
        self.compressed.is_some()
    }

    /// The compressed residuals, if any.
    pub fn compressed(&self) -> Option<&[Residual]> {
        self.compressed.as_deref()
    }

    /// The period of the sieve: least common multiple of all moduli.
    pub fn period(&self) -> u64 {
        let mut moduli = Vec::new();
        self.expanded.moduli(&mut moduli);
        moduli.into_iter().fold(1, lcm)
    }

    /// String representation in the given state. Falls back to the expanded form when the
    /// sieve can't be compressed.
    pub fn repr(&self, state: SieveState) -> String {
        match (state, &self.compressed) {
            (SieveState::Compressed, Some(residuals)) => residuals
                .iter()
                .map(|residual| residual.to_string())
                .collect::<Vec<_>>()
                .join("|"),
            _ => self.expanded.to_string(),
        }
    }

    /// True when `value`, shifted by `n`, is part of the sieve.
    pub fn contains(&self, value: i64, n: i64) -> bool {
        self.expanded.contains(value, n)
    }

    /// All integer points in `z`, with the sieve shifted by `n`.
    pub fn integers(&self, n: i64, z: Range<i64>) -> Vec<i64> {
        z.filter(|value| self.expanded.contains(*value, n)).collect()
    }

    /// A segment of the sieve within `z` in the given format.
    pub fn segment(&self, n: i64, z: Range<i64>, format: SegmentFormat) -> Vec<f64> {
        if z.is_empty() {
            return vec![];
        }
        let bounds = (z.start, z.end - 1);
        format_segment(&self.integers(n, z), bounds, format)
    }
}

impl TryFrom<&str> for Sieve {
    type Error = String;

    fn try_from(input: &str) -> Result<Self, String> {
        let normalized = Sieve::normalize(input);
        let expanded = match SieveParser::parse(Rule::sieve, &normalized) {
            Ok(mut pairs) => {
                let sieve = pairs
                    .next()
                    .and_then(|pair| pair.into_inner().next())
                    .ok_or_else(|| format!("invalid sieve '{}': empty string", input))?;
                Node::parse(sieve).map_err(|err| format!("invalid sieve '{}': {}", input, err))?
            }
            Err(err) => return Err(format!("invalid sieve '{}': {}", input, err)),
        };
        let mut moduli = Vec::new();
        expanded.moduli(&mut moduli);
        let period = moduli.into_iter().fold(1, lcm);
        let compressed = Sieve::compress(&expanded, period);
        Ok(Self {
            expanded,
            compressed,
        })
    }
}

impl Display for Sieve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expanded)
    }
}

// -------------------------------------------------------------------------------------------------

fn is_prime(value: i64) -> bool {
    if value < 2 {
        return false;
    }
    if value % 2 == 0 {
        return value == 2;
    }
    let mut divisor = 3;
    while divisor * divisor <= value {
        if value % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// `length` successive primes, starting at `start`. Negative starts collect negated primes
/// downwards to zero first, then continue with positive primes.
pub fn prime_segment(start: i64, length: usize) -> Vec<i64> {
    let mut segment = Vec::with_capacity(length);
    if start < 0 {
        let mut value = -start;
        while value >= 0 && segment.len() < length {
            if is_prime(value) {
                segment.push(-value);
            }
            value -= 1;
        }
    }
    let mut value = start.max(0);
    while segment.len() < length {
        if is_prime(value) {
            segment.push(value);
        }
        value += 1;
    }
    segment
}

/// A prime segment in the given format. The range is bound by the first and last prime.
pub fn prime_segment_formatted(start: i64, length: usize, format: SegmentFormat) -> Vec<f64> {
    let segment = prime_segment(start, length);
    match (segment.first(), segment.last()) {
        (Some(first), Some(last)) => format_segment(&segment, (*first, *last), format),
        _ => vec![],
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn residual_intersection() -> Result<(), String> {
        let a = Residual::new(3, 2)?;
        let b = Residual::new(5, 1)?;
        assert_eq!(a.intersection(&b), Some(Residual::new(15, 11)?));
        let c = Residual::new(4, 1)?;
        let d = Residual::new(6, 3)?;
        assert_eq!(c.intersection(&d), Some(Residual::new(12, 9)?));
        let e = Residual::new(4, 0)?;
        assert_eq!(c.intersection(&e), None);
        assert_eq!(Residual::new(3, 11)?.to_string(), "3@2");
        assert!(Residual::new(0, 1).is_err());
        Ok(())
    }

    #[test]
    fn parse_and_repr() -> Result<(), String> {
        let sieve = Sieve::try_from("3@11")?;
        assert_eq!(sieve.repr(SieveState::Expanded), "3@2");
        assert_eq!(sieve.period(), 3);
        assert_eq!(
            sieve.integers(0, 0..20),
            vec![2, 5, 8, 11, 14, 17]
        );
        let sieve = Sieve::try_from("(5|2)&4&8")?;
        assert_eq!(sieve.repr(SieveState::Expanded), "{5@0|2@0}&4@0&8@0");
        assert_eq!(sieve.period(), 40);
        assert_eq!(
            sieve.segment(0, 0..100, SegmentFormat::Width),
            vec![8.0; 12]
        );
        let sieve = Sieve::try_from("2&4&8|5")?;
        assert_eq!(sieve.integers(0, 0..20), vec![0, 5, 8, 10, 15, 16]);
        assert_eq!(sieve.repr(SieveState::Compressed), "8@0|5@0");
        assert_eq!(
            Sieve::try_from("3 and 4 or not 5")?.repr(SieveState::Expanded),
            "3@0&4@0|-5@0"
        );
        assert!(Sieve::try_from("3@").is_err());
        assert!(Sieve::try_from("3&|4").is_err());
        assert!(Sieve::try_from("").is_err());
        Ok(())
    }

    #[test]
    fn complex_sieve() -> Result<(), String> {
        let sieve = Sieve::try_from("3@2 & 4@1 | 2@0 & 3@1 | 3@3 | -4@2")?;
        let expected = (0..100)
            .filter(|x| {
                (x % 3 == 2 && x % 4 == 1) || (x % 2 == 0 && x % 3 == 1) || x % 3 == 0 || x % 4 != 2
            })
            .collect::<Vec<i64>>();
        assert_eq!(sieve.integers(0, 0..100), expected);
        assert_eq!(sieve.period(), 12);
        // compressed by segment analysis, still equal
        let residuals = sieve.compressed().ok_or("not compressible")?;
        let compressed = (0..100)
            .filter(|x| residuals.iter().any(|r| r.contains(*x, 0)))
            .collect::<Vec<i64>>();
        assert_eq!(compressed, expected);
        Ok(())
    }

    #[test]
    fn period_segments_repeat() -> Result<(), String> {
        for input in ["3@2&4@1|2@0&3@1|3@3|-4@2", "5|7@3", "-{3|4}^6@1"] {
            let sieve = Sieve::try_from(input)?;
            let period = sieve.period() as i64;
            let one = sieve.integers(0, 0..period);
            let two = sieve.integers(0, 0..2 * period);
            let mut expected = one.clone();
            expected.extend(one.iter().map(|v| v + period));
            assert_eq!(two, expected);
        }
        Ok(())
    }

    #[test]
    fn segment_formats() -> Result<(), String> {
        let sieve = Sieve::try_from("3")?;
        assert_eq!(
            sieve.segment(0, 0..7, SegmentFormat::Binary),
            vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(
            sieve.segment(0, 0..7, SegmentFormat::Unit),
            vec![0.0, 0.5, 1.0]
        );
        assert_eq!(sieve.integers(1, 0..7), vec![1, 4]);
        assert_eq!(SegmentFormat::try_from("WID"), Ok(SegmentFormat::Width));
        Ok(())
    }

    #[test]
    fn primes() {
        assert_eq!(
            prime_segment(3, 10),
            vec![3, 5, 7, 11, 13, 17, 19, 23, 29, 31]
        );
        assert_eq!(prime_segment(-6, 4), vec![-5, -3, -2, 2]);
        assert_eq!(
            prime_segment_formatted(2, 4, SegmentFormat::Width),
            vec![1.0, 2.0, 2.0]
        );
    }
}
