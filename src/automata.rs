//! One dimensional cellular automata, configured from specification strings such as
//! `f{s}k{2}r{1}i{c}x{91}y{135}`, with table extraction of the generated cell history.

use std::fmt::Display;

use crate::seed::RandomStream;

// -------------------------------------------------------------------------------------------------

const X_MAX: i64 = 1000;
const Y_MAX: i64 = 10000;

// -------------------------------------------------------------------------------------------------

/// Cell value model of an automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaFormat {
    /// Discrete cells, rule applied to the exact neighbourhood.
    Standard,
    /// Discrete cells, rule applied to the neighbourhood sum.
    Totalistic,
    /// Unit interval cells, rule added to the neighbourhood average.
    Continuous,
    /// Same as continuous.
    Float,
}

impl CaFormat {
    fn is_continuous(&self) -> bool {
        matches!(self, Self::Continuous | Self::Float)
    }
}

impl TryFrom<&str> for CaFormat {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "standard" => Ok(Self::Standard),
            "t" | "tot" | "totalistic" => Ok(Self::Totalistic),
            "c" | "continuous" => Ok(Self::Continuous),
            "f" | "float" => Ok(Self::Float),
            _ => Err(format!("invalid automaton format '{}'", s)),
        }
    }
}

impl Display for CaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Standard => "s",
            Self::Totalistic => "t",
            Self::Continuous => "c",
            Self::Float => "f",
        };
        write!(f, "{}", name)
    }
}

// -------------------------------------------------------------------------------------------------

/// First generation of an automaton.
#[derive(Debug, Clone, PartialEq)]
pub enum CaInit {
    /// A single active cell in the center.
    Center,
    /// Random cell values.
    Random,
    /// Repeated cell values, e.g. `i{0110}`.
    Cells(Vec<u8>),
}

impl TryFrom<&str> for CaInit {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        let s = s.trim().to_ascii_lowercase();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Self::Cells(s.bytes().map(|b| b - b'0').collect()));
        }
        match s.as_str() {
            "c" | "center" => Ok(Self::Center),
            "r" | "random" => Ok(Self::Random),
            _ => Err(format!("invalid automaton init '{}'", s)),
        }
    }
}

impl Display for CaInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Center => write!(f, "center"),
            Self::Random => write!(f, "random"),
            Self::Cells(cells) => {
                for cell in cells {
                    write!(f, "{}", cell)?;
                }
                Ok(())
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Automaton configuration.
///
/// Keys: `f` format, `k` number of cell values, `r` neighbourhood radius (may be a half
/// value), `i` init, `x` cells per row, `y` generations, `w` extraction width,
/// `c` extraction center offset, `s` skipped generations. Unknown keys are ignored and
/// invalid or out of range values fall back to their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CaSpecification {
    format: CaFormat,
    k: u32,
    r: f64,
    init: CaInit,
    x: usize,
    y: usize,
    w: usize,
    c: i64,
    s: usize,
}

impl Default for CaSpecification {
    fn default() -> Self {
        Self {
            format: CaFormat::Standard,
            k: 2,
            r: 1.0,
            init: CaInit::Center,
            x: 91,
            y: 135,
            w: 91,
            c: 0,
            s: 0,
        }
    }
}

impl CaSpecification {
    pub fn format(&self) -> CaFormat {
        self.format
    }

    /// Number of discrete cell values, 0 for continuous automata.
    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    /// Cells per row.
    pub fn size(&self) -> usize {
        self.x
    }

    /// Generations to extract.
    pub fn generations(&self) -> usize {
        self.y
    }

    /// Generations to produce, including the skipped ones.
    pub fn generations_total(&self) -> usize {
        self.y + self.s
    }

    pub fn skip(&self) -> usize {
        self.s
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn center(&self) -> i64 {
        self.c
    }

    /// Number of cells in a neighbourhood.
    fn span(&self) -> usize {
        (self.r * 2.0 + 1.0) as usize
    }
}

impl TryFrom<&str> for CaSpecification {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        if s.matches('{').count() != s.matches('}').count() {
            return Err(format!(
                "invalid automaton specification '{}': all braces not paired",
                s
            ));
        }
        let mut spec = Self::default();
        let mut width = None;
        let number = |value: &str, min: i64, max: i64| -> Option<i64> {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .map(|v| v.round() as i64)
                .filter(|v| (min..=max).contains(v))
        };
        for group in s.split('}') {
            let Some((key, value)) = group.split_once('{') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            match key.as_str() {
                "f" | "format" | "form" | "type" => {
                    if let Ok(format) = CaFormat::try_from(value) {
                        spec.format = format;
                    }
                }
                "k" | "colors" => {
                    if let Some(k) = number(value, 0, 36) {
                        spec.k = k as u32;
                    }
                }
                "r" | "radius" => {
                    if let Ok(r) = value.trim().parse::<f64>() {
                        if (0.5..=10.0).contains(&r) {
                            spec.r = (r * 2.0).round() / 2.0;
                        }
                    }
                }
                "i" | "init" | "initial" => {
                    if let Ok(init) = CaInit::try_from(value) {
                        spec.init = init;
                    }
                }
                "x" | "size" => {
                    if let Some(x) = number(value, 1, X_MAX) {
                        spec.x = x as usize;
                    }
                }
                "y" | "steps" | "gen" => {
                    if let Some(y) = number(value, 1, Y_MAX) {
                        spec.y = y as usize;
                    }
                }
                "w" | "width" => {
                    width = number(value, 0, Y_MAX).map(|w| w as usize);
                }
                "c" | "center" => {
                    if let Some(c) = number(value, -X_MAX, X_MAX) {
                        spec.c = c;
                    }
                }
                "s" | "skip" => {
                    if let Some(skip) = number(value, 0, Y_MAX) {
                        spec.s = skip as usize;
                    }
                }
                _ => (),
            }
        }
        if spec.k == 0 {
            spec.format = CaFormat::Float;
        }
        spec.w = match width {
            Some(w) if w > 0 => w,
            _ => spec.x,
        };
        if spec.format.is_continuous() {
            spec.k = 0;
        }
        Ok(spec)
    }
}

impl Display for CaSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "f{{{}}}k{{{}}}r{{{}}}i{{{}}}x{{{}}}y{{{}}}w{{{}}}c{{{}}}s{{{}}}",
            self.format, self.k, self.r, self.init, self.x, self.y, self.w, self.c, self.s
        )
    }
}

// -------------------------------------------------------------------------------------------------

/// Ways to reduce the two dimensional cell history to a list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    FlatRow,
    FlatColumn,
    FlatRowReflect,
    FlatColumnReflect,
    SumRow,
    SumColumn,
    AverageRow,
    AverageColumn,
    ProductRow,
    ProductColumn,
}

impl TableFormat {
    fn is_column(&self) -> bool {
        matches!(
            self,
            Self::FlatColumn
                | Self::FlatColumnReflect
                | Self::SumColumn
                | Self::AverageColumn
                | Self::ProductColumn
        )
    }
}

impl TryFrom<&str> for TableFormat {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flatrow" | "fr" | "f" | "flat" => Ok(Self::FlatRow),
            "flatcolumn" | "fc" => Ok(Self::FlatColumn),
            "flatrowreflect" | "frr" => Ok(Self::FlatRowReflect),
            "flatcolumnreflect" | "fcr" => Ok(Self::FlatColumnReflect),
            "sumrow" | "sr" | "sum" | "s" => Ok(Self::SumRow),
            "sumcolumn" | "sc" => Ok(Self::SumColumn),
            "averagerow" | "ar" | "average" | "a" => Ok(Self::AverageRow),
            "averagecolumn" | "ac" => Ok(Self::AverageColumn),
            "productrow" | "pr" | "product" | "p" => Ok(Self::ProductRow),
            "productcolumn" | "pc" => Ok(Self::ProductColumn),
            _ => Err(format!("invalid table extraction string '{}'", s)),
        }
    }
}

impl Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FlatRow => "flatRow",
            Self::FlatColumn => "flatColumn",
            Self::FlatRowReflect => "flatRowReflect",
            Self::FlatColumnReflect => "flatColumnReflect",
            Self::SumRow => "sumRow",
            Self::SumColumn => "sumColumn",
            Self::AverageRow => "averageRow",
            Self::AverageColumn => "averageColumn",
            Self::ProductRow => "productRow",
            Self::ProductColumn => "productColumn",
        };
        write!(f, "{}", name)
    }
}

/// Normalize against a fixed minimum of 0 and the series maximum.
fn normalize(series: Vec<f64>) -> Vec<f64> {
    if series.len() <= 1 {
        return vec![0.0; series.len()];
    }
    let max = series.iter().copied().fold(0.0, f64::max);
    series
        .into_iter()
        .map(|v| if max != 0.0 { v / max } else { 0.0 })
        .collect()
}

// -------------------------------------------------------------------------------------------------

/// A one dimensional cellular automaton with its full generation history.
#[derive(Debug, Clone)]
pub struct Automaton {
    spec: CaSpecification,
    rule: f64,
    mutation: f64,
    history: Vec<Vec<f64>>,
}

impl Automaton {
    /// Create a new automaton with its first generation.
    pub fn new(
        spec: CaSpecification,
        rule: f64,
        mutation: f64,
        rand: &mut RandomStream,
    ) -> Result<Self, String> {
        if spec.format == CaFormat::Totalistic {
            if spec.k <= 1 {
                return Err(format!("bad k value '{}' for a totalistic automaton", spec.k));
            }
            if spec.r < 1.0 {
                return Err(format!("bad r value '{}' for a totalistic automaton", spec.r));
            }
        }
        let mut automaton = Self {
            spec,
            rule: 0.0,
            mutation,
            history: Vec::new(),
        };
        automaton.rule = automaton.filter_rule(rule);
        automaton.clear(rand);
        Ok(automaton)
    }

    pub fn spec(&self) -> &CaSpecification {
        &self.spec
    }

    pub fn rule(&self) -> f64 {
        self.rule
    }

    pub fn history(&self) -> &[Vec<f64>] {
        &self.history
    }

    /// Discrete cell values in ascending order.
    fn values(&self) -> Vec<f64> {
        (0..self.spec.k).map(f64::from).collect()
    }

    /// Number of rule digits, or None when it exceeds the integer range.
    fn rule_max(&self) -> Option<u128> {
        let k = self.spec.k as u128;
        let span = self.spec.span() as u32;
        match self.spec.format {
            CaFormat::Standard => k
                .checked_pow(span)
                .and_then(|n| u32::try_from(n).ok())
                .and_then(|n| k.checked_pow(n)),
            CaFormat::Totalistic => {
                let sums = (k - 1) * span as u128 + 1;
                u32::try_from(sums).ok().and_then(|n| k.checked_pow(n))
            }
            CaFormat::Continuous | CaFormat::Float => None,
        }
    }

    fn filter_rule(&self, rule: f64) -> f64 {
        if self.spec.format.is_continuous() {
            return rule.rem_euclid(1.0);
        }
        let rule = rule.abs().round();
        match self.rule_max() {
            Some(max) => ((rule as u128) % max) as f64,
            None => rule,
        }
    }

    /// Reset the history to the first generation.
    pub fn clear(&mut self, rand: &mut RandomStream) {
        let size = self.spec.x;
        let continuous = self.spec.format.is_continuous();
        let values = self.values();
        let mut row = vec![0.0; size];
        match &self.spec.init {
            CaInit::Center => {
                row[size / 2] = if continuous {
                    1.0
                } else if self.spec.format == CaFormat::Totalistic {
                    values.get(1).copied().unwrap_or(1.0)
                } else {
                    values.last().copied().unwrap_or(1.0)
                };
            }
            CaInit::Random => {
                for cell in row.iter_mut() {
                    *cell = if continuous {
                        rand.unit()
                    } else {
                        values[rand.index(values.len())]
                    };
                }
            }
            CaInit::Cells(cells) => {
                let max = if continuous {
                    1.0
                } else {
                    values.last().copied().unwrap_or(1.0)
                };
                for (index, cell) in row.iter_mut().enumerate() {
                    *cell = f64::from(cells[index % cells.len()]).min(max);
                }
            }
        }
        self.history = vec![row];
    }

    fn neighbourhood(&self, last: &[f64], position: usize) -> Vec<f64> {
        let span = self.spec.span() as i64;
        let shift = -(span / 2);
        (0..span)
            .map(|q| {
                let index = (position as i64 + shift + q).rem_euclid(last.len() as i64);
                last[index as usize]
            })
            .collect()
    }

    fn rule_digit(&self, rule: u128, index: u128) -> f64 {
        let k = self.spec.k as u128;
        u32::try_from(index)
            .ok()
            .and_then(|index| k.checked_pow(index))
            .map_or(0.0, |power| ((rule / power) % k) as f64)
    }

    /// Produce the next generation with the given rule and mutation probability.
    pub fn generate(&mut self, rule: f64, mutation: f64, rand: &mut RandomStream) {
        self.rule = self.filter_rule(rule);
        self.mutation = mutation;
        let last = self.history.last().cloned().unwrap_or_default();
        let mut next = vec![0.0; last.len()];
        if self.spec.format.is_continuous() {
            for (position, cell) in next.iter_mut().enumerate() {
                let neighbours = self.neighbourhood(&last, position);
                let average = neighbours.iter().sum::<f64>() / neighbours.len() as f64;
                *cell = if rand.unit() < self.mutation {
                    rand.unit()
                } else {
                    (average + self.rule).rem_euclid(1.0)
                };
            }
        } else {
            let k = self.spec.k as u128;
            let rule = self.rule as u128;
            let values = self.values();
            for (position, cell) in next.iter_mut().enumerate() {
                let neighbours = self.neighbourhood(&last, position);
                let index = match self.spec.format {
                    CaFormat::Totalistic => Some(neighbours.iter().sum::<f64>() as u128),
                    _ => neighbours.iter().try_fold(0u128, |index, cell| {
                        index.checked_mul(k)?.checked_add(*cell as u128)
                    }),
                };
                let mut value = index.map_or(0.0, |index| self.rule_digit(rule, index));
                if values.len() > 1 && rand.unit() < self.mutation {
                    let others = values
                        .iter()
                        .copied()
                        .filter(|v| *v != value)
                        .collect::<Vec<_>>();
                    value = others[rand.index(others.len())];
                }
                *cell = value;
            }
        }
        self.history.push(next);
    }

    /// Extract the history, from the skipped generations on, as a flat list of values.
    /// Columns are taken `width` cells around the center shifted by the center offset,
    /// wrapping at the row boundaries.
    pub fn cells(&self, format: TableFormat, norm: bool) -> Vec<f64> {
        let rows = self.history.len();
        if rows == 0 {
            return Vec::new();
        }
        let start = self.spec.s % rows;
        let size = self.spec.x as i64;
        let center = size / 2 + self.spec.c;
        let width = self.spec.w.max(1) as i64;
        let (left, right) = (width / 2, width - width / 2);
        let mut table = self.history[start..]
            .iter()
            .map(|row| {
                (center - left..center + right)
                    .map(|i| row[i.rem_euclid(size) as usize])
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        if format.is_column() && !table.is_empty() {
            let columns = table[0].len();
            table = (0..columns)
                .map(|column| table.iter().map(|row| row[column]).collect())
                .collect();
        }
        let values = match format {
            TableFormat::FlatRow | TableFormat::FlatColumn => table.concat(),
            TableFormat::FlatRowReflect | TableFormat::FlatColumnReflect => table
                .into_iter()
                .flat_map(|row| row.into_iter().rev())
                .collect(),
            TableFormat::SumRow | TableFormat::SumColumn => {
                table.iter().map(|row| row.iter().sum()).collect()
            }
            TableFormat::AverageRow | TableFormat::AverageColumn => table
                .iter()
                .map(|row| row.iter().sum::<f64>() / row.len().max(1) as f64)
                .collect(),
            TableFormat::ProductRow | TableFormat::ProductColumn => {
                table.iter().map(|row| row.iter().product()).collect()
            }
        };
        if norm {
            normalize(values)
        } else {
            values
        }
    }
}

impl Display for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.spec)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn row_string(row: &[f64]) -> String {
        row.iter()
            .map(|v| if *v > 0.0 { '+' } else { ' ' })
            .collect()
    }

    #[test]
    fn specification() -> Result<(), String> {
        let spec = CaSpecification::try_from("f{t}k{3}x{21}y{10}")?;
        assert_eq!(spec.format(), CaFormat::Totalistic);
        assert_eq!(spec.width(), 21);
        assert_eq!(
            spec.to_string(),
            "f{t}k{3}r{1}i{center}x{21}y{10}w{21}c{0}s{0}"
        );
        let spec = CaSpecification::try_from("f{f}i{c}x{81}y{120}")?;
        assert_eq!(spec.k(), 0);
        let spec = CaSpecification::try_from("x{5000}r{1.4}q{3}")?;
        assert_eq!(spec.size(), 91);
        assert_eq!(spec.r(), 1.5);
        assert!(CaSpecification::try_from("f{s").is_err());
        Ok(())
    }

    #[test]
    fn standard_rule() -> Result<(), String> {
        let mut rand = RandomStream::new(Some(1));
        let spec = CaSpecification::try_from("f{s}x{9}y{4}")?;
        let mut automaton = Automaton::new(spec, 90.0, 0.0, &mut rand)?;
        for _ in 1..4 {
            automaton.generate(90.0, 0.0, &mut rand);
        }
        let rows = automaton
            .history()
            .iter()
            .map(|r| row_string(r))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec!["    +    ", "   + +   ", "  +   +  ", " + + + + "]
        );
        // rule numbers wrap at 256 for k 2 r 1
        let automaton = Automaton::new(
            CaSpecification::try_from("f{s}")?,
            256.0 + 30.0,
            0.0,
            &mut rand,
        )?;
        assert_eq!(automaton.rule(), 30.0);
        Ok(())
    }

    #[test]
    fn totalistic_and_continuous() -> Result<(), String> {
        let mut rand = RandomStream::new(Some(1));
        let spec = CaSpecification::try_from("f{t}k{2}x{7}")?;
        // sums 1 and 2 become active
        let mut automaton = Automaton::new(spec, 6.0, 0.0, &mut rand)?;
        automaton.generate(6.0, 0.0, &mut rand);
        assert_eq!(row_string(&automaton.history()[1]), "  +++  ");
        automaton.generate(6.0, 0.0, &mut rand);
        assert_eq!(row_string(&automaton.history()[2]), " ++ ++ ");
        assert!(Automaton::new(
            CaSpecification::try_from("f{t}k{1}")?,
            1.0,
            0.0,
            &mut rand
        )
        .is_err());

        let spec = CaSpecification::try_from("f{c}x{5}")?;
        let mut automaton = Automaton::new(spec, 0.25, 0.0, &mut rand)?;
        automaton.generate(0.25, 0.0, &mut rand);
        let row = &automaton.history()[1];
        assert!((row[2] - (1.0 / 3.0 + 0.25)).abs() < 1e-9);
        assert!((row[0] - 0.25).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn extraction() -> Result<(), String> {
        let mut rand = RandomStream::new(Some(1));
        let spec = CaSpecification::try_from("f{s}x{5}y{3}w{3}")?;
        let mut automaton = Automaton::new(spec, 90.0, 0.0, &mut rand)?;
        automaton.generate(90.0, 0.0, &mut rand);
        automaton.generate(90.0, 0.0, &mut rand);
        // rows: 00100, 01010, 10001; width 3 around the center
        assert_eq!(
            automaton.cells(TableFormat::FlatRow, false),
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(automaton.cells(TableFormat::SumRow, false), vec![1.0, 2.0, 0.0]);
        assert_eq!(automaton.cells(TableFormat::SumRow, true), vec![0.5, 1.0, 0.0]);
        assert_eq!(automaton.cells(TableFormat::SumColumn, false), vec![1.0, 1.0, 1.0]);
        assert_eq!(TableFormat::try_from("FCR")?, TableFormat::FlatColumnReflect);
        assert!(TableFormat::try_from("xx").is_err());
        Ok(())
    }
}
