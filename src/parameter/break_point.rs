//! Break point functions: interpolated `(x, y)` point lists read at the event index or
//! the event time, either once or looped.

use std::f64::consts::PI;

use crate::parameter::{
    options::{Edge, StepMode},
    ArgType, Argument, Arguments, Entry, Generator, Parameter, ReferenceState, Value,
};

// -------------------------------------------------------------------------------------------------

/// Interpolation between two adjacent break points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Linear,
    /// Exponential curve; 0 is linear, positive exponents start slow, negative fast.
    Power(f64),
    HalfCosine,
    /// Holds the value of the previous point.
    Flat,
}

impl Curve {
    fn interpolate(&self, t: f64, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> f64 {
        let r = (t - x0) / (x1 - x0);
        match *self {
            Curve::Linear => y0 + r * (y1 - y0),
            Curve::Power(exponent) => {
                if y1 == y0 {
                    y0
                } else if exponent == 0.0 {
                    y0 + r * (y1 - y0)
                } else if exponent > 0.0 {
                    if y1 >= y0 {
                        y0 + r.powf(1.0 + exponent) * (y1 - y0)
                    } else {
                        y1 + (1.0 - r).powf(1.0 + exponent) * (y0 - y1)
                    }
                } else if y1 >= y0 {
                    y1 + (1.0 - r).powf(1.0 - exponent) * (y0 - y1)
                } else {
                    y0 + r.powf(1.0 - exponent) * (y1 - y0)
                }
            }
            Curve::HalfCosine => y0 + (y1 - y0) * (1.0 + (r * PI + PI).cos()) / 2.0,
            Curve::Flat => y0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A sorted list of break points with unique x values.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakPoints {
    points: Vec<(f64, f64)>,
    curve: Curve,
    edge: Edge,
}

impl BreakPoints {
    /// Create break points from `(x, y)` pairs. Duplicate x values keep the first pair; a
    /// single point is extended to a flat segment of length 1.
    pub fn new(points: &[(f64, f64)], curve: Curve, edge: Edge) -> Result<Self, String> {
        let mut unique: Vec<(f64, f64)> = Vec::with_capacity(points.len());
        for (x, y) in points {
            if !unique.iter().any(|(ux, _)| ux == x) {
                unique.push((*x, *y));
            }
        }
        unique.sort_by(|a, b| a.0.total_cmp(&b.0));
        match unique.len() {
            0 => return Err("no valid point pairs given.".to_string()),
            1 => unique.push((unique[0].0 + 1.0, unique[0].1)),
            _ => (),
        }
        Ok(Self {
            points: unique,
            curve,
            edge,
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Evaluate at `t`. Single edges hold the boundary values outside of the point range,
    /// loop edges repeat the range.
    pub fn value(&self, t: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        let t = match self.edge {
            Edge::Single => {
                if t < first.0 {
                    return first.1;
                }
                if t >= last.0 {
                    return last.1;
                }
                t
            }
            Edge::Loop => first.0 + (t - first.0).rem_euclid(last.0 - first.0),
        };
        let index = self
            .points
            .iter()
            .position(|(x, _)| t < *x)
            .unwrap_or(self.points.len() - 1)
            .max(1);
        self.curve
            .interpolate(t, self.points[index - 1], self.points[index])
    }
}

/// Read a point list argument: a list of pairs, a single pair or a single number.
fn parse_points(arg: &Argument) -> Result<Vec<(f64, f64)>, String> {
    let pair = |item: &Argument| -> Result<(f64, f64), String> {
        match item.as_list() {
            Some([x, y, ..]) => match (x.as_number(), y.as_number()) {
                (Some(x), Some(y)) => Ok((x, y)),
                _ => Err("point pairs must consist only of numbers.".to_string()),
            },
            _ => Err("each point must be a list of (x, y) pairs.".to_string()),
        }
    };
    match arg {
        Argument::Number(value) => Ok(vec![(0.0, *value)]),
        Argument::List(items) => match &items[..] {
            [] => Err("add points to create a break point.".to_string()),
            [Argument::Number(value)] => Ok(vec![(0.0, *value)]),
            [Argument::Number(x), Argument::Number(y), ..] => Ok(vec![(*x, *y)]),
            _ => items.iter().map(pair).collect(),
        },
        Argument::Text(_) => Err("supply a list of points.".to_string()),
    }
}

// -------------------------------------------------------------------------------------------------

const POINT_ARGS: &[(&str, ArgType)] = &[
    ("step", ArgType::Text),
    ("edge", ArgType::Text),
    ("points", ArgType::Object),
];

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "bpl",
        long: "breakPointLinear",
        args: POINT_ARGS,
        defaults: "e, l, ((0, 1), (6, .3), (12, .3), (18, 0), (24, .6))",
        build: |args| BreakPoint::build(args, Curve::Linear),
    },
    Entry {
        short: "bpp",
        long: "breakPointPower",
        args: &[
            ("step", ArgType::Text),
            ("edge", ArgType::Text),
            ("points", ArgType::Object),
            ("exponent", ArgType::Number),
        ],
        defaults: "e, l, ((0, 1), (6, .3), (12, .3), (18, 0), (24, .6)), -1.5",
        build: |args| {
            let exponent = args.number(3)?;
            BreakPoint::build(args, Curve::Power(exponent))
        },
    },
    Entry {
        short: "bphc",
        long: "breakPointHalfCosine",
        args: POINT_ARGS,
        defaults: "e, l, ((0, 1), (6, .3), (12, .3), (18, 0), (24, .6))",
        build: |args| BreakPoint::build(args, Curve::HalfCosine),
    },
    Entry {
        short: "bpf",
        long: "breakPointFlat",
        args: POINT_ARGS,
        defaults: "e, l, ((0, 1), (6, .3), (12, .3), (18, 0), (24, .6))",
        build: |args| BreakPoint::build(args, Curve::Flat),
    },
];

#[derive(Debug)]
struct BreakPoint {
    step: StepMode,
    points: BreakPoints,
    index: usize,
}

impl BreakPoint {
    fn build(args: &mut Arguments, curve: Curve) -> Result<Box<dyn Generator>, String> {
        let step = args.option::<StepMode>(0)?;
        let edge = args.option::<Edge>(1)?;
        let points = BreakPoints::new(&parse_points(args.get(2)?)?, curve, edge)?;
        args.set(
            2,
            Argument::List(
                points
                    .points()
                    .iter()
                    .map(|(x, y)| Argument::List(vec![Argument::Number(*x), Argument::Number(*y)]))
                    .collect(),
            ),
        );
        Ok(Box::new(Self {
            step,
            points,
            index: 0,
        }))
    }
}

impl Parameter for BreakPoint {
    fn reset(&mut self) {
        self.index = 0;
    }
}

impl Generator for BreakPoint {
    fn run(&mut self, t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        let value = match self.step {
            StepMode::Event => {
                let value = self.points.value(self.index as f64);
                self.index += 1;
                value
            }
            StepMode::Time => self.points.value(t),
        };
        Ok(Value::Number(value))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::GeneratorObject, seed::SeedSource};

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(1))
    }

    fn numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
        let mut generator = generator(text)?;
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.number(t as f64, &refs)).collect()
    }

    #[test]
    fn linear() -> Result<(), String> {
        assert_eq!(
            numbers("bpl, e, s, ((0, 0), (4, 1))", 6)?,
            vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0]
        );
        assert_eq!(
            numbers("bpl, e, l, ((0, 0), (2, 1))", 5)?,
            vec![0.0, 0.5, 0.0, 0.5, 0.0]
        );
        assert_eq!(
            numbers("bpl, t, s, ((2, 10), (4, 20))", 5)?,
            vec![10.0, 10.0, 10.0, 15.0, 20.0]
        );
        Ok(())
    }

    #[test]
    fn curves() {
        let points = [(0.0, 0.0), (2.0, 1.0)];
        let flat = BreakPoints::new(&points, Curve::Flat, Edge::Single).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(flat.value(1.5), 0.0);
        let cosine = BreakPoints::new(&points, Curve::HalfCosine, Edge::Single)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!((cosine.value(1.0) - 0.5).abs() < 1e-12);
        let power = BreakPoints::new(&points, Curve::Power(1.0), Edge::Single)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(power.value(1.0), 0.25);
        let power = BreakPoints::new(&points, Curve::Power(-1.0), Edge::Single)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(power.value(1.0), 0.75);
    }

    #[test]
    fn points() -> Result<(), String> {
        assert_eq!(
            generator("bpl, e, s, ((4, 1), (0, 0), (4, 2))")?.to_string(),
            "breakPointLinear, event, single, ((0, 0), (4, 1))"
        );
        assert_eq!(numbers("bpf, e, l, 3", 2)?, vec![3.0, 3.0]);
        assert_eq!(
            generator("bpl, e, s, (2, 5)")?.to_string(),
            "breakPointLinear, event, single, ((2, 5), (3, 5))"
        );
        assert!(generator("bpl, e, s, ()").is_err());
        assert!(generator("bpl, e, s, ((1, a))").is_err());
        Ok(())
    }
}
