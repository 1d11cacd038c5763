//! Generators which fold, funnel, quantize or hold the values of other generators.

use crate::{
    parameter::{
        options::{Comparison, ThresholdMatch},
        ArgType, Arguments, Entry, Generator, GeneratorObject, MinMax, Parameter,
        ReferenceState, Value, LOOP_LIMIT,
    },
    seed::RandomStream,
    selector::Selector,
    unit::{self, BoundaryMethod},
};

// -------------------------------------------------------------------------------------------------

const MASK_ARGS: &[(&str, ArgType)] = &[
    ("boundary", ArgType::Text),
    ("first", ArgType::Object),
    ("second", ArgType::Object),
    ("source", ArgType::Object),
];

const MASK_DEFAULTS: &str = "l, (ws, e, 60, 0, .5, 0), (wc, e, 90, 0, .5, 1), (ru, 0, 1)";

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "m",
        long: "mask",
        args: MASK_ARGS,
        defaults: MASK_DEFAULTS,
        build: |args| Mask::build(args, unit::boundary_fit),
    },
    Entry {
        short: "mr",
        long: "maskReject",
        args: MASK_ARGS,
        defaults: MASK_DEFAULTS,
        build: |args| Mask::build(args, unit::boundary_reject),
    },
    Entry {
        short: "ms",
        long: "maskScale",
        args: &[
            ("source", ArgType::Object),
            ("valueCount", ArgType::Number),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "(lp, 100, 120, w, oc), 120, (bphc, e, l, ((0, 0), (120, -3))), 3, oc",
        build: MaskScale::build,
    },
    Entry {
        short: "fb",
        long: "funnelBinary",
        args: &[
            ("thresholdMatch", ArgType::Text),
            ("threshold", ArgType::Object),
            ("first", ArgType::Object),
            ("second", ArgType::Object),
            ("source", ArgType::Object),
        ],
        defaults: "u, (bpl, e, s, ((0, 0), (120, 1))), (ws, e, 60, 0, .5, 0), \
            (wc, e, 90, 0, .5, 1), (ru, 0, 1)",
        build: FunnelBinary::build,
    },
    Entry {
        short: "q",
        long: "quantize",
        args: &[
            ("reference", ArgType::Object),
            ("stepWidth", ArgType::Object),
            ("stepCount", ArgType::Number),
            ("pull", ArgType::Object),
            ("source", ArgType::Object),
        ],
        defaults: "(c, 0), (c, .25), 1, (c, 1), (ru, 0, 1)",
        build: Quantize::build,
    },
    Entry {
        short: "sah",
        long: "sampleAndHold",
        args: &[
            ("comparison", ArgType::Text),
            ("source", ArgType::Object),
            ("trigger", ArgType::Object),
            ("threshold", ArgType::Object),
        ],
        defaults: "gt, (ru, 0, 1), (wsd, e, 10, 0, 0, 1), (c, .5)",
        build: SampleAndHold::build,
    },
];

// -------------------------------------------------------------------------------------------------

/// Place `value` at `max` when above the threshold, at `min` when below it. Values equal to
/// the threshold are resolved by `matching`.
///
/// # Examples:
///
/// ```rust
/// use athenacl::parameter::{mask::funnel_binary, options::ThresholdMatch};
/// assert_eq!(funnel_binary(0.5, 0.0, 1.0, 0.7, ThresholdMatch::Upper), 1.0);
/// assert_eq!(funnel_binary(0.5, 1.0, 0.0, 0.5, ThresholdMatch::Match), 0.5);
/// ```
pub fn funnel_binary(threshold: f64, a: f64, b: f64, value: f64, matching: ThresholdMatch) -> f64 {
    let (min, max) = if a <= b { (a, b) } else { (b, a) };
    if value > threshold {
        max
    } else if value < threshold {
        min
    } else {
        match matching {
            ThresholdMatch::Match => threshold,
            ThresholdMatch::Upper => max,
            ThresholdMatch::Lower => min,
        }
    }
}

/// Move `value` towards the nearest point of a grid built from cyclically repeated step
/// widths, anchored at `reference`. A `pull` of 1 returns the grid point, 0 the value.
///
/// Returns `None` when no neighboring grid points are found within `LOOP_LIMIT` steps.
pub fn quantize(widths: &[f64], reference: f64, value: f64, pull: f64) -> Option<f64> {
    if widths.is_empty() {
        return None;
    }
    let len = widths.len();
    let upwards = reference < value;
    let mut last = reference;
    for n in 1..LOOP_LIMIT {
        let step = if upwards {
            last + widths[n % len]
        } else {
            last - widths[len - 1 - (n - 1) % len]
        };
        let (lower, upper) = if step < last { (step, last) } else { (last, step) };
        if value >= lower && value <= upper {
            if lower == upper {
                return Some(lower);
            }
            let (to_lower, to_upper) = ((value - lower).abs(), (upper - value).abs());
            return Some(if to_lower >= to_upper {
                upper - to_upper * (1.0 - pull)
            } else {
                lower + to_lower * (1.0 - pull)
            });
        }
        last = step;
    }
    None
}

// -------------------------------------------------------------------------------------------------

type Fold = fn(f64, f64, f64, BoundaryMethod) -> f64;

/// Folds source values into, or out of, a dynamic range.
#[derive(Debug)]
struct Mask {
    method: BoundaryMethod,
    fold: Fold,
    first: GeneratorObject,
    second: GeneratorObject,
    source: GeneratorObject,
}

impl Mask {
    fn build(args: &mut Arguments, fold: Fold) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            method: args.option::<BoundaryMethod>(0)?,
            fold,
            first: args.generator(1)?,
            second: args.generator(2)?,
            source: args.generator(3)?,
        }))
    }
}

impl Parameter for Mask {
    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.first.check()?;
        self.second.check()?;
        self.source.check()
    }
}

impl Generator for Mask {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let a = self.first.number(t, refs)?;
        let b = self.second.number(t, refs)?;
        let value = self.source.number(t, refs)?;
        Ok(Value::Number((self.fold)(a, b, value, self.method)))
    }
}

// -------------------------------------------------------------------------------------------------

/// Collects a number of source values at construction, normalizes them and selects from
/// them within a dynamic range.
#[derive(Debug)]
struct MaskScale {
    source: GeneratorObject,
    count: i64,
    range: MinMax,
    selector: Selector<f64>,
    rand: RandomStream,
}

impl MaskScale {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let mut source = args.generator(0)?;
        let count = args.integer(1)?;
        let range = MinMax::new(args, 2, 3)?;
        let mode = args.selection(4)?;
        let refs = ReferenceState::default();
        let series = (0..count.max(0))
            .map(|t| source.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(Self {
            source,
            count,
            range,
            selector: Selector::new(unit::norm_series(&series), mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for MaskScale {
    fn reset(&mut self) {
        self.source.reset();
        self.range.reset();
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.count < 1 {
            return Err("argument error: length must be 1 or greater.".to_string());
        }
        self.source.check()
    }
}

impl Generator for MaskScale {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.selector.select(&mut self.rand)?;
        Ok(Value::Number(self.range.denorm(value, t, refs)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct FunnelBinary {
    matching: ThresholdMatch,
    threshold: GeneratorObject,
    first: GeneratorObject,
    second: GeneratorObject,
    source: GeneratorObject,
}

impl FunnelBinary {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            matching: args.option::<ThresholdMatch>(0)?,
            threshold: args.generator(1)?,
            first: args.generator(2)?,
            second: args.generator(3)?,
            source: args.generator(4)?,
        }))
    }
}

impl Parameter for FunnelBinary {
    fn reset(&mut self) {
        self.threshold.reset();
        self.first.reset();
        self.second.reset();
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.threshold.check()?;
        self.first.check()?;
        self.second.check()?;
        self.source.check()
    }
}

impl Generator for FunnelBinary {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let threshold = self.threshold.number(t, refs)?;
        let a = self.first.number(t, refs)?;
        let b = self.second.number(t, refs)?;
        let value = self.source.number(t, refs)?;
        Ok(Value::Number(funnel_binary(threshold, a, b, value, self.matching)))
    }
}

// -------------------------------------------------------------------------------------------------

/// Attracts source values to a grid of dynamic step widths.
#[derive(Debug)]
struct Quantize {
    reference: GeneratorObject,
    width: GeneratorObject,
    steps: i64,
    pull: GeneratorObject,
    source: GeneratorObject,
}

impl Quantize {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            reference: args.generator(0)?,
            width: args.generator(1)?,
            steps: args.integer(2)?,
            pull: args.generator(3)?,
            source: args.generator(4)?,
        }))
    }

    fn grid(&mut self, refs: &ReferenceState) -> Result<Vec<f64>, String> {
        let mut grid = Vec::with_capacity(self.steps.max(0) as usize);
        for step in 0..self.steps {
            let width = self.width.number(step as f64, refs)?;
            // zero widths make no grid
            if width != 0.0 {
                grid.push(width.abs());
            }
        }
        if grid.is_empty() {
            log::warn!("quantize: no usable step widths; supplying a grid of 1");
            grid.push(1.0);
        }
        Ok(grid)
    }
}

impl Parameter for Quantize {
    fn reset(&mut self) {
        self.reference.reset();
        self.width.reset();
        self.pull.reset();
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.steps <= 0 {
            return Err("stepCount error: must be greater than zero.".to_string());
        }
        self.reference.check()?;
        self.width.check()?;
        self.pull.check()?;
        self.source.check()
    }
}

impl Generator for Quantize {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let grid = self.grid(refs)?;
        let reference = self.reference.number(t, refs)?;
        let value = self.source.number(t, refs)?;
        let pull = self.pull.number(t, refs)?;
        match quantize(&grid, reference, value, pull) {
            Some(value) => Ok(Value::Number(value)),
            None => {
                log::warn!("quantize: failed to find grid neighbors of {}", value);
                Ok(Value::Number(value))
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Side of the threshold the trigger was on at the last call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Above,
    Below,
}

/// Holds a source value until the trigger generator crosses the threshold.
#[derive(Debug)]
struct SampleAndHold {
    comparison: Comparison,
    source: GeneratorObject,
    trigger: GeneratorObject,
    threshold: GeneratorObject,
    value: Option<f64>,
    gate: Option<Gate>,
}

impl SampleAndHold {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            comparison: args.option::<Comparison>(0)?,
            source: args.generator(1)?,
            trigger: args.generator(2)?,
            threshold: args.generator(3)?,
            value: None,
            gate: None,
        }))
    }
}

fn round10(value: f64) -> f64 {
    (value * 1e10).round() / 1e10
}

impl Parameter for SampleAndHold {
    fn reset(&mut self) {
        self.value = None;
        self.gate = None;
        self.source.reset();
        self.trigger.reset();
        self.threshold.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.trigger.check()?;
        self.threshold.check()
    }
}

impl Generator for SampleAndHold {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let trigger = round10(self.trigger.number(t, refs)?);
        let threshold = round10(self.threshold.number(t, refs)?);
        let below = self.gate != Some(Gate::Above);
        let above = self.gate != Some(Gate::Below);
        let update = self.value.is_none()
            || match self.comparison {
                Comparison::Equal => trigger == threshold,
                Comparison::GreaterThan => trigger > threshold && below,
                Comparison::GreaterThanOrEqual => trigger >= threshold && below,
                Comparison::LessThan => trigger < threshold && above,
                Comparison::LessThanOrEqual => trigger <= threshold && above,
            };
        if trigger > threshold {
            self.gate = Some(Gate::Above);
        } else if trigger < threshold {
            self.gate = Some(Gate::Below);
        }
        let value = match self.value {
            Some(value) if !update => value,
            _ => self.source.number(t, refs)?,
        };
        self.value = Some(value);
        Ok(Value::Number(value))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::Argument, seed::SeedSource};

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(3))
    }

    fn numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
        let mut generator = generator(text)?;
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.number(t as f64, &refs)).collect()
    }

    #[test]
    fn masks() -> Result<(), String> {
        assert_eq!(
            numbers("m, l, 3, 9, (bg, oc, (23, 5, 1))", 3)?,
            vec![9.0, 5.0, 3.0]
        );
        assert_eq!(
            numbers("m, r, 3, 9, (bg, oc, (10, 12))", 2)?,
            vec![8.0, 6.0]
        );
        assert_eq!(numbers("m, w, 9, 3, (c, 12)", 1)?, vec![6.0]);
        assert_eq!(
            numbers("mr, l, 0, 10, (bg, oc, (2, 8, 12))", 3)?,
            vec![0.0, 10.0, 12.0]
        );
        let values = numbers("m", 100)?;
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(generator("m, x").is_err());
        Ok(())
    }

    #[test]
    fn mask_scale() -> Result<(), String> {
        assert_eq!(
            numbers("ms, (bg, oc, (2, 4, 6)), 3, 0, 10, oc", 4)?,
            vec![0.0, 5.0, 10.0, 0.0]
        );
        assert!(generator("ms, (c, 1), 0").is_err());
        assert!(generator("ms").is_ok());
        Ok(())
    }

    #[test]
    fn funnel() -> Result<(), String> {
        assert_eq!(funnel_binary(0.5, 2.0, 1.0, 0.5, ThresholdMatch::Lower), 1.0);
        assert_eq!(funnel_binary(0.5, 2.0, 1.0, 0.2, ThresholdMatch::Upper), 1.0);
        assert_eq!(
            numbers("fb, m, .5, 0, 1, (bg, oc, (.2, .5, .9))", 3)?,
            vec![0.0, 0.5, 1.0]
        );
        Ok(())
    }

    #[test]
    fn quantizer() -> Result<(), String> {
        assert_eq!(quantize(&[0.25], 0.0, 0.3, 1.0), Some(0.25));
        assert_eq!(quantize(&[0.25], 0.0, 0.45, 1.0), Some(0.5));
        assert_eq!(quantize(&[0.25], 0.0, -0.1, 1.0), Some(0.0));
        assert_eq!(quantize(&[0.25], 0.0, 0.0, 1.0), Some(0.0));
        let pulled = quantize(&[1.0], 0.0, 0.2, 0.5).unwrap_or_default();
        assert!((pulled - 0.1).abs() < 1e-12);
        assert_eq!(quantize(&[], 0.0, 0.0, 1.0), None);
        assert_eq!(quantize(&[1.0], 0.0, 1e6, 1.0), None);

        assert_eq!(
            numbers("q, 0, .25, 1, 1, (bg, oc, (.3, .45, .9))", 3)?,
            vec![0.25, 0.5, 1.0]
        );
        assert_eq!(numbers("q, 0, 0, 1, 1, (c, 2.3)", 1)?, vec![2.0]);
        assert!(generator("q, 0, .25, 0").is_err());
        Ok(())
    }

    #[test]
    fn sample_and_hold() -> Result<(), String> {
        // trigger crosses .5 upwards at the third and sixth call
        let values = numbers(
            "sah, gt, (bg, oc, (1, 2, 3, 4, 5, 6, 7)), (bg, oc, (0, .2, .8, .9, .1, .7)), .5",
            7,
        )?;
        assert_eq!(values, vec![1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0]);
        let values = numbers("sah, e, (bg, oc, (1, 2, 3)), (bg, oc, (0, 1, 1)), 1", 3)?;
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        let mut hold = generator("sah")?;
        let refs = ReferenceState::default();
        let first = (0..20)
            .map(|t| hold.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        hold.reset();
        let second = (0..20)
            .map(|t| hold.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(first, second);
        Ok(())
    }
}
