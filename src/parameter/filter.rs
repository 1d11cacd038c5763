//! Clone filters: parameter objects transforming a whole column of event values at once.

use crate::{
    parameter::{
        mask::{funnel_binary, quantize},
        operator::{self, Operation},
        options::{Anchor, ThresholdMatch},
        ArgType, Arguments, Entry, Filter, FilterObject, GeneratorObject, MinMax, Parameter,
        ReferenceState, Source, Value,
    },
    seed::RandomStream,
    selector::{SelectionMode, Selector},
    unit::{self, BoundaryMethod},
};

// -------------------------------------------------------------------------------------------------

const OPERATOR_ARGS: &[(&str, ArgType)] = &[("operand", ArgType::Object)];
const ANCHOR_ARGS: &[(&str, ArgType)] = &[("anchor", ArgType::Text), ("operand", ArgType::Object)];

pub(crate) static FILTERS: &[Entry<Box<dyn Filter>>] = &[
    Entry {
        short: "b",
        long: "bypass",
        args: &[],
        defaults: "",
        build: |_| Ok(Box::new(Bypass)),
    },
    Entry {
        short: "r",
        long: "replace",
        args: &[("source", ArgType::Object)],
        defaults: "(ru, 0, 1)",
        build: Replace::build,
    },
    Entry {
        short: "ob",
        long: "orderBackward",
        args: &[],
        defaults: "",
        build: |_| Ok(Box::new(OrderBackward)),
    },
    Entry {
        short: "or",
        long: "orderRotate",
        args: &[("rotationSize", ArgType::Number)],
        defaults: "40",
        build: OrderRotate::build,
    },
    Entry {
        short: "pl",
        long: "pipeLine",
        args: &[("filters", ArgType::List)],
        defaults: "((or, 40), (ob))",
        build: PipeLine::build,
    },
    Entry {
        short: "fa",
        long: "filterAdd",
        args: OPERATOR_ARGS,
        defaults: "(ws, e, 30, 0, 0, 1)",
        build: |args| FilterOperator::build(args, operator::add),
    },
    Entry {
        short: "fm",
        long: "filterMultiply",
        args: OPERATOR_ARGS,
        defaults: "(ws, e, 30, 0, 0, 1)",
        build: |args| FilterOperator::build(args, operator::multiply),
    },
    Entry {
        short: "fd",
        long: "filterDivide",
        args: OPERATOR_ARGS,
        defaults: "(ws, e, 30, 0, 0, 1)",
        build: |args| FilterOperator::build(args, operator::divide),
    },
    Entry {
        short: "fp",
        long: "filterPower",
        args: OPERATOR_ARGS,
        defaults: "(ws, e, 30, 0, 0, 1)",
        build: |args| FilterOperator::build(args, operator::power),
    },
    Entry {
        short: "fma",
        long: "filterMultiplyAnchor",
        args: ANCHOR_ARGS,
        defaults: "lower, (wc, e, 30, 0, 0, 1)",
        build: |args| FilterOperatorAnchor::build(args, operator::multiply),
    },
    Entry {
        short: "fda",
        long: "filterDivideAnchor",
        args: ANCHOR_ARGS,
        defaults: "lower, (wc, e, 30, 0, 0, 1)",
        build: |args| FilterOperatorAnchor::build(args, operator::divide),
    },
    Entry {
        short: "fq",
        long: "filterQuantize",
        args: &[
            ("gridReference", ArgType::Object),
            ("stepWidth", ArgType::Object),
            ("stepCount", ArgType::Number),
            ("pull", ArgType::Object),
        ],
        defaults: "(c, 0), (c, .25), 1, (c, 1)",
        build: FilterQuantize::build,
    },
    Entry {
        short: "mf",
        long: "maskFilter",
        args: &[
            ("boundary", ArgType::Text),
            ("first", ArgType::Object),
            ("second", ArgType::Object),
        ],
        defaults: "l, (ws, e, 60, 0, .5, 0), (wc, e, 90, 0, .5, 1)",
        build: MaskFilter::build,
    },
    Entry {
        short: "msf",
        long: "maskScaleFilter",
        args: &[
            ("min", ArgType::Object),
            ("max", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "(ws, e, 60, 0, .5, 0), (wc, e, 90, 0, .5, 1), rc",
        build: MaskScaleFilter::build,
    },
    Entry {
        short: "ffb",
        long: "filterFunnelBinary",
        args: &[
            ("thresholdMatch", ArgType::Text),
            ("threshold", ArgType::Object),
            ("first", ArgType::Object),
            ("second", ArgType::Object),
        ],
        defaults: "u, (bpl, e, s, ((0, 0), (120, 1))), (ws, e, 60, 0, .5, 0), \
            (wc, e, 90, 0, .5, 1)",
        build: FilterFunnelBinary::build,
    },
];

/// Numeric view of the values; filters with arithmetic reject text values.
fn numbers(name: &str, values: &[Value]) -> Result<Vec<f64>, String> {
    values
        .iter()
        .map(|value| value.number().map_err(|err| format!("{}: {}", name, err)))
        .collect()
}

fn to_values(numbers: Vec<f64>) -> Vec<Value> {
    numbers.into_iter().map(Value::Number).collect()
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct Bypass;

impl Parameter for Bypass {
    fn reset(&mut self) {}
}

impl Filter for Bypass {
    fn run(&mut self, values: &[Value], _: &[f64], _: &[ReferenceState]) -> Result<Vec<Value>, String> {
        Ok(values.to_vec())
    }
}

#[derive(Debug)]
struct OrderBackward;

impl Parameter for OrderBackward {
    fn reset(&mut self) {}
}

impl Filter for OrderBackward {
    fn run(&mut self, values: &[Value], _: &[f64], _: &[ReferenceState]) -> Result<Vec<Value>, String> {
        Ok(values.iter().rev().cloned().collect())
    }
}

/// Rotates the values to the left.
#[derive(Debug)]
struct OrderRotate {
    steps: usize,
}

impl OrderRotate {
    fn build(args: &mut Arguments) -> Result<Box<dyn Filter>, String> {
        let steps = args.integer(0)?;
        if steps <= 0 {
            return Err("number of rotation steps must be greater than 0".to_string());
        }
        Ok(Box::new(Self {
            steps: steps as usize,
        }))
    }
}

impl Parameter for OrderRotate {
    fn reset(&mut self) {}
}

impl Filter for OrderRotate {
    fn run(&mut self, values: &[Value], _: &[f64], _: &[ReferenceState]) -> Result<Vec<Value>, String> {
        let mut rotated = values.to_vec();
        if !rotated.is_empty() {
            let len = rotated.len();
            rotated.rotate_left(self.steps % len);
        }
        Ok(rotated)
    }
}

/// Applies filters in sequence.
#[derive(Debug)]
struct PipeLine {
    filters: Vec<FilterObject>,
}

impl PipeLine {
    fn build(args: &mut Arguments) -> Result<Box<dyn Filter>, String> {
        Ok(Box::new(Self {
            filters: args.filters(0)?,
        }))
    }
}

impl Parameter for PipeLine {
    fn reset(&mut self) {
        self.filters.iter_mut().for_each(FilterObject::reset);
    }

    fn check(&self) -> Result<(), String> {
        self.filters.iter().try_for_each(FilterObject::check)
    }
}

impl Filter for PipeLine {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        let mut values = values.to_vec();
        for filter in &mut self.filters {
            values = filter.run(&values, times, refs)?;
        }
        Ok(values)
    }
}

// -------------------------------------------------------------------------------------------------

/// Replaces all values with the values of a generator, or the durations of a rhythm.
#[derive(Debug)]
struct Replace {
    source: Source,
}

impl Replace {
    fn build(args: &mut Arguments) -> Result<Box<dyn Filter>, String> {
        Ok(Box::new(Self {
            source: args.source(0)?,
        }))
    }
}

impl Parameter for Replace {
    fn reset(&mut self) {
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }
}

impl Filter for Replace {
    fn run(&mut self, _: &[Value], times: &[f64], refs: &[ReferenceState]) -> Result<Vec<Value>, String> {
        times
            .iter()
            .zip(refs)
            .map(|(t, refs)| self.source.value(*t, refs))
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------

/// Combines each value with the value of a generator, or the duration of a rhythm, at
/// the event's time.
#[derive(Debug)]
struct FilterOperator {
    name: &'static str,
    operation: Operation,
    source: Source,
}

impl FilterOperator {
    fn build(args: &mut Arguments, operation: Operation) -> Result<Box<dyn Filter>, String> {
        Ok(Box::new(Self {
            name: args.name(),
            operation,
            source: args.source(0)?,
        }))
    }
}

impl Parameter for FilterOperator {
    fn reset(&mut self) {
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }
}

impl Filter for FilterOperator {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        let mut result = Vec::with_capacity(values.len());
        for ((value, t), refs) in numbers(self.name, values)?.into_iter().zip(times).zip(refs) {
            let operand = self.source.number(*t, refs)?;
            let value = (self.operation)(value, operand);
            if value.is_nan() {
                return Err(format!("{}: operation gives no real result", self.name));
            }
            result.push(value);
        }
        Ok(to_values(result))
    }
}

/// Like `FilterOperator`, but operates on the distances to an anchor value of the column.
#[derive(Debug)]
struct FilterOperatorAnchor {
    name: &'static str,
    operation: Operation,
    anchor: Anchor,
    source: Source,
}

impl FilterOperatorAnchor {
    fn build(args: &mut Arguments, operation: Operation) -> Result<Box<dyn Filter>, String> {
        Ok(Box::new(Self {
            name: args.name(),
            operation,
            anchor: args.option::<Anchor>(0)?,
            source: args.source(1)?,
        }))
    }
}

/// The anchor value of a column. Medians of even lengths average the two middle values.
fn anchor_value(anchor: Anchor, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let len = sorted.len();
    match anchor {
        Anchor::Lower => sorted[0],
        Anchor::Upper => sorted[len - 1],
        Anchor::Average => sorted.iter().sum::<f64>() / len as f64,
        Anchor::Median => {
            if len % 2 == 0 {
                (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
            } else {
                sorted[len / 2]
            }
        }
    }
}

impl Parameter for FilterOperatorAnchor {
    fn reset(&mut self) {
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }
}

impl Filter for FilterOperatorAnchor {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        let values = numbers(self.name, values)?;
        let anchor = anchor_value(self.anchor, &values);
        let mut result = Vec::with_capacity(values.len());
        for ((value, t), refs) in values.into_iter().zip(times).zip(refs) {
            let operand = self.source.number(*t, refs)?;
            result.push((self.operation)(value - anchor, operand) + anchor);
        }
        Ok(to_values(result))
    }
}

// -------------------------------------------------------------------------------------------------

/// Attracts values towards a dynamic grid.
#[derive(Debug)]
struct FilterQuantize {
    reference: GeneratorObject,
    width: GeneratorObject,
    steps: usize,
    pull: GeneratorObject,
}

impl FilterQuantize {
    fn build(args: &mut Arguments) -> Result<Box<dyn Filter>, String> {
        let reference = args.generator(0)?;
        let width = args.generator(1)?;
        let steps = args.integer(2)?;
        if steps <= 0 {
            return Err("stepCount error: must be greater than zero.".to_string());
        }
        Ok(Box::new(Self {
            reference,
            width,
            steps: steps as usize,
            pull: args.generator(3)?,
        }))
    }

    fn grid(&mut self, refs: &ReferenceState) -> Result<Vec<f64>, String> {
        let mut widths = Vec::with_capacity(self.steps);
        for step in 0..self.steps {
            let width = self.width.number(step as f64, refs)?;
            if width != 0.0 {
                widths.push(width.abs());
            }
        }
        if widths.is_empty() {
            log::warn!("filterQuantize: supplying grid with default values");
            widths.push(1.0);
        }
        Ok(widths)
    }
}

impl Parameter for FilterQuantize {
    fn reset(&mut self) {
        self.reference.reset();
        self.width.reset();
        self.pull.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.reference.check()?;
        self.width.check()?;
        self.pull.check()
    }
}

impl Filter for FilterQuantize {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        let mut result = Vec::with_capacity(values.len());
        for ((value, t), refs) in numbers("filterQuantize", values)?.into_iter().zip(times).zip(refs) {
            let widths = self.grid(refs)?;
            let reference = self.reference.number(*t, refs)?;
            let pull = self.pull.number(*t, refs)?;
            result.push(quantize(&widths, reference, value, pull).unwrap_or_else(|| {
                log::warn!("filterQuantize: no grid found near {}", value);
                value
            }));
        }
        Ok(to_values(result))
    }
}

// -------------------------------------------------------------------------------------------------

/// Fits values into a dynamic range.
#[derive(Debug)]
struct MaskFilter {
    method: BoundaryMethod,
    first: GeneratorObject,
    second: GeneratorObject,
}

impl MaskFilter {
    fn build(args: &mut Arguments) -> Result<Box<dyn Filter>, String> {
        Ok(Box::new(Self {
            method: args.option::<BoundaryMethod>(0)?,
            first: args.generator(1)?,
            second: args.generator(2)?,
        }))
    }
}

impl Parameter for MaskFilter {
    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.first.check()?;
        self.second.check()
    }
}

impl Filter for MaskFilter {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        let mut result = Vec::with_capacity(values.len());
        for ((value, t), refs) in numbers("maskFilter", values)?.into_iter().zip(times).zip(refs) {
            let a = self.first.number(*t, refs)?;
            let b = self.second.number(*t, refs)?;
            result.push(unit::boundary_fit(a, b, value, self.method));
        }
        Ok(to_values(result))
    }
}

/// Normalizes the column and selects from the normalized values, scaled into a dynamic
/// range.
#[derive(Debug)]
struct MaskScaleFilter {
    range: MinMax,
    mode: SelectionMode,
    rand: RandomStream,
}

impl MaskScaleFilter {
    fn build(args: &mut Arguments) -> Result<Box<dyn Filter>, String> {
        Ok(Box::new(Self {
            range: MinMax::new(args, 0, 1)?,
            mode: args.selection(2)?,
            rand: args.random(),
        }))
    }
}

impl Parameter for MaskScaleFilter {
    fn reset(&mut self) {
        self.range.reset();
        self.rand.reset();
    }
}

impl Filter for MaskScaleFilter {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        let series = unit::norm_series(&numbers("maskScaleFilter", values)?);
        let mut selector = Selector::new(series, self.mode);
        let mut result = Vec::with_capacity(values.len());
        for (t, refs) in times.iter().zip(refs) {
            let value = selector.select(&mut self.rand)?;
            result.push(self.range.denorm(value, *t, refs)?);
        }
        Ok(to_values(result))
    }
}

/// Moves values to one of two dynamic boundaries, depending on a dynamic threshold.
#[derive(Debug)]
struct FilterFunnelBinary {
    matching: ThresholdMatch,
    threshold: GeneratorObject,
    first: GeneratorObject,
    second: GeneratorObject,
}

impl FilterFunnelBinary {
    fn build(args: &mut Arguments) -> Result<Box<dyn Filter>, String> {
        Ok(Box::new(Self {
            matching: args.option::<ThresholdMatch>(0)?,
            threshold: args.generator(1)?,
            first: args.generator(2)?,
            second: args.generator(3)?,
        }))
    }
}

impl Parameter for FilterFunnelBinary {
    fn reset(&mut self) {
        self.threshold.reset();
        self.first.reset();
        self.second.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.threshold.check()?;
        self.first.check()?;
        self.second.check()
    }
}

impl Filter for FilterFunnelBinary {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        let mut result = Vec::with_capacity(values.len());
        for ((value, t), refs) in numbers("filterFunnelBinary", values)?.into_iter().zip(times).zip(refs) {
            let threshold = self.threshold.number(*t, refs)?;
            let a = self.first.number(*t, refs)?;
            let b = self.second.number(*t, refs)?;
            result.push(funnel_binary(threshold, a, b, value, self.matching));
        }
        Ok(to_values(result))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::Argument, seed::SeedSource};

    fn apply(text: &str, values: &[f64]) -> Result<Vec<f64>, String> {
        let mut filter = FilterObject::build(&Argument::parse(text)?, &mut SeedSource::new(3))?;
        let times = (0..values.len()).map(|t| t as f64).collect::<Vec<_>>();
        let refs = vec![ReferenceState::default(); values.len()];
        filter
            .run(&to_values(values.to_vec()), &times, &refs)?
            .iter()
            .map(Value::number)
            .collect()
    }

    #[test]
    fn ordering() -> Result<(), String> {
        let mut bypass = FilterObject::build(&Argument::parse("b")?, &mut SeedSource::new(1))?;
        let values = vec![Value::from("a"), Value::Number(1.0)];
        let refs = vec![ReferenceState::default(); 2];
        assert_eq!(bypass.run(&values, &[0.0, 1.0], &refs)?, values);
        assert_eq!(bypass.to_string(), "bypass");

        assert_eq!(apply("ob", &[1.0, 2.0, 3.0])?, vec![3.0, 2.0, 1.0]);
        assert_eq!(
            apply("or, 2", &[1.0, 2.0, 3.0, 4.0, 5.0])?,
            vec![3.0, 4.0, 5.0, 1.0, 2.0]
        );
        assert_eq!(apply("or, 7", &[1.0, 2.0, 3.0])?, vec![2.0, 3.0, 1.0]);
        assert!(apply("or, 0", &[1.0]).is_err());
        assert_eq!(apply("pl, ((or, 1), ob)", &[1.0, 2.0, 3.0])?, vec![1.0, 3.0, 2.0]);
        Ok(())
    }

    #[test]
    fn replace() -> Result<(), String> {
        assert_eq!(apply("r, 3", &[1.0, 2.0])?, vec![3.0, 3.0]);
        assert_eq!(apply("r, (l, ((1, 1, 1)))", &[7.0])?, vec![0.5]);
        Ok(())
    }

    #[test]
    fn operators() -> Result<(), String> {
        assert_eq!(apply("fa, 1", &[1.0, 2.0])?, vec![2.0, 3.0]);
        assert_eq!(apply("fm, 2", &[1.0, 2.0])?, vec![2.0, 4.0]);
        assert_eq!(apply("fd, 0", &[1.0, 2.0])?, vec![1.0, 2.0]);
        assert_eq!(apply("fd, 4", &[1.0, 2.0])?, vec![0.25, 0.5]);
        assert_eq!(apply("fp, 2", &[3.0, -2.0])?, vec![9.0, 4.0]);
        assert!(apply("fp, .5", &[-2.0]).is_err());
        let mut add = FilterObject::build(&Argument::parse("fa, 1")?, &mut SeedSource::new(1))?;
        let refs = vec![ReferenceState::default()];
        assert!(add.run(&[Value::from("x")], &[0.0], &refs).is_err());
        Ok(())
    }

    #[test]
    fn anchors() -> Result<(), String> {
        assert_eq!(apply("fma, lower, 2", &[1.0, 2.0, 4.0])?, vec![1.0, 3.0, 7.0]);
        assert_eq!(apply("fda, upper, 2", &[1.0, 2.0, 5.0])?, vec![3.0, 3.5, 5.0]);
        assert_eq!(apply("fma, m, 0", &[5.0, 1.0, 3.0])?, vec![3.0, 3.0, 3.0]);
        assert_eq!(apply("fma, a, 0", &[1.0, 2.0, 6.0])?, vec![3.0, 3.0, 3.0]);
        assert_eq!(anchor_value(Anchor::Median, &[4.0, 1.0, 3.0, 2.0]), 2.5);
        Ok(())
    }

    #[test]
    fn masks() -> Result<(), String> {
        assert_eq!(apply("fq, 0, 1, 1, 1", &[0.2, 0.7, 1.4])?, vec![0.0, 1.0, 1.0]);
        assert_eq!(apply("ffb, u, .5, 0, 1", &[0.2, 0.5, 0.9])?, vec![0.0, 1.0, 1.0]);
        assert_eq!(apply("mf, l, 0, 1", &[-1.0, 0.5, 2.0])?, vec![0.0, 0.5, 1.0]);
        assert_eq!(apply("msf, 0, 10, oc", &[2.0, 4.0, 6.0])?, vec![0.0, 5.0, 10.0]);
        assert!(apply("fq, 0, 1, 0, 1", &[1.0]).is_err());
        Ok(())
    }
}
