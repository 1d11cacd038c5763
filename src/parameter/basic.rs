//! Constants, baskets, accumulators and other generators without a random or periodic
//! core.

use crate::{
    parameter::{
        options::{Direction, PitchReadFormat, TypeFormat},
        ArgType, Arguments, Entry, Generator, GeneratorObject, MinMax, Parameter,
        ReferenceState, Value,
    },
    pitch::Pitch,
    seed::RandomStream,
    selector::Selector,
    unit,
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "c",
        long: "constant",
        args: &[("value", ArgType::Value)],
        defaults: "0",
        build: Constant::build,
    },
    Entry {
        short: "cg",
        long: "cyclicGen",
        args: &[
            ("direction", ArgType::Text),
            ("min", ArgType::Number),
            ("max", ArgType::Number),
            ("increment", ArgType::Number),
        ],
        defaults: "ud, 0, 1, .125",
        build: CyclicGen::build,
    },
    Entry {
        short: "bg",
        long: "basketGen",
        args: &[("selection", ArgType::Text), ("values", ArgType::Object)],
        defaults: "rc, (0, .25, .25, 1)",
        build: BasketGen::build,
    },
    Entry {
        short: "bf",
        long: "basketFill",
        args: &[
            ("selection", ArgType::Text),
            ("source", ArgType::Object),
            ("count", ArgType::Number),
        ],
        defaults: "oc, (ru, 0, 1), 10",
        build: BasketFill::build,
    },
    Entry {
        short: "bfs",
        long: "basketFillSelect",
        args: &[
            ("source", ArgType::Object),
            ("count", ArgType::Number),
            ("selection", ArgType::Object),
        ],
        defaults: "(ru, 0, 1), 10, (rb, .2, .2, 0, 1)",
        build: BasketFillSelect::build,
    },
    Entry {
        short: "bs",
        long: "basketSelect",
        args: &[("values", ArgType::Object), ("selection", ArgType::Object)],
        defaults: "(1, 2, 3, 4, 5, 6, 7, 8, 9), \
            (rb, .2, .2, (bpl, e, s, ((0, .4), (120, 0))), (bpl, e, s, ((0, .6), (120, 1))))",
        build: BasketSelect::build,
    },
    Entry {
        short: "a",
        long: "accumulator",
        args: &[("init", ArgType::Number), ("source", ArgType::Object)],
        defaults: "0, (bg, rc, (1, 3, 4, 7, -11))",
        build: Accumulator::build,
    },
    Entry {
        short: "oo",
        long: "oneOver",
        args: &[("source", ArgType::Object)],
        defaults: "(ws, e, 30, 0, .5, 2)",
        build: OneOver::build,
    },
    Entry {
        short: "tf",
        long: "typeFormat",
        args: &[("format", ArgType::Text), ("source", ArgType::Object)],
        defaults: "sq, (bg, rc, (1, 3, 4, 7, -11))",
        build: TypeFormatter::build,
    },
    Entry {
        short: "pr",
        long: "pathRead",
        args: &[("format", ArgType::Text)],
        defaults: "forte",
        build: PathRead::build,
    },
    Entry {
        short: "fs",
        long: "fibonacciSeries",
        args: &[
            ("start", ArgType::Number),
            ("length", ArgType::Number),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "200, 20, 0, 1, oc",
        build: FibonacciSeries::build,
    },
];

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct Constant {
    value: Value,
}

impl Constant {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let value = match args.values(0)?.pop() {
            Some(value) => value,
            None => return Err("constant: missing value".to_string()),
        };
        Ok(Box::new(Self { value }))
    }
}

impl Parameter for Constant {
    fn reset(&mut self) {}
}

impl Generator for Constant {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        Ok(self.value.clone())
    }
}

// -------------------------------------------------------------------------------------------------

/// Counts between min and max with a fixed increment.
#[derive(Debug)]
struct CyclicGen {
    initial_direction: Direction,
    direction: Direction,
    min: f64,
    max: f64,
    increment: f64,
    value: f64,
}

impl CyclicGen {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let direction = args.option::<Direction>(0)?;
        let min = args.number(1)?;
        Ok(Box::new(Self {
            initial_direction: direction,
            direction,
            min,
            max: args.number(2)?,
            increment: args.number(3)?,
            value: min,
        }))
    }
}

impl Parameter for CyclicGen {
    fn reset(&mut self) {
        self.direction = self.initial_direction;
        self.value = self.min;
    }

    fn check(&self) -> Result<(), String> {
        if self.min > self.max {
            return Err("range error: minimum is larger than maximum.".to_string());
        }
        if self.increment < 0.0 || self.increment > (self.max - self.min).abs() {
            return Err("increment error: must fit within range.".to_string());
        }
        Ok(())
    }
}

impl Generator for CyclicGen {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        match self.direction {
            Direction::UpDown => {
                self.value += self.increment;
                if self.value > self.max {
                    self.direction = Direction::DownUp;
                    self.value = self.max;
                }
            }
            Direction::DownUp => {
                self.value -= self.increment;
                if self.value < self.min {
                    self.direction = Direction::UpDown;
                    self.value = self.min;
                }
            }
            Direction::Up => {
                if self.value + self.increment > self.max {
                    self.value = self.min;
                } else {
                    self.value += self.increment;
                }
            }
            Direction::Down => {
                if self.value - self.increment < self.min {
                    self.value = self.max;
                } else {
                    self.value -= self.increment;
                }
            }
        }
        Ok(Value::Number(self.value))
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct BasketGen {
    selector: Selector<Value>,
    rand: RandomStream,
}

impl BasketGen {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let mode = args.selection(0)?;
        let values = args.values(1)?;
        Ok(Box::new(Self {
            selector: Selector::new(values, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for BasketGen {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.selector.is_empty() {
            return Err("list must have more than 0 items.".to_string());
        }
        Ok(())
    }
}

impl Generator for BasketGen {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        self.selector.select(&mut self.rand)
    }
}

// -------------------------------------------------------------------------------------------------

fn fill_basket(source: &mut GeneratorObject, count: i64) -> Result<Vec<Value>, String> {
    let refs = ReferenceState::default();
    (0..count.unsigned_abs().max(1))
        .map(|t| source.run(t as f64, &refs))
        .collect()
}

/// Fills a basket from a generator once and selects from it.
#[derive(Debug)]
struct BasketFill {
    source: GeneratorObject,
    selector: Selector<Value>,
    rand: RandomStream,
}

impl BasketFill {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let mode = args.selection(0)?;
        let mut source = args.generator(1)?;
        let basket = fill_basket(&mut source, args.integer(2)?)?;
        Ok(Box::new(Self {
            source,
            selector: Selector::new(basket, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for BasketFill {
    fn reset(&mut self) {
        self.source.reset();
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }
}

impl Generator for BasketFill {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        self.selector.select(&mut self.rand)
    }
}

/// Fills a basket from a generator once and selects from it with a unit generator.
#[derive(Debug)]
struct BasketFillSelect {
    source: GeneratorObject,
    basket: Vec<Value>,
    selection: GeneratorObject,
    bounds: Vec<unit::Boundary>,
}

impl BasketFillSelect {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let mut source = args.generator(0)?;
        let basket = fill_basket(&mut source, args.integer(1)?)?;
        let bounds = unit::boundary_equal(basket.len())?;
        Ok(Box::new(Self {
            source,
            basket,
            selection: args.generator(2)?,
            bounds,
        }))
    }
}

impl Parameter for BasketFillSelect {
    fn reset(&mut self) {
        self.source.reset();
        self.selection.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.selection.check()
    }
}

impl Generator for BasketFillSelect {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let position = unit::limit(self.selection.number(t, refs)?);
        let index = unit::boundary_position(position, &self.bounds)?;
        Ok(self.basket[index].clone())
    }
}

/// Selects from a fixed list with a unit generator.
#[derive(Debug)]
struct BasketSelect {
    values: Vec<Value>,
    selection: GeneratorObject,
    bounds: Vec<unit::Boundary>,
}

impl BasketSelect {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let values = args.values(0)?;
        if values.is_empty() {
            return Err("list must have more than 0 items.".to_string());
        }
        let bounds = unit::boundary_equal(values.len())?;
        Ok(Box::new(Self {
            values,
            selection: args.generator(1)?,
            bounds,
        }))
    }
}

impl Parameter for BasketSelect {
    fn reset(&mut self) {
        self.selection.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.selection.check()
    }
}

impl Generator for BasketSelect {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let position = unit::limit(self.selection.number(t, refs)?);
        let index = unit::boundary_position(position, &self.bounds)?;
        Ok(self.values[index].clone())
    }
}

// -------------------------------------------------------------------------------------------------

/// Sums the values of a generator, starting with the init value.
#[derive(Debug)]
struct Accumulator {
    init: f64,
    value: f64,
    started: bool,
    source: GeneratorObject,
}

impl Accumulator {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let init = args.number(0)?;
        Ok(Box::new(Self {
            init,
            value: init,
            started: false,
            source: args.generator(1)?,
        }))
    }
}

impl Parameter for Accumulator {
    fn reset(&mut self) {
        self.source.reset();
        self.value = self.init;
        self.started = false;
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }
}

impl Generator for Accumulator {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        if self.started {
            self.value += self.source.number(t, refs)?;
        } else {
            self.started = true;
        }
        Ok(Value::Number(self.value))
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct OneOver {
    source: GeneratorObject,
}

impl OneOver {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            source: args.generator(0)?,
        }))
    }
}

impl Parameter for OneOver {
    fn reset(&mut self) {
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }
}

impl Generator for OneOver {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.source.number(t, refs)?;
        Ok(Value::Number(if value == 0.0 { 1.0 } else { 1.0 / value }))
    }
}

// -------------------------------------------------------------------------------------------------

/// Converts values of a generator to strings.
#[derive(Debug)]
struct TypeFormatter {
    format: TypeFormat,
    source: GeneratorObject,
}

impl TypeFormatter {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            format: args.option::<TypeFormat>(0)?,
            source: args.generator(1)?,
        }))
    }
}

impl Parameter for TypeFormatter {
    fn reset(&mut self) {
        self.source.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }
}

impl Generator for TypeFormatter {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.source.run(t, refs)?;
        Ok(Value::Text(match self.format {
            TypeFormat::String => value.to_string(),
            TypeFormat::StringQuote => format!("\"{}\"", value),
        }))
    }
}

// -------------------------------------------------------------------------------------------------

/// Reads the active multiset or pitch of the scheduling loop.
#[derive(Debug)]
struct PathRead {
    format: PitchReadFormat,
}

impl PathRead {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            format: args.option::<PitchReadFormat>(0)?,
        }))
    }
}

impl Parameter for PathRead {
    fn reset(&mut self) {}
}

impl Generator for PathRead {
    fn run(&mut self, _t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let multiset = refs
            .multiset
            .as_ref()
            .ok_or_else(|| "pathRead: no current multiset".to_string())?;
        let pitch = || {
            refs.pitch_post
                .or(refs.pitch_raw)
                .map(Pitch::from_ps)
                .ok_or_else(|| "pathRead: no current pitch".to_string())
        };
        Ok(match self.format {
            PitchReadFormat::Forte => Value::Text(format!("\"{}\"", multiset.set_class(false))),
            PitchReadFormat::Mason => {
                let mut pcs = multiset
                    .pcs()
                    .into_iter()
                    .map(|pc| pc.round().rem_euclid(12.0) as u32)
                    .collect::<Vec<_>>();
                pcs.sort_unstable();
                pcs.dedup();
                Value::Number(pcs.into_iter().map(|pc| f64::from(1u32 << pc)).sum())
            }
            PitchReadFormat::Frequency => Value::Number(pitch()?.frequency()),
            PitchReadFormat::PitchSpace => Value::Number(pitch()?.ps()),
            PitchReadFormat::Midi => Value::Number(f64::from(pitch()?.midi())),
            PitchReadFormat::Pch => Value::Number(pitch()?.pch()),
            PitchReadFormat::Name => Value::Text(pitch()?.name()),
        })
    }
}

// -------------------------------------------------------------------------------------------------

/// Terms `start..start + length` of the Fibonacci series 1, 1, 2, 3, 5, ...
pub fn fibonacci_series(start: usize, length: usize) -> Vec<f64> {
    let (mut a, mut b) = (0.0_f64, 1.0_f64);
    for _ in 0..start {
        (a, b) = (b, a + b);
    }
    let mut series = Vec::with_capacity(length);
    for _ in 0..length {
        series.push(b);
        (a, b) = (b, a + b);
    }
    series
}

/// Selects from a normalized segment of the Fibonacci series.
#[derive(Debug)]
struct FibonacciSeries {
    start: i64,
    length: i64,
    range: MinMax,
    selector: Selector<f64>,
    rand: RandomStream,
}

impl FibonacciSeries {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let start = args.integer(0)?;
        let length = args.integer(1)?;
        let range = MinMax::new(args, 2, 3)?;
        let mode = args.selection(4)?;
        let mut series = unit::norm_series(&fibonacci_series(
            start.max(0) as usize,
            length.unsigned_abs() as usize,
        ));
        if length < 0 {
            series.reverse();
        }
        Ok(Box::new(Self {
            start,
            length,
            range,
            selector: Selector::new(series, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for FibonacciSeries {
    fn reset(&mut self) {
        self.range.reset();
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.start < 1 {
            return Err("argument error: start value must be 1 or greater.".to_string());
        }
        if self.length == 0 {
            return Err("argument error: length must be 1 or greater.".to_string());
        }
        Ok(())
    }

    fn preview(&self) -> Option<String> {
        Some(
            self.selector
                .items()
                .iter()
                .map(|v| format!("{:.3}", v))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

impl Generator for FibonacciSeries {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.selector.select(&mut self.rand)?;
        Ok(Value::Number(self.range.denorm(value, t, refs)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{multiset::Multiset, seed::SeedSource};

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        let mut seeds = SeedSource::new(1);
        GeneratorObject::build(&crate::parameter::Argument::parse(text)?, &mut seeds)
    }

    fn numbers(generator: &mut GeneratorObject, count: usize) -> Result<Vec<f64>, String> {
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.number(t as f64, &refs)).collect()
    }

    #[test]
    fn constant() -> Result<(), String> {
        let refs = ReferenceState::default();
        assert_eq!(generator("c, 3")?.run(0.0, &refs)?, Value::Number(3.0));
        assert_eq!(generator("c, abc")?.run(0.0, &refs)?, Value::from("abc"));
        assert_eq!(generator("c")?.to_string(), "constant, 0");
        Ok(())
    }

    #[test]
    fn cyclic() -> Result<(), String> {
        assert_eq!(
            numbers(&mut generator("cg, ud, 0, 1, .5")?, 6)?,
            vec![0.5, 1.0, 1.0, 0.5, 0.0, 0.0]
        );
        assert_eq!(
            numbers(&mut generator("cg, u, 0, 2, 1")?, 5)?,
            vec![1.0, 2.0, 0.0, 1.0, 2.0]
        );
        assert_eq!(
            numbers(&mut generator("cg, d, 0, 2, 1")?, 4)?,
            vec![2.0, 1.0, 0.0, 2.0]
        );
        assert_eq!(
            generator("cg, du, 0, 1, .5")?.to_string(),
            "cyclicGen, downUp, 0, 1, 0.5"
        );
        assert!(generator("cg, ud, 2, 1, .5").is_err());
        assert!(generator("cg, ud, 0, 1, 2").is_err());
        Ok(())
    }

    #[test]
    fn baskets() -> Result<(), String> {
        assert_eq!(
            numbers(&mut generator("bg, oc, (1, 2, 3)")?, 4)?,
            vec![1.0, 2.0, 3.0, 1.0]
        );
        assert_eq!(numbers(&mut generator("bg, oc, 4")?, 2)?, vec![4.0, 4.0]);
        assert_eq!(
            numbers(&mut generator("bfs, (bg, oc, (20, 30)), 2, (bg, oc, (.2, .8))")?, 2)?,
            vec![20.0, 30.0]
        );
        assert_eq!(
            numbers(&mut generator("bf, oc, (bg, oc, (3, 100)), 20")?, 2)?,
            vec![3.0, 100.0]
        );
        assert_eq!(
            numbers(&mut generator("bs, (1, 2, 3), (bg, oc, (0, .5, 1))")?, 3)?,
            vec![1.0, 2.0, 3.0]
        );
        assert!(generator("bg, oc, ()").is_err());
        Ok(())
    }

    #[test]
    fn accumulator() -> Result<(), String> {
        let mut a = generator("a, 10, (bg, oc, (1, -2))")?;
        assert_eq!(numbers(&mut a, 4)?, vec![10.0, 11.0, 9.0, 10.0]);
        a.reset();
        assert_eq!(numbers(&mut a, 2)?, vec![10.0, 11.0]);
        Ok(())
    }

    #[test]
    fn one_over() -> Result<(), String> {
        assert_eq!(
            numbers(&mut generator("oo, (bg, oc, (2, 0, -4))")?, 3)?,
            vec![0.5, 1.0, -0.25]
        );
        Ok(())
    }

    #[test]
    fn type_format() -> Result<(), String> {
        let refs = ReferenceState::default();
        assert_eq!(
            generator("tf, sq, (c, 3)")?.run(0.0, &refs)?,
            Value::from("\"3\"")
        );
        assert_eq!(generator("tf, s, (c, 3)")?.run(0.0, &refs)?, Value::from("3"));
        Ok(())
    }

    #[test]
    fn path_read() -> Result<(), String> {
        let mut refs = ReferenceState::default();
        let mut forte = generator("pr, forte")?;
        assert!(forte.run(0.0, &refs).is_err());
        refs.multiset = Some(Multiset::try_from("c,e,g")?);
        refs.pitch_raw = Some(4.0);
        assert_eq!(forte.run(0.0, &refs)?, Value::from("\"3-11B\""));
        assert_eq!(generator("pr, midi")?.run(0.0, &refs)?, Value::Number(64.0));
        assert_eq!(generator("pr, mason")?.run(0.0, &refs)?, Value::Number(145.0));
        refs.pitch_post = Some(7.0);
        assert_eq!(generator("pr, ps")?.run(0.0, &refs)?, Value::Number(7.0));
        assert!(generator("pr, other").is_err());
        Ok(())
    }

    #[test]
    fn fibonacci() -> Result<(), String> {
        assert_eq!(
            fibonacci_series(2, 5),
            vec![2.0, 3.0, 5.0, 8.0, 13.0]
        );
        assert_eq!(fibonacci_series(10, 1), vec![89.0]);
        let values = numbers(&mut generator("fs, 3, 3, 0, 10")?, 4)?;
        assert_eq!(values, vec![0.0, 4.0, 10.0, 0.0]);
        let values = numbers(&mut generator("fs, 3, -3, 0, 10")?, 3)?;
        assert_eq!(values, vec![10.0, 4.0, 0.0]);
        assert!(generator("fs, 0, 3, 0, 1").is_err());
        assert!(generator("fs, 1, 0, 0, 1").is_err());
        Ok(())
    }
}
