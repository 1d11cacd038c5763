//! Iterators: generators which group, skip, window, hold or cross the values of other
//! generators.

use std::collections::VecDeque;

use crate::{
    parameter::{
        ArgType, Arguments, Entry, Generator, GeneratorObject, Parameter, ReferenceState, Value,
        FAIL_LIMIT,
    },
    seed::RandomStream,
    selector::{SelectionMode, Selector},
    unit,
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "ig",
        long: "iterateGroup",
        args: &[("source", ArgType::Object), ("control", ArgType::Object)],
        defaults: "(ws, e, 30, 0, 0, 1), (bg, rc, (-3, 1, -1, 5))",
        build: IterateGroup::build,
    },
    Entry {
        short: "iw",
        long: "iterateWindow",
        args: &[
            ("sources", ArgType::List),
            ("control", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "((ru, 0, 1), (wt, e, 30, 0, 0, 1)), (bg, oc, (8, 4, -2)), oc",
        build: IterateWindow::build,
    },
    Entry {
        short: "ih",
        long: "iterateHold",
        args: &[
            ("source", ArgType::Object),
            ("size", ArgType::Object),
            ("refresh", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "(ru, 0, 1), (bg, rc, (2, 3, 4)), (bg, oc, (12, 24)), oc",
        build: IterateHold::build,
    },
    Entry {
        short: "ic",
        long: "iterateCross",
        args: &[
            ("first", ArgType::Object),
            ("second", ArgType::Object),
            ("interpolation", ArgType::Object),
        ],
        defaults: "(ws, e, 30, 0, 0, 1), (wp, e, 30, 0, 0, 1), (bpl, e, l, ((0, 0), (120, 1)))",
        build: IterateCross::build,
    },
    Entry {
        short: "is",
        long: "iterateSelect",
        args: &[
            ("source", ArgType::Object),
            ("size", ArgType::Object),
            ("refresh", ArgType::Object),
            ("selection", ArgType::Object),
        ],
        defaults: "(ru, 0, 1), (bg, rc, (10, 11, 12)), (bg, oc, (12, 24)), (rb, .15, .15, 0, 1)",
        build: IterateSelect::build,
    },
];

// -------------------------------------------------------------------------------------------------

/// Repeats each source value or skips source values, as told by the control generator:
/// positive counts repeat, negative counts skip.
#[derive(Debug)]
struct IterateGroup {
    source: GeneratorObject,
    control: GeneratorObject,
    buffer: VecDeque<Value>,
}

impl IterateGroup {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            source: args.generator(0)?,
            control: args.generator(1)?,
            buffer: VecDeque::new(),
        }))
    }
}

impl Parameter for IterateGroup {
    fn reset(&mut self) {
        self.source.reset();
        self.control.reset();
        self.buffer.clear();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.control.check()
    }
}

impl Generator for IterateGroup {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let mut attempts = 0;
        while self.buffer.is_empty() {
            let count = self.control.number(t, refs)?.round() as i64;
            if count < 0 {
                for _ in 0..count.unsigned_abs() {
                    self.source.run(t, refs)?;
                }
            } else if count > 0 {
                let value = self.source.run(t, refs)?;
                self.buffer.extend(std::iter::repeat(value).take(count as usize));
            }
            attempts += 1;
            if attempts > FAIL_LIMIT && self.buffer.is_empty() {
                log::warn!("iterateGroup: no values obtained; supplying value");
                self.buffer.push_back(self.source.run(t, refs)?);
            }
        }
        self.buffer
            .pop_front()
            .ok_or_else(|| "iterateGroup: empty value buffer".to_string())
    }
}

// -------------------------------------------------------------------------------------------------

/// Takes windows of values from one of several generators: positive counts take values,
/// negative counts skip values of the selected generator.
#[derive(Debug)]
struct IterateWindow {
    sources: Vec<GeneratorObject>,
    control: GeneratorObject,
    selector: Selector<usize>,
    rand: RandomStream,
    buffer: VecDeque<Value>,
}

impl IterateWindow {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let sources = args.generators(0)?;
        let control = args.generator(1)?;
        let mode = args.selection(2)?;
        Ok(Box::new(Self {
            selector: Selector::new((0..sources.len()).collect(), mode),
            sources,
            control,
            rand: args.random(),
            buffer: VecDeque::new(),
        }))
    }
}

impl Parameter for IterateWindow {
    fn reset(&mut self) {
        self.sources.iter_mut().for_each(GeneratorObject::reset);
        self.control.reset();
        self.selector.reset();
        self.rand.reset();
        self.buffer.clear();
    }

    fn check(&self) -> Result<(), String> {
        self.control.check()?;
        self.sources.iter().try_for_each(GeneratorObject::check)
    }
}

impl Generator for IterateWindow {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let mut attempts = 0;
        while self.buffer.is_empty() {
            let index = self.selector.select(&mut self.rand)?;
            let count = self.control.number(t, refs)?.round() as i64;
            let source = &mut self.sources[index];
            if count < 0 {
                for _ in 0..count.unsigned_abs() {
                    source.run(t, refs)?;
                }
            } else {
                for _ in 0..count {
                    self.buffer.push_back(source.run(t, refs)?);
                }
            }
            attempts += 1;
            if attempts > FAIL_LIMIT && self.buffer.is_empty() {
                log::warn!("iterateWindow: no values obtained; supplying value");
                self.buffer.push_back(source.run(t, refs)?);
            }
        }
        self.buffer
            .pop_front()
            .ok_or_else(|| "iterateWindow: empty value buffer".to_string())
    }
}

// -------------------------------------------------------------------------------------------------

/// A buffer of source values which gets refilled after a dynamic number of calls.
#[derive(Debug)]
pub(crate) struct HoldBuffer<T> {
    pub values: Vec<T>,
    /// Calls since the last refill.
    count: u64,
    /// Calls since construction or reset.
    total: u64,
    /// Calls between refills; 0 holds forever.
    period: u64,
}

impl<T> Default for HoldBuffer<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            count: 0,
            total: 0,
            period: 0,
        }
    }
}

impl<T> HoldBuffer<T> {
    /// Count a call and refill the buffer when due, calling `fill` with the running step
    /// index for each new value. Returns true when the values changed.
    pub fn advance<F>(
        &mut self,
        size: &mut GeneratorObject,
        refresh: &mut GeneratorObject,
        t: f64,
        refs: &ReferenceState,
        mut fill: F,
    ) -> Result<bool, String>
    where
        F: FnMut(u64) -> Result<T, String>,
    {
        let mut refilled = false;
        if self.total == 0 || (self.period != 0 && self.count >= self.period) {
            let size = size.number(t, refs)?.round().abs() as u64;
            if size != 0 || self.values.is_empty() {
                let size = if size == 0 { FAIL_LIMIT as u64 } else { size };
                self.values = (self.total..self.total + size)
                    .map(&mut fill)
                    .collect::<Result<Vec<_>, _>>()?;
                refilled = true;
            }
            self.count = 0;
        }
        if self.count == 0 {
            self.period = refresh.number(t, refs)?.round().abs() as u64;
        }
        self.count += 1;
        self.total += 1;
        Ok(refilled)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Holds a number of source values and selects from them until the buffer gets refreshed.
#[derive(Debug)]
struct IterateHold {
    source: GeneratorObject,
    size: GeneratorObject,
    refresh: GeneratorObject,
    mode: SelectionMode,
    buffer: HoldBuffer<Value>,
    selector: Selector<Value>,
    rand: RandomStream,
}

impl IterateHold {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let mode = args.selection(3)?;
        Ok(Box::new(Self {
            source: args.generator(0)?,
            size: args.generator(1)?,
            refresh: args.generator(2)?,
            mode,
            buffer: HoldBuffer::default(),
            selector: Selector::new(Vec::new(), mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for IterateHold {
    fn reset(&mut self) {
        self.source.reset();
        self.size.reset();
        self.refresh.reset();
        self.buffer.reset();
        self.selector = Selector::new(Vec::new(), self.mode);
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.size.check()?;
        self.refresh.check()
    }
}

impl Generator for IterateHold {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let source = &mut self.source;
        let buffer = &mut self.buffer;
        if buffer.advance(&mut self.size, &mut self.refresh, t, refs, |step| {
            source.run(step as f64, refs)
        })? {
            self.selector = Selector::new(buffer.values.clone(), self.mode);
        }
        self.selector.select(&mut self.rand)
    }
}

// -------------------------------------------------------------------------------------------------

/// Like `IterateHold`, but selects from the held values with a unit interval generator.
#[derive(Debug)]
struct IterateSelect {
    source: GeneratorObject,
    size: GeneratorObject,
    refresh: GeneratorObject,
    selection: GeneratorObject,
    buffer: HoldBuffer<Value>,
    bounds: Vec<unit::Boundary>,
}

impl IterateSelect {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            source: args.generator(0)?,
            size: args.generator(1)?,
            refresh: args.generator(2)?,
            selection: args.generator(3)?,
            buffer: HoldBuffer::default(),
            bounds: Vec::new(),
        }))
    }
}

impl Parameter for IterateSelect {
    fn reset(&mut self) {
        self.source.reset();
        self.size.reset();
        self.refresh.reset();
        self.selection.reset();
        self.buffer.reset();
        self.bounds.clear();
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.size.check()?;
        self.refresh.check()?;
        self.selection.check()
    }
}

impl Generator for IterateSelect {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let source = &mut self.source;
        let buffer = &mut self.buffer;
        if buffer.advance(&mut self.size, &mut self.refresh, t, refs, |step| {
            source.run(step as f64, refs)
        })? {
            self.bounds = unit::boundary_equal(buffer.values.len())?;
        }
        let position = unit::limit(self.selection.number(t, refs)?);
        let index = unit::boundary_position(position, &self.bounds)?;
        Ok(self.buffer.values[index].clone())
    }
}

// -------------------------------------------------------------------------------------------------

/// Interpolates between two generators with a unit interval generator.
#[derive(Debug)]
struct IterateCross {
    first: GeneratorObject,
    second: GeneratorObject,
    interpolation: GeneratorObject,
}

impl IterateCross {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            first: args.generator(0)?,
            second: args.generator(1)?,
            interpolation: args.generator(2)?,
        }))
    }
}

impl Parameter for IterateCross {
    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
        self.interpolation.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.first.check()?;
        self.second.check()?;
        self.interpolation.check()
    }
}

impl Generator for IterateCross {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let position = unit::limit(self.interpolation.number(t, refs)?);
        let a = self.first.number(t, refs)?;
        let b = self.second.number(t, refs)?;
        Ok(Value::Number(unit::interpolate(position, a, b)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::Argument, seed::SeedSource};

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(9))
    }

    fn numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
        let mut generator = generator(text)?;
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.number(t as f64, &refs)).collect()
    }

    #[test]
    fn iterate_group() -> Result<(), String> {
        // repeat 1 twice, skip 2, repeat 3 twice, ...
        assert_eq!(
            numbers("ig, (bg, oc, (1, 2, 3, 4, 5, 6)), (bg, oc, (2, -1))", 6)?,
            vec![1.0, 1.0, 3.0, 3.0, 5.0, 5.0]
        );
        // zero counts fall back to single values
        assert_eq!(numbers("ig, (bg, oc, (1, 2)), 0", 2)?, vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn iterate_window() -> Result<(), String> {
        assert_eq!(
            numbers("iw, ((bg, oc, (1, 2, 3)), (c, 10)), (bg, oc, (2, 1, -1, 1)), oc", 6)?,
            vec![1.0, 2.0, 10.0, 10.0, 1.0, 2.0]
        );
        Ok(())
    }

    #[test]
    fn iterate_hold() -> Result<(), String> {
        assert_eq!(
            numbers("ih, (bg, oc, (1, 2, 3, 4, 5, 6)), 2, 3, oc", 7)?,
            vec![1.0, 2.0, 1.0, 3.0, 4.0, 3.0, 5.0]
        );
        // a refresh count of 0 holds the first values forever
        assert_eq!(
            numbers("ih, (bg, oc, (1, 2, 3)), 1, 0, oc", 4)?,
            vec![1.0, 1.0, 1.0, 1.0]
        );
        let mut hold = generator("ih")?;
        let refs = ReferenceState::default();
        let first = (0..30)
            .map(|t| hold.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        hold.reset();
        let second = (0..30)
            .map(|t| hold.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn iterate_select() -> Result<(), String> {
        assert_eq!(
            numbers("is, (bg, oc, (1, 2, 3, 4)), 2, 2, (bg, oc, (0, 1))", 4)?,
            vec![1.0, 2.0, 3.0, 4.0]
        );
        let values = numbers("is", 50)?;
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        Ok(())
    }

    #[test]
    fn iterate_cross() -> Result<(), String> {
        assert_eq!(
            numbers("ic, 0, 10, (bg, oc, (0, .5, 1, 2))", 4)?,
            vec![0.0, 5.0, 10.0, 10.0]
        );
        Ok(())
    }
}
