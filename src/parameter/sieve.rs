//! Sieve and prime segment generators.

use crate::{
    parameter::{
        args::format_number, ArgType, Argument, Arguments, Entry, Generator, GeneratorObject,
        MinMax, Parameter, ReferenceState, Value,
    },
    seed::RandomStream,
    selector::Selector,
    sieve::{prime_segment_formatted, SegmentFormat, Sieve},
    unit::{self, FunnelUnit},
};

// -------------------------------------------------------------------------------------------------

/// Upper bound of prime segment lengths.
const PRIME_LIMIT: i64 = 999_999;

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "sl",
        long: "sieveList",
        args: &[
            ("logicalString", ArgType::Text),
            ("zMin", ArgType::Number),
            ("zMax", ArgType::Number),
            ("format", ArgType::Text),
            ("selection", ArgType::Text),
        ],
        defaults: "3|4, -12, 12, int, oc",
        build: SieveList::build,
    },
    Entry {
        short: "vs",
        long: "valueSieve",
        args: &[
            ("logicalString", ArgType::Text),
            ("length", ArgType::Number),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "3&19|4&13@11, 360, 0, 1, oo",
        build: ValueSieve::build,
    },
    Entry {
        short: "sf",
        long: "sieveFunnel",
        args: &[
            ("logicalString", ArgType::Text),
            ("length", ArgType::Number),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
            ("fill", ArgType::Object),
        ],
        defaults: "3|4, 24, 0, 1, (ru, 0, 1)",
        build: SieveFunnel::build,
    },
    Entry {
        short: "lp",
        long: "listPrime",
        args: &[
            ("start", ArgType::Number),
            ("length", ArgType::Number),
            ("format", ArgType::Text),
            ("selection", ArgType::Text),
        ],
        defaults: "2, 50, int, oc",
        build: ListPrime::build,
    },
    Entry {
        short: "vp",
        long: "valuePrime",
        args: &[
            ("start", ArgType::Number),
            ("length", ArgType::Number),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "2, 50, 0, 1, oo",
        build: ValuePrime::build,
    },
];

/// Parse the sieve argument and store its expanded form.
pub(crate) fn sieve(args: &mut Arguments, index: usize) -> Result<Sieve, String> {
    let sieve = Sieve::try_from(args.text(index)?.as_str())?;
    args.set(index, Argument::Text(sieve.to_string()));
    Ok(sieve)
}

fn preview(values: &[f64]) -> Option<String> {
    Some(
        values
            .iter()
            .map(|v| format_value(*v))
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format_number(value)
    } else {
        format!("{:.3}", value)
    }
}

// -------------------------------------------------------------------------------------------------

/// Selects from a sieve segment within an inclusive integer range.
#[derive(Debug)]
struct SieveList {
    selector: Selector<f64>,
    rand: RandomStream,
}

impl SieveList {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let sieve = sieve(args, 0)?;
        let (a, b) = (args.integer(1)?, args.integer(2)?);
        if a == b {
            return Err("zMin must not be equal to zMax".to_string());
        }
        let (min, max) = (a.min(b), a.max(b));
        args.set(1, Argument::Number(min as f64));
        args.set(2, Argument::Number(max as f64));
        let format = args.option::<SegmentFormat>(3)?;
        let segment = sieve.segment(0, min..max + 1, format);
        let mode = args.selection(4)?;
        Ok(Box::new(Self {
            selector: Selector::new(segment, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for SieveList {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.selector.is_empty() {
            return Err(
                "sieve segment is empty; choose a better logic formula or z.".to_string(),
            );
        }
        Ok(())
    }

    fn preview(&self) -> Option<String> {
        preview(self.selector.items())
    }
}

impl Generator for SieveList {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        Ok(Value::Number(self.selector.select(&mut self.rand)?))
    }
}

// -------------------------------------------------------------------------------------------------

/// Selects from a unit sieve segment over `0..length`, mapped into a dynamic range.
/// Negative lengths reverse the segment.
#[derive(Debug)]
struct ValueSieve {
    length: i64,
    range: MinMax,
    selector: Selector<f64>,
    rand: RandomStream,
}

impl ValueSieve {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let sieve = sieve(args, 0)?;
        let length = args.integer(1)?;
        let mut series = sieve.segment(0, 0..length.abs(), SegmentFormat::Unit);
        if length < 0 {
            series.reverse();
        }
        let range = MinMax::new(args, 2, 3)?;
        let mode = args.selection(4)?;
        Ok(Box::new(Self {
            length,
            range,
            selector: Selector::new(series, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for ValueSieve {
    fn reset(&mut self) {
        self.selector.reset();
        self.range.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.length == 0 {
            return Err("argument error: length must not be 0.".to_string());
        }
        if self.selector.is_empty() {
            return Err("sieve segment is empty; choose a longer length.".to_string());
        }
        Ok(())
    }

    fn preview(&self) -> Option<String> {
        preview(self.selector.items())
    }
}

impl Generator for ValueSieve {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.selector.select(&mut self.rand)?;
        Ok(Value::Number(self.range.denorm(value, t, refs)?))
    }
}

// -------------------------------------------------------------------------------------------------

/// Funnels the values of a fill generator to the nearest point of a sieve segment.
#[derive(Debug)]
struct SieveFunnel {
    segment: Vec<i64>,
    funnel: Option<FunnelUnit>,
    range: MinMax,
    fill: GeneratorObject,
}

impl SieveFunnel {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let sieve = sieve(args, 0)?;
        let length = args.integer(1)?;
        if length < 1 {
            return Err("argument error: length must be 1 or greater.".to_string());
        }
        let segment = sieve.integers(0, 0..length);
        let funnel = if segment.is_empty() {
            None
        } else {
            Some(FunnelUnit::new(&segment)?)
        };
        Ok(Box::new(Self {
            segment,
            funnel,
            range: MinMax::new(args, 2, 3)?,
            fill: args.generator(4)?,
        }))
    }
}

impl Parameter for SieveFunnel {
    fn reset(&mut self) {
        self.range.reset();
        self.fill.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.funnel.is_none() {
            return Err("sieve segment is empty; choose a longer length.".to_string());
        }
        self.fill.check()
    }

    fn preview(&self) -> Option<String> {
        preview(&self.segment.iter().map(|v| *v as f64).collect::<Vec<_>>())
    }
}

impl Generator for SieveFunnel {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let fill = unit::limit(self.fill.number(t, refs)?);
        let funnel = self
            .funnel
            .as_ref()
            .ok_or_else(|| "sieve segment is empty".to_string())?;
        let value = funnel.find_nearest(fill)?;
        Ok(Value::Number(self.range.denorm(value, t, refs)?))
    }
}

// -------------------------------------------------------------------------------------------------

fn primes(args: &Arguments, format: SegmentFormat) -> Result<(i64, Vec<f64>), String> {
    let start = args.integer(0)?;
    let length = args.integer(1)?;
    if length.abs() > PRIME_LIMIT {
        return Err("length value exceeds a practical range".to_string());
    }
    let mut segment = prime_segment_formatted(start, length.unsigned_abs() as usize, format);
    if length < 0 {
        segment.reverse();
    }
    Ok((length, segment))
}

/// Selects from a segment of successive primes.
#[derive(Debug)]
struct ListPrime {
    length: i64,
    selector: Selector<f64>,
    rand: RandomStream,
}

impl ListPrime {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let format = args.option::<SegmentFormat>(2)?;
        let (length, segment) = primes(args, format)?;
        let mode = args.selection(3)?;
        Ok(Box::new(Self {
            length,
            selector: Selector::new(segment, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for ListPrime {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.length == 0 {
            return Err("length must not be 0.".to_string());
        }
        if self.selector.is_empty() {
            return Err(
                "segment obtained zero values; try a different start or length.".to_string(),
            );
        }
        Ok(())
    }

    fn preview(&self) -> Option<String> {
        preview(self.selector.items())
    }
}

impl Generator for ListPrime {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        Ok(Value::Number(self.selector.select(&mut self.rand)?))
    }
}

// -------------------------------------------------------------------------------------------------

/// Selects from a unit prime segment, mapped into a dynamic range.
#[derive(Debug)]
struct ValuePrime {
    length: i64,
    range: MinMax,
    selector: Selector<f64>,
    rand: RandomStream,
}

impl ValuePrime {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let (length, series) = primes(args, SegmentFormat::Unit)?;
        let range = MinMax::new(args, 2, 3)?;
        let mode = args.selection(4)?;
        Ok(Box::new(Self {
            length,
            range,
            selector: Selector::new(series, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for ValuePrime {
    fn reset(&mut self) {
        self.selector.reset();
        self.range.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.length == 0 {
            return Err("length must be larger than 0.".to_string());
        }
        if self.selector.is_empty() {
            return Err(
                "segment obtained zero values; try a different start or length.".to_string(),
            );
        }
        Ok(())
    }

    fn preview(&self) -> Option<String> {
        preview(self.selector.items())
    }
}

impl Generator for ValuePrime {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.selector.select(&mut self.rand)?;
        Ok(Value::Number(self.range.denorm(value, t, refs)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::ReprFormat, seed::SeedSource};

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(3))
    }

    fn numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
        let mut generator = generator(text)?;
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.number(t as f64, &refs)).collect()
    }

    #[test]
    fn sieve_list() -> Result<(), String> {
        assert_eq!(
            numbers("sl, 3|4, 12, 0, int, oc", 7)?,
            vec![0.0, 3.0, 4.0, 6.0, 8.0, 9.0, 12.0]
        );
        assert_eq!(
            numbers("sl, 3, 0, 9, wid, oc", 3)?,
            vec![3.0, 3.0, 3.0]
        );
        let sieve_list = generator("sl, 5, 0, 10, bin")?;
        assert_eq!(
            sieve_list.to_string(),
            "sieveList, 5@0, 0, 10, bin, orderedCyclic"
        );
        assert_eq!(
            sieve_list.repr(ReprFormat::Full),
            "sieveList, 5@0, 0, 10, bin, orderedCyclic\n1,0,0,0,0,1,0,0,0,0,1"
        );
        assert!(generator("sl, 3, 4, 4").is_err());
        assert!(generator("sl, 7, 1, 5").is_err());
        assert!(generator("sl, 3&&4").is_err());
        Ok(())
    }

    #[test]
    fn value_sieve() -> Result<(), String> {
        assert_eq!(
            numbers("vs, 4, 9, 0, 8, oc", 3)?,
            vec![0.0, 4.0, 8.0]
        );
        assert_eq!(
            numbers("vs, 4, -9, 0, 8, oc", 3)?,
            vec![8.0, 4.0, 0.0]
        );
        assert!(generator("vs, 4, 0").is_err());
        Ok(())
    }

    #[test]
    fn sieve_funnel() -> Result<(), String> {
        // segment 0, 5, 10 funnels to 0, .5, 1
        assert_eq!(
            numbers("sf, 5, 11, 0, 10, (bg, oc, (0, .1, .45, .55, .9, 1))", 6)?,
            vec![0.0, 0.0, 5.0, 5.0, 10.0, 10.0]
        );
        assert!(generator("sf, 5, 0").is_err());
        Ok(())
    }

    #[test]
    fn primes() -> Result<(), String> {
        assert_eq!(
            numbers("lp, 2, 5, int, oc", 6)?,
            vec![2.0, 3.0, 5.0, 7.0, 11.0, 2.0]
        );
        assert_eq!(
            numbers("lp, 2, -3, int, oc", 3)?,
            vec![5.0, 3.0, 2.0]
        );
        assert_eq!(numbers("lp, 2, 4, wid, oc", 3)?, vec![1.0, 2.0, 2.0]);
        let values = numbers("vp, 2, 3, 0, 6, oc", 3)?;
        for (value, expected) in values.iter().zip([0.0, 2.0, 6.0]) {
            assert!((value - expected).abs() < 1e-9, "{:?}", values);
        }
        assert!(generator("lp, 2, 0").is_err());
        assert!(generator("lp, 2, 10000000").is_err());
        Ok(())
    }
}
