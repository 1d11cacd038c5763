//! Cellular automata generators. The automaton is run once at construction time with its
//! rule and mutation generators evaluated per generation; calls select from the extracted
//! cell values.

use crate::{
    automata::{Automaton, CaSpecification, TableFormat},
    parameter::{
        ArgType, Argument, Arguments, Entry, Generator, GeneratorObject, MinMax, Parameter,
        ReferenceState, Value,
    },
    seed::RandomStream,
    selector::Selector,
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "cl",
        long: "caList",
        args: &[
            ("caSpec", ArgType::Text),
            ("rule", ArgType::Object),
            ("mutation", ArgType::Object),
            ("tableExtraction", ArgType::Text),
            ("selection", ArgType::Text),
        ],
        defaults: "f{f}i{c}x{81}y{120}, .25, .0005, sc, oc",
        build: |args| CellularAutomaton::build(args, false),
    },
    Entry {
        short: "cv",
        long: "caValue",
        args: &[
            ("caSpec", ArgType::Text),
            ("rule", ArgType::Object),
            ("mutation", ArgType::Object),
            ("tableExtraction", ArgType::Text),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "f{s}, (c, 110), (c, 0), sr, 0, 1, oc",
        build: |args| CellularAutomaton::build(args, true),
    },
];

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct CellularAutomaton {
    automaton: Automaton,
    rule: GeneratorObject,
    mutation: GeneratorObject,
    /// Only set for normalized values.
    range: Option<MinMax>,
    selector: Selector<f64>,
    rand: RandomStream,
}

impl CellularAutomaton {
    fn build(args: &mut Arguments, normalized: bool) -> Result<Box<dyn Generator>, String> {
        let spec = CaSpecification::try_from(args.text(0)?.as_str())
            .map_err(|err| format!("error in CA specification: {}", err))?;
        args.set(0, Argument::Text(spec.to_string()));
        let mut rule = args.generator(1)?;
        let mut mutation = args.generator(2)?;
        let format = args.option::<TableFormat>(3)?;
        let (range, mode) = if normalized {
            (Some(MinMax::new(args, 4, 5)?), args.selection(6)?)
        } else {
            (None, args.selection(4)?)
        };

        let mut rand = args.random();
        let refs = ReferenceState::default();
        let mut automaton = Automaton::new(
            spec.clone(),
            rule.number(0.0, &refs)?,
            mutation.number(0.0, &refs)?,
            &mut rand,
        )?;
        for generation in 1..spec.generations_total() {
            let t = generation as f64;
            let (r, m) = (rule.number(t, &refs)?, mutation.number(t, &refs)?);
            automaton.generate(r, m, &mut rand);
        }
        let cells = automaton.cells(format, normalized);
        Ok(Box::new(Self {
            automaton,
            rule,
            mutation,
            range,
            selector: Selector::new(cells, mode),
            rand,
        }))
    }
}

impl Parameter for CellularAutomaton {
    fn reset(&mut self) {
        self.rule.reset();
        self.mutation.reset();
        if let Some(range) = &mut self.range {
            range.reset();
        }
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.rule.check()?;
        self.mutation.check()?;
        if self.selector.is_empty() {
            return Err("automaton produced no values".to_string());
        }
        Ok(())
    }

    fn preview(&self) -> Option<String> {
        let rows = self
            .automaton
            .history()
            .iter()
            .skip(self.automaton.spec().skip())
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        c if *c <= 0.0 => ' ',
                        c if *c < 0.5 => '.',
                        _ => '+',
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>();
        Some(rows.join("\n"))
    }
}

impl Generator for CellularAutomaton {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.selector.select(&mut self.rand)?;
        match &mut self.range {
            Some(range) => Ok(Value::Number(range.denorm(value, t, refs)?)),
            None => Ok(Value::Number(value)),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::ReprFormat, seed::SeedSource};

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(7))
    }

    fn numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
        let mut generator = generator(text)?;
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.number(t as f64, &refs)).collect()
    }

    #[test]
    fn ca_list() -> Result<(), String> {
        // rule 90 from a single center cell: 1, 2, 2, 4 active cells
        assert_eq!(
            numbers("cl, f{s}x{9}y{4}, 90, 0, sr, oc", 5)?,
            vec![1.0, 2.0, 2.0, 4.0, 1.0]
        );
        let list = generator("cl, f{s}x{9}y{4}, 90, 0, sr, oc")?;
        assert_eq!(
            list.to_string(),
            "caList, f{s}k{2}r{1}i{center}x{9}y{4}w{9}c{0}s{0}, (constant, 90), \
            (constant, 0), sumRow, orderedCyclic"
        );
        assert_eq!(
            list.repr(ReprFormat::Full).lines().skip(1).collect::<Vec<_>>(),
            vec!["    +    ", "   + +   ", "  +   +  ", " + + + + "]
        );
        Ok(())
    }

    #[test]
    fn ca_value() -> Result<(), String> {
        assert_eq!(
            numbers("cv, f{s}x{9}y{4}, 90, 0, sr, 0, 8, oc", 4)?,
            vec![2.0, 4.0, 4.0, 8.0]
        );
        let values = numbers("cv", 50)?;
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(generator("cv, f{s, 90").is_err());
        Ok(())
    }

    #[test]
    fn determinism() -> Result<(), String> {
        let text = "cl, f{s}x{21}y{20}i{r}, 30, .1, fr, rc";
        assert_eq!(numbers(text, 40)?, numbers(text, 40)?);
        Ok(())
    }
}
