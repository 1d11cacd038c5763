//! L-system grammar generator.

use crate::{
    grammar::Grammar,
    parameter::{
        ArgType, Argument, Arguments, Entry, Generator, Parameter, ReferenceState, Value,
    },
    seed::RandomStream,
    selector::Selector,
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[Entry {
    short: "gt",
    long: "grammarTerminus",
    args: &[
        ("grammarString", ArgType::Text),
        ("stepCount", ArgType::Number),
        ("selection", ArgType::Text),
    ],
    defaults: "a{.2}b{.5}c{.8}d{0}@a{ba}b{bc}c{cd}d{ac}@a, 6, oc",
    build: GrammarTerminus::build,
}];

/// Derives a grammar `stepCount` times at construction and selects from the values of
/// the final state.
#[derive(Debug)]
struct GrammarTerminus {
    selector: Selector<Value>,
    rand: RandomStream,
}

impl GrammarTerminus {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let mut grammar = Grammar::try_from(args.text(0)?.as_str())
            .map_err(|err| format!("Grammar creation failed: {}", err))?;
        args.set(0, Argument::Text(grammar.to_string()));
        let steps = args.integer(1)?;
        if steps < 0 {
            return Err("step count must not be negative.".to_string());
        }
        let mode = args.selection(2)?;
        let mut rand = args.random();
        for _ in 0..steps {
            grammar.step(&mut rand)?;
        }
        let values = grammar
            .values()
            .into_iter()
            .map(|value| match value.parse::<f64>() {
                Ok(number) => Value::Number(number),
                Err(_) => Value::Text(value),
            })
            .collect();
        Ok(Box::new(Self {
            selector: Selector::new(values, mode),
            rand,
        }))
    }
}

impl Parameter for GrammarTerminus {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.selector.is_empty() {
            return Err("grammar derivation produced no values; add steps.".to_string());
        }
        Ok(())
    }
}

impl Generator for GrammarTerminus {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        self.selector.select(&mut self.rand)
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

    #[test]
    fn grammar_terminus() -> Result<(), String> {
        let refs = ReferenceState::default();
        // b, ab, aba, abaab
        let mut terminus = generator("gt, a{1}b{2}@a{ab}b{a}@b, 4, oc")?;
        let values = (0..6)
            .map(|t| terminus.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(values, vec![1.0, 2.0, 1.0, 1.0, 2.0, 1.0]);
        assert_eq!(
            terminus.to_string(),
            "grammarTerminus, a{1}b{2}@a{ab}b{a}@b, 4, orderedCyclic"
        );
        let mut text = generator("gt, a{x}b{y}@a{ab}b{a}@b, 1, oc")?;
        assert_eq!(text.run(0.0, &refs)?, Value::from("x"));
        Ok(())
    }

    #[test]
    fn errors() {
        assert!(generator("gt, a{1}@a{b}").is_err());
        assert!(generator("gt, a{1}b{2}@a{ab}b{a}@b, -1").is_err());
        assert!(generator("gt").is_ok());
    }
}
