//! Markov chain value generator.

use crate::{
    markov::{weighted_order, Transition},
    parameter::{
        ArgType, Argument, Arguments, Entry, Generator, GeneratorObject, Parameter,
        ReferenceState, Value, MARKOV_LIMIT,
    },
    seed::RandomStream,
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[Entry {
    short: "mv",
    long: "markovValue",
    args: &[
        ("transitionString", ArgType::Text),
        ("order", ArgType::Object),
    ],
    defaults: "a{.2}b{.5}c{.8}d{0}:{a=5|b=4|c=7|d=1}, (c, 0)",
    build: MarkovValue::build,
}];

/// Parse a transition argument and store its canonical form.
pub(crate) fn transition(args: &mut Arguments, index: usize) -> Result<Transition, String> {
    let transition = Transition::try_from(args.text(index)?.as_str())
        .map_err(|err| format!("Markov transition creation failed: {}", err))?;
    args.set(index, Argument::Text(transition.to_string()));
    Ok(transition)
}

/// Keep the last `MARKOV_LIMIT` values of a history.
pub(crate) fn push_history(history: &mut Vec<String>, value: String) {
    history.push(value);
    if history.len() > MARKOV_LIMIT {
        history.remove(0);
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct MarkovValue {
    transition: Transition,
    order: GeneratorObject,
    history: Vec<String>,
    rand: RandomStream,
}

impl MarkovValue {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            transition: transition(args, 0)?,
            order: args.generator(1)?,
            history: Vec::new(),
            rand: args.random(),
        }))
    }
}

impl Parameter for MarkovValue {
    fn reset(&mut self) {
        self.order.reset();
        self.history.clear();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.order.check()
    }
}

impl Generator for MarkovValue {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let unit = self.rand.unit();
        let order = weighted_order(self.order.number(t, refs)?, &mut self.rand);
        let value = self.transition.next(unit, &self.history, order)?;
        push_history(&mut self.history, value.clone());
        Ok(match value.parse::<f64>() {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(value),
        })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::seed::SeedSource;

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(11))
    }

    fn run(text: &str, count: usize) -> Result<Vec<Value>, String> {
        let mut generator = generator(text)?;
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.run(t as f64, &refs)).collect()
    }

    #[test]
    fn zero_order() -> Result<(), String> {
        let values = run("mv, a{1}b{2}:{a=1}, 0", 10)?;
        assert!(values.iter().all(|v| *v == Value::Number(1.0)));
        let values = run("mv, a{x}b{y}:{a=1|b=1}, 0", 100)?;
        assert!(values.contains(&Value::from("x")));
        assert!(values.contains(&Value::from("y")));
        Ok(())
    }

    #[test]
    fn first_order() -> Result<(), String> {
        // a always moves to b, b always moves to a
        let values = run("mv, a{1}b{2}:{a=1|b=1}a:{b=1}b:{a=1}, 1", 20)?;
        for pair in values.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        Ok(())
    }

    #[test]
    fn history_limit() {
        let mut history = Vec::new();
        for i in 0..20 {
            push_history(&mut history, i.to_string());
        }
        assert_eq!(history.len(), MARKOV_LIMIT);
        assert_eq!(history[0], "11");
    }

    #[test]
    fn reset() -> Result<(), String> {
        assert!(generator("mv, a{1}:{b=1}").is_err());
        let mut generator = generator("mv")?;
        let refs = ReferenceState::default();
        let first = (0..20)
            .map(|t| generator.run(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        generator.reset();
        let second = (0..20)
            .map(|t| generator.run(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(first, second);
        Ok(())
    }
}
