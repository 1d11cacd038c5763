//! Feedback model generator.

use crate::{
    feedback::{Environment, FeedbackModel},
    parameter::{
        ArgType, Arguments, Entry, Generator, GeneratorObject, MinMax, Parameter,
        ReferenceState, Value,
    },
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[Entry {
    short: "fml",
    long: "feedbackModelLibrary",
    args: &[
        ("feedbackModelName", ArgType::Text),
        ("agingStep", ArgType::Object),
        ("threshold", ArgType::Object),
        ("min", ArgType::Object),
        ("max", ArgType::Object),
    ],
    defaults: "cc, (bg, rc, (1, 3)), (c, .9), 0, 1",
    build: FeedbackModelLibrary::build,
}];

/// Reads the population level of a particle environment after aging it each call.
#[derive(Debug)]
struct FeedbackModelLibrary {
    environment: Environment,
    age: GeneratorObject,
    threshold: GeneratorObject,
    range: MinMax,
}

impl FeedbackModelLibrary {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let model = args
            .option::<FeedbackModel>(0)
            .map_err(|err| format!("Feedback object creation failed: {}", err))?;
        Ok(Box::new(Self {
            environment: Environment::new(model),
            age: args.generator(1)?,
            threshold: args.generator(2)?,
            range: MinMax::new(args, 3, 4)?,
        }))
    }
}

impl Parameter for FeedbackModelLibrary {
    fn reset(&mut self) {
        self.environment.reset();
        self.age.reset();
        self.threshold.reset();
        self.range.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.age.check()?;
        self.threshold.check()
    }
}

impl Generator for FeedbackModelLibrary {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let age = self.age.number(t, refs)?;
        let threshold = self.threshold.number(t, refs)?;
        self.environment.advance(age, threshold);
        Ok(Value::Number(
            self.range.denorm(self.environment.value(), t, refs)?,
        ))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::Argument, seed::SeedSource};

    #[test]
    fn feedback_model() -> Result<(), String> {
        let mut seeds = SeedSource::new(1);
        let mut model = GeneratorObject::build(&Argument::parse("fml, t, 1, .6, 0, 10")?, &mut seeds)?;
        assert_eq!(
            model.to_string(),
            "feedbackModelLibrary, thermostat, (constant, 1), (constant, 0.6), \
            (constant, 0), (constant, 10)"
        );
        let refs = ReferenceState::default();
        let values = (0..100)
            .map(|t| model.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        assert!(values.iter().all(|v| (0.0..=10.0).contains(v)));
        model.reset();
        assert_eq!(model.number(0.0, &refs)?, values[0]);
        assert!(GeneratorObject::build(&Argument::parse("fml, xx")?, &mut seeds).is_err());
        Ok(())
    }
}
