//! Chaotic generators.

use crate::parameter::{
    ArgType, Argument, Arguments, Entry, Generator, GeneratorObject, MinMax, Parameter,
    ReferenceState, Value,
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[Entry {
    short: "lm",
    long: "logisticMap",
    args: &[
        ("initValue", ArgType::Number),
        ("p", ArgType::Any),
        ("min", ArgType::Object),
        ("max", ArgType::Object),
    ],
    defaults: ".5, (wt, e, 90, 0, 2.75, 4), 0, 1",
    build: LogisticMap::build,
}];

/// Named growth rates of the logistic map.
const PRESETS: &[(&str, f64)] = &[
    ("bi", 3.2),
    ("2", 3.2),
    ("quad", 3.44951),
    ("4", 3.44951),
    ("chaos", 3.5699461),
    ("periodic01", 3.57),
];

/// One step of the logistic map (Verhulst equation).
pub fn verhulst(p: f64, x: f64) -> f64 {
    p * x * (1.0 - x)
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct LogisticMap {
    init: f64,
    x: f64,
    p: GeneratorObject,
    range: MinMax,
}

impl LogisticMap {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let init = args.number(0)?;
        if let Argument::Text(name) = args.get(1)? {
            let key = name.trim().to_ascii_lowercase();
            let value = PRESETS
                .iter()
                .find(|(preset, _)| preset.to_ascii_lowercase() == key)
                .map(|(_, value)| *value)
                .ok_or_else(|| "no such preset name known.".to_string())?;
            args.set(1, Argument::Number(value));
        }
        Ok(Box::new(Self {
            init,
            x: init,
            p: args.generator(1)?,
            range: MinMax::new(args, 2, 3)?,
        }))
    }
}

impl Parameter for LogisticMap {
    fn reset(&mut self) {
        self.x = self.init;
        self.p.reset();
        self.range.reset();
    }

    fn check(&self) -> Result<(), String> {
        if self.init > 1.0 || self.init <= 0.0 {
            return Err("incorrect x init value; value must be between 0 and 1.".to_string());
        }
        self.p.check()
    }
}

impl Generator for LogisticMap {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let p = self.p.number(t, refs)?;
        // rates above 4 leave the unit interval
        self.x = verhulst(p, self.x).clamp(0.0, 1.0);
        Ok(Value::Number(self.range.denorm(self.x, t, refs)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::seed::SeedSource;

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(1))
    }

    #[test]
    fn logistic_map() -> Result<(), String> {
        let refs = ReferenceState::default();
        let mut map = generator("lm, .5, 2, 0, 1")?;
        // p = 2 converges immediately to .5
        for t in 0..4 {
            assert_eq!(map.number(t as f64, &refs)?, 0.5);
        }
        let mut map = generator("lm, .5, bi, 0, 10")?;
        assert_eq!(map.to_string(), "logisticMap, 0.5, (constant, 3.2), (constant, 0), (constant, 10)");
        let first = map.number(0.0, &refs)?;
        assert!((first - 8.0).abs() < 1e-9);
        let second = map.number(1.0, &refs)?;
        assert!((second - 5.12).abs() < 1e-9);
        map.reset();
        assert!((map.number(0.0, &refs)? - first).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn errors() {
        assert!(generator("lm, 0").is_err());
        assert!(generator("lm, 1.5").is_err());
        assert!(generator("lm, .5, nothing").is_err());
        assert!(generator("lm").is_ok());
    }
}
