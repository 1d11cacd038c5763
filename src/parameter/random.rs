//! Random generators: unit interval distributions mapped into a dynamic range.

use std::f64::consts::PI;

use crate::{
    parameter::{
        ArgType, Arguments, Entry, Generator, MinMax, Parameter, ReferenceState, Value,
        LOOP_LIMIT,
    },
    seed::RandomStream,
};

// -------------------------------------------------------------------------------------------------

/// Unit interval distributions. Distributions with tails outside of the unit interval are
/// redrawn until a value falls into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Uniform,
    Linear,
    InverseLinear,
    Triangular,
    InverseTriangular,
    Exponential { lambda: f64 },
    InverseExponential { lambda: f64 },
    BilateralExponential { lambda: f64 },
    Gauss { mu: f64, sigma: f64 },
    Cauchy { alpha: f64, mu: f64 },
    Beta { alpha: f64, beta: f64 },
    Weibull { alpha: f64, beta: f64 },
}

fn exponential(rand: &mut RandomStream, lambda: f64) -> f64 {
    let mut u = rand.unit();
    while u <= 1e-7 {
        u = rand.unit();
    }
    -u.ln() / lambda
}

impl Distribution {
    /// Draw a candidate value, which may lie outside of the unit interval.
    fn draw(&self, rand: &mut RandomStream) -> f64 {
        match *self {
            Distribution::Uniform => rand.unit(),
            Distribution::Linear => rand.unit().min(rand.unit()),
            Distribution::InverseLinear => rand.unit().max(rand.unit()),
            Distribution::Triangular | Distribution::InverseTriangular => {
                let inverse = matches!(self, Distribution::InverseTriangular);
                let a = rand.unit();
                let b = rand.unit() / 2.0;
                let accepted = if a < 0.5 { a > b } else { a - 0.5 < b };
                if accepted != inverse {
                    a
                } else {
                    -1.0
                }
            }
            Distribution::Exponential { lambda } => exponential(rand, lambda),
            Distribution::InverseExponential { lambda } => 1.0 - exponential(rand, lambda),
            Distribution::BilateralExponential { lambda } => {
                let r = exponential(rand, lambda);
                if r >= 1.0 {
                    -1.0
                } else if rand.unit() > 0.5 {
                    0.5 + r / 2.0
                } else {
                    0.5 - r / 2.0
                }
            }
            Distribution::Gauss { mu, sigma } => rand.gauss(mu, sigma),
            Distribution::Cauchy { alpha, mu } => {
                let mut x = rand.unit();
                while x == 0.5 {
                    x = rand.unit();
                }
                alpha * (x * PI).tan() + mu
            }
            Distribution::Beta { alpha, beta } => {
                let y = exponential(rand, alpha);
                let z = exponential(rand, 1.0 / beta);
                let value = z / (y + z);
                if rand.unit() > 0.5 {
                    1.0 - value
                } else {
                    value
                }
            }
            Distribution::Weibull { alpha, beta } => {
                let u = rand.unit().max(f64::MIN_POSITIVE);
                alpha * (-u.ln()).powf(1.0 / beta)
            }
        }
    }

    /// Draw a value within the unit interval.
    pub fn sample(&self, rand: &mut RandomStream) -> f64 {
        for _ in 0..LOOP_LIMIT {
            let value = self.draw(rand);
            let in_range = match self {
                // exclusive upper bounds, so zero and one stay distinct events
                Distribution::Exponential { .. } => (0.0..1.0).contains(&value),
                Distribution::InverseExponential { .. } => value > 0.0 && value <= 1.0,
                _ => (0.0..=1.0).contains(&value),
            };
            if in_range {
                return value;
            }
        }
        log::warn!(
            "{:?} failed to produce a unit interval value after {} attempts",
            self,
            LOOP_LIMIT
        );
        0.5
    }
}

// -------------------------------------------------------------------------------------------------

const RANGE_ARGS: &[(&str, ArgType)] = &[("min", ArgType::Object), ("max", ArgType::Object)];

const ONE_ARGS: &[(&str, ArgType)] = &[
    ("lambda", ArgType::Number),
    ("min", ArgType::Object),
    ("max", ArgType::Object),
];

const TWO_ARGS: &[(&str, ArgType)] = &[
    ("alpha", ArgType::Number),
    ("beta", ArgType::Number),
    ("min", ArgType::Object),
    ("max", ArgType::Object),
];

macro_rules! random_builders {
    ($($name:ident => |$args:ident| $distribution:expr, $offset:literal);+ $(;)?) => {
        paste::paste! {
            $(
                fn [<build_ $name>]($args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
                    let distribution = $distribution;
                    Random::build($args, distribution, $offset)
                }
            )+
        }
    };
}

random_builders! {
    uniform => |args| Distribution::Uniform, 0;
    linear => |args| Distribution::Linear, 0;
    inverse_linear => |args| Distribution::InverseLinear, 0;
    triangular => |args| Distribution::Triangular, 0;
    inverse_triangular => |args| Distribution::InverseTriangular, 0;
    exponential => |args| Distribution::Exponential { lambda: args.number(0)? }, 1;
    inverse_exponential => |args| Distribution::InverseExponential { lambda: args.number(0)? }, 1;
    bilateral_exponential => |args| Distribution::BilateralExponential { lambda: args.number(0)? }, 1;
    gauss => |args| Distribution::Gauss { mu: args.number(0)?, sigma: args.number(1)? }, 2;
    cauchy => |args| Distribution::Cauchy { alpha: args.number(0)?, mu: args.number(1)? }, 2;
    beta => |args| Distribution::Beta { alpha: args.number(0)?, beta: args.number(1)? }, 2;
    weibull => |args| Distribution::Weibull { alpha: args.number(0)?, beta: args.number(1)? }, 2;
}

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "ru",
        long: "randomUniform",
        args: RANGE_ARGS,
        defaults: "0, 1",
        build: build_uniform,
    },
    Entry {
        short: "rl",
        long: "randomLinear",
        args: RANGE_ARGS,
        defaults: "0, 1",
        build: build_linear,
    },
    Entry {
        short: "ril",
        long: "randomInverseLinear",
        args: RANGE_ARGS,
        defaults: "0, 1",
        build: build_inverse_linear,
    },
    Entry {
        short: "rt",
        long: "randomTriangular",
        args: RANGE_ARGS,
        defaults: "0, 1",
        build: build_triangular,
    },
    Entry {
        short: "rit",
        long: "randomInverseTriangular",
        args: RANGE_ARGS,
        defaults: "0, 1",
        build: build_inverse_triangular,
    },
    Entry {
        short: "re",
        long: "randomExponential",
        args: ONE_ARGS,
        defaults: ".5, 0, 1",
        build: build_exponential,
    },
    Entry {
        short: "rie",
        long: "randomInverseExponential",
        args: ONE_ARGS,
        defaults: ".5, 0, 1",
        build: build_inverse_exponential,
    },
    Entry {
        short: "rbe",
        long: "randomBilateralExponential",
        args: ONE_ARGS,
        defaults: ".5, 0, 1",
        build: build_bilateral_exponential,
    },
    Entry {
        short: "rg",
        long: "randomGauss",
        args: &[
            ("mu", ArgType::Number),
            ("sigma", ArgType::Number),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
        ],
        defaults: ".5, .1, 0, 1",
        build: build_gauss,
    },
    Entry {
        short: "rc",
        long: "randomCauchy",
        args: &[
            ("alpha", ArgType::Number),
            ("mu", ArgType::Number),
            ("min", ArgType::Object),
            ("max", ArgType::Object),
        ],
        defaults: ".1, .5, 0, 1",
        build: build_cauchy,
    },
    Entry {
        short: "rb",
        long: "randomBeta",
        args: TWO_ARGS,
        defaults: ".5, .5, 0, 1",
        build: build_beta,
    },
    Entry {
        short: "rw",
        long: "randomWeibull",
        args: TWO_ARGS,
        defaults: ".5, 2, 0, 1",
        build: build_weibull,
    },
];

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct Random {
    distribution: Distribution,
    range: MinMax,
    rand: RandomStream,
}

impl Random {
    fn build(
        args: &mut Arguments,
        distribution: Distribution,
        offset: usize,
    ) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            distribution,
            range: MinMax::new(args, offset, offset + 1)?,
            rand: args.random(),
        }))
    }
}

impl Parameter for Random {
    fn reset(&mut self) {
        self.range.reset();
        self.rand.reset();
    }

    fn check(&self) -> Result<(), String> {
        match self.distribution {
            Distribution::Exponential { lambda }
            | Distribution::InverseExponential { lambda }
            | Distribution::BilateralExponential { lambda }
                if lambda <= 0.0 =>
            {
                Err("lambda may not be less than or equal to zero.".to_string())
            }
            Distribution::Gauss { mu: a, sigma: b }
            | Distribution::Cauchy { alpha: a, mu: b }
            | Distribution::Beta { alpha: a, beta: b }
            | Distribution::Weibull { alpha: a, beta: b }
                if a <= 0.0 || b <= 0.0 =>
            {
                Err("alpha and beta may not be less than or equal to zero.".to_string())
            }
            Distribution::Weibull { alpha, beta } if alpha >= 20.0 || beta >= 20.0 => {
                Err("alpha and beta should not be greater than 20.".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl Generator for Random {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let value = self.distribution.sample(&mut self.rand);
        Ok(Value::Number(self.range.denorm(value, t, refs)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        parameter::{Argument, GeneratorObject},
        seed::SeedSource,
    };

    fn numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
        let mut seeds = SeedSource::new(42);
        let mut generator = GeneratorObject::build(&Argument::parse(text)?, &mut seeds)?;
        let refs = ReferenceState::default();
        (0..count).map(|t| generator.number(t as f64, &refs)).collect()
    }

    #[test]
    fn ranges() -> Result<(), String> {
        for text in [
            "ru, 2, 4",
            "rl, 2, 4",
            "ril, 2, 4",
            "rt, 2, 4",
            "rit, 2, 4",
            "re, 2, 2, 4",
            "rie, 2, 2, 4",
            "rbe, 2, 2, 4",
            "rg, .5, .3, 2, 4",
            "rc, .1, .5, 2, 4",
            "rb, .2, .2, 2, 4",
            "rw, .5, 2, 2, 4",
            "ru, 4, 2",
        ] {
            for value in numbers(text, 200)? {
                assert!((2.0..=4.0).contains(&value), "{}: {}", text, value);
            }
        }
        Ok(())
    }

    #[test]
    fn distributions() -> Result<(), String> {
        let mean = |values: Vec<f64>| values.iter().sum::<f64>() / values.len() as f64;
        assert!(mean(numbers("rl", 2000)?) < 0.45);
        assert!(mean(numbers("ril", 2000)?) > 0.55);
        let gauss = mean(numbers("rg, .5, .05, 0, 1", 2000)?);
        assert!((gauss - 0.5).abs() < 0.02);
        assert!(mean(numbers("re, 10", 2000)?) < 0.2);
        assert!(mean(numbers("rie, 10", 2000)?) > 0.8);
        Ok(())
    }

    #[test]
    fn checks() -> Result<(), String> {
        let mut seeds = SeedSource::new(1);
        for text in ["re, 0", "rb, 0, .5", "rw, 20, 1", "rg, .5, -1"] {
            assert!(
                GeneratorObject::build(&Argument::parse(text)?, &mut seeds).is_err(),
                "{}",
                text
            );
        }
        Ok(())
    }
}
