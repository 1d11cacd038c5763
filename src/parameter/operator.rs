//! Arithmetic operators combining the values of two generators.

use crate::parameter::{
    ArgType, Arguments, Entry, Generator, GeneratorObject, Parameter, ReferenceState, Value,
};

// -------------------------------------------------------------------------------------------------

/// Binary operation of two numbers.
pub type Operation = fn(f64, f64) -> f64;

macro_rules! operators {
    ($($short:literal, $name:ident => |$a:ident, $b:ident| $body:expr);+ $(;)?) => {
        paste::paste! {
            $(
                pub fn [<$name:lower>]($a: f64, $b: f64) -> f64 {
                    $body
                }
            )+

            pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
                $(
                    Entry {
                        short: $short,
                        long: concat!("operator", stringify!($name)),
                        args: OPERATOR_ARGS,
                        defaults: "(ws, e, 30, 0, 0, 1), (a, .5, (c, .025))",
                        build: |args| Operator::build(args, [<$name:lower>]),
                    },
                )+
            ];
        }
    };
}

const OPERATOR_ARGS: &[(&str, ArgType)] = &[("first", ArgType::Object), ("second", ArgType::Object)];

operators! {
    "oa", Add => |a, b| a + b;
    "os", Subtract => |a, b| a - b;
    "om", Multiply => |a, b| a * b;
    // division by zero keeps the numerator
    "od", Divide => |a, b| if b == 0.0 { a } else { a / b };
    "op", Power => |a, b| a.powf(b);
    // floored modulo; a zero modulus keeps the value
    "oc", Congruence => |a, b| {
        if b == 0.0 {
            a
        } else {
            let rem = a % b;
            if rem != 0.0 && (rem < 0.0) != (b < 0.0) {
                rem + b
            } else {
                rem
            }
        }
    };
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct Operator {
    operation: Operation,
    first: GeneratorObject,
    second: GeneratorObject,
}

impl Operator {
    fn build(args: &mut Arguments, operation: Operation) -> Result<Box<dyn Generator>, String> {
        Ok(Box::new(Self {
            operation,
            first: args.generator(0)?,
            second: args.generator(1)?,
        }))
    }
}

impl Parameter for Operator {
    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.first.check()?;
        self.second.check()
    }
}

impl Generator for Operator {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let a = self.first.number(t, refs)?;
        let b = self.second.number(t, refs)?;
        let value = (self.operation)(a, b);
        if value.is_nan() {
            return Err(format!("{} and {} give no real result", a, b));
        }
        Ok(Value::Number(value))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::Argument, seed::SeedSource};

    fn value(text: &str) -> Result<f64, String> {
        let mut generator = GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(1))?;
        generator.number(0.0, &ReferenceState::default())
    }

    #[test]
    fn operations() {
        assert_eq!(add(1.0, 2.0), 3.0);
        assert_eq!(subtract(1.0, 2.0), -1.0);
        assert_eq!(multiply(3.0, 2.0), 6.0);
        assert_eq!(divide(3.0, 2.0), 1.5);
        assert_eq!(divide(3.0, 0.0), 3.0);
        assert_eq!(power(2.0, 3.0), 8.0);
        assert_eq!(congruence(7.0, 3.0), 1.0);
        assert_eq!(congruence(-7.0, 3.0), 2.0);
        assert_eq!(congruence(7.0, -3.0), -2.0);
        assert_eq!(congruence(7.0, 0.0), 7.0);
    }

    #[test]
    fn generators() -> Result<(), String> {
        assert_eq!(value("oa, 1, 2")?, 3.0);
        assert_eq!(value("os, 1, 2")?, -1.0);
        assert_eq!(value("om, 1.5, 2")?, 3.0);
        assert_eq!(value("od, 4, 0")?, 4.0);
        assert_eq!(value("op, 3, 2")?, 9.0);
        assert_eq!(value("oc, 10.5, 4")?, 2.5);
        assert!(value("op, -2, .5").is_err());
        let generator = GeneratorObject::build(&Argument::parse("oa")?, &mut SeedSource::new(1))?;
        assert_eq!(
            generator.to_string(),
            "operatorAdd, (waveSine, event, (constant, 30), 0, (constant, 0), (constant, 1)), \
            (accumulator, 0.5, (constant, 0.025))"
        );
        Ok(())
    }
}
