//! Periodic generators: unit oscillators sampled at the event index or the event time and
//! mapped into a dynamic range.

use std::f64::consts::PI;

use crate::parameter::{
    options::StepMode, ArgType, Arguments, Entry, Generator, GeneratorObject, MinMax,
    Parameter, ReferenceState, Value,
};

// -------------------------------------------------------------------------------------------------

/// Unit interval oscillator shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Oscillator {
    Sine,
    Cosine,
    SawUp,
    SawDown,
    Pulse,
    Triangle,
    /// Rising power curve with exponent `2^e`.
    PowerUp(f64),
    /// Falling power curve with exponent `2^e`.
    PowerDown(f64),
}

impl Oscillator {
    /// Sample the oscillator at time `t` with the given frequency and phase in cycles.
    pub fn sample(&self, t: f64, frequency: f64, phase: f64) -> f64 {
        let position = || {
            let period = 1.0 / frequency;
            (t + period * phase).rem_euclid(period) / period
        };
        match self {
            Oscillator::Sine => (1.0 + (2.0 * PI * (phase + t * frequency)).sin()) / 2.0,
            Oscillator::Cosine => (1.0 + (2.0 * PI * (phase + t * frequency)).cos()) / 2.0,
            Oscillator::SawUp => position(),
            Oscillator::SawDown => 1.0 - position(),
            Oscillator::Pulse => {
                if position() < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Oscillator::Triangle => {
                let position = position();
                if position < 0.5 {
                    position * 2.0
                } else {
                    1.0 - (position - 0.5) * 2.0
                }
            }
            Oscillator::PowerUp(exponent) => position().powf(2f64.powf(*exponent)),
            Oscillator::PowerDown(exponent) => (1.0 - position()).powf(2f64.powf(*exponent)),
        }
    }
}

// -------------------------------------------------------------------------------------------------

const WAVE_ARGS: &[(&str, ArgType)] = &[
    ("step", ArgType::Text),
    ("secondsPerCycle", ArgType::Object),
    ("phase", ArgType::Number),
    ("min", ArgType::Object),
    ("max", ArgType::Object),
];

const POWER_ARGS: &[(&str, ArgType)] = &[
    ("step", ArgType::Text),
    ("secondsPerCycle", ArgType::Object),
    ("phase", ArgType::Number),
    ("exponent", ArgType::Number),
    ("min", ArgType::Object),
    ("max", ArgType::Object),
];

macro_rules! wave_entry {
    ($short:literal, $long:literal, $oscillator:ident) => {
        Entry {
            short: $short,
            long: $long,
            args: WAVE_ARGS,
            defaults: "e, 30, 0, 0, 1",
            build: |args| Wave::build(args, |_| Oscillator::$oscillator),
        }
    };
    ($short:literal, $long:literal, $oscillator:ident, power) => {
        Entry {
            short: $short,
            long: $long,
            args: POWER_ARGS,
            defaults: "e, 30, 0, 2, 0, 1",
            build: |args| Wave::build(args, Oscillator::$oscillator),
        }
    };
}

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    wave_entry!("ws", "waveSine", Sine),
    wave_entry!("wc", "waveCosine", Cosine),
    wave_entry!("wsu", "waveSawUp", SawUp),
    wave_entry!("wsd", "waveSawDown", SawDown),
    wave_entry!("wp", "wavePulse", Pulse),
    wave_entry!("wt", "waveTriangle", Triangle),
    wave_entry!("wpu", "wavePowerUp", PowerUp, power),
    wave_entry!("wpd", "wavePowerDown", PowerDown, power),
];

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct Wave {
    oscillator: Oscillator,
    step: StepMode,
    seconds_per_cycle: GeneratorObject,
    phase: f64,
    range: MinMax,
    index: usize,
}

impl Wave {
    fn build(
        args: &mut Arguments,
        oscillator: fn(f64) -> Oscillator,
    ) -> Result<Box<dyn Generator>, String> {
        let step = args.option::<StepMode>(0)?;
        let seconds_per_cycle = args.generator(1)?;
        let phase = args.number(2)?;
        let (oscillator, range) = if args.name().starts_with("wavePower") {
            (oscillator(args.number(3)?), MinMax::new(args, 4, 5)?)
        } else {
            (oscillator(0.0), MinMax::new(args, 3, 4)?)
        };
        Ok(Box::new(Self {
            oscillator,
            step,
            seconds_per_cycle,
            phase,
            range,
            index: 0,
        }))
    }
}

impl Parameter for Wave {
    fn reset(&mut self) {
        self.index = 0;
        self.seconds_per_cycle.reset();
        self.range.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.seconds_per_cycle.check()
    }
}

impl Generator for Wave {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        let local = match self.step {
            StepMode::Event => self.index as f64,
            StepMode::Time => t,
        };
        let seconds_per_cycle = self.seconds_per_cycle.number(t, refs)?;
        let frequency = if seconds_per_cycle == 0.0 {
            1.0
        } else {
            1.0 / seconds_per_cycle
        };
        let value = self.oscillator.sample(local, frequency, self.phase).clamp(0.0, 1.0);
        let value = self.range.denorm(value, t, refs)?;
        if self.step == StepMode::Event {
            self.index += 1;
        }
        Ok(Value::Number(value))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{parameter::Argument, seed::SeedSource};

    fn numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
        let mut seeds = SeedSource::new(1);
        let mut generator = GeneratorObject::build(&Argument::parse(text)?, &mut seeds)?;
        let refs = ReferenceState::default();
        (0..count)
            .map(|t| generator.number(t as f64 * 0.5, &refs))
            .collect()
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (a, b) in a.iter().zip(b) {
            assert!((a - b).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn oscillators() {
        assert!((Oscillator::Sine.sample(0.0, 1.0, 0.0) - 0.5).abs() < 1e-12);
        assert!((Oscillator::Sine.sample(0.25, 1.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((Oscillator::Cosine.sample(0.0, 1.0, 0.0) - 1.0).abs() < 1e-12);
        assert_eq!(Oscillator::SawUp.sample(0.25, 1.0, 0.0), 0.25);
        assert_eq!(Oscillator::SawDown.sample(0.25, 1.0, 0.0), 0.75);
        assert_eq!(Oscillator::Pulse.sample(0.75, 1.0, 0.0), 0.0);
        assert_eq!(Oscillator::Triangle.sample(0.75, 1.0, 0.0), 0.5);
        assert_eq!(Oscillator::PowerUp(1.0).sample(0.5, 1.0, 0.0), 0.25);
        assert_eq!(Oscillator::PowerDown(0.0).sample(0.25, 1.0, 0.0), 0.75);
        assert_eq!(Oscillator::SawUp.sample(0.0, 1.0, 0.5), 0.5);
    }

    #[test]
    fn event_steps() -> Result<(), String> {
        assert_close(
            &numbers("wsu, e, 4, 0, 0, 8", 5)?,
            &[0.0, 2.0, 4.0, 6.0, 0.0],
        );
        assert_close(
            &numbers("wt, e, 4, 0, 10, 20", 4)?,
            &[10.0, 15.0, 20.0, 15.0],
        );
        assert_close(&numbers("wp, e, 2, 0, 0, 1", 4)?, &[1.0, 0.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn time_steps() -> Result<(), String> {
        // t advances by .5 per call
        assert_close(
            &numbers("wsu, t, 2, 0, 0, 1", 4)?,
            &[0.0, 0.25, 0.5, 0.75],
        );
        Ok(())
    }

    #[test]
    fn power_waves() -> Result<(), String> {
        assert_close(
            &numbers("wpu, e, 4, 0, 0, 0, 1", 3)?,
            &[0.0, 0.25, 0.5],
        );
        let mut seeds = SeedSource::new(1);
        let generator = GeneratorObject::build(&Argument::parse("wpd")?, &mut seeds)?;
        assert_eq!(
            generator.to_string(),
            "wavePowerDown, event, (constant, 30), 0, 2, (constant, 0), (constant, 1)"
        );
        Ok(())
    }
}
