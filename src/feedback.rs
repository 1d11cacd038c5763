//! Particle feedback systems: sensors count living particles and produce new ones while
//! the count is below their threshold, so the population hunts around the threshold.

use std::{collections::BTreeMap, fmt::Display};

// -------------------------------------------------------------------------------------------------

/// Population level, as particle count, that maps to the unit value 1.
const CAPACITY: f64 = 100.0;

// -------------------------------------------------------------------------------------------------

/// A particle with a fixed life cycle of named states, each lasting a number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    life_cycle: Vec<(char, usize)>,
    age: usize,
}

impl Particle {
    pub fn new(life_cycle: Vec<(char, usize)>) -> Result<Self, String> {
        if life_cycle.is_empty() || life_cycle.iter().any(|(_, frames)| *frames == 0) {
            return Err("invalid particle life cycle: states must last at least a frame".into());
        }
        Ok(Self { life_cycle, age: 0 })
    }

    pub fn life_span(&self) -> usize {
        self.life_cycle.iter().map(|(_, frames)| frames).sum()
    }

    pub fn age(&self) -> usize {
        self.age
    }

    pub fn is_dead(&self) -> bool {
        self.age > self.life_span()
    }

    /// Current state, None when dead. A newborn particle is in its first state.
    pub fn state(&self) -> Option<char> {
        if self.is_dead() {
            return None;
        }
        let mut end = 0;
        for (state, frames) in &self.life_cycle {
            end += frames;
            if self.age <= end {
                return Some(*state);
            }
        }
        None
    }

    /// Advance by a rounded number of frames. Returns false once the particle died.
    pub fn advance(&mut self, age_step: f64) -> bool {
        self.age += age_step.max(0.0).round() as usize;
        !self.is_dead()
    }
}

// -------------------------------------------------------------------------------------------------

/// Senses one particle state and produces a particle while the sensed count is below its
/// threshold.
#[derive(Debug, Clone, PartialEq)]
struct Sensor {
    sense: char,
    life_cycle: Vec<(char, usize)>,
    threshold: usize,
}

impl Sensor {
    fn process(&self, composition: &BTreeMap<char, usize>) -> Option<Particle> {
        let level = composition.get(&self.sense).copied().unwrap_or(0);
        if level < self.threshold {
            Particle::new(self.life_cycle.clone()).ok()
        } else {
            None
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Available feedback environment models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackModel {
    /// One particle state; sensors keep the population near the threshold.
    Thermostat,
    /// Particles pass an active and a passive state; sensors only see active particles,
    /// which causes wider swings around the threshold.
    ClimateControl,
}

impl TryFrom<&str> for FeedbackModel {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t" | "thermostat" => Ok(Self::Thermostat),
            "cc" | "climatecontrol" => Ok(Self::ClimateControl),
            _ => Err(format!(
                "invalid feedback model '{}': expecting one of thermostat, climateControl",
                s
            )),
        }
    }
}

impl Display for FeedbackModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thermostat => write!(f, "thermostat"),
            Self::ClimateControl => write!(f, "climateControl"),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A population of particles regulated by a bank of sensors.
///
/// # Examples:
///
/// ```rust
/// use athenacl::feedback::{Environment, FeedbackModel};
/// let mut environment = Environment::new(FeedbackModel::Thermostat);
/// for _ in 0..100 {
///     environment.advance(1.0, 0.5);
/// }
/// assert!(environment.value() > 0.2 && environment.value() < 0.8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    model: FeedbackModel,
    particles: Vec<Particle>,
    sensors: Vec<Sensor>,
}

impl Environment {
    pub fn new(model: FeedbackModel) -> Self {
        let (count, life_cycle) = match model {
            FeedbackModel::Thermostat => (10, vec![('a', 24)]),
            FeedbackModel::ClimateControl => (10, vec![('a', 12), ('b', 12)]),
        };
        let sensors = (0..count)
            .map(|_| Sensor {
                sense: 'a',
                life_cycle: life_cycle.clone(),
                threshold: CAPACITY as usize,
            })
            .collect();
        let mut environment = Self {
            model,
            particles: Vec::new(),
            sensors,
        };
        environment.fill();
        environment
    }

    pub fn model(&self) -> FeedbackModel {
        self.model
    }

    /// Restart with one particle per sensor.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.fill();
    }

    fn fill(&mut self) {
        for sensor in &self.sensors {
            if let Ok(particle) = Particle::new(sensor.life_cycle.clone()) {
                self.particles.push(particle);
            }
        }
    }

    /// Number of living particles per state.
    pub fn composition(&self) -> BTreeMap<char, usize> {
        let mut composition = BTreeMap::new();
        for state in self.particles.iter().filter_map(Particle::state) {
            *composition.entry(state).or_insert(0) += 1;
        }
        composition
    }

    /// Age all particles by `age_step` frames, remove dead ones, then let all sensors
    /// react to the new composition. `threshold` is the target level in the unit
    /// interval.
    pub fn advance(&mut self, age_step: f64, threshold: f64) {
        let threshold = (threshold.clamp(0.0, 1.0) * CAPACITY).round() as usize;
        for sensor in &mut self.sensors {
            sensor.threshold = threshold;
        }
        self.particles.retain_mut(|p| p.advance(age_step));
        let composition = self.composition();
        let produced = self
            .sensors
            .iter()
            .filter_map(|s| s.process(&composition))
            .collect::<Vec<_>>();
        self.particles.extend(produced);
    }

    /// Current population level in the unit interval. Passive particles count half.
    pub fn value(&self) -> f64 {
        let composition = self.composition();
        let active = composition.get(&'a').copied().unwrap_or(0) as f64;
        let passive = composition.get(&'b').copied().unwrap_or(0) as f64;
        ((active + passive * 0.5) / CAPACITY).clamp(0.0, 1.0)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn particle() -> Result<(), String> {
        let mut particle = Particle::new(vec![('a', 2), ('b', 1)])?;
        assert_eq!(particle.state(), Some('a'));
        assert!(particle.advance(1.0));
        assert!(particle.advance(1.4));
        assert_eq!(particle.state(), Some('a'));
        assert!(particle.advance(0.6));
        assert_eq!(particle.state(), Some('b'));
        assert!(!particle.advance(1.0));
        assert_eq!(particle.state(), None);
        assert!(Particle::new(vec![('a', 0)]).is_err());
        Ok(())
    }

    #[test]
    fn hunting() {
        for model in [FeedbackModel::Thermostat, FeedbackModel::ClimateControl] {
            let mut environment = Environment::new(model);
            let mut values = Vec::new();
            for _ in 0..200 {
                environment.advance(1.0, 0.6);
                values.push(environment.value());
            }
            let tail = &values[100..];
            let average = tail.iter().sum::<f64>() / tail.len() as f64;
            assert!(average > 0.5 && average < 0.95, "{} average {}", model, average);
            assert!(tail.iter().all(|v| (0.0..=1.0).contains(v)));
        }
        assert_eq!(
            FeedbackModel::try_from("CC"),
            Ok(FeedbackModel::ClimateControl)
        );
        assert!(FeedbackModel::try_from("x").is_err());
    }
}
