//! Rhythm generators: parameter objects producing realized `(dur, sus, acc)` pulses while
//! keeping the symbolic pulse they were created from.

use std::collections::{HashMap, VecDeque};

use crate::{
    event::Event,
    genetic::{Genome, GENERATIONS},
    markov::{weighted_order, Transition},
    parameter::{
        iterate::HoldBuffer,
        markov::{push_history, transition},
        options::Articulation,
        sieve::sieve,
        ArgType, Arguments, Entry, GeneratorObject, Parameter, ReferenceState, RhythmGenerator,
        RhythmObject, FAIL_LIMIT, MARKOV_LIMIT,
    },
    pulse::{Pulse, RealizedPulse, Rhythm},
    seed::RandomStream,
    selector::{SelectionMode, Selector},
    sieve::SegmentFormat,
};

// -------------------------------------------------------------------------------------------------

/// Sustain scalar of looped and bred pulses: slightly detached.
const LOOP_SUSTAIN: f64 = 0.94;
/// Sustain scalar of seconds based durations.
const SECONDS_SUSTAIN: f64 = 0.999;
/// Amplitude scalar applied to events accented by `binaryAccent`.
const ACCENT_SCALAR: f64 = 1.08;

pub(crate) static RHYTHMS: &[Entry<Box<dyn RhythmGenerator>>] = &[
    Entry {
        short: "l",
        long: "loop",
        args: &[("pulseList", ArgType::List), ("selection", ArgType::Text)],
        defaults: "((3, 1, 1), (3, 1, 1), (8, 1, 1), (8, 1, 1), (8, 3, 1), (3, 2, 0)), oc",
        build: Loop::build,
    },
    Entry {
        short: "ba",
        long: "binaryAccent",
        args: &[("pulseList", ArgType::List)],
        defaults: "((3, 1, 1), (3, 2, 1))",
        build: BinaryAccent::build,
    },
    Entry {
        short: "cs",
        long: "convertSecond",
        args: &[("duration", ArgType::Object)],
        defaults: "(ru, .25, 2.5)",
        build: ConvertSecond::build,
    },
    Entry {
        short: "cst",
        long: "convertSecondTriple",
        args: &[
            ("duration", ArgType::Object),
            ("sustain", ArgType::Object),
            ("accent", ArgType::Object),
        ],
        defaults: "(ws, e, 30, 0, .25, 2.5), (ws, e, 60, .25, .25, 2.5), (bg, rc, (0, 1, 1, 1))",
        build: ConvertSecondTriple::build,
    },
    Entry {
        short: "pt",
        long: "pulseTriple",
        args: &[
            ("divisor", ArgType::Object),
            ("multiplier", ArgType::Object),
            ("accent", ArgType::Object),
            ("sustain", ArgType::Object),
        ],
        defaults: "(bg, rc, (6, 5, 4, 3)), (bg, rc, (1, 2, 3)), (bg, rc, (1, 1, 1, 0)), \
            (ru, .5, 1.5)",
        build: PulseTriple::build,
    },
    Entry {
        short: "ps",
        long: "pulseSieve",
        args: &[
            ("logicalString", ArgType::Text),
            ("sieveLength", ArgType::Number),
            ("pulse", ArgType::Any),
            ("selection", ArgType::Text),
            ("articulation", ArgType::Text),
        ],
        defaults: "3|4|5@2, 60, (3, 1, 1), oc, a",
        build: PulseSieve::build,
    },
    Entry {
        short: "rs",
        long: "rhythmSieve",
        args: &[
            ("logicalString", ArgType::Text),
            ("sieveLength", ArgType::Number),
            ("selection", ArgType::Text),
            ("rhythm", ArgType::Object),
        ],
        defaults: "3|4|5, 60, rw, (l, ((3, 1, 1), (3, 1, 1), (3, 5, 1)))",
        build: RhythmSieve::build,
    },
    Entry {
        short: "mp",
        long: "markovPulse",
        args: &[
            ("transitionString", ArgType::Text),
            ("order", ArgType::Object),
        ],
        defaults: "a{3,1,1}b{2,1,1}c{3,2,0}:{a=3|b=4|c=1}, (c, 0)",
        build: MarkovPulse::build,
    },
    Entry {
        short: "mra",
        long: "markovRhythmAnalysis",
        args: &[
            ("source", ArgType::Object),
            ("pulseCount", ArgType::Number),
            ("maxAnalysisOrder", ArgType::Number),
            ("order", ArgType::Object),
        ],
        defaults: "(l, ((4, 3, 1), (4, 3, 1), (4, 2, 0), (8, 1, 1), (4, 2, 1), (4, 2, 1)), oc), 12, 2, \
            (cg, u, 0, 2, .25)",
        build: MarkovRhythmAnalysis::build,
    },
    Entry {
        short: "irg",
        long: "iterateRhythmGroup",
        args: &[("source", ArgType::Object), ("control", ArgType::Object)],
        defaults: "(l, ((4, 3, 1), (4, 3, 1), (4, 2, 0), (8, 1, 1), (4, 2, 1), (4, 2, 1)), oc), \
            (bg, rc, (-3, 1, -1, 5))",
        build: IterateRhythmGroup::build,
    },
    Entry {
        short: "irw",
        long: "iterateRhythmWindow",
        args: &[
            ("sources", ArgType::List),
            ("control", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "((l, ((4, 3, 1), (4, 3, 1), (4, 2, 0), (8, 1, 1), (4, 2, 1), (4, 2, 1)), oc), \
            (cs, (ru, 1.5, 4))), (bg, rc, (-3, 6, -1, 15)), oc",
        build: IterateRhythmWindow::build,
    },
    Entry {
        short: "irh",
        long: "iterateRhythmHold",
        args: &[
            ("source", ArgType::Object),
            ("size", ArgType::Object),
            ("refresh", ArgType::Object),
            ("selection", ArgType::Text),
        ],
        defaults: "(pt, (bg, rc, (4, 2)), (bg, oc, (5, 4, 3, 2, 1)), (c, 1), (ru, .75, 1.25)), \
            (bg, rc, (2, 3, 4)), (bg, oc, (4, 5, 6)), oc",
        build: IterateRhythmHold::build,
    },
    Entry {
        short: "gr",
        long: "gaRhythm",
        args: &[
            ("pulseList", ArgType::List),
            ("crossover", ArgType::Number),
            ("mutation", ArgType::Number),
            ("elitism", ArgType::Number),
            ("selection", ArgType::Text),
            ("populationSize", ArgType::Number),
        ],
        defaults: "((3, 1, 1), (3, 1, 1), (6, 1, 1), (6, 3, 1), (3, 1, 0)), .7, .06, .01, oc, 20",
        build: GaRhythm::build,
    },
];

/// A realized value together with the pulse it was made of, if any. Buffered values are
/// realized again with the current tempo when a pulse is known.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Realized {
    value: RealizedPulse,
    pulse: Option<Pulse>,
}

impl Realized {
    fn from_object(object: &mut RhythmObject, t: f64, refs: &ReferenceState) -> Result<Self, String> {
        let value = object.run(t, refs)?;
        Ok(Self {
            value,
            pulse: object.current_pulse(),
        })
    }

    fn realize(&self, bpm: f64) -> RealizedPulse {
        match self.pulse {
            Some(pulse) => pulse.realize(bpm),
            None => self.value,
        }
    }
}

fn pulse_preview<'a>(pulses: impl Iterator<Item = &'a Pulse>) -> String {
    pulses.map(|p| p.to_string()).collect::<Vec<_>>().join(",")
}

// -------------------------------------------------------------------------------------------------

/// Selects pulses from a list.
#[derive(Debug)]
struct Loop {
    selector: Selector<Pulse>,
    rand: RandomStream,
    current: Option<Pulse>,
}

impl Loop {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let mut rhythm = args.rhythm_list(0)?;
        if rhythm.is_empty() {
            return Err("list error: there must be rhythms in this list.".to_string());
        }
        rhythm.set_sustain(LOOP_SUSTAIN);
        let mode = args.selection(1)?;
        Ok(Box::new(Self {
            selector: Selector::new(rhythm.into_iter().collect(), mode),
            rand: args.random(),
            current: None,
        }))
    }
}

impl Parameter for Loop {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
        self.current = None;
    }
}

impl RhythmGenerator for Loop {
    fn run(&mut self, _t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let pulse = self.selector.select(&mut self.rand)?;
        self.current = Some(pulse);
        Ok(pulse.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Plays the second of two pulses when the current pitch is the first pitch of the
/// current multiset, and accents such events.
#[derive(Debug)]
struct BinaryAccent {
    plain: Pulse,
    accented: Pulse,
    current: Option<Pulse>,
}

impl BinaryAccent {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let rhythm = args
            .rhythm_list(0)
            .map_err(|_| "enter a list of two pulse objects.".to_string())?;
        match rhythm.pulses() {
            [plain, accented] => Ok(Box::new(Self {
                plain: plain.with_sustain(1.4),
                accented: accented.with_sustain(1.6),
                current: None,
            })),
            _ => Err("enter a list of two pulse objects.".to_string()),
        }
    }

    fn is_accented(refs: &ReferenceState) -> bool {
        let first = refs
            .multiset
            .as_ref()
            .and_then(|multiset| multiset.ps().first().copied());
        match (refs.pitch_raw, first) {
            (Some(pitch), Some(first)) => (pitch - first).abs() < 1.0e-9,
            _ => false,
        }
    }
}

impl Parameter for BinaryAccent {
    fn reset(&mut self) {
        self.current = None;
    }
}

impl RhythmGenerator for BinaryAccent {
    fn run(&mut self, _t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let pulse = if Self::is_accented(refs) {
            self.accented
        } else {
            self.plain
        };
        self.current = Some(pulse);
        Ok(pulse.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }

    fn post_event(&self, event: &mut Event, refs: &ReferenceState) {
        if Self::is_accented(refs) {
            event.amp *= ACCENT_SCALAR;
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Durations in seconds, independent of the tempo.
#[derive(Debug)]
struct ConvertSecond {
    duration: GeneratorObject,
}

impl ConvertSecond {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        Ok(Box::new(Self {
            duration: args.generator(0)?,
        }))
    }
}

impl Parameter for ConvertSecond {
    fn reset(&mut self) {
        self.duration.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.duration.check()
    }
}

impl RhythmGenerator for ConvertSecond {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let dur = self.duration.number(t, refs)?;
        Ok(RealizedPulse {
            dur,
            sus: dur * SECONDS_SUSTAIN,
            acc: 1.0,
        })
    }

    fn current_pulse(&self) -> Option<Pulse> {
        None
    }
}

/// Duration, sustain and accent from three generators.
#[derive(Debug)]
struct ConvertSecondTriple {
    duration: GeneratorObject,
    sustain: GeneratorObject,
    accent: GeneratorObject,
}

impl ConvertSecondTriple {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        Ok(Box::new(Self {
            duration: args.generator(0)?,
            sustain: args.generator(1)?,
            accent: args.generator(2)?,
        }))
    }
}

impl Parameter for ConvertSecondTriple {
    fn reset(&mut self) {
        self.duration.reset();
        self.sustain.reset();
        self.accent.reset();
    }

    fn check(&self) -> Result<(), String> {
        self.duration.check()?;
        self.sustain.check()?;
        self.accent.check()
    }
}

impl RhythmGenerator for ConvertSecondTriple {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        Ok(RealizedPulse {
            dur: self.duration.number(t, refs)?.abs(),
            sus: self.sustain.number(t, refs)?.abs(),
            acc: self.accent.number(t, refs)?.abs().min(1.0),
        })
    }

    fn current_pulse(&self) -> Option<Pulse> {
        None
    }
}

// -------------------------------------------------------------------------------------------------

/// Builds each pulse from divisor, multiplier, accent and sustain generators.
#[derive(Debug)]
struct PulseTriple {
    divisor: GeneratorObject,
    multiplier: GeneratorObject,
    accent: GeneratorObject,
    sustain: GeneratorObject,
    current: Option<Pulse>,
}

impl PulseTriple {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        Ok(Box::new(Self {
            divisor: args.generator(0)?,
            multiplier: args.generator(1)?,
            accent: args.generator(2)?,
            sustain: args.generator(3)?,
            current: None,
        }))
    }
}

impl Parameter for PulseTriple {
    fn reset(&mut self) {
        self.divisor.reset();
        self.multiplier.reset();
        self.accent.reset();
        self.sustain.reset();
        self.current = None;
    }

    fn check(&self) -> Result<(), String> {
        self.divisor.check()?;
        self.multiplier.check()?;
        self.accent.check()?;
        self.sustain.check()
    }
}

impl RhythmGenerator for PulseTriple {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        // zero divisors, multipliers and sustains fall back to 1
        let integer = |value: f64| match value.round().abs() as i64 {
            0 => 1,
            value => value,
        };
        let divisor = integer(self.divisor.number(t, refs)?);
        let multiplier = integer(self.multiplier.number(t, refs)?);
        let accent = self.accent.number(t, refs)?.abs().min(1.0);
        let sustain = match self.sustain.number(t, refs)?.abs() {
            value if value == 0.0 => 1.0,
            value => value,
        };
        let pulse = Pulse::new(divisor, multiplier, accent)?.with_sustain(sustain);
        self.current = Some(pulse);
        Ok(pulse.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Reads a sieve as rhythm. Attack articulation plays a pulse at each sieve point and
/// rests in between; sustain articulation stretches the pulse across the gaps.
#[derive(Debug)]
struct PulseSieve {
    pulse: Pulse,
    articulation: Articulation,
    selector: Selector<f64>,
    rand: RandomStream,
    current: Option<Pulse>,
}

impl PulseSieve {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let sieve = sieve(args, 0)?;
        let length = args.integer(1)?.abs();
        let pulse = args.pulse(2)?.with_sustain(LOOP_SUSTAIN);
        let mode = args.selection(3)?;
        let articulation = args.option::<Articulation>(4)?;
        let format = match articulation {
            Articulation::Attack => SegmentFormat::Binary,
            Articulation::Sustain => SegmentFormat::Width,
        };
        let segment = sieve.segment(0, 0..length, format);
        if segment.is_empty() {
            return Err("sieve segment is empty; choose a longer length.".to_string());
        }
        Ok(Box::new(Self {
            pulse,
            articulation,
            selector: Selector::new(segment, mode),
            rand: args.random(),
            current: None,
        }))
    }
}

impl Parameter for PulseSieve {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
        self.current = None;
    }

    fn preview(&self) -> Option<String> {
        let values = self.selector.items().iter().map(|v| v.to_string());
        Some(values.collect::<Vec<_>>().join(","))
    }
}

impl RhythmGenerator for PulseSieve {
    fn run(&mut self, _t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let value = self.selector.select(&mut self.rand)?;
        let pulse = match self.articulation {
            Articulation::Attack => {
                let accent = if value != 0.0 { 1.0 } else { 0.0 };
                self.pulse.with_accent(accent)
            }
            Articulation::Sustain => {
                let mut pulse = self.pulse.with_accent(1.0);
                pulse.scale(value.round().abs() as u64)?;
                pulse
            }
        };
        self.current = Some(pulse);
        Ok(pulse.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Turns the pulses of another rhythm into notes or rests following a binary sieve.
#[derive(Debug)]
struct RhythmSieve {
    source: RhythmObject,
    selector: Selector<f64>,
    rand: RandomStream,
    current: Option<Pulse>,
}

impl RhythmSieve {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let sieve = sieve(args, 0)?;
        let length = args.integer(1)?.abs();
        if length < 1 {
            return Err("argument error: length must be 1 or greater.".to_string());
        }
        let segment = sieve.segment(0, 0..length, SegmentFormat::Binary);
        if segment.is_empty() {
            return Err("sieve segment is empty; choose a longer length.".to_string());
        }
        let mode = args.selection(2)?;
        Ok(Box::new(Self {
            source: args.rhythm(3)?,
            selector: Selector::new(segment, mode),
            rand: args.random(),
            current: None,
        }))
    }
}

impl Parameter for RhythmSieve {
    fn reset(&mut self) {
        self.source.reset();
        self.selector.reset();
        self.rand.reset();
        self.current = None;
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()
    }

    fn preview(&self) -> Option<String> {
        let values = self.selector.items().iter().map(|v| v.to_string());
        Some(values.collect::<Vec<_>>().join(","))
    }
}

impl RhythmGenerator for RhythmSieve {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let source = Realized::from_object(&mut self.source, t, refs)?;
        let accent = if self.selector.select(&mut self.rand)? != 0.0 {
            1.0
        } else {
            0.0
        };
        self.current = source.pulse.map(|pulse| pulse.with_accent(accent));
        Ok(match self.current {
            Some(pulse) => pulse.realize(refs.bpm),
            None => RealizedPulse {
                acc: accent,
                ..source.value
            },
        })
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Pulses chosen by a Markov chain over a transition string of pulse values.
#[derive(Debug)]
struct MarkovPulse {
    transition: Transition,
    pulses: HashMap<String, Pulse>,
    order: GeneratorObject,
    history: Vec<String>,
    rand: RandomStream,
    current: Option<Pulse>,
}

impl MarkovPulse {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let transition = transition(args, 0)?;
        let pulses = transition
            .values()
            .into_iter()
            .map(|value| {
                Pulse::try_from(value)
                    .map(|pulse| (value.to_string(), pulse))
                    .map_err(|err| format!("failed pulse object definition: {}", err))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(Box::new(Self {
            transition,
            pulses,
            order: args.generator(1)?,
            history: Vec::new(),
            rand: args.random(),
            current: None,
        }))
    }
}

impl Parameter for MarkovPulse {
    fn reset(&mut self) {
        self.order.reset();
        self.history.clear();
        self.rand.reset();
        self.current = None;
    }

    fn check(&self) -> Result<(), String> {
        self.order.check()
    }
}

impl RhythmGenerator for MarkovPulse {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let unit = self.rand.unit();
        let order = weighted_order(self.order.number(t, refs)?, &mut self.rand);
        let value = self.transition.next(unit, &self.history, order)?;
        let pulse = *self
            .pulses
            .get(&value)
            .ok_or_else(|| format!("markovPulse: no pulse for value '{}'", value))?;
        push_history(&mut self.history, value);
        self.current = Some(pulse);
        Ok(pulse.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// A Markov chain learned from the pulses of another rhythm.
#[derive(Debug)]
struct MarkovRhythmAnalysis {
    source: RhythmObject,
    count: usize,
    max_order: usize,
    order: GeneratorObject,
    transition: Transition,
    pulses: HashMap<String, Pulse>,
    history: Vec<String>,
    rand: RandomStream,
    current: Option<Pulse>,
}

impl MarkovRhythmAnalysis {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let mut source = args.rhythm(0)?;
        let count = args.integer(1)?;
        if count <= 0 {
            return Err("pulseCount error: must be greater than zero.".to_string());
        }
        let max_order = args.integer(2)?;
        if max_order <= 0 {
            return Err("maxAnalysisOrder error: must be greater than zero.".to_string());
        }
        if max_order as usize > MARKOV_LIMIT {
            return Err(format!(
                "maxAnalysisOrder error: analysis order cannot exceed {}.",
                MARKOV_LIMIT
            ));
        }
        let (transition, pulses) = Self::analyze(&mut source, count as usize, max_order as usize)?;
        Ok(Box::new(Self {
            source,
            count: count as usize,
            max_order: max_order as usize,
            order: args.generator(3)?,
            transition,
            pulses,
            history: Vec::new(),
            rand: args.random(),
            current: None,
        }))
    }

    fn analyze(
        source: &mut RhythmObject,
        count: usize,
        max_order: usize,
    ) -> Result<(Transition, HashMap<String, Pulse>), String> {
        // the tempo does not matter for the symbolic pulses
        let refs = ReferenceState::with_bpm(60.0);
        let mut series = Vec::with_capacity(count);
        let mut pulses = HashMap::new();
        for step in 0..count {
            source.run(step as f64, &refs)?;
            let pulse = source.current_pulse().ok_or_else(|| {
                format!("markovRhythmAnalysis: {} does not produce pulses", source.name())
            })?;
            let key = pulse.to_string();
            pulses.insert(key.clone(), pulse);
            series.push(key);
        }
        Ok((Transition::from_analysis(&series, max_order)?, pulses))
    }
}

impl Parameter for MarkovRhythmAnalysis {
    fn reset(&mut self) {
        self.source.reset();
        self.order.reset();
        self.history.clear();
        self.rand.reset();
        self.current = None;
        // a reset source yields the same series again
        match Self::analyze(&mut self.source, self.count, self.max_order) {
            Ok((transition, pulses)) => {
                self.transition = transition;
                self.pulses = pulses;
            }
            Err(err) => log::warn!("markovRhythmAnalysis: analysis failed on reset: {}", err),
        }
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.order.check()
    }

    fn preview(&self) -> Option<String> {
        Some(self.transition.to_string())
    }
}

impl RhythmGenerator for MarkovRhythmAnalysis {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let unit = self.rand.unit();
        let order = weighted_order(self.order.number(t, refs)?, &mut self.rand);
        let value = self.transition.next(unit, &self.history, order)?;
        let pulse = *self
            .pulses
            .get(&value)
            .ok_or_else(|| format!("markovRhythmAnalysis: no pulse for value '{}'", value))?;
        push_history(&mut self.history, value);
        self.current = Some(pulse);
        Ok(pulse.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Repeats or skips the pulses of another rhythm: positive control values repeat,
/// negative values skip.
#[derive(Debug)]
struct IterateRhythmGroup {
    source: RhythmObject,
    control: GeneratorObject,
    buffer: VecDeque<Realized>,
    current: Option<Pulse>,
}

impl IterateRhythmGroup {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        Ok(Box::new(Self {
            source: args.rhythm(0)?,
            control: args.generator(1)?,
            buffer: VecDeque::new(),
            current: None,
        }))
    }
}

impl Parameter for IterateRhythmGroup {
    fn reset(&mut self) {
        self.source.reset();
        self.control.reset();
        self.buffer.clear();
        self.current = None;
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.control.check()
    }
}

impl RhythmGenerator for IterateRhythmGroup {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let mut attempts = 0;
        while self.buffer.is_empty() {
            let count = self.control.number(t, refs)?.round() as i64;
            if count < 0 {
                for _ in 0..count.unsigned_abs() {
                    self.source.run(t, refs)?;
                }
            } else if count > 0 {
                let value = Realized::from_object(&mut self.source, t, refs)?;
                self.buffer.extend(std::iter::repeat(value).take(count as usize));
            }
            attempts += 1;
            if attempts > FAIL_LIMIT && self.buffer.is_empty() {
                log::warn!("iterateRhythmGroup: no values obtained; supplying value");
                self.buffer
                    .push_back(Realized::from_object(&mut self.source, t, refs)?);
            }
        }
        let value = self
            .buffer
            .pop_front()
            .ok_or_else(|| "iterateRhythmGroup: empty value buffer".to_string())?;
        self.current = value.pulse;
        Ok(value.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Takes windows of pulses from one of several rhythms: positive counts take pulses,
/// negative counts skip pulses of the selected rhythm.
#[derive(Debug)]
struct IterateRhythmWindow {
    sources: Vec<RhythmObject>,
    control: GeneratorObject,
    selector: Selector<usize>,
    rand: RandomStream,
    buffer: VecDeque<Realized>,
    current: Option<Pulse>,
}

impl IterateRhythmWindow {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let sources = args.rhythms(0)?;
        let control = args.generator(1)?;
        let mode = args.selection(2)?;
        Ok(Box::new(Self {
            selector: Selector::new((0..sources.len()).collect(), mode),
            sources,
            control,
            rand: args.random(),
            buffer: VecDeque::new(),
            current: None,
        }))
    }
}

impl Parameter for IterateRhythmWindow {
    fn reset(&mut self) {
        self.sources.iter_mut().for_each(RhythmObject::reset);
        self.control.reset();
        self.selector.reset();
        self.rand.reset();
        self.buffer.clear();
        self.current = None;
    }

    fn check(&self) -> Result<(), String> {
        self.control.check()?;
        self.sources.iter().try_for_each(RhythmObject::check)
    }
}

impl RhythmGenerator for IterateRhythmWindow {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let mut attempts = 0;
        while self.buffer.is_empty() {
            let index = self.selector.select(&mut self.rand)?;
            let count = self.control.number(t, refs)?.round() as i64;
            let source = &mut self.sources[index];
            if count < 0 {
                for _ in 0..count.unsigned_abs() {
                    source.run(t, refs)?;
                }
            } else {
                for _ in 0..count {
                    self.buffer.push_back(Realized::from_object(source, t, refs)?);
                }
            }
            attempts += 1;
            if attempts > FAIL_LIMIT && self.buffer.is_empty() {
                log::warn!("iterateRhythmWindow: no values obtained; supplying value");
                self.buffer.push_back(Realized::from_object(source, t, refs)?);
            }
        }
        let value = self
            .buffer
            .pop_front()
            .ok_or_else(|| "iterateRhythmWindow: empty value buffer".to_string())?;
        self.current = value.pulse;
        Ok(value.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Holds a number of pulses of another rhythm and selects from them until refreshed.
#[derive(Debug)]
struct IterateRhythmHold {
    source: RhythmObject,
    size: GeneratorObject,
    refresh: GeneratorObject,
    mode: SelectionMode,
    buffer: HoldBuffer<Realized>,
    selector: Selector<Realized>,
    rand: RandomStream,
    current: Option<Pulse>,
}

impl IterateRhythmHold {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let mode = args.selection(3)?;
        Ok(Box::new(Self {
            source: args.rhythm(0)?,
            size: args.generator(1)?,
            refresh: args.generator(2)?,
            mode,
            buffer: HoldBuffer::default(),
            selector: Selector::new(Vec::new(), mode),
            rand: args.random(),
            current: None,
        }))
    }
}

impl Parameter for IterateRhythmHold {
    fn reset(&mut self) {
        self.source.reset();
        self.size.reset();
        self.refresh.reset();
        self.buffer.reset();
        self.selector = Selector::new(Vec::new(), self.mode);
        self.rand.reset();
        self.current = None;
    }

    fn check(&self) -> Result<(), String> {
        self.source.check()?;
        self.size.check()?;
        self.refresh.check()
    }
}

impl RhythmGenerator for IterateRhythmHold {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let source = &mut self.source;
        let buffer = &mut self.buffer;
        if buffer.advance(&mut self.size, &mut self.refresh, t, refs, |step| {
            Realized::from_object(source, step as f64, refs)
        })? {
            self.selector = Selector::new(buffer.values.clone(), self.mode);
        }
        let value = self.selector.select(&mut self.rand)?;
        self.current = value.pulse;
        Ok(value.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

/// Breeds rhythmic variants of a pulse list with a genetic algorithm and selects from the
/// pulses of all variants. Breeding happens once, at construction.
#[derive(Debug)]
struct GaRhythm {
    variants: Vec<Rhythm>,
    selector: Selector<Pulse>,
    rand: RandomStream,
    current: Option<Pulse>,
}

impl GaRhythm {
    fn build(args: &mut Arguments) -> Result<Box<dyn RhythmGenerator>, String> {
        let target = args.rhythm_list(0)?;
        let crossover = args.number(1)?;
        let mutation = args.number(2)?;
        let elitism = args.number(3)?;
        let mode = args.selection(4)?;
        let population = args.integer(5)?;
        if population < 2 {
            return Err("population size must be 2 or greater".to_string());
        }
        let mut breeding = args.random();
        let mut genome = Genome::new(
            &target,
            population as usize,
            crossover,
            mutation,
            elitism,
            &mut breeding,
        )?;
        let mut variants = genome.generate(GENERATIONS, &mut breeding)?;
        if variants.is_empty() {
            return Err("genome failed to be populated.".to_string());
        }
        variants
            .iter_mut()
            .for_each(|rhythm| rhythm.set_sustain(LOOP_SUSTAIN));
        let pulses = variants
            .iter()
            .flat_map(|rhythm| rhythm.iter().copied())
            .collect();
        Ok(Box::new(Self {
            variants,
            selector: Selector::new(pulses, mode),
            rand: args.random(),
            current: None,
        }))
    }
}

impl Parameter for GaRhythm {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
        self.current = None;
    }

    fn preview(&self) -> Option<String> {
        let lines = self
            .variants
            .iter()
            .map(|rhythm| format!("({})", pulse_preview(rhythm.iter())));
        Some(lines.collect::<Vec<_>>().join("\n"))
    }
}

impl RhythmGenerator for GaRhythm {
    fn run(&mut self, _t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        let pulse = self.selector.select(&mut self.rand)?;
        self.current = Some(pulse);
        Ok(pulse.realize(refs.bpm))
    }

    fn current_pulse(&self) -> Option<Pulse> {
        self.current
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        multiset::Multiset,
        parameter::{Argument, ReprFormat},
        seed::SeedSource,
    };

    fn rhythm(text: &str) -> Result<RhythmObject, String> {
        RhythmObject::build(&Argument::parse(text)?, &mut SeedSource::new(17))
    }

    fn run(text: &str, count: usize) -> Result<Vec<(RealizedPulse, Option<Pulse>)>, String> {
        let mut rhythm = rhythm(text)?;
        let refs = ReferenceState::with_bpm(120.0);
        (0..count)
            .map(|t| {
                let value = rhythm.run(t as f64, &refs)?;
                Ok((value, rhythm.current_pulse()))
            })
            .collect()
    }

    fn accents(text: &str, count: usize) -> Result<Vec<f64>, String> {
        Ok(run(text, count)?.into_iter().map(|(v, _)| v.acc).collect())
    }

    fn divisors(text: &str, count: usize) -> Result<Vec<u64>, String> {
        run(text, count)?
            .into_iter()
            .map(|(_, pulse)| pulse.map(|p| p.divisor()).ok_or("missing pulse".to_string()))
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1.0e-9
    }

    #[test]
    fn looped() -> Result<(), String> {
        let values = run("l, ((4, 1, 1), (4, 3, 0)), oc", 3)?;
        assert!(close(values[0].0.dur, 0.125));
        assert!(close(values[0].0.sus, 0.125 * LOOP_SUSTAIN));
        assert!(close(values[1].0.dur, 0.375));
        assert_eq!(values[1].0.acc, 0.0);
        assert_eq!(values[1].1, Some(Pulse::new(4, 3, 0.0)?.with_sustain(LOOP_SUSTAIN)));
        assert!(close(values[2].0.dur, 0.125));

        assert!(rhythm("l, ()").is_err());
        assert_eq!(
            rhythm("l, (q, e), rp")?.to_string(),
            "loop, ((1, 1, 1), (2, 1, 1)), randomPermutate"
        );
        Ok(())
    }

    #[test]
    fn binary_accent() -> Result<(), String> {
        let mut accent = rhythm("ba")?;
        let mut refs = ReferenceState::with_bpm(60.0);
        refs.multiset = Some(Multiset::from_ps(&[2.0, 4.0, 7.0])?);
        refs.pitch_raw = Some(4.0);
        let plain = accent.run(0.0, &refs)?;
        assert!(close(plain.dur, 1.0 / 3.0));
        assert!(close(plain.sus, 1.4 / 3.0));
        let mut event = Event {
            amp: 0.5,
            ..Event::default()
        };
        accent.post_event(&mut event, &refs);
        assert_eq!(event.amp, 0.5);

        refs.pitch_raw = Some(2.0);
        let accented = accent.run(1.0, &refs)?;
        assert!(close(accented.dur, 2.0 / 3.0));
        assert!(close(accented.sus, 1.6 * 2.0 / 3.0));
        accent.post_event(&mut event, &refs);
        assert!(close(event.amp, 0.54));

        assert!(rhythm("ba, ((3, 1, 1))").is_err());
        Ok(())
    }

    #[test]
    fn seconds() -> Result<(), String> {
        let values = run("cs, (c, 2)", 1)?;
        assert_eq!(values[0].0.dur, 2.0);
        assert!(close(values[0].0.sus, 1.998));
        assert_eq!(values[0].0.acc, 1.0);
        assert_eq!(values[0].1, None);

        let values = run("cst, 1, -.5, 3", 1)?;
        assert_eq!(values[0].0, RealizedPulse { dur: 1.0, sus: 0.5, acc: 1.0 });
        assert_eq!(values[0].1, None);
        Ok(())
    }

    #[test]
    fn pulse_triple() -> Result<(), String> {
        let values = run("pt, (c, 4), (c, 0), (c, 1), (c, 0)", 1)?;
        assert_eq!(values[0].1, Some(Pulse::new(4, 1, 1.0)?));
        assert!(close(values[0].0.dur, 0.125));
        assert!(close(values[0].0.sus, 0.125));

        let values = run("pt, (c, -2), (c, 3.2), (c, 2), (c, .5)", 1)?;
        assert_eq!(values[0].1, Some(Pulse::new(2, 3, 1.0)?.with_sustain(0.5)));
        assert!(close(values[0].0.dur, 0.75));
        assert!(close(values[0].0.sus, 0.375));

        let values = run("pt", 50)?;
        assert!(values.iter().all(|(_, pulse)| pulse.is_some()));
        Ok(())
    }

    #[test]
    fn pulse_sieve() -> Result<(), String> {
        assert_eq!(
            accents("ps, 3, 6, (4, 1, 1), oc, a", 6)?,
            vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
        );
        let values = run("ps, 3, 12, (4, 1, 1), oc, s", 3)?;
        for (value, pulse) in values {
            assert_eq!(pulse.map(|p| p.multiplier()), Some(3));
            assert!(close(value.dur, 0.375));
            assert!(close(value.sus, 0.375 * LOOP_SUSTAIN));
        }
        assert!(rhythm("ps, 3, 0").is_err());
        let sieve = rhythm("ps, 3, 6, (4, 1, 1), oc, a")?;
        assert_eq!(
            sieve.repr(ReprFormat::Full).lines().last(),
            Some("1,0,0,1,0,0")
        );
        Ok(())
    }

    #[test]
    fn rhythm_sieve() -> Result<(), String> {
        assert_eq!(
            accents("rs, 2, 4, oc, (l, ((4, 1, 1)))", 4)?,
            vec![1.0, 0.0, 1.0, 0.0]
        );
        let values = run("rs, 2, 4, oc, (cs, (c, 3))", 2)?;
        assert_eq!(values[1].0.dur, 3.0);
        assert!(close(values[1].0.sus, 2.997));
        assert_eq!(values[1].0.acc, 0.0);
        assert_eq!(values[1].1, None);
        assert!(rhythm("rs, 3, 0").is_err());
        Ok(())
    }

    #[test]
    fn markov_pulse() -> Result<(), String> {
        let count = 1000;
        let values = run("mp", count)?;
        let frequency = |divisor: u64, multiplier: u64| {
            values
                .iter()
                .filter(|(_, pulse)| {
                    pulse.is_some_and(|p| p.divisor() == divisor && p.multiplier() == multiplier)
                })
                .count() as f64
                / count as f64
        };
        assert!((frequency(3, 1) - 3.0 / 8.0).abs() < 0.05);
        assert!((frequency(2, 1) - 4.0 / 8.0).abs() < 0.05);
        assert!((frequency(3, 2) - 1.0 / 8.0).abs() < 0.05);
        assert!(values
            .iter()
            .filter(|(_, pulse)| pulse.is_some_and(|p| p.multiplier() == 2))
            .all(|(value, _)| value.acc == 0.0));
        assert!(rhythm("mp, a{x}:{a=1}").is_err());
        Ok(())
    }

    #[test]
    fn markov_analysis() -> Result<(), String> {
        let values = divisors("mra, (l, ((4, 1, 1), (2, 1, 1)), oc), 6, 1, 1", 20)?;
        for pair in values[1..].windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert!(rhythm("mra, (cs, (c, 1)), 6, 1, 1").is_err());
        assert!(rhythm("mra, (l, ((4, 1, 1))), 6, 12, 1").is_err());
        Ok(())
    }

    #[test]
    fn iterate_rhythm_group() -> Result<(), String> {
        assert_eq!(
            divisors("irg, (l, ((4, 1, 1), (2, 1, 1), (1, 1, 1)), oc), (bg, oc, (2, -1))", 6)?,
            vec![4, 4, 1, 1, 2, 2]
        );
        Ok(())
    }

    #[test]
    fn iterate_rhythm_window() -> Result<(), String> {
        let values = run(
            "irw, ((l, ((4, 1, 1)), oc), (cs, (c, 3))), (bg, oc, (2, 1)), oc",
            6,
        )?;
        let durations = values.iter().map(|(v, _)| v.dur).collect::<Vec<_>>();
        assert_eq!(durations, vec![0.125, 0.125, 3.0, 0.125, 0.125, 3.0]);
        assert!(values[2].1.is_none());
        Ok(())
    }

    #[test]
    fn iterate_rhythm_hold() -> Result<(), String> {
        assert_eq!(
            divisors("irh, (l, ((4, 1, 1), (2, 1, 1), (1, 1, 1)), oc), 2, 0, oc", 4)?,
            vec![4, 2, 4, 2]
        );
        let mut hold = rhythm("irh")?;
        let refs = ReferenceState::default();
        let first = (0..20)
            .map(|t| hold.run(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        hold.reset();
        let second = (0..20)
            .map(|t| hold.run(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn ga_rhythm() -> Result<(), String> {
        let mut bred = rhythm("gr")?;
        let refs = ReferenceState::default();
        let first = (0..20)
            .map(|t| {
                bred.run(t as f64, &refs)?;
                bred.current_pulse().ok_or("missing pulse".to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;
        assert!(first.iter().all(|p| p.sustain() == LOOP_SUSTAIN));
        bred.reset();
        let second = (0..20)
            .map(|t| {
                bred.run(t as f64, &refs)?;
                bred.current_pulse().ok_or("missing pulse".to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(first, second);
        assert!(bred.repr(ReprFormat::Full).lines().count() > 1);

        assert!(rhythm("gr, ((4, 1, 1), (4, 1, 1))").is_err());
        assert!(rhythm("gr, ((4, 1, 1), (4, 1, 1), (2, 1, 0)), 1.5").is_err());
        assert!(rhythm("gr, ((4, 1, 1), (4, 1, 1), (2, 1, 0)), .7, .06, .01, oc, 1").is_err());
        Ok(())
    }
}
