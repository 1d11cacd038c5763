//! Parameter objects: composable, stateful value generators, rhythm generators, clone
//! filters and static options, built from textual argument trees.

use std::{collections::HashMap, fmt::Debug, fmt::Display};

use derive_more::{Display as DisplayDerive, From};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    event::Event,
    multiset::Multiset,
    pulse::{Pulse, RealizedPulse, Rhythm},
    seed::{RandomStream, SeedSource},
    selector::SelectionMode,
    unit,
};

// -------------------------------------------------------------------------------------------------

pub mod args;
pub mod options;

pub mod automata;
pub mod basic;
pub mod break_point;
pub mod chaos;
pub mod feedback;
pub mod file;
pub mod grammar;
pub mod iterate;
pub mod markov;
pub mod mask;
pub mod operator;
pub mod random;
pub mod sieve;
pub mod wave;

pub mod filter;
pub mod rhythm;
pub mod statics;

pub use args::Argument;
pub use statics::{StaticObject, StaticValue};

// -------------------------------------------------------------------------------------------------

/// Maximum number of attempts of retrying generators.
pub const LOOP_LIMIT: usize = 999;
/// Maximum number of attempts of generators that need to collect values.
pub const FAIL_LIMIT: usize = 99;
/// Maximum length of Markov histories.
pub const MARKOV_LIMIT: usize = 9;

// -------------------------------------------------------------------------------------------------

/// A generated parameter value.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// The numeric value, or an error for text values.
    pub fn number(&self) -> Result<f64, String> {
        match self {
            Value::Number(value) => Ok(*value),
            Value::Text(text) => Err(format!("expected a number, got '{}'", text)),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(value) => write!(f, "{}", args::format_number(*value)),
            Value::Text(text) => write!(f, "{}", text),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Ambient state of the scheduling loop which parameter objects may read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceState {
    pub bpm: f64,
    /// The active multiset of the texture's path.
    pub multiset: Option<Multiset>,
    /// The selected pitch before field, octave and temperament are applied.
    pub pitch_raw: Option<f64>,
    /// The realized pitch of the current event.
    pub pitch_post: Option<f64>,
    /// The raw pitch of the previous event.
    pub pitch_previous: Option<f64>,
}

impl Default for ReferenceState {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            multiset: None,
            pitch_raw: None,
            pitch_post: None,
            pitch_previous: None,
        }
    }
}

impl ReferenceState {
    pub fn with_bpm(bpm: f64) -> Self {
        Self {
            bpm,
            ..Self::default()
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Behavior shared by all dynamic parameter objects.
pub trait Parameter: Debug {
    /// Restore the state right after construction, recursively.
    fn reset(&mut self);

    /// Validate the constructed object.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    /// Optional computed state shown in full representations, e.g. a sieve segment.
    fn preview(&self) -> Option<String> {
        None
    }
}

/// Produces one value per call.
pub trait Generator: Parameter {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String>;
}

/// Produces realized pulses and keeps the symbolic pulse of the last call.
pub trait RhythmGenerator: Parameter {
    fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String>;

    /// The symbolic pulse of the last call, if the value was created from a pulse.
    fn current_pulse(&self) -> Option<Pulse>;

    /// Adjust an event produced with the last value before it gets stored.
    fn post_event(&self, _event: &mut Event, _refs: &ReferenceState) {}
}

/// Transforms a whole column of event values. `values`, `times` and `refs` always have
/// the same length and so does the result.
pub trait Filter: Parameter {
    fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String>;
}

// -------------------------------------------------------------------------------------------------

/// Parameter object libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DisplayDerive)]
pub enum Library {
    #[display("generator")]
    Generator,
    #[display("rhythm")]
    Rhythm,
    #[display("filter")]
    Filter,
    #[display("textureStatic")]
    TextureStatic,
    #[display("cloneStatic")]
    CloneStatic,
    #[display("static")]
    Static,
}

/// Accepted data of an argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Number,
    /// A string; numbers are accepted and read as text.
    Text,
    List,
    /// A nested parameter object; numbers become constants.
    Object,
    /// A number or a string.
    Value,
    /// A nested parameter object, a number or a preset name.
    Any,
}

impl ArgType {
    fn accepts(&self, arg: &Argument) -> bool {
        matches!(
            (self, arg),
            (ArgType::Number, Argument::Number(_))
                | (ArgType::Text, Argument::Text(_) | Argument::Number(_))
                | (ArgType::List, Argument::List(_))
                | (ArgType::Object, Argument::List(_) | Argument::Number(_))
                | (ArgType::Value, Argument::Number(_) | Argument::Text(_))
                | (ArgType::Any, _)
        )
    }
}

impl Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArgType::Number => "number",
            ArgType::Text => "string",
            ArgType::List => "list",
            ArgType::Object => "number or list",
            ArgType::Value => "number or string",
            ArgType::Any => "number, string or list",
        };
        write!(f, "{}", name)
    }
}

/// A parameter object type of a library.
pub(crate) struct Entry<T> {
    pub short: &'static str,
    pub long: &'static str,
    pub args: &'static [(&'static str, ArgType)],
    /// Default arguments in argument text notation.
    pub defaults: &'static str,
    pub build: fn(&mut Arguments<'_>) -> Result<T, String>,
}

impl<T> Entry<T> {
    fn doc(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        if args.is_empty() {
            format!("{} ({})", self.long, self.short)
        } else {
            format!(
                "{} ({}): {}; defaults: {}",
                self.long, self.short, args, self.defaults
            )
        }
    }
}

type Table<T> = HashMap<String, &'static Entry<T>>;

fn index<T>(groups: &[&'static [Entry<T>]]) -> Table<T> {
    let mut table = HashMap::new();
    for entry in groups.iter().flat_map(|group| group.iter()) {
        table.insert(entry.short.to_ascii_lowercase(), entry);
        table.insert(entry.long.to_ascii_lowercase(), entry);
    }
    table
}

lazy_static! {
    static ref GENERATORS: Table<Box<dyn Generator>> = index(&[
        basic::GENERATORS,
        wave::GENERATORS,
        random::GENERATORS,
        break_point::GENERATORS,
        sieve::GENERATORS,
        chaos::GENERATORS,
        automata::GENERATORS,
        markov::GENERATORS,
        grammar::GENERATORS,
        feedback::GENERATORS,
        mask::GENERATORS,
        iterate::GENERATORS,
        operator::GENERATORS,
        file::GENERATORS,
    ]);
    static ref RHYTHMS: Table<Box<dyn RhythmGenerator>> = index(&[rhythm::RHYTHMS]);
    static ref FILTERS: Table<Box<dyn Filter>> = index(&[filter::FILTERS]);
    static ref TEXTURE_STATICS: Table<StaticValue> = index(&[statics::TEXTURE_STATICS]);
    static ref CLONE_STATICS: Table<StaticValue> = index(&[statics::CLONE_STATICS]);
    static ref STATICS: Table<StaticValue> = index(&[statics::STATICS]);
}

fn sorted_names<T>(table: &Table<T>) -> Vec<(&'static str, &'static str)> {
    let mut names = table
        .values()
        .map(|entry| (entry.short, entry.long))
        .collect::<Vec<_>>();
    names.sort_unstable();
    names.dedup();
    names
}

/// All `(short, long)` type names of a library, sorted by short name.
pub fn names(library: Library) -> Vec<(&'static str, &'static str)> {
    match library {
        Library::Generator => sorted_names(&GENERATORS),
        Library::Rhythm => sorted_names(&RHYTHMS),
        Library::Filter => sorted_names(&FILTERS),
        Library::TextureStatic => sorted_names(&TEXTURE_STATICS),
        Library::CloneStatic => sorted_names(&CLONE_STATICS),
        Library::Static => sorted_names(&STATICS),
    }
}

/// Documentation of a parameter object type: name, argument names and defaults.
///
/// # Examples:
///
/// ```rust
/// use athenacl::parameter::{doc, Library};
/// assert!(doc(Library::Generator, "ru").unwrap().starts_with("randomUniform (ru)"));
/// ```
pub fn doc(library: Library, name: &str) -> Result<String, Error> {
    let key = name.trim().to_ascii_lowercase();
    let doc = match library {
        Library::Generator => GENERATORS.get(&key).map(|e| e.doc()),
        Library::Rhythm => RHYTHMS.get(&key).map(|e| e.doc()),
        Library::Filter => FILTERS.get(&key).map(|e| e.doc()),
        Library::TextureStatic => TEXTURE_STATICS.get(&key).map(|e| e.doc()),
        Library::CloneStatic => CLONE_STATICS.get(&key).map(|e| e.doc()),
        Library::Static => STATICS.get(&key).map(|e| e.doc()),
    };
    doc.ok_or_else(|| {
        Error::ParameterObjectSyntax(format!("no {} parameter object named '{}'", library, name))
    })
}

// -------------------------------------------------------------------------------------------------

/// Check an argument list against a type entry: fill missing trailing arguments from the
/// defaults, reject surplus arguments and wrongly typed data.
fn expand<T>(
    library: Library,
    table: &Table<T>,
    args: &[Argument],
) -> Result<(&'static Entry<T>, Vec<Argument>), String> {
    let name = match args.first() {
        Some(Argument::Text(name)) => name,
        Some(other) => {
            return Err(format!(
                "a parameter object name is required, got '{}'",
                other
            ))
        }
        None => return Err("no parameter object name given".to_string()),
    };
    let entry = table
        .get(&name.trim().to_ascii_lowercase())
        .copied()
        .ok_or_else(|| format!("no {} parameter object named '{}'", library, name))?;
    let count = entry.args.len();
    let mut values = args[1..].to_vec();
    if values.len() > count {
        return Err(format!(
            "too many arguments; enter {} arguments.",
            count + 1
        ));
    }
    if values.len() < count {
        let defaults = Argument::parse_list(entry.defaults)?;
        if defaults.len() != count {
            return Err(format!(
                "incorrect number of arguments; enter {} arguments.",
                count + 1
            ));
        }
        values.extend_from_slice(&defaults[values.len()..]);
    }
    for (value, (_, arg_type)) in values.iter().zip(entry.args) {
        if !arg_type.accepts(value) {
            return Err(format!(
                "wrong type of data used as an argument. replace {} with a {} argument type.",
                value, arg_type
            ));
        }
    }
    Ok((entry, values))
}

fn build<T>(
    library: Library,
    table: &Table<T>,
    args: &[Argument],
    seeds: &mut SeedSource,
) -> Result<(Vec<Argument>, T), String> {
    let (entry, values) = expand(library, table, args)?;
    let mut arguments = Arguments {
        name: entry.long,
        values,
        seeds,
    };
    let object = (entry.build)(&mut arguments)?;
    let mut canonical = Vec::with_capacity(arguments.values.len() + 1);
    canonical.push(Argument::Text(entry.long.to_string()));
    canonical.append(&mut arguments.values);
    Ok((canonical, object))
}

/// Single values in sub object positions are shorthand notations: numbers are constants,
/// texts type names with default arguments.
fn sub_arguments(arg: &Argument) -> Vec<Argument> {
    match arg {
        Argument::Number(value) => vec![Argument::from("c"), Argument::Number(*value)],
        Argument::Text(_) => vec![arg.clone()],
        Argument::List(items) => items.clone(),
    }
}

// -------------------------------------------------------------------------------------------------

/// Representation formats of parameter objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReprFormat {
    /// Round trip argument text with long type names and all defaults expanded.
    #[default]
    ArgsOnly,
    /// Argument text followed by computed state, if any.
    Full,
}

/// A constructed parameter object with its canonical arguments.
#[derive(Debug)]
pub struct ParameterObject<P: ?Sized> {
    library: Library,
    args: Vec<Argument>,
    object: Box<P>,
}

pub type GeneratorObject = ParameterObject<dyn Generator>;
pub type RhythmObject = ParameterObject<dyn RhythmGenerator>;
pub type FilterObject = ParameterObject<dyn Filter>;

impl<P: Parameter + ?Sized> ParameterObject<P> {
    pub fn library(&self) -> Library {
        self.library
    }

    /// The long type name.
    pub fn name(&self) -> &str {
        self.args.first().and_then(Argument::as_text).unwrap_or_default()
    }

    /// Canonical arguments, including the long type name.
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn reset(&mut self) {
        self.object.reset();
    }

    pub fn check(&self) -> Result<(), String> {
        self.object.check()
    }

    pub fn repr(&self, format: ReprFormat) -> String {
        let args = args::format_arguments(&self.args);
        match (format, self.object.preview()) {
            (ReprFormat::Full, Some(preview)) => format!("{}\n{}", args, preview),
            _ => args,
        }
    }
}

impl<P: Parameter + ?Sized> Display for ParameterObject<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repr(ReprFormat::ArgsOnly))
    }
}

fn syntax_error(err: String) -> Error {
    Error::ParameterObjectSyntax(err)
}

impl ParameterObject<dyn Generator> {
    /// Build a generator from its argument tree.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use athenacl::{parameter::{GeneratorObject, ReferenceState}, seed::SeedSource};
    /// let mut seeds = SeedSource::new(1);
    /// let mut generator = GeneratorObject::parse("bg, oc, (1, 2)", &mut seeds).unwrap();
    /// let refs = ReferenceState::default();
    /// assert_eq!(generator.number(0.0, &refs).unwrap(), 1.0);
    /// assert_eq!(generator.number(1.0, &refs).unwrap(), 2.0);
    /// assert_eq!(generator.to_string(), "basketGen, orderedCyclic, (1, 2)");
    /// ```
    pub fn new(args: &[Argument], seeds: &mut SeedSource) -> Result<Self, Error> {
        Self::build(args, seeds).map_err(syntax_error)
    }

    /// Build a generator from argument text.
    pub fn parse(text: &str, seeds: &mut SeedSource) -> Result<Self, Error> {
        Self::new(&Argument::parse(text).map_err(syntax_error)?, seeds)
    }

    pub(crate) fn build(args: &[Argument], seeds: &mut SeedSource) -> Result<Self, String> {
        let (args, object) = build(Library::Generator, &GENERATORS, args, seeds)?;
        object.check()?;
        Ok(Self {
            library: Library::Generator,
            args,
            object,
        })
    }

    pub fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        self.object.run(t, refs)
    }

    /// Run and require a numeric value.
    pub fn number(&mut self, t: f64, refs: &ReferenceState) -> Result<f64, String> {
        self.object
            .run(t, refs)?
            .number()
            .map_err(|err| format!("{}: {}", self.name(), err))
    }
}

impl ParameterObject<dyn RhythmGenerator> {
    /// Build a rhythm generator from its argument tree.
    pub fn new(args: &[Argument], seeds: &mut SeedSource) -> Result<Self, Error> {
        Self::build(args, seeds).map_err(syntax_error)
    }

    /// Build a rhythm generator from argument text.
    pub fn parse(text: &str, seeds: &mut SeedSource) -> Result<Self, Error> {
        Self::new(&Argument::parse(text).map_err(syntax_error)?, seeds)
    }

    pub(crate) fn build(args: &[Argument], seeds: &mut SeedSource) -> Result<Self, String> {
        let (args, object) = build(Library::Rhythm, &RHYTHMS, args, seeds)?;
        object.check()?;
        Ok(Self {
            library: Library::Rhythm,
            args,
            object,
        })
    }

    pub fn run(&mut self, t: f64, refs: &ReferenceState) -> Result<RealizedPulse, String> {
        self.object.run(t, refs)
    }

    pub fn current_pulse(&self) -> Option<Pulse> {
        self.object.current_pulse()
    }

    pub fn post_event(&self, event: &mut Event, refs: &ReferenceState) {
        self.object.post_event(event, refs)
    }
}

impl ParameterObject<dyn Filter> {
    /// Build a clone filter from its argument tree.
    pub fn new(args: &[Argument], seeds: &mut SeedSource) -> Result<Self, Error> {
        Self::build(args, seeds).map_err(syntax_error)
    }

    /// Build a clone filter from argument text.
    pub fn parse(text: &str, seeds: &mut SeedSource) -> Result<Self, Error> {
        Self::new(&Argument::parse(text).map_err(syntax_error)?, seeds)
    }

    pub(crate) fn build(args: &[Argument], seeds: &mut SeedSource) -> Result<Self, String> {
        let (args, object) = build(Library::Filter, &FILTERS, args, seeds)?;
        object.check()?;
        Ok(Self {
            library: Library::Filter,
            args,
            object,
        })
    }

    pub fn run(
        &mut self,
        values: &[Value],
        times: &[f64],
        refs: &[ReferenceState],
    ) -> Result<Vec<Value>, String> {
        if values.len() != times.len() || times.len() != refs.len() {
            return Err(format!(
                "{}: values, times and references must have equal length",
                self.name()
            ));
        }
        let result = self.object.run(values, times, refs)?;
        if result.len() != values.len() {
            return Err(format!("{}: filter changed the number of values", self.name()));
        }
        Ok(result)
    }
}

// -------------------------------------------------------------------------------------------------

/// A sub object slot which accepts generators and rhythm generators. Rhythms contribute
/// their realized duration.
#[derive(Debug)]
pub enum Source {
    Generator(GeneratorObject),
    Rhythm(RhythmObject),
}

impl Source {
    fn args(&self) -> &[Argument] {
        match self {
            Source::Generator(object) => object.args(),
            Source::Rhythm(object) => object.args(),
        }
    }

    pub fn number(&mut self, t: f64, refs: &ReferenceState) -> Result<f64, String> {
        match self {
            Source::Generator(object) => object.number(t, refs),
            Source::Rhythm(object) => Ok(object.run(t, refs)?.dur),
        }
    }

    /// Run and keep text values of generators.
    pub fn value(&mut self, t: f64, refs: &ReferenceState) -> Result<Value, String> {
        match self {
            Source::Generator(object) => object.run(t, refs),
            Source::Rhythm(object) => Ok(Value::Number(object.run(t, refs)?.dur)),
        }
    }

    pub fn check(&self) -> Result<(), String> {
        match self {
            Source::Generator(object) => object.check(),
            Source::Rhythm(object) => object.check(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Source::Generator(object) => object.reset(),
            Source::Rhythm(object) => object.reset(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// The output range of a generator, given by two nested generators.
#[derive(Debug)]
pub(crate) struct MinMax {
    min: GeneratorObject,
    max: GeneratorObject,
}

impl MinMax {
    pub fn new(args: &mut Arguments<'_>, min: usize, max: usize) -> Result<Self, String> {
        Ok(Self {
            min: args.generator(min)?,
            max: args.generator(max)?,
        })
    }

    pub fn range(&mut self, t: f64, refs: &ReferenceState) -> Result<(f64, f64), String> {
        Ok((self.min.number(t, refs)?, self.max.number(t, refs)?))
    }

    /// Map a unit value into the current range.
    pub fn denorm(&mut self, value: f64, t: f64, refs: &ReferenceState) -> Result<f64, String> {
        let (min, max) = self.range(t, refs)?;
        unit::denorm(value, min, max)
    }

    pub fn reset(&mut self) {
        self.min.reset();
        self.max.reset();
    }
}

// -------------------------------------------------------------------------------------------------

/// Type checked arguments of a parameter object under construction. Accessors take the
/// argument position after the type name and canonicalize the stored argument, so the
/// final argument list of an object is its round trip representation.
pub struct Arguments<'a> {
    name: &'static str,
    values: Vec<Argument>,
    seeds: &'a mut SeedSource,
}

impl Arguments<'_> {
    /// Long name of the object under construction.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn get(&self, index: usize) -> Result<&Argument, String> {
        self.values
            .get(index)
            .ok_or_else(|| format!("{}: missing argument {}", self.name, index + 1))
    }

    fn set(&mut self, index: usize, arg: Argument) {
        if let Some(value) = self.values.get_mut(index) {
            *value = arg;
        }
    }

    /// A new random stream, seeded from the object tree's seed source.
    pub fn random(&mut self) -> RandomStream {
        RandomStream::new(Some(self.seeds.next_seed()))
    }

    pub fn seeds(&mut self) -> &mut SeedSource {
        self.seeds
    }

    pub fn number(&self, index: usize) -> Result<f64, String> {
        match self.get(index)? {
            Argument::Number(value) => Ok(*value),
            other => Err(format!(
                "wrong type of data used as an argument. replace {} with a number argument type.",
                other
            )),
        }
    }

    /// A number rounded to the nearest integer.
    pub fn integer(&self, index: usize) -> Result<i64, String> {
        Ok(self.number(index)?.round() as i64)
    }

    pub fn text(&self, index: usize) -> Result<String, String> {
        match self.get(index)? {
            Argument::Text(text) => Ok(text.clone()),
            Argument::Number(value) => Ok(args::format_number(*value)),
            other => Err(format!(
                "wrong type of data used as an argument. replace {} with a string argument type.",
                other
            )),
        }
    }

    pub fn list(&self, index: usize) -> Result<Vec<Argument>, String> {
        match self.get(index)? {
            Argument::List(items) => Ok(items.clone()),
            other => Err(format!(
                "wrong type of data used as an argument. replace {} with a list argument type.",
                other
            )),
        }
    }

    /// A list of numbers. A single number is accepted as a list of one.
    pub fn numbers(&self, index: usize) -> Result<Vec<f64>, String> {
        match self.get(index)? {
            Argument::Number(value) => Ok(vec![*value]),
            Argument::List(items) => items
                .iter()
                .map(|item| {
                    item.as_number()
                        .ok_or_else(|| format!("{}: list values must be numbers, got '{}'", self.name, item))
                })
                .collect(),
            other => Err(format!("{}: expected a list of numbers, got '{}'", self.name, other)),
        }
    }

    /// A list of numbers or strings.
    pub fn values(&self, index: usize) -> Result<Vec<Value>, String> {
        let items = match self.get(index)? {
            Argument::List(items) => items.clone(),
            other => vec![other.clone()],
        };
        items
            .into_iter()
            .map(|item| match item {
                Argument::Number(value) => Ok(Value::Number(value)),
                Argument::Text(text) => Ok(Value::Text(text)),
                Argument::List(_) => Err(format!(
                    "{}: nested lists are not supported here: '{}'",
                    self.name, item
                )),
            })
            .collect()
    }

    /// A control string, stored in its long form.
    pub fn option<T>(&mut self, index: usize) -> Result<T, String>
    where
        T: for<'s> TryFrom<&'s str, Error = String> + Display,
    {
        let option = T::try_from(self.text(index)?.as_str())?;
        self.set(index, Argument::Text(option.to_string()));
        Ok(option)
    }

    pub fn selection(&mut self, index: usize) -> Result<SelectionMode, String> {
        self.option::<SelectionMode>(index)
    }

    fn pulse_from(&self, arg: &Argument) -> Result<Pulse, String> {
        let pulse = match arg {
            Argument::List(items) => {
                let numbers = items
                    .iter()
                    .map(|item| item.as_number())
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| format!("invalid pulse '{}'", arg))?;
                match numbers[..] {
                    [d, m] => Pulse::new(d.round() as i64, m.round() as i64, 1.0),
                    [d, m, a] => Pulse::new(d.round() as i64, m.round() as i64, a),
                    _ => Err(format!("invalid pulse '{}': expecting two or three values", arg)),
                }
            }
            Argument::Number(ratio) => Pulse::from_ratio(*ratio),
            Argument::Text(text) => Pulse::try_from(text.as_str()),
        };
        pulse.map_err(|err| format!("failed pulse object definition: {}", err))
    }

    fn pulse_argument(pulse: &Pulse) -> Argument {
        Argument::List(vec![
            Argument::Number(pulse.divisor() as f64),
            Argument::Number(pulse.multiplier() as f64),
            Argument::Number(pulse.accent()),
        ])
    }

    /// A single pulse, stored as `(d, m, a)` triple.
    pub fn pulse(&mut self, index: usize) -> Result<Pulse, String> {
        let pulse = self.pulse_from(self.get(index)?)?;
        self.set(index, Self::pulse_argument(&pulse));
        Ok(pulse)
    }

    /// A list of pulses, stored as list of triples. A list of two or three numbers is a
    /// single pulse.
    pub fn rhythm_list(&mut self, index: usize) -> Result<Rhythm, String> {
        let arg = self.get(index)?.clone();
        let pulses = match &arg {
            Argument::List(items)
                if (2..=3).contains(&items.len()) && items.iter().all(|i| i.as_number().is_some()) =>
            {
                vec![self.pulse_from(&arg)?]
            }
            Argument::List(items) => items
                .iter()
                .map(|item| self.pulse_from(item))
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![self.pulse_from(other)?],
        };
        self.set(
            index,
            Argument::List(pulses.iter().map(Self::pulse_argument).collect()),
        );
        Ok(Rhythm::new(pulses))
    }

    /// A nested generator. Numbers become constants.
    pub fn generator(&mut self, index: usize) -> Result<GeneratorObject, String> {
        let sub = sub_arguments(self.get(index)?);
        let object = GeneratorObject::build(&sub, self.seeds)
            .map_err(|err| format!("failed sub-parameter: {}", err))?;
        self.set(index, Argument::List(object.args().to_vec()));
        Ok(object)
    }

    /// A list of nested generators.
    pub fn generators(&mut self, index: usize) -> Result<Vec<GeneratorObject>, String> {
        let items = self.list(index)?;
        let mut objects = Vec::with_capacity(items.len());
        for item in &items {
            let object = GeneratorObject::build(&sub_arguments(item), self.seeds)
                .map_err(|err| format!("failed sub-parameter: {}", err))?;
            objects.push(object);
        }
        if objects.is_empty() {
            return Err(format!("{}: supply at least one parameter object", self.name));
        }
        self.set(
            index,
            Argument::List(objects.iter().map(|o| Argument::List(o.args().to_vec())).collect()),
        );
        Ok(objects)
    }

    /// A nested rhythm generator.
    pub fn rhythm(&mut self, index: usize) -> Result<RhythmObject, String> {
        let sub = sub_arguments(self.get(index)?);
        let object = RhythmObject::build(&sub, self.seeds)
            .map_err(|err| format!("failed sub-parameter: {}", err))?;
        self.set(index, Argument::List(object.args().to_vec()));
        Ok(object)
    }

    /// A list of nested rhythm generators.
    pub fn rhythms(&mut self, index: usize) -> Result<Vec<RhythmObject>, String> {
        let items = self.list(index)?;
        let mut objects = Vec::with_capacity(items.len());
        for item in &items {
            let object = RhythmObject::build(&sub_arguments(item), self.seeds)
                .map_err(|err| format!("failed sub-parameter: {}", err))?;
            objects.push(object);
        }
        if objects.is_empty() {
            return Err(format!("{}: supply at least one parameter object", self.name));
        }
        self.set(
            index,
            Argument::List(objects.iter().map(|o| Argument::List(o.args().to_vec())).collect()),
        );
        Ok(objects)
    }

    /// A list of nested filters.
    pub fn filters(&mut self, index: usize) -> Result<Vec<FilterObject>, String> {
        let items = self.list(index)?;
        let mut objects = Vec::with_capacity(items.len());
        for item in &items {
            let object = FilterObject::build(&sub_arguments(item), self.seeds)
                .map_err(|err| format!("failed sub-parameter: {}", err))?;
            objects.push(object);
        }
        self.set(
            index,
            Argument::List(objects.iter().map(|o| Argument::List(o.args().to_vec())).collect()),
        );
        Ok(objects)
    }

    /// A nested generator or rhythm generator.
    pub fn source(&mut self, index: usize) -> Result<Source, String> {
        let sub = sub_arguments(self.get(index)?);
        let is_rhythm = sub
            .first()
            .and_then(Argument::as_text)
            .is_some_and(|name| RHYTHMS.contains_key(&name.trim().to_ascii_lowercase()));
        let source = if is_rhythm {
            RhythmObject::build(&sub, self.seeds).map(Source::Rhythm)
        } else {
            GeneratorObject::build(&sub, self.seeds).map(Source::Generator)
        }
        .map_err(|err| format!("failed sub-parameter: {}", err))?;
        self.set(index, Argument::List(source.args().to_vec()));
        Ok(source)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn construction() -> Result<(), String> {
        let mut seeds = SeedSource::new(1);
        let generator = GeneratorObject::build(&Argument::parse("ru")?, &mut seeds)?;
        assert_eq!(
            generator.to_string(),
            "randomUniform, (constant, 0), (constant, 1)"
        );
        let generator = GeneratorObject::build(&Argument::parse("ru, .2, (c, 3)")?, &mut seeds)?;
        assert_eq!(
            generator.to_string(),
            "randomUniform, (constant, 0.2), (constant, 3)"
        );
        assert_eq!(generator.name(), "randomUniform");
        assert_eq!(generator.library(), Library::Generator);

        let err = GeneratorObject::build(&Argument::parse("ru, 0, 1, 2")?, &mut seeds)
            .err()
            .unwrap_or_default();
        assert_eq!(err, "too many arguments; enter 3 arguments.");
        let err = GeneratorObject::build(&Argument::parse("ru, abc")?, &mut seeds)
            .err()
            .unwrap_or_default();
        assert_eq!(
            err,
            "wrong type of data used as an argument. replace abc with a number or list argument type."
        );
        let err = GeneratorObject::build(&Argument::parse("ru, (xx, 1)")?, &mut seeds)
            .err()
            .unwrap_or_default();
        assert!(err.starts_with("failed sub-parameter: "), "{}", err);
        assert!(GeneratorObject::build(&Argument::parse("nothing")?, &mut seeds).is_err());
        assert!(GeneratorObject::build(&[], &mut seeds).is_err());
        Ok(())
    }

    #[test]
    fn defaults_build() -> Result<(), String> {
        let mut seeds = SeedSource::new(1);
        for library in [
            Library::Generator,
            Library::Rhythm,
            Library::Filter,
            Library::TextureStatic,
            Library::CloneStatic,
            Library::Static,
        ] {
            for (short, long) in names(library) {
                let args = [Argument::from(short)];
                let built = match library {
                    Library::Generator => GeneratorObject::build(&args, &mut seeds).map(|_| ()),
                    Library::Rhythm => RhythmObject::build(&args, &mut seeds).map(|_| ()),
                    Library::Filter => FilterObject::build(&args, &mut seeds).map(|_| ()),
                    _ => StaticObject::build(library, &args).map(|_| ()),
                };
                assert!(built.is_ok(), "{} {}: {:?}", library, long, built);
            }
        }
        Ok(())
    }

    #[test]
    fn round_trip() -> Result<(), String> {
        let mut seeds = SeedSource::new(2);
        for text in [
            "ws, e, 30, 0, 0, 1",
            "bg, rp, (1, 1, 2, 3)",
            "mv, a{.2}b{.5}:{a=5|b=4}, (c, 0)",
            "sl, 3|4, -12, 12, int, oc",
            "iw, ((ru, 0, 1), (wt, e, 30, 0, 0, 1)), (bg, oc, (8, 4, -2)), oc",
            "a, 0, (bg, rc, (1, 3, 4, 7, -11))",
        ] {
            let first = GeneratorObject::build(&Argument::parse(text)?, &mut seeds)?;
            let second = GeneratorObject::build(first.args(), &mut seeds)?;
            assert_eq!(first.to_string(), second.to_string());
            let third = GeneratorObject::build(&Argument::parse(&first.to_string())?, &mut seeds)?;
            assert_eq!(first.args(), third.args());
        }
        let rhythm = RhythmObject::build(&Argument::parse("l, ((4,1,1), (4,3,0)), rc")?, &mut seeds)?;
        assert_eq!(
            rhythm.to_string(),
            "loop, ((4, 1, 1), (4, 3, 0)), randomChoice"
        );
        Ok(())
    }

    #[test]
    fn determinism() -> Result<(), String> {
        let refs = ReferenceState::default();
        let run = |seed: u64| -> Result<Vec<f64>, String> {
            let mut seeds = SeedSource::new(seed);
            let mut generator = GeneratorObject::build(&Argument::parse("ru, 0, 10")?, &mut seeds)?;
            (0..10).map(|t| generator.number(t as f64, &refs)).collect()
        };
        assert_eq!(run(300)?, run(300)?);
        assert_ne!(run(300)?, run(301)?);

        let mut seeds = SeedSource::new(5);
        let mut generator = GeneratorObject::build(&Argument::parse("rg, .5, .1, 0, 1")?, &mut seeds)?;
        let first = (0..10)
            .map(|t| generator.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        generator.reset();
        let second = (0..10)
            .map(|t| generator.number(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn sources() -> Result<(), String> {
        let mut seeds = SeedSource::new(1);
        let mut filter = FilterObject::build(&Argument::parse("fa, (l, ((1, 1, 1)))")?, &mut seeds)?;
        let values = vec![Value::Number(0.0), Value::Number(1.0)];
        let refs = vec![ReferenceState::with_bpm(120.0), ReferenceState::with_bpm(60.0)];
        let result = filter.run(&values, &[0.0, 1.0], &refs)?;
        assert_eq!(result, vec![Value::Number(0.5), Value::Number(2.0)]);
        assert!(filter.run(&values, &[0.0], &refs[..1]).is_err());
        Ok(())
    }

    #[test]
    fn docs() -> Result<(), Error> {
        assert!(names(Library::Generator).contains(&("ru", "randomUniform")));
        assert!(names(Library::Rhythm).contains(&("gr", "gaRhythm")));
        assert!(names(Library::Filter).contains(&("b", "bypass")));
        assert!(doc(Library::Filter, "bypass")?.starts_with("bypass (b)"));
        assert!(doc(Library::Rhythm, "nothing").is_err());
        Ok(())
    }
}
