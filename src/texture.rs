//! Textures: procedural event generators bound to a path, an instrument and a set of
//! parameter objects. The scheduling discipline of a texture is a [`TextureModule`].

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    event::{sort_events, time_range_abs, Event},
    orchestra::Orchestra,
    parameter::{
        args::Argument,
        file::is_empty_path,
        names,
        options::{
            control_strings, DensityPartition, EventCountLevel, EventPartition, Level,
            PolyphonicLevel,
        },
        GeneratorObject, Library, ReferenceState, ReprFormat, RhythmObject, StaticObject,
        StaticValue, Value,
    },
    path::Path,
    pulse::Pulse,
    seed::{derive_seed, RandomStream, SeedSource},
    selector::SelectionMode,
    temperament::Temperament,
};

mod drone_articulate;
mod drone_sustain;
mod harmonic_assembly;
mod line_cluster;
mod line_groove;
mod time_fill;
mod time_segment;

pub use drone_articulate::DroneArticulate;
pub use drone_sustain::DroneSustain;
pub use harmonic_assembly::HarmonicAssembly;
pub use line_cluster::LineCluster;
pub use line_groove::LineGroove;
pub use time_fill::TimeFill;
pub use time_segment::TimeSegment;

// -------------------------------------------------------------------------------------------------

/// Upper bound for the number of events a single score may produce.
pub const EVENT_LIMIT: usize = 250_000;

const DEFAULT_BPM: &str = "c, 120";
const DEFAULT_RHYTHM: &str = "pt, (c, 4), (bg, rp, (1, 1, 2, 3)), (c, 1), (c, .75)";
const DEFAULT_AMPLITUDE: &str = "rb, .4, .4, .7, .9";
const DEFAULT_PAN: &str = "c, .5";
const DEFAULT_FIELD: &str = "c, 0";
const DEFAULT_OCTAVE: &str = "c, 0";
const DEFAULT_TIME_RANGE: &str = "staticRange, (0, 20)";

control_strings!(
    /// How the multisets of a path are read: as simultaneities or as parallel parts.
    PolyphonyMode, "polyphony mode" {
        Set => "set" | "s",
        Part => "part" | "p",
    }
);

// -------------------------------------------------------------------------------------------------

/// A dynamic parameter which only exists in some texture modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicParameter {
    pub name: &'static str,
    /// Default arguments in argument text notation.
    pub default: &'static str,
    pub doc: &'static str,
}

/// A scheduling discipline of textures.
pub trait TextureModule: Debug {
    /// The long module name.
    fn name(&self) -> &'static str;
    fn doc(&self) -> &'static str;
    /// Texture static parameters as `(short, long)` names.
    fn statics(&self) -> &'static [(&'static str, &'static str)];
    /// Module specific generator parameters.
    fn dynamics(&self) -> &'static [DynamicParameter] {
        &[]
    }
    /// Create events for the current bindings of the scorer.
    fn score(&self, scorer: &mut Scorer) -> Result<(), String>;
}

/// All texture modules as `(short, long)` names.
pub fn texture_module_names() -> Vec<(&'static str, &'static str)> {
    vec![
        ("da", "DroneArticulate"),
        ("ds", "DroneSustain"),
        ("ha", "HarmonicAssembly"),
        ("lc", "LineCluster"),
        ("lg", "LineGroove"),
        ("tf", "TimeFill"),
        ("ts", "TimeSegment"),
    ]
}

/// Look up a texture module by its short or long name, case-insensitively.
pub fn texture_module(name: &str) -> Result<Box<dyn TextureModule>, Error> {
    match name.trim().to_ascii_lowercase().as_str() {
        "lg" | "linegroove" => Ok(Box::new(LineGroove)),
        "tf" | "timefill" => Ok(Box::new(TimeFill)),
        "da" | "dronearticulate" => Ok(Box::new(DroneArticulate)),
        "ha" | "harmonicassembly" => Ok(Box::new(HarmonicAssembly)),
        "ds" | "dronesustain" => Ok(Box::new(DroneSustain)),
        "lc" | "linecluster" => Ok(Box::new(LineCluster)),
        "ts" | "timesegment" => Ok(Box::new(TimeSegment)),
        _ => Err(Error::TextureState(format!(
            "invalid texture module '{}': expecting one of {}",
            name,
            texture_module_names()
                .iter()
                .map(|(_, long)| *long)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

// -------------------------------------------------------------------------------------------------

/// An editable parameter slot of a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Instrument,
    TimeRange,
    Bpm,
    Rhythm,
    Amplitude,
    Pan,
    Field,
    Octave,
    Aux(usize),
    /// A texture static, by long name.
    Static(&'static str),
    /// A module specific generator, by name.
    Dynamic(&'static str),
}

impl Role {
    /// Resolve a role name or abbreviation for the given module.
    pub fn parse(name: &str, module: &dyn TextureModule) -> Result<Self, Error> {
        let lower = name.trim().to_ascii_lowercase();
        let role = match lower.as_str() {
            "i" | "inst" | "instrument" => Some(Role::Instrument),
            "t" | "trange" | "timerange" => Some(Role::TimeRange),
            "b" | "beatt" | "bpm" => Some(Role::Bpm),
            "r" | "rhythmq" | "rhythm" => Some(Role::Rhythm),
            "a" | "ampq" | "amplitude" => Some(Role::Amplitude),
            "n" | "panq" | "pan" => Some(Role::Pan),
            "f" | "fieldq" | "field" => Some(Role::Field),
            "o" | "octq" | "octave" => Some(Role::Octave),
            _ => None,
        };
        if let Some(role) = role {
            return Ok(role);
        }
        if let Some(index) = lower
            .strip_prefix("auxq")
            .or_else(|| lower.strip_prefix('x'))
            .and_then(|index| index.parse::<usize>().ok())
        {
            return Ok(Role::Aux(index));
        }
        if let Some((_, long)) = module
            .statics()
            .iter()
            .find(|(short, long)| *short == lower || long.to_ascii_lowercase() == lower)
        {
            return Ok(Role::Static(*long));
        }
        if let Some(dynamic) = module
            .dynamics()
            .iter()
            .find(|dynamic| dynamic.name.to_ascii_lowercase() == lower)
        {
            return Ok(Role::Dynamic(dynamic.name));
        }
        Err(Error::TextureState(format!(
            "no parameter named '{}' in a {} texture",
            name,
            module.name()
        )))
    }

    /// The name under which the role is displayed and stored.
    pub fn key(&self) -> String {
        match self {
            Role::Instrument => "inst".to_string(),
            Role::TimeRange => "tRange".to_string(),
            Role::Bpm => "beatT".to_string(),
            Role::Rhythm => "rhythmQ".to_string(),
            Role::Amplitude => "ampQ".to_string(),
            Role::Pan => "panQ".to_string(),
            Role::Field => "fieldQ".to_string(),
            Role::Octave => "octQ".to_string(),
            Role::Aux(index) => format!("auxQ{}", index),
            Role::Static(name) | Role::Dynamic(name) => name.to_string(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Seeds of the two random streams of a texture: parameter objects and module decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextureSeeds {
    pub parameter: u64,
    pub module: u64,
}

#[derive(Debug)]
struct Parameters {
    bpm: GeneratorObject,
    rhythm: RhythmObject,
    amp: GeneratorObject,
    pan: GeneratorObject,
    field: GeneratorObject,
    octave: GeneratorObject,
    aux: Vec<GeneratorObject>,
    dynamics: Vec<(&'static str, GeneratorObject)>,
}

impl Parameters {
    fn reset(&mut self) {
        self.bpm.reset();
        self.rhythm.reset();
        self.amp.reset();
        self.pan.reset();
        self.field.reset();
        self.octave.reset();
        for aux in &mut self.aux {
            aux.reset();
        }
        for (_, dynamic) in &mut self.dynamics {
            dynamic.reset();
        }
    }
}

/// Parameter object seeds derive from the texture name and the role.
fn seed_source(seeds: TextureSeeds, texture: &str, role: &Role) -> SeedSource {
    SeedSource::new(derive_seed(
        seeds.parameter,
        &format!("{}:{}", texture, role.key()),
    ))
}

/// Read a single number as a constant generator.
fn constant_shorthand(args: Vec<Argument>) -> Vec<Argument> {
    match args.as_slice() {
        [Argument::Number(value)] => {
            vec![Argument::Text("c".to_string()), Argument::Number(*value)]
        }
        _ => args,
    }
}

/// Prepend the static object name unless the arguments already start with it.
fn static_args(short: &str, long: &str, mut args: Vec<Argument>) -> Vec<Argument> {
    let named = args.first().and_then(Argument::as_text).is_some_and(|name| {
        name.eq_ignore_ascii_case(short) || name.eq_ignore_ascii_case(long)
    });
    if !named {
        args.insert(0, Argument::Text(long.to_string()));
    }
    args
}

fn static_short_name(library: Library, long: &str) -> &'static str {
    names(library)
        .into_iter()
        .find(|(_, name)| *name == long)
        .map_or("", |(short, _)| short)
}

// -------------------------------------------------------------------------------------------------

/// A texture: binds a path, an instrument and parameter objects to a texture module and
/// keeps the events of its last score.
#[derive(Debug)]
pub struct Texture {
    name: String,
    module: Box<dyn TextureModule>,
    path: String,
    orchestra: Orchestra,
    aux_count: usize,
    temperament: Temperament,
    silence: bool,
    post_map: bool,
    polyphony: PolyphonyMode,
    midi_program: Option<u8>,
    midi_channel: Option<u8>,
    mute: bool,
    seeds: TextureSeeds,
    instrument: StaticObject,
    time_range: StaticObject,
    params: Parameters,
    statics: Vec<StaticObject>,
    random: RandomStream,
    events: Vec<Event>,
    time_range_abs: (f64, f64),
}

impl Texture {
    /// Create a texture with default parameters.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use athenacl::{Orchestra, Path, Texture, TextureSeeds};
    /// let path = Path::from_strings("a", &["3-2"]).unwrap();
    /// let mut texture =
    ///     Texture::new("a", "lg", path.name(), Orchestra::GeneralMidi, 0, TextureSeeds::default())
    ///         .unwrap();
    /// texture.score(&path).unwrap();
    /// assert!(!texture.events().is_empty());
    /// ```
    pub fn new(
        name: &str,
        module: &str,
        path: &str,
        orchestra: Orchestra,
        inst: u32,
        seeds: TextureSeeds,
    ) -> Result<Self, Error> {
        let module = texture_module(module)?;
        let instrument = StaticObject::new(
            Library::Static,
            &[
                Argument::Text("staticInst".to_string()),
                Argument::Number(inst as f64),
            ],
        )?;
        orchestra.instrument_name(inst)?;
        let time_range = StaticObject::parse(Library::Static, DEFAULT_TIME_RANGE)?;
        let statics = module
            .statics()
            .iter()
            .map(|(_, long)| StaticObject::parse(Library::TextureStatic, long))
            .collect::<Result<Vec<_>, _>>()?;

        let generator = |role: Role, text: &str| {
            GeneratorObject::parse(text, &mut seed_source(seeds, name, &role))
                .map_err(|err| err.with_context(&role.key()))
        };
        let aux = orchestra
            .aux_parameters(inst, 0)?
            .iter()
            .enumerate()
            .map(|(index, aux)| generator(Role::Aux(index), aux.default))
            .collect::<Result<Vec<_>, _>>()?;
        let dynamics = module
            .dynamics()
            .iter()
            .map(|dynamic| {
                generator(Role::Dynamic(dynamic.name), dynamic.default)
                    .map(|object| (dynamic.name, object))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let params = Parameters {
            bpm: generator(Role::Bpm, DEFAULT_BPM)?,
            rhythm: RhythmObject::parse(
                DEFAULT_RHYTHM,
                &mut seed_source(seeds, name, &Role::Rhythm),
            )?,
            amp: generator(Role::Amplitude, DEFAULT_AMPLITUDE)?,
            pan: generator(Role::Pan, DEFAULT_PAN)?,
            field: generator(Role::Field, DEFAULT_FIELD)?,
            octave: generator(Role::Octave, DEFAULT_OCTAVE)?,
            aux,
            dynamics,
        };
        let random = RandomStream::new(Some(derive_seed(seeds.module, name)));
        Ok(Self {
            name: name.to_string(),
            module,
            path: path.to_string(),
            orchestra,
            aux_count: 0,
            temperament: Temperament::default(),
            silence: false,
            post_map: true,
            polyphony: PolyphonyMode::Set,
            midi_program: orchestra.midi_program(inst),
            midi_channel: orchestra.midi_channel(),
            mute: false,
            seeds,
            instrument,
            time_range,
            params,
            statics,
            random,
            events: Vec::new(),
            time_range_abs: (0.0, 0.0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn module(&self) -> &dyn TextureModule {
        self.module.as_ref()
    }

    /// Name of the bound path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Rebind the texture to another path. Reference counts are kept by the owner of the
    /// paths.
    pub fn set_path(&mut self, path: &str) {
        self.path = path.to_string();
    }

    pub fn orchestra(&self) -> Orchestra {
        self.orchestra
    }

    /// Move the texture into another orchestra. The instrument must exist there; aux
    /// parameters are reset to the new instrument's defaults.
    pub fn set_orchestra(&mut self, orchestra: Orchestra) -> Result<(), Error> {
        let inst = self.inst();
        orchestra.instrument_name(inst)?;
        let aux = self.default_aux(orchestra, inst, self.aux_count)?;
        self.orchestra = orchestra;
        self.params.aux = aux;
        self.midi_program = orchestra.midi_program(inst);
        self.midi_channel = orchestra.midi_channel();
        Ok(())
    }

    pub fn inst(&self) -> u32 {
        self.instrument.value().instrument().unwrap_or_default()
    }

    /// Instrument time range in seconds.
    pub fn time_range(&self) -> (f64, f64) {
        self.time_range.value().range().unwrap_or((0.0, 0.0))
    }

    pub fn aux_count(&self) -> usize {
        self.params.aux.len()
    }

    /// Set the number of aux parameters of instruments with a variable count. Existing
    /// aux generators are kept, new ones get the orchestra default.
    pub fn set_aux_count(&mut self, count: usize) -> Result<(), Error> {
        if !self.orchestra.has_variable_aux() {
            return Err(Error::TextureState(format!(
                "the aux count of orchestra {} is fixed",
                self.orchestra
            )));
        }
        let mut aux = self.default_aux(self.orchestra, self.inst(), count)?;
        for (index, existing) in std::mem::take(&mut self.params.aux).into_iter().enumerate() {
            if index < aux.len() {
                aux[index] = existing;
            }
        }
        self.aux_count = count;
        self.params.aux = aux;
        Ok(())
    }

    pub fn temperament(&self) -> Temperament {
        self.temperament
    }

    pub fn set_temperament(&mut self, temperament: Temperament) {
        self.temperament = temperament;
    }

    /// True when rests are kept as silent events.
    pub fn silence(&self) -> bool {
        self.silence
    }

    pub fn set_silence(&mut self, silence: bool) {
        self.silence = silence;
    }

    pub fn post_map(&self) -> bool {
        self.post_map
    }

    pub fn set_post_map(&mut self, post_map: bool) {
        self.post_map = post_map;
    }

    pub fn polyphony(&self) -> PolyphonyMode {
        self.polyphony
    }

    pub fn set_polyphony(&mut self, polyphony: PolyphonyMode) {
        self.polyphony = polyphony;
    }

    pub fn midi_program(&self) -> Option<u8> {
        self.midi_program
    }

    pub fn set_midi_program(&mut self, program: Option<u8>) {
        self.midi_program = program;
    }

    pub fn midi_channel(&self) -> Option<u8> {
        self.midi_channel
    }

    pub fn set_midi_channel(&mut self, channel: Option<u8>) {
        self.midi_channel = channel;
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn seeds(&self) -> TextureSeeds {
        self.seeds
    }

    /// Events of the last score, sorted by time.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Earliest start and latest sustain end of the last score.
    pub fn time_range_abs(&self) -> (f64, f64) {
        self.time_range_abs
    }

    // ---------------------------------------------------------------------------------------------

    /// All editable roles, in display order.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = vec![
            Role::Instrument,
            Role::TimeRange,
            Role::Bpm,
            Role::Rhythm,
            Role::Amplitude,
            Role::Pan,
            Role::Field,
            Role::Octave,
        ];
        roles.extend((0..self.params.aux.len()).map(Role::Aux));
        roles.extend(self.module.statics().iter().map(|(_, long)| Role::Static(*long)));
        roles.extend(
            self.module
                .dynamics()
                .iter()
                .map(|dynamic| Role::Dynamic(dynamic.name)),
        );
        roles
    }

    /// Canonical arguments of the object in the given role.
    pub fn args(&self, role: &Role) -> Result<Vec<Argument>, Error> {
        let args = match role {
            Role::Instrument => self.instrument.args(),
            Role::TimeRange => self.time_range.args(),
            Role::Bpm => self.params.bpm.args(),
            Role::Rhythm => self.params.rhythm.args(),
            Role::Amplitude => self.params.amp.args(),
            Role::Pan => self.params.pan.args(),
            Role::Field => self.params.field.args(),
            Role::Octave => self.params.octave.args(),
            Role::Aux(index) => self
                .params
                .aux
                .get(*index)
                .ok_or_else(|| self.missing_role(role))?
                .args(),
            Role::Static(name) => self
                .statics
                .iter()
                .find(|object| object.name() == *name)
                .ok_or_else(|| self.missing_role(role))?
                .args(),
            Role::Dynamic(name) => self
                .params
                .dynamics
                .iter()
                .find(|(dynamic, _)| dynamic == name)
                .ok_or_else(|| self.missing_role(role))?
                .1
                .args(),
        };
        Ok(args.to_vec())
    }

    /// Textual representation of the object in the given role.
    pub fn repr(&self, role: &Role, format: ReprFormat) -> Result<String, Error> {
        Ok(match role {
            Role::Instrument => self.instrument.repr(format),
            Role::TimeRange => self.time_range.repr(format),
            Role::Bpm => self.params.bpm.repr(format),
            Role::Rhythm => self.params.rhythm.repr(format),
            Role::Amplitude => self.params.amp.repr(format),
            Role::Pan => self.params.pan.repr(format),
            Role::Field => self.params.field.repr(format),
            Role::Octave => self.params.octave.repr(format),
            Role::Aux(index) => self
                .params
                .aux
                .get(*index)
                .ok_or_else(|| self.missing_role(role))?
                .repr(format),
            Role::Static(_) | Role::Dynamic(_) => {
                let args = self.args(role)?;
                crate::parameter::args::format_arguments(&args)
            }
        })
    }

    /// Role keys and argument texts of all parameters.
    pub fn parameters(&self) -> Result<Vec<(String, String)>, Error> {
        self.roles()
            .iter()
            .map(|role| Ok((role.key(), self.repr(role, ReprFormat::ArgsOnly)?)))
            .collect()
    }

    /// Replace the parameter object of a role from argument text. When the new object
    /// fails to build, the previous object stays in place.
    ///
    /// A single number is read as a constant; static parameters may omit their name.
    pub fn edit(&mut self, role: &str, text: &str) -> Result<(), Error> {
        let role = Role::parse(role, self.module.as_ref())?;
        let args = Argument::parse(text).map_err(Error::ParameterObjectSyntax)?;
        let args = match role {
            Role::Instrument | Role::TimeRange | Role::Static(_) => args,
            _ => constant_shorthand(args),
        };
        self.set_args(&role, args)
            .map_err(|err| err.with_context(&role.key()))
    }

    /// Replace the parameter object of a role from an argument tree.
    pub fn set_args(&mut self, role: &Role, args: Vec<Argument>) -> Result<(), Error> {
        match role {
            Role::Instrument => {
                let object = StaticObject::new(
                    Library::Static,
                    &static_args("si", "staticInst", args),
                )?;
                let inst = object.value().instrument().unwrap_or_default();
                self.orchestra.instrument_name(inst)?;
                let aux = self.default_aux(self.orchestra, inst, self.aux_count)?;
                self.instrument = object;
                self.params.aux = aux;
                self.midi_program = self.orchestra.midi_program(inst);
            }
            Role::TimeRange => {
                let args = match static_args("sr", "staticRange", args).as_slice() {
                    [name, start @ Argument::Number(_), end @ Argument::Number(_)] => {
                        vec![name.clone(), Argument::List(vec![start.clone(), end.clone()])]
                    }
                    args => args.to_vec(),
                };
                self.time_range = StaticObject::new(Library::Static, &args)?;
            }
            Role::Bpm => self.params.bpm = GeneratorObject::new(&args, &mut self.seed_source(role))?,
            Role::Rhythm => {
                self.params.rhythm = RhythmObject::new(&args, &mut self.seed_source(role))?
            }
            Role::Amplitude => {
                self.params.amp = GeneratorObject::new(&args, &mut self.seed_source(role))?
            }
            Role::Pan => self.params.pan = GeneratorObject::new(&args, &mut self.seed_source(role))?,
            Role::Field => {
                self.params.field = GeneratorObject::new(&args, &mut self.seed_source(role))?
            }
            Role::Octave => {
                self.params.octave = GeneratorObject::new(&args, &mut self.seed_source(role))?
            }
            Role::Aux(index) => {
                if *index >= self.params.aux.len() {
                    return Err(self.missing_role(role));
                }
                self.params.aux[*index] = GeneratorObject::new(&args, &mut self.seed_source(role))?;
            }
            Role::Static(long) => {
                let short = static_short_name(Library::TextureStatic, long);
                let object =
                    StaticObject::new(Library::TextureStatic, &static_args(short, long, args))?;
                let slot = self
                    .statics
                    .iter_mut()
                    .find(|existing| existing.name() == object.name())
                    .ok_or_else(|| {
                        Error::TextureState(format!("no static parameter named '{}'", long))
                    })?;
                *slot = object;
            }
            Role::Dynamic(name) => {
                let index = self
                    .params
                    .dynamics
                    .iter()
                    .position(|(dynamic, _)| dynamic == name)
                    .ok_or_else(|| self.missing_role(role))?;
                self.params.dynamics[index].1 =
                    GeneratorObject::new(&args, &mut self.seed_source(role))?;
            }
        }
        Ok(())
    }

    /// A new texture with the same configuration. All parameter objects are rebuilt from
    /// their arguments, so the copy does not share any state with this texture.
    pub fn copy(&self, name: &str) -> Result<Texture, Error> {
        let mut texture = Texture::new(
            name,
            self.module.name(),
            &self.path,
            self.orchestra,
            self.inst(),
            self.seeds,
        )?;
        texture.rebuild_from(self)?;
        Ok(texture)
    }

    /// Rebuild all parameter objects with new seeds.
    pub fn reseed(&mut self, seeds: TextureSeeds) -> Result<(), Error> {
        let mut texture = Texture::new(
            &self.name,
            self.module.name(),
            &self.path,
            self.orchestra,
            self.inst(),
            seeds,
        )?;
        texture.rebuild_from(self)?;
        texture.events = std::mem::take(&mut self.events);
        texture.time_range_abs = self.time_range_abs;
        *self = texture;
        Ok(())
    }

    fn rebuild_from(&mut self, other: &Texture) -> Result<(), Error> {
        self.aux_count = other.aux_count;
        self.temperament = other.temperament;
        self.silence = other.silence;
        self.post_map = other.post_map;
        self.polyphony = other.polyphony;
        self.midi_program = other.midi_program;
        self.midi_channel = other.midi_channel;
        self.mute = other.mute;
        if self.orchestra.has_variable_aux() {
            self.params.aux = self.default_aux(self.orchestra, self.inst(), self.aux_count)?;
        }
        for role in other.roles() {
            if role != Role::Instrument {
                self.set_args(&role, other.args(&role)?)?;
            }
        }
        Ok(())
    }

    fn seed_source(&self, role: &Role) -> SeedSource {
        seed_source(self.seeds, &self.name, role)
    }

    fn default_aux(
        &self,
        orchestra: Orchestra,
        inst: u32,
        aux_count: usize,
    ) -> Result<Vec<GeneratorObject>, Error> {
        orchestra
            .aux_parameters(inst, aux_count)?
            .iter()
            .enumerate()
            .map(|(index, aux)| {
                GeneratorObject::parse(aux.default, &mut self.seed_source(&Role::Aux(index)))
            })
            .collect()
    }

    fn missing_role(&self, role: &Role) -> Error {
        Error::TextureState(format!(
            "texture {} has no parameter {}",
            self.name,
            role.key()
        ))
    }

    // ---------------------------------------------------------------------------------------------

    /// Validate the parameter configuration against the orchestra.
    pub fn check(&self) -> Result<(), Error> {
        let inst = self.inst();
        let expected = self.orchestra.aux_parameters(inst, self.aux_count)?.len();
        if expected != self.params.aux.len() {
            return Err(Error::TextureState(format!(
                "texture {}: instrument {} expects {} aux parameters, got {}",
                self.name,
                inst,
                expected,
                self.params.aux.len()
            )));
        }
        let (start, end) = self.time_range();
        if start >= end {
            return Err(Error::TextureState(format!(
                "texture {}: empty time range",
                self.name
            )));
        }
        Ok(())
    }

    /// Create new events from the current bindings. Every dynamic parameter object and
    /// the module random stream is reset first, so equal seeds give equal scores.
    ///
    /// On failure the texture keeps no events.
    pub fn score(&mut self, path: &Path) -> Result<(), Error> {
        self.events.clear();
        self.time_range_abs = (0.0, 0.0);
        if path.name() != self.path {
            return Err(Error::PathReference(format!(
                "texture {} is bound to path {}, not {}",
                self.name,
                self.path,
                path.name()
            )));
        }
        if path.is_empty() {
            return Err(Error::PathReference(format!("path {} is empty", path.name())));
        }
        self.check()?;
        self.params.reset();
        self.random.reset();

        let (start, end) = self.time_range();
        let duration_fraction = self
            .statics
            .iter()
            .find(|object| object.name() == "pathDurationFraction")
            .and_then(|object| object.value().switch())
            .unwrap_or(true);
        let windows = if duration_fraction {
            path.time_ranges(start, end)
        } else {
            let span = (end - start) / path.len() as f64;
            (0..path.len())
                .map(|index| {
                    (
                        start + span * index as f64,
                        start + span * (index + 1) as f64,
                    )
                })
                .collect()
        };
        let groups = path.pitch_groups();
        let voices = match self.polyphony {
            PolyphonyMode::Set => vec![groups],
            PolyphonyMode::Part => {
                let count = groups.iter().map(Vec::len).max().unwrap_or(0);
                (0..count)
                    .map(|voice| {
                        groups
                            .iter()
                            .map(|chord| {
                                chord.get(voice).or(chord.last()).copied().into_iter().collect()
                            })
                            .collect()
                    })
                    .collect()
            }
        };

        let inst = self.inst();
        let mut refs = ReferenceState::default();
        refs.bpm = self
            .params
            .bpm
            .number(start, &refs)
            .map_err(|err| self.score_error("beatT", err))?;
        let mut events = Vec::new();
        for chords in voices {
            let mut scorer = Scorer {
                texture: &self.name,
                inst,
                time_range: (start, end),
                temperament: self.temperament,
                silence: self.silence,
                params: &mut self.params,
                statics: &self.statics,
                random: &mut self.random,
                path,
                chords,
                windows: windows.clone(),
                refs: refs.clone(),
                events: Vec::new(),
            };
            self.module.score(&mut scorer).map_err(|err| {
                Error::TextureState(format!("texture {}: {}", self.name, err))
            })?;
            refs = scorer.refs;
            events.append(&mut scorer.events);
        }
        sort_events(&mut events);
        self.time_range_abs = time_range_abs(&events);
        self.events = events;
        log::debug!(
            "scored texture {} with {} events",
            self.name,
            self.events.len()
        );
        Ok(())
    }

    fn score_error(&self, role: &str, err: String) -> Error {
        Error::TextureState(format!("texture {}: {}: {}", self.name, role, err))
    }
}

// -------------------------------------------------------------------------------------------------

/// One rhythm step: tempo, symbolic pulse and the realized values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    pub bpm: f64,
    pub pulse: Option<Pulse>,
    pub dur: f64,
    pub sus: f64,
    pub acc: f64,
}

impl Beat {
    pub fn is_rest(&self) -> bool {
        self.acc == 0.0
    }
}

fn context(role: &'static str) -> impl Fn(String) -> String {
    move |err| format!("{}: {}", role, err)
}

/// The scheduling context passed to texture modules: the bound parameter objects, the
/// path split into time windows and the reference state of the running score.
pub struct Scorer<'a> {
    texture: &'a str,
    inst: u32,
    time_range: (f64, f64),
    temperament: Temperament,
    silence: bool,
    params: &'a mut Parameters,
    statics: &'a [StaticObject],
    random: &'a mut RandomStream,
    path: &'a Path,
    chords: Vec<Vec<f64>>,
    windows: Vec<(f64, f64)>,
    refs: ReferenceState,
    events: Vec<Event>,
}

impl Scorer<'_> {
    /// Texture time range in seconds.
    pub fn time_range(&self) -> (f64, f64) {
        self.time_range
    }

    /// Number of path positions.
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Pitches of a path position, as read by the current voice.
    pub fn chord(&self, position: usize) -> &[f64] {
        self.chords.get(position).map_or(&[], Vec::as_slice)
    }

    /// Time window of a path position.
    pub fn window(&self, position: usize) -> (f64, f64) {
        self.windows.get(position).copied().unwrap_or(self.time_range)
    }

    /// Position whose window contains the time; the last position for later times.
    pub fn position_at(&self, time: f64) -> usize {
        self.windows
            .iter()
            .position(|(_, end)| time < *end)
            .unwrap_or(self.windows.len().saturating_sub(1))
    }

    /// True when rests are kept as silent events.
    pub fn is_silence(&self) -> bool {
        self.silence
    }

    /// The texture module random stream.
    pub fn random(&mut self) -> &mut RandomStream {
        self.random
    }

    // ---------------------------------------------------------------------------------------------

    pub fn static_value(&self, short: &str) -> Result<&StaticValue, String> {
        let long = static_short_name_reverse(short);
        self.statics
            .iter()
            .find(|object| object.name() == long)
            .map(StaticObject::value)
            .ok_or_else(|| format!("missing static parameter '{}'", short))
    }

    fn typed_static<T>(
        &self,
        short: &str,
        get: impl Fn(&StaticValue) -> Option<T>,
    ) -> Result<T, String> {
        get(self.static_value(short)?)
            .ok_or_else(|| format!("static parameter '{}' has an unexpected value", short))
    }

    pub fn selection(&self, short: &str) -> Result<SelectionMode, String> {
        self.typed_static(short, StaticValue::selection)
    }

    pub fn level(&self, short: &str) -> Result<Level, String> {
        self.typed_static(short, StaticValue::level)
    }

    pub fn polyphonic_level(&self, short: &str) -> Result<PolyphonicLevel, String> {
        self.typed_static(short, StaticValue::polyphonic_level)
    }

    pub fn seconds(&self, short: &str) -> Result<f64, String> {
        self.typed_static(short, StaticValue::seconds)
    }

    pub fn count(&self, short: &str) -> Result<usize, String> {
        self.typed_static(short, StaticValue::count)
    }

    pub fn event_partition(&self, short: &str) -> Result<EventPartition, String> {
        self.typed_static(short, StaticValue::event_partition)
    }

    pub fn density_partition(&self, short: &str) -> Result<DensityPartition, String> {
        self.typed_static(short, StaticValue::density_partition)
    }

    pub fn event_count_level(&self, short: &str) -> Result<EventCountLevel, String> {
        self.typed_static(short, StaticValue::event_count_level)
    }

    /// Transpositions and time delay of parallel voices.
    pub fn parallel_motion(&self, short: &str) -> Result<(Vec<f64>, f64), String> {
        self.typed_static(short, |value| {
            value
                .parallel_motion()
                .map(|(transpositions, delay)| (transpositions.to_vec(), delay))
        })
    }

    // ---------------------------------------------------------------------------------------------

    /// Make a path position the active multiset.
    pub fn set_position(&mut self, position: usize) {
        self.refs.multiset = self.path.multiset(position).cloned();
    }

    /// Make a pitch the current raw pitch.
    pub fn set_pitch(&mut self, ps: f64) {
        self.refs.pitch_previous = self.refs.pitch_raw;
        self.refs.pitch_raw = Some(ps);
    }

    /// Evaluate tempo and rhythm. Durations must be positive.
    pub fn beat(&mut self, t: f64) -> Result<Beat, String> {
        let bpm = self
            .params
            .bpm
            .number(t, &self.refs)
            .map_err(context("beatT"))?;
        if !(bpm > 0.0) {
            return Err(format!("beatT: invalid tempo {}", bpm));
        }
        self.refs.bpm = bpm;
        let realized = self
            .params
            .rhythm
            .run(t, &self.refs)
            .map_err(context("rhythmQ"))?;
        if !(realized.dur > 0.0) {
            return Err(format!(
                "rhythmQ: non-positive duration {} at time {}",
                realized.dur, t
            ));
        }
        Ok(Beat {
            bpm,
            pulse: self.params.rhythm.current_pulse(),
            dur: realized.dur,
            sus: realized.sus,
            acc: realized.acc,
        })
    }

    /// A beat which bypasses the rhythm: one accented, fully sustained pulse of the given
    /// duration at the current tempo.
    pub fn sustained_beat(&self, dur: f64) -> Beat {
        Beat {
            bpm: self.refs.bpm,
            pulse: None,
            dur,
            sus: dur,
            acc: 1.0,
        }
    }

    pub fn field(&mut self, t: f64) -> Result<f64, String> {
        self.params.field.number(t, &self.refs).map_err(context("fieldQ"))
    }

    /// Octave, rounded to an integer.
    pub fn octave(&mut self, t: f64) -> Result<f64, String> {
        self.params
            .octave
            .number(t, &self.refs)
            .map(f64::round)
            .map_err(context("octQ"))
    }

    pub fn amp(&mut self, t: f64) -> Result<f64, String> {
        self.params.amp.number(t, &self.refs).map_err(context("ampQ"))
    }

    pub fn pan(&mut self, t: f64) -> Result<f64, String> {
        self.params.pan.number(t, &self.refs).map_err(context("panQ"))
    }

    pub fn aux(&mut self, t: f64) -> Result<Vec<Value>, String> {
        let refs = &self.refs;
        self.params
            .aux
            .iter_mut()
            .enumerate()
            .map(|(index, aux)| {
                aux.run(t, refs)
                    .map_err(|err| format!("auxQ{}: {}", index, err))
            })
            .collect()
    }

    /// Evaluate a module specific generator.
    pub fn dynamic(&mut self, name: &str, t: f64) -> Result<f64, String> {
        let refs = &self.refs;
        let (_, object) = self
            .params
            .dynamics
            .iter_mut()
            .find(|(dynamic, _)| *dynamic == name)
            .ok_or_else(|| format!("missing parameter '{}'", name))?;
        object
            .number(t, refs)
            .map_err(|err| format!("{}: {}", name, err))
    }

    /// Apply octave, field and temperament to a raw pitch.
    pub fn realize_pitch(&mut self, ps: f64, field: f64, octave: f64) -> f64 {
        self.temperament
            .apply(octave * 12.0 + field + ps, self.random)
    }

    /// A gaussian time offset within `[-max, max]`.
    pub fn time_offset(&mut self, max: f64) -> f64 {
        let unit = self.random.gauss(0.5, 0.1).clamp(0.0, 1.0);
        (unit * 2.0 - 1.0) * max
    }

    /// Round to an integer, rounding up with a probability of the fractional part.
    pub fn weighted_round(&mut self, value: f64) -> i64 {
        let floor = value.floor();
        if self.random.unit() < value - floor {
            floor as i64 + 1
        } else {
            floor as i64
        }
    }

    // ---------------------------------------------------------------------------------------------

    /// An event from the given values, without evaluating any parameter.
    pub fn new_event(
        &self,
        time: f64,
        beat: &Beat,
        ps: f64,
        amp: f64,
        pan: f64,
        aux: Vec<Value>,
    ) -> Event {
        Event {
            time,
            bpm: beat.bpm,
            pulse: beat.pulse,
            dur: beat.dur,
            sus: beat.sus,
            acc: beat.acc,
            amp,
            ps,
            pan,
            aux,
            inst: self.inst,
            texture: self.texture.to_string(),
            clone: None,
        }
    }

    /// An event with amplitude, pan and aux values evaluated at time `t`.
    /// The amplitude gets scaled by the accent.
    pub fn event(&mut self, t: f64, beat: &Beat, ps: f64) -> Result<Event, String> {
        let amp = self.amp(t)? * beat.acc;
        let pan = self.pan(t)?;
        let aux = self.aux(t)?;
        Ok(self.new_event(t, beat, ps, amp, pan, aux))
    }

    /// Run the rhythm's event hook and keep the event. Events with an empty file path
    /// in their aux values are silenced.
    pub fn store(&mut self, mut event: Event) -> Result<(), String> {
        if self.events.len() >= EVENT_LIMIT {
            return Err(format!("more than {} events", EVENT_LIMIT));
        }
        self.refs.pitch_post = Some(event.ps);
        self.params.rhythm.post_event(&mut event, &self.refs);
        if event.aux.iter().any(is_empty_path) {
            log::warn!(
                "texture {}: missing file at time {}, event is silenced",
                self.texture,
                event.time
            );
            event.amp = 0.0;
        }
        self.events.push(event);
        Ok(())
    }
}

fn static_short_name_reverse(short: &str) -> &'static str {
    names(Library::TextureStatic)
        .into_iter()
        .find(|(name, long)| name.eq_ignore_ascii_case(short) || long.eq_ignore_ascii_case(short))
        .map_or("", |(_, long)| long)
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn new_texture(module: &str) -> Result<(Texture, Path), Error> {
        let path = Path::from_strings("a", &["3-2", "c,e,g"]).map_err(Error::PitchSyntax)?;
        let texture = Texture::new(
            "t",
            module,
            "a",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds {
                parameter: 1,
                module: 2,
            },
        )?;
        Ok((texture, path))
    }

    #[test]
    fn module_lookup() {
        assert_eq!(texture_module("lg").map(|m| m.name()), Ok("LineGroove"));
        assert_eq!(texture_module("TimeFill").map(|m| m.name()), Ok("TimeFill"));
        assert!(texture_module("xx").is_err());
    }

    #[test]
    fn every_module_scores_with_defaults() -> Result<(), Error> {
        for (short, long) in texture_module_names() {
            assert_eq!(texture_module(long).map(|m| m.name()), Ok(long));
            let (mut texture, path) = new_texture(short)?;
            texture.score(&path)?;
            assert!(!texture.events().is_empty(), "{} made no events", long);
        }
        Ok(())
    }

    #[test]
    fn roles() -> Result<(), Error> {
        let (texture, _) = new_texture("lg")?;
        let module = texture.module();
        assert_eq!(Role::parse("r", module)?, Role::Rhythm);
        assert_eq!(Role::parse("auxQ2", module)?, Role::Aux(2));
        assert_eq!(Role::parse("x0", module)?, Role::Aux(0));
        assert_eq!(Role::parse("psc", module)?, Role::Static("pitchSelectorControl"));
        assert!(Role::parse("fillGenerator", module).is_err());
        let (texture, _) = new_texture("tf")?;
        assert_eq!(
            Role::parse("fillgenerator", texture.module())?,
            Role::Dynamic("fillGenerator")
        );
        Ok(())
    }

    #[test]
    fn defaults() -> Result<(), Error> {
        let (texture, _) = new_texture("lg")?;
        assert_eq!(texture.time_range(), (0.0, 20.0));
        assert_eq!(texture.aux_count(), 0);
        assert_eq!(texture.midi_program(), Some(0));
        assert_eq!(texture.repr(&Role::Pan, ReprFormat::ArgsOnly)?, "constant, 0.5");
        Ok(())
    }

    #[test]
    fn score_line_groove() -> Result<(), Error> {
        let (mut texture, path) = new_texture("lg")?;
        texture.score(&path)?;
        let events = texture.events();
        assert!(!events.is_empty());
        assert_eq!(events[0].time, 0.0);
        assert!(events.iter().all(|e| e.time < 20.0));
        assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
        assert!(events.iter().all(|e| e.acc > 0.0 && e.texture == "t"));
        Ok(())
    }

    #[test]
    fn rescore_is_deterministic() -> Result<(), Error> {
        let (mut texture, path) = new_texture("lg")?;
        texture.score(&path)?;
        let first = texture.events().to_vec();
        texture.score(&path)?;
        assert_eq!(first, texture.events());
        Ok(())
    }

    #[test]
    fn edit_keeps_previous_object_on_failure() -> Result<(), Error> {
        let (mut texture, _) = new_texture("lg")?;
        texture.edit("a", ".5")?;
        assert_eq!(texture.repr(&Role::Amplitude, ReprFormat::ArgsOnly)?, "constant, 0.5");
        assert!(texture.edit("a", "ru, x").is_err());
        assert_eq!(texture.repr(&Role::Amplitude, ReprFormat::ArgsOnly)?, "constant, 0.5");
        texture.edit("t", "5, 10")?;
        assert_eq!(texture.time_range(), (5.0, 10.0));
        texture.edit("psc", "oc")?;
        assert_eq!(
            texture.repr(&Role::Static("pitchSelectorControl"), ReprFormat::ArgsOnly)?,
            "pitchSelectorControl, orderedCyclic"
        );
        Ok(())
    }

    #[test]
    fn copy_is_independent() -> Result<(), Error> {
        let (mut texture, _) = new_texture("lg")?;
        texture.edit("r", "l, ((4,1,1))")?;
        let copy = texture.copy("u")?;
        assert_eq!(texture.parameters()?, copy.parameters()?);
        texture.edit("r", "l, ((2,1,1))")?;
        assert_ne!(
            texture.repr(&Role::Rhythm, ReprFormat::ArgsOnly)?,
            copy.repr(&Role::Rhythm, ReprFormat::ArgsOnly)?
        );
        assert_eq!(copy.path(), "a");
        Ok(())
    }

    #[test]
    fn silence_keeps_rests() -> Result<(), Error> {
        let (mut texture, path) = new_texture("lg")?;
        texture.edit("r", "l, ((4,1,1),(4,1,0))")?;
        texture.score(&path)?;
        let sounding = texture.events().len();
        assert!(texture.events().iter().all(|e| !e.is_rest()));
        texture.set_silence(true);
        texture.score(&path)?;
        assert_eq!(texture.events().len(), sounding * 2);
        Ok(())
    }

    #[test]
    fn part_polyphony_splits_voices() -> Result<(), Error> {
        let (mut texture, path) = new_texture("lg")?;
        texture.edit("r", "l, ((1,1,1))")?;
        texture.set_polyphony(PolyphonyMode::Part);
        texture.score(&path)?;
        assert_eq!(texture.events().len(), 3 * 40);
        Ok(())
    }

    #[test]
    fn wrong_path_fails() -> Result<(), Error> {
        let (mut texture, _) = new_texture("lg")?;
        let other = Path::from_strings("b", &["c"]).map_err(Error::PitchSyntax)?;
        assert!(matches!(
            texture.score(&other),
            Err(Error::PathReference(_))
        ));
        Ok(())
    }
}
