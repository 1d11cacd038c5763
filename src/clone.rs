//! Clones: filtered replays of the events of a texture.

use crate::{
    error::Error,
    event::{retrograde, sort_events, time_range_abs, Event},
    parameter::{
        args::{format_arguments, Argument},
        options::TimeReference,
        FilterObject, Library, ReferenceState, ReprFormat, StaticObject, Value,
    },
    seed::{derive_seed, SeedSource},
    texture::Texture,
};

// -------------------------------------------------------------------------------------------------

/// Shift every event by one quarter note at the event's tempo.
const DEFAULT_TIME: &str = "fa, (l, ((1, 1, 1)))";
const DEFAULT_FILTER: &str = "b";

/// An editable parameter slot of a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneRole {
    Time,
    Sustain,
    Accent,
    Amplitude,
    Pan,
    Field,
    Octave,
    Aux(usize),
    /// A clone static, by long name.
    Static(&'static str),
}

impl CloneRole {
    pub fn parse(name: &str) -> Result<Self, Error> {
        let lower = name.trim().to_ascii_lowercase();
        let role = match lower.as_str() {
            "t" | "time" => CloneRole::Time,
            "s" | "sus" | "sustain" => CloneRole::Sustain,
            "c" | "acc" | "accent" => CloneRole::Accent,
            "a" | "ampq" | "amplitude" => CloneRole::Amplitude,
            "n" | "panq" | "pan" => CloneRole::Pan,
            "f" | "fieldq" | "field" => CloneRole::Field,
            "o" | "octq" | "octave" => CloneRole::Octave,
            "trs" | "timereferencesource" => CloneRole::Static("timeReferenceSource"),
            "rmt" | "retrogrademethodtoggle" => CloneRole::Static("retrogradeMethodToggle"),
            _ => lower
                .strip_prefix("auxq")
                .or_else(|| lower.strip_prefix('x'))
                .and_then(|index| index.parse::<usize>().ok())
                .map(CloneRole::Aux)
                .ok_or_else(|| {
                    Error::TextureState(format!("no clone parameter named '{}'", name))
                })?,
        };
        Ok(role)
    }

    pub fn key(&self) -> String {
        match self {
            CloneRole::Time => "time".to_string(),
            CloneRole::Sustain => "sus".to_string(),
            CloneRole::Accent => "acc".to_string(),
            CloneRole::Amplitude => "ampQ".to_string(),
            CloneRole::Pan => "panQ".to_string(),
            CloneRole::Field => "fieldQ".to_string(),
            CloneRole::Octave => "octQ".to_string(),
            CloneRole::Aux(index) => format!("auxQ{}", index),
            CloneRole::Static(name) => name.to_string(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A clone of a texture: replays the texture's last score through a bank of filters.
#[derive(Debug)]
pub struct TextureClone {
    name: String,
    texture: String,
    seed: u64,
    mute: bool,
    time: FilterObject,
    sus: FilterObject,
    acc: FilterObject,
    amp: FilterObject,
    pan: FilterObject,
    field: FilterObject,
    octave: FilterObject,
    aux: Vec<FilterObject>,
    time_reference: StaticObject,
    retrograde: StaticObject,
    events: Vec<Event>,
    time_range_abs: (f64, f64),
}

impl TextureClone {
    /// Create a clone of the texture with default filters.
    pub fn new(name: &str, texture: &Texture, seed: u64) -> Result<Self, Error> {
        let filter = |role: CloneRole, text: &str| {
            FilterObject::parse(text, &mut seed_source(seed, texture.name(), name, &role))
                .map_err(|err| err.with_context(&role.key()))
        };
        let aux = (0..texture.aux_count())
            .map(|index| filter(CloneRole::Aux(index), DEFAULT_FILTER))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            texture: texture.name().to_string(),
            seed,
            mute: false,
            time: filter(CloneRole::Time, DEFAULT_TIME)?,
            sus: filter(CloneRole::Sustain, DEFAULT_FILTER)?,
            acc: filter(CloneRole::Accent, DEFAULT_FILTER)?,
            amp: filter(CloneRole::Amplitude, DEFAULT_FILTER)?,
            pan: filter(CloneRole::Pan, DEFAULT_FILTER)?,
            field: filter(CloneRole::Field, DEFAULT_FILTER)?,
            octave: filter(CloneRole::Octave, DEFAULT_FILTER)?,
            aux,
            time_reference: StaticObject::parse(Library::CloneStatic, "trs")?,
            retrograde: StaticObject::parse(Library::CloneStatic, "rmt")?,
            events: Vec::new(),
            time_range_abs: (0.0, 0.0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the clone. Filters are rebuilt, as their random streams derive from the name.
    /// Events of the last score are kept.
    pub fn rename(&mut self, name: &str, texture: &Texture) -> Result<(), Error> {
        let mut clone = self.rebuild(name, texture, self.seed)?;
        clone.events = std::mem::take(&mut self.events);
        clone.time_range_abs = self.time_range_abs;
        *self = clone;
        Ok(())
    }

    /// Name of the parent texture.
    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn set_texture(&mut self, texture: &str) {
        self.texture = texture.to_string();
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn time_range_abs(&self) -> (f64, f64) {
        self.time_range_abs
    }

    pub fn aux_count(&self) -> usize {
        self.aux.len()
    }

    /// Match the aux filters to the parent's aux count: existing filters are kept, new
    /// ones bypass.
    pub fn set_aux_count(&mut self, count: usize) -> Result<(), Error> {
        self.aux.truncate(count);
        for index in self.aux.len()..count {
            let role = CloneRole::Aux(index);
            self.aux
                .push(FilterObject::parse(DEFAULT_FILTER, &mut self.seed_source(&role))?);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------

    /// All editable roles, in display order.
    pub fn roles(&self) -> Vec<CloneRole> {
        let mut roles = vec![
            CloneRole::Time,
            CloneRole::Sustain,
            CloneRole::Accent,
            CloneRole::Amplitude,
            CloneRole::Pan,
            CloneRole::Field,
            CloneRole::Octave,
        ];
        roles.extend((0..self.aux.len()).map(CloneRole::Aux));
        roles.push(CloneRole::Static("timeReferenceSource"));
        roles.push(CloneRole::Static("retrogradeMethodToggle"));
        roles
    }

    fn filter(&self, role: &CloneRole) -> Result<&FilterObject, Error> {
        match role {
            CloneRole::Time => Ok(&self.time),
            CloneRole::Sustain => Ok(&self.sus),
            CloneRole::Accent => Ok(&self.acc),
            CloneRole::Amplitude => Ok(&self.amp),
            CloneRole::Pan => Ok(&self.pan),
            CloneRole::Field => Ok(&self.field),
            CloneRole::Octave => Ok(&self.octave),
            CloneRole::Aux(index) => self.aux.get(*index).ok_or_else(|| self.missing_role(role)),
            CloneRole::Static(_) => Err(self.missing_role(role)),
        }
    }

    fn static_object(&self, role: &CloneRole) -> Result<&StaticObject, Error> {
        match role {
            CloneRole::Static("timeReferenceSource") => Ok(&self.time_reference),
            CloneRole::Static("retrogradeMethodToggle") => Ok(&self.retrograde),
            _ => Err(self.missing_role(role)),
        }
    }

    pub fn args(&self, role: &CloneRole) -> Result<Vec<Argument>, Error> {
        match role {
            CloneRole::Static(_) => Ok(self.static_object(role)?.args().to_vec()),
            _ => Ok(self.filter(role)?.args().to_vec()),
        }
    }

    pub fn repr(&self, role: &CloneRole, format: ReprFormat) -> Result<String, Error> {
        match role {
            CloneRole::Static(_) => Ok(format_arguments(self.static_object(role)?.args())),
            _ => Ok(self.filter(role)?.repr(format)),
        }
    }

    /// Role keys and argument texts of all parameters.
    pub fn parameters(&self) -> Result<Vec<(String, String)>, Error> {
        self.roles()
            .iter()
            .map(|role| Ok((role.key(), self.repr(role, ReprFormat::ArgsOnly)?)))
            .collect()
    }

    /// Replace a filter or clone static from argument text. On failure the previous
    /// object stays in place.
    pub fn edit(&mut self, role: &str, text: &str) -> Result<(), Error> {
        let role = CloneRole::parse(role)?;
        let args = Argument::parse(text).map_err(Error::ParameterObjectSyntax)?;
        self.set_args(&role, args)
            .map_err(|err| err.with_context(&role.key()))
    }

    pub fn set_args(&mut self, role: &CloneRole, mut args: Vec<Argument>) -> Result<(), Error> {
        if let CloneRole::Static(long) = role {
            let short = match *long {
                "timeReferenceSource" => "trs",
                _ => "rmt",
            };
            let named = args.first().and_then(Argument::as_text).is_some_and(|name| {
                name.eq_ignore_ascii_case(short) || name.eq_ignore_ascii_case(long)
            });
            if !named {
                args.insert(0, Argument::Text(long.to_string()));
            }
            let object = StaticObject::new(Library::CloneStatic, &args)?;
            match *long {
                "timeReferenceSource" => self.time_reference = object,
                _ => self.retrograde = object,
            }
            return Ok(());
        }
        let object = FilterObject::new(&args, &mut self.seed_source(role))?;
        match role {
            CloneRole::Time => self.time = object,
            CloneRole::Sustain => self.sus = object,
            CloneRole::Accent => self.acc = object,
            CloneRole::Amplitude => self.amp = object,
            CloneRole::Pan => self.pan = object,
            CloneRole::Field => self.field = object,
            CloneRole::Octave => self.octave = object,
            CloneRole::Aux(index) => match self.aux.get_mut(*index) {
                Some(slot) => *slot = object,
                None => return Err(self.missing_role(role)),
            },
            CloneRole::Static(_) => return Err(self.missing_role(role)),
        }
        Ok(())
    }

    /// A new clone of the same texture with all filters rebuilt from their arguments.
    pub fn copy(&self, name: &str, texture: &Texture) -> Result<TextureClone, Error> {
        self.rebuild(name, texture, self.seed)
    }

    /// Rebuild all filters with a new seed. Events of the last score are kept.
    pub fn reseed(&mut self, seed: u64, texture: &Texture) -> Result<(), Error> {
        let mut clone = self.rebuild(&self.name, texture, seed)?;
        clone.events = std::mem::take(&mut self.events);
        clone.time_range_abs = self.time_range_abs;
        *self = clone;
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn rebuild(&self, name: &str, texture: &Texture, seed: u64) -> Result<TextureClone, Error> {
        let mut clone = TextureClone::new(name, texture, seed)?;
        clone.set_aux_count(self.aux.len())?;
        clone.mute = self.mute;
        for role in self.roles() {
            clone.set_args(&role, self.args(&role)?)?;
        }
        Ok(clone)
    }

    fn seed_source(&self, role: &CloneRole) -> SeedSource {
        seed_source(self.seed, &self.texture, &self.name, role)
    }

    fn missing_role(&self, role: &CloneRole) -> Error {
        Error::TextureState(format!(
            "clone {} has no parameter {}",
            self.name,
            role.key()
        ))
    }

    // ---------------------------------------------------------------------------------------------

    /// Replay the parent texture's events through the filters.
    ///
    /// On failure the clone keeps no events.
    pub fn score(&mut self, texture: &Texture) -> Result<(), Error> {
        self.events.clear();
        self.time_range_abs = (0.0, 0.0);
        self.score_events(texture).map_err(|err| {
            Error::TextureState(format!(
                "clone {} of texture {}: {}",
                self.name, self.texture, err
            ))
        })?;
        log::debug!(
            "scored clone {} of texture {} with {} events",
            self.name,
            self.texture,
            self.events.len()
        );
        Ok(())
    }

    fn score_events(&mut self, texture: &Texture) -> Result<(), String> {
        if texture.events().is_empty() {
            return Err("texture has no events".to_string());
        }
        if texture.aux_count() != self.aux.len() {
            return Err(format!(
                "texture has {} aux parameters, clone has {}",
                texture.aux_count(),
                self.aux.len()
            ));
        }
        for filter in [
            &mut self.time,
            &mut self.sus,
            &mut self.acc,
            &mut self.amp,
            &mut self.pan,
            &mut self.field,
            &mut self.octave,
        ] {
            filter.reset();
        }
        for filter in &mut self.aux {
            filter.reset();
        }

        let mut events = texture.events().to_vec();
        if let Some(method) = self.retrograde.value().retrograde() {
            retrograde(&mut events, method);
        }
        let refs = events
            .iter()
            .map(|event| ReferenceState {
                pitch_post: Some(event.ps),
                ..ReferenceState::with_bpm(event.bpm)
            })
            .collect::<Vec<_>>();

        let times_pre = events.iter().map(|event| event.time).collect::<Vec<_>>();
        let times_post = numbers(self.time.run(&column(&times_pre), &times_pre, &refs))
            .map_err(|err| format!("time: {}", err))?;
        let times = match self.time_reference.value().time_reference() {
            Some(TimeReference::CloneTime) => times_post.clone(),
            _ => times_pre,
        };

        let filter = |filter: &mut FilterObject, values: Vec<f64>, role: &str| {
            numbers(filter.run(&column(&values), &times, &refs))
                .map_err(|err| format!("{}: {}", role, err))
        };
        let sus = filter(&mut self.sus, events.iter().map(|e| e.sus).collect(), "sus")?;
        let acc = filter(&mut self.acc, events.iter().map(|e| e.acc).collect(), "acc")?;
        let amp = filter(&mut self.amp, events.iter().map(|e| e.amp).collect(), "ampQ")?;
        let pan = filter(&mut self.pan, events.iter().map(|e| e.pan).collect(), "panQ")?;
        let ps = filter(&mut self.field, events.iter().map(|e| e.ps).collect(), "fieldQ")?;
        let octaves = filter(
            &mut self.octave,
            ps.iter().map(|ps| ps.div_euclid(12.0)).collect(),
            "octQ",
        )?;
        let mut aux = Vec::with_capacity(self.aux.len());
        for (index, aux_filter) in self.aux.iter_mut().enumerate() {
            let values = events
                .iter()
                .map(|event| event.aux.get(index).cloned().unwrap_or(Value::Number(0.0)))
                .collect::<Vec<_>>();
            aux.push(
                aux_filter
                    .run(&values, &times, &refs)
                    .map_err(|err| format!("auxQ{}: {}", index, err))?,
            );
        }

        for (index, event) in events.iter_mut().enumerate() {
            event.time = times_post[index];
            event.sus = sus[index];
            event.acc = acc[index];
            event.amp = amp[index];
            event.pan = if (0.0..=1.0).contains(&pan[index]) {
                pan[index]
            } else {
                pan[index].rem_euclid(1.0)
            };
            event.ps = octaves[index] * 12.0 + ps[index].rem_euclid(12.0);
            for (column, values) in aux.iter().enumerate() {
                if let Some(value) = event.aux.get_mut(column) {
                    *value = values[index].clone();
                }
            }
            event.clone = Some(self.name.clone());
        }
        sort_events(&mut events);
        self.time_range_abs = time_range_abs(&events);
        self.events = events;
        Ok(())
    }
}

fn seed_source(seed: u64, texture: &str, clone: &str, role: &CloneRole) -> SeedSource {
    SeedSource::new(derive_seed(
        seed,
        &format!("{}/{}:{}", texture, clone, role.key()),
    ))
}

fn column(values: &[f64]) -> Vec<Value> {
    values.iter().copied().map(Value::Number).collect()
}

fn numbers(values: Result<Vec<Value>, String>) -> Result<Vec<f64>, String> {
    values?.iter().map(Value::number).collect()
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{orchestra::Orchestra, path::Path, texture::TextureSeeds};

    fn scored_texture() -> Result<(Texture, Path), Error> {
        let path = Path::from_strings("p", &["c,e,g"]).map_err(Error::PitchSyntax)?;
        let mut texture = Texture::new(
            "t",
            "lg",
            "p",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds::default(),
        )?;
        texture.edit("r", "l, ((1,1,1))")?;
        texture.edit("t", "0, 2")?;
        texture.edit("psc", "oc")?;
        texture.score(&path)?;
        Ok((texture, path))
    }

    #[test]
    fn default_shifts_by_a_beat() -> Result<(), Error> {
        let (texture, _) = scored_texture()?;
        let mut clone = TextureClone::new("c", &texture, 0)?;
        clone.score(&texture)?;
        let times = clone.events().iter().map(|e| e.time).collect::<Vec<_>>();
        assert_eq!(times, vec![0.5, 1.0, 1.5, 2.0]);
        assert_eq!(clone.time_range_abs().0, 0.5);
        assert!(clone.events().iter().all(|e| e.clone.as_deref() == Some("c")));
        Ok(())
    }

    #[test]
    fn pitch_filters() -> Result<(), Error> {
        let (texture, _) = scored_texture()?;
        let mut clone = TextureClone::new("c", &texture, 0)?;
        clone.edit("f", "fa, (c, 2)")?;
        clone.edit("o", "fa, (c, 1)")?;
        clone.score(&texture)?;
        let pitches = clone.events().iter().map(|e| e.ps).collect::<Vec<_>>();
        assert_eq!(pitches, vec![14.0, 18.0, 21.0, 14.0]);
        Ok(())
    }

    #[test]
    fn pan_wraps() -> Result<(), Error> {
        let (texture, _) = scored_texture()?;
        let mut clone = TextureClone::new("c", &texture, 0)?;
        clone.edit("n", "fa, (c, .75)")?;
        clone.score(&texture)?;
        assert!(clone
            .events()
            .iter()
            .all(|e| (e.pan - 0.25).abs() < 1e-9));
        Ok(())
    }

    #[test]
    fn retrograde_toggle() -> Result<(), Error> {
        let (texture, _) = scored_texture()?;
        let mut clone = TextureClone::new("c", &texture, 0)?;
        clone.edit("time", "b")?;
        clone.edit("rmt", "eventInverse")?;
        clone.score(&texture)?;
        let pitches = clone.events().iter().map(|e| e.ps).collect::<Vec<_>>();
        assert_eq!(pitches, vec![0.0, 7.0, 4.0, 0.0]);
        Ok(())
    }

    #[test]
    fn empty_texture_fails() -> Result<(), Error> {
        let texture = Texture::new(
            "t",
            "lg",
            "p",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds::default(),
        )?;
        let mut clone = TextureClone::new("c", &texture, 0)?;
        assert!(matches!(clone.score(&texture), Err(Error::TextureState(_))));
        Ok(())
    }

    #[test]
    fn copy_keeps_configuration() -> Result<(), Error> {
        let (texture, _) = scored_texture()?;
        let mut clone = TextureClone::new("c", &texture, 0)?;
        clone.edit("a", "fm, (c, .5)")?;
        clone.edit("trs", "ct")?;
        let copy = clone.copy("d", &texture)?;
        assert_eq!(clone.parameters()?, copy.parameters()?);
        assert_eq!(copy.name(), "d");
        Ok(())
    }
}
