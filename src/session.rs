//! The session: libraries of paths, textures and clones, global options and the random
//! seeds, plus persistence of all of it as a JSON document.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    clone::{CloneRole, TextureClone},
    error::Error,
    event_list::{EventList, EventMode, OutputFormat},
    multiset::{Multiset, SetClass},
    orchestra::Orchestra,
    path::Path,
    seed::resolve_seed,
    temperament::Temperament,
    texture::{PolyphonyMode, Role, Texture, TextureSeeds},
    writer::{default_writers, WriteReport},
};

// -------------------------------------------------------------------------------------------------

/// Set class identity used when describing paths: transposition only, or transposition
/// and inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TuningMode {
    #[default]
    Tn,
    TnI,
}

/// Global session options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    pub tuning: TuningMode,
    pub event_mode: EventMode,
    pub audio_channels: u32,
    pub audio_rate: u32,
    pub author: String,
    /// Seed of the texture module streams. `None` picks a random seed.
    pub texture_seed: Option<u64>,
    /// Seed of the parameter object streams. `None` picks a random seed.
    pub parameter_seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tuning: TuningMode::default(),
            event_mode: EventMode::default(),
            audio_channels: 2,
            audio_rate: 44100,
            author: String::new(),
            texture_seed: None,
            parameter_seed: None,
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AthenaSection {
    #[serde(flatten)]
    options: SessionOptions,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathRecord {
    name: String,
    multisets: Vec<Vec<f64>>,
    durations: Vec<f64>,
    #[serde(default)]
    active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextureRecord {
    name: String,
    module: String,
    path: String,
    inst: u32,
    orchestra: Orchestra,
    #[serde(default)]
    temperament: Option<String>,
    #[serde(default)]
    silence: bool,
    #[serde(default = "default_true")]
    post_map: bool,
    #[serde(default)]
    polyphony: Option<String>,
    #[serde(default)]
    aux_count: usize,
    #[serde(default)]
    midi_program: Option<u8>,
    #[serde(default)]
    midi_channel: Option<u8>,
    #[serde(default)]
    mute: bool,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloneRecord {
    texture: String,
    name: String,
    #[serde(default)]
    mute: bool,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
}

/// The persisted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDocument {
    athena: AthenaSection,
    #[serde(default)]
    path: Vec<PathRecord>,
    #[serde(default)]
    texture: Vec<TextureRecord>,
    #[serde(default)]
    clone: Vec<CloneRecord>,
}

fn default_true() -> bool {
    true
}

/// Rewrite names of older documents before anything gets constructed.
fn migrate(document: &mut SessionDocument) {
    for texture in &mut document.texture {
        let module = match texture.module.to_ascii_lowercase().as_str() {
            "literalhorizontal" => Some("LineGroove"),
            "literalvertical" => Some("HarmonicAssembly"),
            _ => None,
        };
        if let Some(module) = module {
            log::info!("texture {}: module {} is now {}", texture.name, texture.module, module);
            texture.module = module.to_string();
        }
        texture.parameters.remove("textQ");
        if let Some(value) = texture.parameters.remove("pitchSelector") {
            texture
                .parameters
                .insert("pitchSelectorControl".to_string(), value);
        }
    }
    let aux_counts = document
        .texture
        .iter()
        .map(|texture| (texture.name.clone(), texture.aux_count))
        .collect::<BTreeMap<_, _>>();
    for clone in &mut document.clone {
        let aux_count = aux_counts.get(&clone.texture).copied().unwrap_or(0);
        clone.parameters.retain(|key, _| {
            key.strip_prefix("auxQ")
                .and_then(|index| index.parse::<usize>().ok())
                .map_or(true, |index| index < aux_count)
        });
    }
}

// -------------------------------------------------------------------------------------------------

/// Owns all paths, textures and clones of a composition.
///
/// Textures reference paths by name, clones reference textures by name. The reference count
/// of each path always equals the number of textures bound to it.
#[derive(Debug)]
pub struct Session {
    options: SessionOptions,
    texture_seed: u64,
    parameter_seed: u64,
    paths: Vec<Path>,
    active_path: Option<String>,
    textures: Vec<Texture>,
    active_texture: Option<String>,
    clones: Vec<TextureClone>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    /// Create an empty session. Missing seeds are picked randomly and written back into
    /// the options, so a saved session reloads with the same seeds.
    pub fn new(mut options: SessionOptions) -> Self {
        let texture_seed = resolve_seed(options.texture_seed);
        let parameter_seed = resolve_seed(options.parameter_seed);
        options.texture_seed = Some(texture_seed);
        options.parameter_seed = Some(parameter_seed);
        Self {
            options,
            texture_seed,
            parameter_seed,
            paths: Vec::new(),
            active_path: None,
            textures: Vec::new(),
            active_texture: None,
            clones: Vec::new(),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn set_tuning(&mut self, tuning: TuningMode) {
        self.options.tuning = tuning;
    }

    pub fn set_author(&mut self, author: &str) {
        self.options.author = author.to_string();
    }

    pub fn set_audio(&mut self, channels: u32, rate: u32) {
        self.options.audio_channels = channels;
        self.options.audio_rate = rate;
    }

    /// Change the event mode. All textures move into the mode's orchestra; fails without
    /// changes when an instrument is not available there.
    pub fn set_event_mode(&mut self, mode: EventMode) -> Result<(), Error> {
        let orchestra = mode.orchestra();
        if let Some(texture) = self
            .textures
            .iter()
            .find(|texture| !orchestra.is_valid(texture.inst()))
        {
            return Err(Error::TextureState(format!(
                "instrument {} of texture {} is not available in orchestra {}",
                texture.inst(),
                texture.name(),
                orchestra
            )));
        }
        for texture in &mut self.textures {
            if texture.orchestra() != orchestra {
                texture.set_orchestra(orchestra)?;
            }
        }
        let names = self
            .textures
            .iter()
            .map(|texture| texture.name().to_string())
            .collect::<Vec<_>>();
        for name in names {
            self.sync_clone_aux(&name)?;
        }
        self.options.event_mode = mode;
        Ok(())
    }

    fn texture_seeds(&self) -> TextureSeeds {
        TextureSeeds {
            parameter: self.parameter_seed,
            module: self.texture_seed,
        }
    }

    // ---------------------------------------------------------------------------------------------

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        self.paths.iter().find(|path| path.name() == name)
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active_path.as_deref().and_then(|name| self.path(name))
    }

    fn path_index(&self, name: &str) -> Result<usize, Error> {
        self.paths
            .iter()
            .position(|path| path.name() == name)
            .ok_or_else(|| Error::PathReference(format!("no path named '{}'", name)))
    }

    fn check_new_path(&self, name: &str) -> Result<(), Error> {
        if self.path(name).is_some() {
            return Err(Error::PathReference(format!(
                "a path named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    /// Create a new path from multiset strings and make it the active path.
    pub fn path_new(&mut self, name: &str, multisets: &[&str]) -> Result<(), Error> {
        self.check_new_path(name)?;
        let path = Path::from_strings(name, multisets).map_err(Error::PitchSyntax)?;
        self.paths.push(path);
        self.active_path = Some(name.to_string());
        Ok(())
    }

    /// Copy a path under a new name and make the copy the active path.
    pub fn path_copy(&mut self, source: &str, name: &str) -> Result<(), Error> {
        self.check_new_path(name)?;
        let source = &self.paths[self.path_index(source)?];
        let path = Path::new(name, source.multisets().to_vec(), source.durations().to_vec())
            .map_err(Error::PitchSyntax)?;
        self.paths.push(path);
        self.active_path = Some(name.to_string());
        Ok(())
    }

    /// Delete a path. Fails while textures use it.
    pub fn path_delete(&mut self, name: &str) -> Result<(), Error> {
        let index = self.path_index(name)?;
        let ref_count = self.paths[index].ref_count();
        if ref_count > 0 {
            return Err(Error::PathReference(format!(
                "path '{}' is used by {} texture(s)",
                name, ref_count
            )));
        }
        self.paths.remove(index);
        if self.active_path.as_deref() == Some(name) {
            self.active_path = self.paths.last().map(|path| path.name().to_string());
        }
        Ok(())
    }

    pub fn path_select(&mut self, name: &str) -> Result<(), Error> {
        self.path_index(name)?;
        self.active_path = Some(name.to_string());
        Ok(())
    }

    /// Modify a path in place. Textures observe the change on their next score.
    pub fn path_edit<F>(&mut self, name: &str, edit: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Path) -> Result<(), String>,
    {
        let index = self.path_index(name)?;
        let mut path = self.paths[index].clone();
        edit(&mut path).map_err(|err| Error::PathReference(err).with_context(name))?;
        path.set_name(name);
        self.paths[index] = path;
        Ok(())
    }

    /// Set classes of the path's multisets, following the session's tuning mode.
    pub fn path_set_classes(&self, name: &str) -> Result<Vec<SetClass>, Error> {
        let path = &self.paths[self.path_index(name)?];
        Ok(path.set_classes(self.options.tuning == TuningMode::TnI))
    }

    // ---------------------------------------------------------------------------------------------

    /// Textures in creation order.
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn texture(&self, name: &str) -> Option<&Texture> {
        self.textures.iter().find(|texture| texture.name() == name)
    }

    pub fn active_texture(&self) -> Option<&Texture> {
        self.active_texture
            .as_deref()
            .and_then(|name| self.texture(name))
    }

    fn texture_index(&self, name: &str) -> Result<usize, Error> {
        self.textures
            .iter()
            .position(|texture| texture.name() == name)
            .ok_or_else(|| Error::TextureState(format!("no texture named '{}'", name)))
    }

    fn check_new_texture(&self, name: &str) -> Result<(), Error> {
        if self.texture(name).is_some() {
            return Err(Error::TextureState(format!(
                "a texture named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    /// Create a texture with default parameters, bound to the active path and using the
    /// orchestra of the current event mode.
    pub fn texture_new(&mut self, name: &str, module: &str, inst: u32) -> Result<(), Error> {
        self.check_new_texture(name)?;
        let path = self
            .active_path
            .clone()
            .ok_or_else(|| Error::PathReference("no active path".to_string()))?;
        let path_index = self.path_index(&path)?;
        let texture = Texture::new(
            name,
            module,
            &path,
            self.options.event_mode.orchestra(),
            inst,
            self.texture_seeds(),
        )?;
        self.paths[path_index].ref_increment();
        self.textures.push(texture);
        self.active_texture = Some(name.to_string());
        Ok(())
    }

    /// Copy a texture with all its parameters. The copy is bound to the same path.
    pub fn texture_copy(&mut self, source: &str, name: &str) -> Result<(), Error> {
        self.check_new_texture(name)?;
        let texture = self.textures[self.texture_index(source)?].copy(name)?;
        let path_index = self.path_index(texture.path())?;
        self.paths[path_index].ref_increment();
        self.textures.push(texture);
        self.active_texture = Some(name.to_string());
        Ok(())
    }

    /// Delete a texture and all of its clones, releasing its path.
    pub fn texture_delete(&mut self, name: &str) -> Result<(), Error> {
        let index = self.texture_index(name)?;
        let texture = self.textures.remove(index);
        if let Ok(path_index) = self.path_index(texture.path()) {
            self.paths[path_index].ref_decrement();
        }
        self.clones.retain(|clone| clone.texture() != name);
        if self.active_texture.as_deref() == Some(name) {
            self.active_texture = self
                .textures
                .last()
                .map(|texture| texture.name().to_string());
        }
        Ok(())
    }

    pub fn texture_select(&mut self, name: &str) -> Result<(), Error> {
        self.texture_index(name)?;
        self.active_texture = Some(name.to_string());
        Ok(())
    }

    /// Edit a texture parameter from argument text. With `refresh` the texture and its
    /// clones get rescored right away.
    pub fn texture_edit(
        &mut self,
        name: &str,
        role: &str,
        text: &str,
        refresh: bool,
    ) -> Result<(), Error> {
        let index = self.texture_index(name)?;
        self.textures[index]
            .edit(role, text)
            .map_err(|err| err.with_context(name))?;
        self.sync_clone_aux(name)?;
        if refresh {
            self.texture_score(name)?;
        }
        Ok(())
    }

    /// Bind a texture to another path.
    pub fn texture_set_path(&mut self, name: &str, path: &str) -> Result<(), Error> {
        let index = self.texture_index(name)?;
        let new_index = self.path_index(path)?;
        if let Ok(old_index) = self.path_index(self.textures[index].path()) {
            self.paths[old_index].ref_decrement();
        }
        self.paths[new_index].ref_increment();
        self.textures[index].set_path(path);
        Ok(())
    }

    /// Toggle the mute state of a texture. Returns the new state.
    pub fn texture_mute(&mut self, name: &str) -> Result<bool, Error> {
        let index = self.texture_index(name)?;
        let texture = &mut self.textures[index];
        texture.set_mute(!texture.mute());
        Ok(texture.mute())
    }

    /// Score a texture and its clones.
    pub fn texture_score(&mut self, name: &str) -> Result<(), Error> {
        let index = self.texture_index(name)?;
        let path = &self.paths[self.path_index(self.textures[index].path())?];
        let texture = &mut self.textures[index];
        texture.score(path)?;
        for clone in self
            .clones
            .iter_mut()
            .filter(|clone| clone.texture() == name)
        {
            clone.score(texture)?;
        }
        Ok(())
    }

    /// Match the aux filters of a texture's clones to the texture's aux count.
    fn sync_clone_aux(&mut self, name: &str) -> Result<(), Error> {
        let aux_count = self.textures[self.texture_index(name)?].aux_count();
        for clone in self
            .clones
            .iter_mut()
            .filter(|clone| clone.texture() == name && clone.aux_count() != aux_count)
        {
            clone.set_aux_count(aux_count)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------

    /// Clones of a texture, in creation order.
    pub fn clones<'a>(&'a self, texture: &'a str) -> impl Iterator<Item = &'a TextureClone> {
        self.clones
            .iter()
            .filter(move |clone| clone.texture() == texture)
    }

    pub fn texture_clone(&self, texture: &str, name: &str) -> Option<&TextureClone> {
        self.clones
            .iter()
            .find(|clone| clone.texture() == texture && clone.name() == name)
    }

    fn clone_index(&self, texture: &str, name: &str) -> Result<usize, Error> {
        self.clones
            .iter()
            .position(|clone| clone.texture() == texture && clone.name() == name)
            .ok_or_else(|| {
                Error::TextureState(format!("texture {} has no clone named '{}'", texture, name))
            })
    }

    fn check_new_clone(&self, texture: &str, name: &str) -> Result<(), Error> {
        if self.texture_clone(texture, name).is_some() {
            return Err(Error::TextureState(format!(
                "texture {} already has a clone named '{}'",
                texture, name
            )));
        }
        Ok(())
    }

    /// Create a clone with default filters.
    pub fn clone_new(&mut self, texture: &str, name: &str) -> Result<(), Error> {
        self.check_new_clone(texture, name)?;
        let parent = &self.textures[self.texture_index(texture)?];
        let clone = TextureClone::new(name, parent, self.parameter_seed)?;
        self.clones.push(clone);
        Ok(())
    }

    pub fn clone_copy(&mut self, texture: &str, source: &str, name: &str) -> Result<(), Error> {
        self.check_new_clone(texture, name)?;
        let parent = &self.textures[self.texture_index(texture)?];
        let clone = self.clones[self.clone_index(texture, source)?].copy(name, parent)?;
        self.clones.push(clone);
        Ok(())
    }

    pub fn clone_rename(&mut self, texture: &str, name: &str, new_name: &str) -> Result<(), Error> {
        self.check_new_clone(texture, new_name)?;
        let index = self.clone_index(texture, name)?;
        let parent = &self.textures[self.texture_index(texture)?];
        self.clones[index].rename(new_name, parent)
    }

    /// Edit a clone filter from argument text. With `refresh` the clone gets rescored
    /// from its texture's last score.
    pub fn clone_edit(
        &mut self,
        texture: &str,
        name: &str,
        role: &str,
        text: &str,
        refresh: bool,
    ) -> Result<(), Error> {
        let index = self.clone_index(texture, name)?;
        let parent = &self.textures[self.texture_index(texture)?];
        let clone = &mut self.clones[index];
        clone
            .edit(role, text)
            .map_err(|err| err.with_context(&format!("{} {}", texture, name)))?;
        if refresh {
            clone.score(parent)?;
        }
        Ok(())
    }

    pub fn clone_delete(&mut self, texture: &str, name: &str) -> Result<(), Error> {
        let index = self.clone_index(texture, name)?;
        self.clones.remove(index);
        Ok(())
    }

    /// Toggle the mute state of a clone. Returns the new state.
    pub fn clone_mute(&mut self, texture: &str, name: &str) -> Result<bool, Error> {
        let index = self.clone_index(texture, name)?;
        let clone = &mut self.clones[index];
        clone.set_mute(!clone.mute());
        Ok(clone.mute())
    }

    // ---------------------------------------------------------------------------------------------

    /// Reseed the texture module streams of all textures. Returns the seed in use.
    pub fn seed_textures(&mut self, seed: Option<u64>) -> Result<u64, Error> {
        self.texture_seed = resolve_seed(seed);
        self.options.texture_seed = Some(self.texture_seed);
        self.reseed_all()?;
        Ok(self.texture_seed)
    }

    /// Reseed the parameter object streams of all textures and clones. Returns the seed
    /// in use.
    pub fn seed_parameters(&mut self, seed: Option<u64>) -> Result<u64, Error> {
        self.parameter_seed = resolve_seed(seed);
        self.options.parameter_seed = Some(self.parameter_seed);
        self.reseed_all()?;
        let seed = self.parameter_seed;
        for clone in &mut self.clones {
            let index = self
                .textures
                .iter()
                .position(|texture| texture.name() == clone.texture())
                .ok_or_else(|| {
                    Error::TextureState(format!("no texture named '{}'", clone.texture()))
                })?;
            clone.reseed(seed, &self.textures[index])?;
        }
        Ok(seed)
    }

    fn reseed_all(&mut self) -> Result<(), Error> {
        let seeds = self.texture_seeds();
        for texture in &mut self.textures {
            texture.reseed(seeds)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------

    /// Score all unmuted textures and clones and merge their events.
    ///
    /// A texture which fails to score is recorded in the list's failures; the remaining
    /// textures still score. Clones of a failed texture are skipped.
    pub fn event_list(&mut self, mode: EventMode) -> Result<EventList, Error> {
        if mode != self.options.event_mode {
            self.set_event_mode(mode)?;
        }
        let mut list = EventList::new(mode);
        for texture in self.textures.iter_mut().filter(|texture| !texture.mute()) {
            let scored = self
                .paths
                .iter()
                .find(|path| path.name() == texture.path())
                .ok_or_else(|| {
                    Error::PathReference(format!("no path named '{}'", texture.path()))
                })
                .and_then(|path| texture.score(path));
            if let Err(err) = scored {
                list.push_failure(texture.name(), err);
                continue;
            }
            list.push_texture(texture);
            for clone in self
                .clones
                .iter_mut()
                .filter(|clone| clone.texture() == texture.name() && !clone.mute())
            {
                match clone.score(texture) {
                    Ok(()) => list.push_clone(clone, texture),
                    Err(err) => list.push_failure(clone.name(), err),
                }
            }
        }
        list.sort();
        log::info!(
            "event list in mode {} with {} events, {} failures",
            mode,
            list.len(),
            list.failures().len()
        );
        Ok(list)
    }

    /// Create the event list of the current event mode and write it next to `base`.
    /// Without explicit formats, the mode's default formats and the session document
    /// are written.
    pub fn write_event_list(
        &mut self,
        base: &std::path::Path,
        formats: Option<&[OutputFormat]>,
    ) -> Result<WriteReport, Error> {
        let list = self.event_list(self.options.event_mode)?;
        let formats = match formats {
            Some(formats) => formats.to_vec(),
            None => {
                let mut formats = self.options.event_mode.default_formats();
                formats.push(OutputFormat::XmlAthenaObject);
                formats
            }
        };
        let writers = default_writers(self.to_json()?);
        Ok(list.write_files(base, &formats, &writers))
    }

    // ---------------------------------------------------------------------------------------------

    fn document(&self) -> Result<SessionDocument, Error> {
        let path = self
            .paths
            .iter()
            .map(|path| PathRecord {
                name: path.name().to_string(),
                multisets: path.multisets().iter().map(Multiset::ps).collect(),
                durations: path.durations().to_vec(),
                active: self.active_path.as_deref() == Some(path.name()),
            })
            .collect();
        let texture = self
            .textures
            .iter()
            .map(|texture| {
                Ok(TextureRecord {
                    name: texture.name().to_string(),
                    module: texture.module().name().to_string(),
                    path: texture.path().to_string(),
                    inst: texture.inst(),
                    orchestra: texture.orchestra(),
                    temperament: Some(texture.temperament().to_string()),
                    silence: texture.silence(),
                    post_map: texture.post_map(),
                    polyphony: Some(texture.polyphony().to_string()),
                    aux_count: texture.aux_count(),
                    midi_program: texture.midi_program(),
                    midi_channel: texture.midi_channel(),
                    mute: texture.mute(),
                    parameters: texture.parameters()?.into_iter().collect(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let clone = self
            .clones
            .iter()
            .map(|clone| {
                Ok(CloneRecord {
                    texture: clone.texture().to_string(),
                    name: clone.name().to_string(),
                    mute: clone.mute(),
                    parameters: clone.parameters()?.into_iter().collect(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(SessionDocument {
            athena: AthenaSection {
                options: self.options.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            path,
            texture,
            clone,
        })
    }

    fn from_document(mut document: SessionDocument) -> Result<Self, Error> {
        migrate(&mut document);
        let mut session = Session::new(document.athena.options);
        for record in document.path {
            let path = record
                .multisets
                .iter()
                .map(|ps| Multiset::from_ps(ps))
                .collect::<Result<Vec<_>, _>>()
                .and_then(|multisets| Path::new(&record.name, multisets, record.durations))
                .map_err(|err| Error::PitchSyntax(err).with_context(&record.name))?;
            session.check_new_path(&record.name)?;
            session.paths.push(path);
            if record.active {
                session.active_path = Some(record.name);
            }
        }
        for record in document.texture {
            let name = record.name.clone();
            let texture = session
                .texture_from_record(record)
                .map_err(|err| err.with_context(&format!("texture {}", name)))?;
            session.check_new_texture(&name)?;
            let path_index = session.path_index(texture.path())?;
            session.paths[path_index].ref_increment();
            session.textures.push(texture);
            session.active_texture = Some(name);
        }
        for record in document.clone {
            let texture = record.texture.clone();
            let name = record.name.clone();
            let clone = session
                .clone_from_record(record)
                .map_err(|err| err.with_context(&format!("clone {} {}", texture, name)))?;
            session.check_new_clone(&texture, &name)?;
            session.clones.push(clone);
        }
        Ok(session)
    }

    fn texture_from_record(&self, record: TextureRecord) -> Result<Texture, Error> {
        let mut texture = Texture::new(
            &record.name,
            &record.module,
            &record.path,
            record.orchestra,
            record.inst,
            self.texture_seeds(),
        )?;
        if let Some(temperament) = &record.temperament {
            texture.set_temperament(
                Temperament::try_from(temperament.as_str()).map_err(Error::TextureState)?,
            );
        }
        if let Some(polyphony) = &record.polyphony {
            texture.set_polyphony(
                PolyphonyMode::try_from(polyphony.as_str()).map_err(Error::TextureState)?,
            );
        }
        texture.set_silence(record.silence);
        texture.set_post_map(record.post_map);
        if record.orchestra.has_variable_aux() {
            texture.set_aux_count(record.aux_count)?;
        }
        for (key, text) in &record.parameters {
            match Role::parse(key, texture.module()) {
                Ok(Role::Instrument) => {}
                Ok(_) => texture.edit(key, text)?,
                Err(err) => log::warn!("texture {}: skipping {}", record.name, err),
            }
        }
        texture.set_midi_program(record.midi_program);
        texture.set_midi_channel(record.midi_channel);
        texture.set_mute(record.mute);
        Ok(texture)
    }

    fn clone_from_record(&self, record: CloneRecord) -> Result<TextureClone, Error> {
        let parent = &self.textures[self.texture_index(&record.texture)?];
        let mut clone = TextureClone::new(&record.name, parent, self.parameter_seed)?;
        for (key, text) in &record.parameters {
            match CloneRole::parse(key) {
                Ok(_) => clone.edit(key, text)?,
                Err(err) => log::warn!("clone {}: skipping {}", record.name, err),
            }
        }
        clone.set_mute(record.mute);
        Ok(clone)
    }

    /// Serialize the session into a JSON document.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(&self.document()?)
            .map_err(|err| Error::FileIO(format!("failed to serialize session: {}", err)))
    }

    /// Restore a session from a JSON document. Unknown keys are ignored and names of
    /// older documents are migrated.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let document = serde_json::from_str::<SessionDocument>(json)
            .map_err(|err| Error::FileIO(format!("invalid session document: {}", err)))?;
        Self::from_document(document)
    }

    pub fn save_json(&self, file: &std::path::Path) -> Result<(), Error> {
        let json = self.to_json()?;
        std::fs::write(file, json)
            .with_context(|| format!("failed to write session file '{}'", file.display()))
            .map_err(|err| Error::FileIO(format!("{:#}", err)))
    }

    pub fn load_json(file: &std::path::Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read session file '{}'", file.display()))
            .map_err(|err| Error::FileIO(format!("{:#}", err)))?;
        Self::from_json(&json)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn session() -> Result<Session, Error> {
        let mut session = Session::new(SessionOptions {
            texture_seed: Some(1),
            parameter_seed: Some(2),
            ..SessionOptions::default()
        });
        session.path_new("a", &["3-2"])?;
        session.texture_new("a", "lg", 0)?;
        session.texture_edit("a", "t", "0, 4", false)?;
        Ok(session)
    }

    #[test]
    fn path_references() -> Result<(), Error> {
        let mut session = session()?;
        session.path_new("b", &["(8,12,21,34)"])?;
        assert_eq!(session.active_path().map(|path| path.name()), Some("b"));
        session.texture_copy("a", "b")?;
        assert_eq!(session.path("a").map(Path::ref_count), Some(2));
        assert_eq!(
            session.path_delete("a").map_err(|err| err.kind()),
            Err("PathReferenceError")
        );
        session.texture_set_path("b", "b")?;
        assert_eq!(session.path("a").map(Path::ref_count), Some(1));
        assert_eq!(session.path("b").map(Path::ref_count), Some(1));
        session.texture_delete("a")?;
        session.path_delete("a")?;
        assert!(session.path("a").is_none());
        assert!(session.path_select("a").is_err());
        Ok(())
    }

    #[test]
    fn clone_cascade() -> Result<(), Error> {
        let mut session = session()?;
        session.clone_new("a", "x")?;
        session.clone_copy("a", "x", "y")?;
        assert!(session.clone_new("a", "y").is_err());
        assert_eq!(session.clones("a").count(), 2);
        assert!(session.clone_mute("a", "y")?);
        session.clone_rename("a", "y", "z")?;
        assert!(session.texture_clone("a", "z").is_some_and(|clone| clone.mute()));
        session.texture_delete("a")?;
        assert_eq!(session.clones("a").count(), 0);
        Ok(())
    }

    #[test]
    fn event_list_merges_clones() -> Result<(), Error> {
        let mut session = session()?;
        session.clone_new("a", "x")?;
        let list = session.event_list(EventMode::Midi)?;
        let texture_events = session.texture("a").map_or(0, |t| t.events().len());
        assert!(texture_events > 0);
        assert_eq!(list.len(), texture_events * 2);
        assert!(list
            .events()
            .windows(2)
            .all(|pair| pair[0].event.time <= pair[1].event.time));

        session.clone_mute("a", "x")?;
        session.texture_mute("a")?;
        assert!(session.event_list(EventMode::Midi)?.is_empty());
        Ok(())
    }

    #[test]
    fn failing_texture_does_not_stop_others() -> Result<(), Error> {
        let mut session = session()?;
        session.texture_copy("a", "b")?;
        // a tempo of zero fails at score time
        session.texture_edit("b", "b", "0", false)?;
        let list = session.event_list(EventMode::Midi)?;
        assert_eq!(list.failures().len(), 1);
        assert_eq!(list.failures()[0].0, "b");
        assert!(!list.is_empty());
        Ok(())
    }

    #[test]
    fn event_mode_changes_orchestra() -> Result<(), Error> {
        let mut session = session()?;
        session.set_event_mode(EventMode::CsoundExternal)?;
        assert_eq!(
            session.texture("a").map(Texture::orchestra),
            Some(Orchestra::CsoundExternal)
        );
        session.texture_edit("a", "i", "12345", false)?;
        assert_eq!(
            session
                .set_event_mode(EventMode::Midi)
                .map_err(|err| err.kind()),
            Err("TextureStateError")
        );
        assert_eq!(session.options().event_mode, EventMode::CsoundExternal);
        Ok(())
    }

    #[test]
    fn json_round_trip() -> Result<(), Error> {
        let mut session = session()?;
        session.texture_edit("a", "a", "ru, .2, .8", false)?;
        session.clone_new("a", "x")?;
        session.clone_edit("a", "x", "f", "fa, (c, 12)", false)?;
        let first = session.event_list(EventMode::Midi)?;

        let mut loaded = Session::from_json(&session.to_json()?)?;
        assert_eq!(loaded.path("a").map(Path::ref_count), Some(1));
        assert_eq!(
            loaded.texture("a").map(|t| t.parameters()).transpose()?,
            session.texture("a").map(|t| t.parameters()).transpose()?
        );
        let second = loaded.event_list(EventMode::Midi)?;
        assert_eq!(first.events(), second.events());
        Ok(())
    }

    #[test]
    fn renamed_clone_round_trip() -> Result<(), Error> {
        let mut session = session()?;
        session.clone_new("a", "x")?;
        session.clone_edit("a", "x", "a", "fa, (ru, 0, .5)", false)?;
        session.clone_rename("a", "x", "y")?;
        assert!(session.texture_clone("a", "x").is_none());
        let first = session.event_list(EventMode::Midi)?;
        assert!(first
            .events()
            .iter()
            .any(|mapped| mapped.event.clone.as_deref() == Some("y")));

        let mut loaded = Session::from_json(&session.to_json()?)?;
        let second = loaded.event_list(EventMode::Midi)?;
        assert_eq!(first.events(), second.events());
        Ok(())
    }

    #[test]
    fn clone_amplitudes_are_mapped_into_range() -> Result<(), Error> {
        let mut session = session()?;
        session.clone_new("a", "loud")?;
        session.clone_edit("a", "loud", "a", "fa, (c, 2)", false)?;
        let list = session.event_list(EventMode::Midi)?;
        let amps = list
            .events()
            .iter()
            .filter(|mapped| mapped.event.clone.is_some())
            .map(|mapped| (mapped.event.amp, mapped.amp))
            .collect::<Vec<_>>();
        assert!(!amps.is_empty());
        assert!(amps.iter().all(|(raw, mapped)| *raw > 1.0 && *mapped == 127.0));
        Ok(())
    }

    #[test]
    fn migrates_old_names() -> Result<(), Error> {
        let session = session()?;
        let json = session
            .to_json()?
            .replace("\"LineGroove\"", "\"LiteralHorizontal\"")
            .replace("\"pitchSelectorControl\"", "\"pitchSelector\"");
        let loaded = Session::from_json(&json)?;
        assert_eq!(
            loaded.texture("a").map(|texture| texture.module().name()),
            Some("LineGroove")
        );
        assert!(Session::from_json("{").is_err_and(|err| err.kind() == "FileIOError"));
        Ok(())
    }

    #[test]
    fn seeds() -> Result<(), Error> {
        let mut session = session()?;
        session.texture_edit("a", "a", "ru, 0, 1", false)?;
        let amps = |session: &mut Session| -> Result<Vec<f64>, Error> {
            Ok(session
                .event_list(EventMode::Midi)?
                .events()
                .iter()
                .map(|mapped| mapped.event.amp)
                .collect())
        };
        let first = amps(&mut session)?;
        assert_eq!(amps(&mut session)?, first);
        session.seed_parameters(Some(3))?;
        assert_ne!(amps(&mut session)?, first);
        session.seed_parameters(Some(2))?;
        assert_eq!(amps(&mut session)?, first);
        Ok(())
    }
}
