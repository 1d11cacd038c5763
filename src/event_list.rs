//! Event lists: the merged, time ordered and orchestra mapped events of all textures and
//! clones of a rendering pass.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    clone::TextureClone,
    error::Error,
    event::Event,
    orchestra::{MapField, Orchestra},
    texture::Texture,
};

// -------------------------------------------------------------------------------------------------

/// Top level output policy: selects the orchestra and the default output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventMode {
    #[default]
    Midi,
    MidiPercussion,
    CsoundNative,
    CsoundGeneralMidi,
    CsoundExternal,
    CsoundSilence,
    SuperCollider,
    AcToolbox,
}

impl EventMode {
    pub const ALL: [EventMode; 8] = [
        EventMode::Midi,
        EventMode::MidiPercussion,
        EventMode::CsoundNative,
        EventMode::CsoundGeneralMidi,
        EventMode::CsoundExternal,
        EventMode::CsoundSilence,
        EventMode::SuperCollider,
        EventMode::AcToolbox,
    ];

    pub fn orchestra(&self) -> Orchestra {
        match self {
            EventMode::Midi | EventMode::CsoundGeneralMidi | EventMode::AcToolbox => {
                Orchestra::GeneralMidi
            }
            EventMode::MidiPercussion => Orchestra::GeneralMidiPercussion,
            EventMode::CsoundNative => Orchestra::CsoundNative,
            EventMode::CsoundExternal => Orchestra::CsoundExternal,
            EventMode::CsoundSilence => Orchestra::CsoundSilence,
            EventMode::SuperCollider => Orchestra::SuperColliderNative,
        }
    }

    /// True for modes which render Csound scores.
    pub fn is_csound(&self) -> bool {
        matches!(
            self,
            EventMode::CsoundNative
                | EventMode::CsoundGeneralMidi
                | EventMode::CsoundExternal
                | EventMode::CsoundSilence
        )
    }

    /// Formats written when no formats are requested explicitly.
    pub fn default_formats(&self) -> Vec<OutputFormat> {
        match self {
            EventMode::Midi | EventMode::MidiPercussion => vec![OutputFormat::MidiFile],
            EventMode::CsoundNative => vec![
                OutputFormat::CsoundScore,
                OutputFormat::CsoundOrchestra,
                OutputFormat::CsoundData,
                OutputFormat::CsoundBatch,
            ],
            EventMode::CsoundGeneralMidi
            | EventMode::CsoundExternal
            | EventMode::CsoundSilence => vec![OutputFormat::CsoundScore],
            EventMode::SuperCollider => vec![OutputFormat::SuperColliderTask],
            EventMode::AcToolbox => vec![OutputFormat::AcToolbox],
        }
    }

    /// Formats a writer may produce in this mode.
    pub fn supports(&self, format: OutputFormat) -> bool {
        match format {
            OutputFormat::TextSpace | OutputFormat::TextTab | OutputFormat::XmlAthenaObject => {
                true
            }
            OutputFormat::CsoundScore => self.is_csound(),
            OutputFormat::CsoundOrchestra
            | OutputFormat::CsoundData
            | OutputFormat::CsoundBatch
            | OutputFormat::AudioFile => *self == EventMode::CsoundNative,
            OutputFormat::MidiFile => {
                matches!(self, EventMode::Midi | EventMode::MidiPercussion)
            }
            OutputFormat::AcToolbox => *self == EventMode::AcToolbox,
            OutputFormat::SuperColliderTask => *self == EventMode::SuperCollider,
        }
    }
}

impl TryFrom<&str> for EventMode {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "midi" => Ok(EventMode::Midi),
            "mp" | "mc" | "midipercussion" => Ok(EventMode::MidiPercussion),
            "cn" | "csoundnative" => Ok(EventMode::CsoundNative),
            "cg" | "csoundgeneralmidi" => Ok(EventMode::CsoundGeneralMidi),
            "ce" | "csoundexternal" => Ok(EventMode::CsoundExternal),
            "cs" | "csoundsilence" => Ok(EventMode::CsoundSilence),
            "s" | "supercollider" => Ok(EventMode::SuperCollider),
            "a" | "actoolbox" => Ok(EventMode::AcToolbox),
            _ => Err(format!(
                "invalid event mode '{}': expecting one of m, mp, cn, cg, ce, cs, s, a",
                s
            )),
        }
    }
}

impl Display for EventMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventMode::Midi => "midi",
            EventMode::MidiPercussion => "midiPercussion",
            EventMode::CsoundNative => "csoundNative",
            EventMode::CsoundGeneralMidi => "csoundGeneralMidi",
            EventMode::CsoundExternal => "csoundExternal",
            EventMode::CsoundSilence => "csoundSilence",
            EventMode::SuperCollider => "superCollider",
            EventMode::AcToolbox => "acToolbox",
        };
        write!(f, "{}", name)
    }
}

// -------------------------------------------------------------------------------------------------

/// The closed set of output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFormat {
    CsoundOrchestra,
    CsoundScore,
    CsoundData,
    CsoundBatch,
    MidiFile,
    TextSpace,
    TextTab,
    XmlAthenaObject,
    AcToolbox,
    SuperColliderTask,
    AudioFile,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 11] = [
        OutputFormat::CsoundOrchestra,
        OutputFormat::CsoundScore,
        OutputFormat::CsoundData,
        OutputFormat::CsoundBatch,
        OutputFormat::MidiFile,
        OutputFormat::TextSpace,
        OutputFormat::TextTab,
        OutputFormat::XmlAthenaObject,
        OutputFormat::AcToolbox,
        OutputFormat::SuperColliderTask,
        OutputFormat::AudioFile,
    ];

    /// The short format code.
    pub fn code(&self) -> &'static str {
        match self {
            OutputFormat::CsoundOrchestra => "co",
            OutputFormat::CsoundScore => "cs",
            OutputFormat::CsoundData => "cd",
            OutputFormat::CsoundBatch => "cb",
            OutputFormat::MidiFile => "mf",
            OutputFormat::TextSpace => "ts",
            OutputFormat::TextTab => "tt",
            OutputFormat::XmlAthenaObject => "xao",
            OutputFormat::AcToolbox => "at",
            OutputFormat::SuperColliderTask => "sct",
            OutputFormat::AudioFile => "af",
        }
    }

    /// File name suffix, appended to the base name of an event list.
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputFormat::CsoundOrchestra => ".orc",
            OutputFormat::CsoundScore => ".sco",
            OutputFormat::CsoundData => ".csd",
            OutputFormat::CsoundBatch => ".bat",
            OutputFormat::MidiFile => ".mid",
            OutputFormat::TextSpace => "_space.txt",
            OutputFormat::TextTab => "_tab.txt",
            OutputFormat::XmlAthenaObject => ".json",
            OutputFormat::AcToolbox => "_ac.lisp",
            OutputFormat::SuperColliderTask => ".sc",
            OutputFormat::AudioFile => ".aif",
        }
    }
}

impl TryFrom<&str> for OutputFormat {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        let name = s.trim().to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|format| {
                format.code() == name || format.to_string().to_ascii_lowercase() == name
            })
            .ok_or_else(|| {
                format!(
                    "invalid output format '{}': expecting one of {}",
                    s,
                    OutputFormat::ALL.map(|format| format.code()).join(", ")
                )
            })
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::CsoundOrchestra => "csoundOrchestra",
            OutputFormat::CsoundScore => "csoundScore",
            OutputFormat::CsoundData => "csoundData",
            OutputFormat::CsoundBatch => "csoundBatch",
            OutputFormat::MidiFile => "midiFile",
            OutputFormat::TextSpace => "textSpace",
            OutputFormat::TextTab => "textTab",
            OutputFormat::XmlAthenaObject => "xmlAthenaObject",
            OutputFormat::AcToolbox => "acToolbox",
            OutputFormat::SuperColliderTask => "superColliderTask",
            OutputFormat::AudioFile => "audioFile",
        };
        write!(f, "{}", name)
    }
}

// -------------------------------------------------------------------------------------------------

/// An event with its values mapped into the output representation of the orchestra.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedEvent {
    /// The realized event.
    pub event: Event,
    /// Mapped pitch: MIDI note, Csound pch or raw pitch space, depending on orchestra.
    pub pitch: f64,
    pub amp: f64,
    pub pan: f64,
    /// True when amplitude and pan were scaled by the orchestra.
    pub post_map: bool,
    pub midi_program: Option<u8>,
    pub midi_channel: Option<u8>,
    /// Position of the source texture in creation order.
    pub order: usize,
    /// Position of the event within its source.
    pub index: usize,
}

impl MappedEvent {
    pub fn is_rest(&self) -> bool {
        self.event.is_rest()
    }
}

/// The merged events of a rendering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EventList {
    mode: EventMode,
    events: Vec<MappedEvent>,
    failures: Vec<(String, Error)>,
    sources: usize,
}

impl EventList {
    pub fn new(mode: EventMode) -> Self {
        Self {
            mode,
            events: Vec::new(),
            failures: Vec::new(),
            sources: 0,
        }
    }

    pub fn mode(&self) -> EventMode {
        self.mode
    }

    pub fn orchestra(&self) -> Orchestra {
        self.mode.orchestra()
    }

    /// Merged events, sorted by time, source creation order and event index.
    pub fn events(&self) -> &[MappedEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Names and errors of textures or clones which failed to score.
    pub fn failures(&self) -> &[(String, Error)] {
        &self.failures
    }

    /// Add the events of a scored texture. Values are mapped by the texture's orchestra.
    pub fn push_texture(&mut self, texture: &Texture) {
        self.push_events(
            texture.events(),
            texture.orchestra(),
            texture.post_map(),
            texture.midi_program(),
            texture.midi_channel(),
        );
    }

    /// Add the events of a scored clone. Mapping options follow the parent texture.
    pub fn push_clone(&mut self, clone: &TextureClone, texture: &Texture) {
        self.push_events(
            clone.events(),
            texture.orchestra(),
            texture.post_map(),
            texture.midi_program(),
            texture.midi_channel(),
        );
    }

    fn push_events(
        &mut self,
        events: &[Event],
        orchestra: Orchestra,
        post_map: bool,
        midi_program: Option<u8>,
        midi_channel: Option<u8>,
    ) {
        let order = self.sources;
        self.sources += 1;
        self.events
            .extend(events.iter().enumerate().map(|(index, event)| MappedEvent {
                pitch: orchestra.post_map(MapField::Pitch, event.ps, post_map),
                amp: orchestra.post_map(MapField::Amplitude, event.amp, post_map),
                pan: orchestra.post_map(MapField::Pan, event.pan, post_map),
                post_map,
                midi_program,
                midi_channel,
                order,
                index,
                event: event.clone(),
            }));
    }

    /// Record a texture or clone which failed to score.
    pub fn push_failure(&mut self, name: &str, error: Error) {
        log::warn!("{} failed to score: {}", name, error);
        self.failures.push((name.to_string(), error));
    }

    /// Sort the merged events. Sources keep their creation order for equal times.
    pub fn sort(&mut self) {
        self.events.sort_by(|a, b| {
            a.event
                .time
                .total_cmp(&b.event.time)
                .then(a.order.cmp(&b.order))
                .then(a.index.cmp(&b.index))
        });
    }

    /// Earliest start and latest sustain end of all events.
    pub fn time_range_abs(&self) -> (f64, f64) {
        self.events
            .iter()
            .map(|mapped| (mapped.event.time, mapped.event.end()))
            .reduce(|(start, end), (time, event_end)| (start.min(time), end.max(event_end)))
            .unwrap_or((0.0, 0.0))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{path::Path, texture::TextureSeeds};

    #[test]
    fn modes() {
        assert_eq!(EventMode::try_from("m"), Ok(EventMode::Midi));
        assert_eq!(EventMode::try_from("MC"), Ok(EventMode::MidiPercussion));
        assert_eq!(EventMode::try_from("cn").map(|m| m.orchestra()), Ok(Orchestra::CsoundNative));
        assert!(EventMode::try_from("x").is_err());
        assert_eq!(EventMode::Midi.default_formats(), vec![OutputFormat::MidiFile]);
        assert!(EventMode::CsoundExternal.supports(OutputFormat::CsoundScore));
        assert!(!EventMode::Midi.supports(OutputFormat::CsoundScore));
    }

    #[test]
    fn formats() {
        assert_eq!(OutputFormat::try_from("xao"), Ok(OutputFormat::XmlAthenaObject));
        assert_eq!(OutputFormat::try_from("textTab"), Ok(OutputFormat::TextTab));
        assert!(OutputFormat::try_from("wav").is_err());
        for format in OutputFormat::ALL {
            assert_eq!(OutputFormat::try_from(format.code()), Ok(format));
        }
    }

    #[test]
    fn merge_and_map() -> Result<(), Error> {
        let path = Path::from_strings("p", &["c4"]).map_err(Error::PitchSyntax)?;
        let mut textures = Vec::new();
        for name in ["a", "b"] {
            let mut texture = Texture::new(
                name,
                "lg",
                "p",
                Orchestra::GeneralMidi,
                0,
                TextureSeeds::default(),
            )?;
            texture.edit("r", "l, ((1,1,1))")?;
            texture.edit("t", "0, 1")?;
            texture.edit("a", ".5")?;
            texture.score(&path)?;
            textures.push(texture);
        }
        let mut list = EventList::new(EventMode::Midi);
        for texture in &textures {
            list.push_texture(texture);
        }
        list.sort();
        let merged = list
            .events()
            .iter()
            .map(|mapped| (mapped.event.time, mapped.event.texture.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(merged, vec![(0.0, "a"), (0.0, "b"), (0.5, "a"), (0.5, "b")]);
        assert!(list.events().iter().all(|mapped| mapped.pitch == 60.0));
        assert!(list.events().iter().all(|mapped| mapped.amp == 64.0));
        assert!(list.events().iter().all(|mapped| mapped.pan == 64.0));
        Ok(())
    }
}
