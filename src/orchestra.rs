//! Orchestras: named instrument collections which define instrument numbers, aux
//! parameters and the mapping of realized values into output values.

use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::{error::Error, pitch};

// -------------------------------------------------------------------------------------------------

const GM_PROGRAMS: [&str; 128] = [
    "acousticGrandPiano", "brightAcousticPiano", "electricGrandPiano", "honkyTonkPiano",
    "electricPiano1", "electricPiano2", "harpsichord", "clavinet",
    "celesta", "glockenspiel", "musicBox", "vibraphone",
    "marimba", "xylophone", "tubularBells", "dulcimer",
    "drawbarOrgan", "percussiveOrgan", "rockOrgan", "churchOrgan",
    "reedOrgan", "accordion", "harmonica", "tangoAccordion",
    "acousticGuitarNylon", "acousticGuitarSteel", "electricGuitarJazz", "electricGuitarClean",
    "electricGuitarMuted", "overdrivenGuitar", "distortionGuitar", "guitarHarmonics",
    "acousticBass", "electricBassFinger", "electricBassPick", "fretlessBass",
    "slapBass1", "slapBass2", "synthBass1", "synthBass2",
    "violin", "viola", "cello", "contrabass",
    "tremoloStrings", "pizzicatoStrings", "orchestralHarp", "timpani",
    "stringEnsemble1", "stringEnsemble2", "synthStrings1", "synthStrings2",
    "choirAahs", "voiceOohs", "synthVoice", "orchestraHit",
    "trumpet", "trombone", "tuba", "mutedTrumpet",
    "frenchHorn", "brassSection", "synthBrass1", "synthBrass2",
    "sopranoSax", "altoSax", "tenorSax", "baritoneSax",
    "oboe", "englishHorn", "bassoon", "clarinet",
    "piccolo", "flute", "recorder", "panFlute",
    "blownBottle", "shakuhachi", "whistle", "ocarina",
    "lead1Square", "lead2Sawtooth", "lead3Calliope", "lead4Chiff",
    "lead5Charang", "lead6Voice", "lead7Fifths", "lead8BassLead",
    "pad1NewAge", "pad2Warm", "pad3Polysynth", "pad4Choir",
    "pad5Bowed", "pad6Metallic", "pad7Halo", "pad8Sweep",
    "fx1Rain", "fx2Soundtrack", "fx3Crystal", "fx4Atmosphere",
    "fx5Brightness", "fx6Goblins", "fx7Echoes", "fx8SciFi",
    "sitar", "banjo", "shamisen", "koto",
    "kalimba", "bagpipe", "fiddle", "shanai",
    "tinkleBell", "agogo", "steelDrums", "woodblock",
    "taikoDrum", "melodicTom", "synthDrum", "reverseCymbal",
    "guitarFretNoise", "breathNoise", "seashore", "birdTweet",
    "telephoneRing", "helicopter", "applause", "gunshot",
];

const GM_PERCUSSION: [&str; 47] = [
    "acousticBassDrum", "bassDrum1", "sideStick", "acousticSnare",
    "handClap", "electricSnare", "lowFloorTom", "closedHiHat",
    "highFloorTom", "pedalHiHat", "lowTom", "openHiHat",
    "lowMidTom", "hiMidTom", "crashCymbal1", "highTom",
    "rideCymbal1", "chineseCymbal", "rideBell", "tambourine",
    "splashCymbal", "cowbell", "crashCymbal2", "vibraslap",
    "rideCymbal2", "hiBongo", "lowBongo", "muteHiConga",
    "openHiConga", "lowConga", "highTimbale", "lowTimbale",
    "highAgogo", "lowAgogo", "cabasa", "maracas",
    "shortWhistle", "longWhistle", "shortGuiro", "longGuiro",
    "claves", "hiWoodBlock", "lowWoodBlock", "muteCuica",
    "openCuica", "muteTriangle", "openTriangle",
];

/// First instrument number of the percussion key map.
const GM_PERCUSSION_FIRST: u32 = 35;

/// MIDI channel used for percussion.
pub const PERCUSSION_CHANNEL: u8 = 10;

/// An aux parameter of an instrument: a description and the default argument text of
/// the generator that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxParameter {
    pub info: &'static str,
    pub default: &'static str,
}

const fn aux(info: &'static str, default: &'static str) -> AuxParameter {
    AuxParameter { info, default }
}

struct Instrument {
    name: &'static str,
    aux: &'static [AuxParameter],
}

const SUSTAIN_AUX: &[AuxParameter] = &[
    aux("sustain percent within unit interval", "c, .5"),
    aux("sustain center within unit interval", "c, .5"),
];

const BANDPASS_AUX: &[AuxParameter] = &[
    aux("bandpass filter start center frequency in Hz", "c, 2000"),
    aux("bandpass filter end center frequency in Hz", "c, 200"),
    aux("bandpass filter bandwidth in Hz", "c, 200"),
];

const NOISE_BASIC_AUX: &[AuxParameter] = &[
    aux("sustain percent within unit interval", "c, .5"),
    aux("sustain center within unit interval", "c, .5"),
    aux("low-pass filter start cutoff frequency in Hz", "c, 100"),
];

lazy_static! {
    static ref CSOUND_NATIVE: HashMap<u32, Instrument> = HashMap::from([
        (3, Instrument { name: "sineDrone", aux: &[] }),
        (4, Instrument { name: "sineUnitEnvelope", aux: SUSTAIN_AUX }),
        (5, Instrument { name: "sawBandpassFilter", aux: BANDPASS_AUX }),
        (11, Instrument { name: "noiseWhite", aux: SUSTAIN_AUX }),
    ]);
    static ref SUPER_COLLIDER_NATIVE: HashMap<u32, Instrument> =
        HashMap::from([(0, Instrument { name: "noiseBasic", aux: NOISE_BASIC_AUX })]);
}

const CSOUND_SILENCE_AUX: &[AuxParameter] = &[
    aux("phase", "c, 1"),
    aux("y pan depth", "c, .5"),
    aux("z pan depth", "c, .5"),
    aux("mason index, pitch class set", "pr, mason"),
];

const CSOUND_EXTERNAL_AUX: AuxParameter = aux("unknown parameter", "c, 1");

// -------------------------------------------------------------------------------------------------

/// A realized event value which an orchestra maps into its output representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapField {
    Pitch,
    Amplitude,
    Pan,
}

/// Available orchestras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orchestra {
    GeneralMidi,
    GeneralMidiPercussion,
    CsoundNative,
    /// Any instrument number with a user defined number of aux parameters.
    CsoundExternal,
    CsoundSilence,
    SuperColliderNative,
}

impl Orchestra {
    pub const ALL: [Orchestra; 6] = [
        Orchestra::GeneralMidi,
        Orchestra::GeneralMidiPercussion,
        Orchestra::CsoundNative,
        Orchestra::CsoundExternal,
        Orchestra::CsoundSilence,
        Orchestra::SuperColliderNative,
    ];

    /// Valid instrument numbers, or `None` when any number is valid.
    pub fn instruments(&self) -> Option<Vec<u32>> {
        match self {
            Orchestra::GeneralMidi => Some((0..GM_PROGRAMS.len() as u32).collect()),
            Orchestra::GeneralMidiPercussion => Some(
                (GM_PERCUSSION_FIRST..GM_PERCUSSION_FIRST + GM_PERCUSSION.len() as u32).collect(),
            ),
            Orchestra::CsoundNative => Some(sorted_keys(&CSOUND_NATIVE)),
            Orchestra::SuperColliderNative => Some(sorted_keys(&SUPER_COLLIDER_NATIVE)),
            Orchestra::CsoundExternal | Orchestra::CsoundSilence => None,
        }
    }

    pub fn is_valid(&self, inst: u32) -> bool {
        self.instruments()
            .map_or(true, |instruments| instruments.contains(&inst))
    }

    /// True when textures choose the number of aux parameters themselves.
    pub fn has_variable_aux(&self) -> bool {
        matches!(self, Orchestra::CsoundExternal)
    }

    fn check(&self, inst: u32) -> Result<(), Error> {
        if self.is_valid(inst) {
            Ok(())
        } else {
            Err(Error::TextureState(format!(
                "instrument {} is not available in orchestra {}",
                inst, self
            )))
        }
    }

    pub fn instrument_name(&self, inst: u32) -> Result<String, Error> {
        self.check(inst)?;
        let name = match self {
            Orchestra::GeneralMidi => GM_PROGRAMS[inst as usize],
            Orchestra::GeneralMidiPercussion => {
                GM_PERCUSSION[(inst - GM_PERCUSSION_FIRST) as usize]
            }
            Orchestra::CsoundNative => CSOUND_NATIVE[&inst].name,
            Orchestra::SuperColliderNative => SUPER_COLLIDER_NATIVE[&inst].name,
            Orchestra::CsoundExternal => "csoundExternal",
            Orchestra::CsoundSilence => "csoundSilence",
        };
        Ok(name.to_string())
    }

    /// Aux parameters of an instrument. `aux_count` is only used by orchestras with
    /// variable aux parameters.
    pub fn aux_parameters(&self, inst: u32, aux_count: usize) -> Result<Vec<AuxParameter>, Error> {
        self.check(inst)?;
        Ok(match self {
            Orchestra::GeneralMidi | Orchestra::GeneralMidiPercussion => vec![],
            Orchestra::CsoundNative => CSOUND_NATIVE[&inst].aux.to_vec(),
            Orchestra::SuperColliderNative => SUPER_COLLIDER_NATIVE[&inst].aux.to_vec(),
            Orchestra::CsoundSilence => CSOUND_SILENCE_AUX.to_vec(),
            Orchestra::CsoundExternal => vec![CSOUND_EXTERNAL_AUX; aux_count],
        })
    }

    /// MIDI channel of an instrument, for MIDI based orchestras.
    pub fn midi_channel(&self) -> Option<u8> {
        match self {
            Orchestra::GeneralMidiPercussion => Some(PERCUSSION_CHANNEL),
            _ => None,
        }
    }

    /// MIDI program of an instrument, for the general MIDI orchestra.
    pub fn midi_program(&self, inst: u32) -> Option<u8> {
        match self {
            Orchestra::GeneralMidi if inst < 128 => Some(inst as u8),
            _ => None,
        }
    }

    /// Map a realized value into the orchestra's output representation. Pitches are
    /// always mapped. Amplitudes and pans are only scaled when `map_mode` is on; pans
    /// outside of the unit interval are wrapped into it and amplitudes never fall below
    /// zero.
    pub fn post_map(&self, field: MapField, value: f64, map_mode: bool) -> f64 {
        match field {
            MapField::Pitch => match self {
                Orchestra::GeneralMidi | Orchestra::GeneralMidiPercussion => {
                    pitch::ps_to_midi(value) as f64
                }
                Orchestra::CsoundNative | Orchestra::SuperColliderNative => {
                    pitch::ps_to_pch(value)
                }
                Orchestra::CsoundSilence => pitch::ps_to_midi_real(value),
                Orchestra::CsoundExternal => value,
            },
            MapField::Amplitude => {
                let value = match self {
                    Orchestra::CsoundSilence => value * 127.0,
                    Orchestra::GeneralMidi | Orchestra::GeneralMidiPercussion if map_mode => {
                        (value.clamp(0.0, 1.0) * 127.0).round()
                    }
                    Orchestra::CsoundNative if map_mode => value.clamp(0.0, 1.0),
                    _ => value,
                };
                value.max(0.0)
            }
            MapField::Pan => match self {
                Orchestra::GeneralMidi | Orchestra::GeneralMidiPercussion if map_mode => {
                    (value.rem_euclid(1.0) * 127.0).round()
                }
                Orchestra::GeneralMidi | Orchestra::GeneralMidiPercussion => value,
                _ if map_mode || !(0.0..=1.0).contains(&value) => wrap_unit(value),
                _ => value,
            },
        }
    }
}

/// Wrap a value into \[0 - 1\]; values already in range, including 1, are kept.
fn wrap_unit(value: f64) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        value.rem_euclid(1.0)
    }
}

fn sorted_keys(table: &HashMap<u32, Instrument>) -> Vec<u32> {
    let mut keys = table.keys().copied().collect::<Vec<_>>();
    keys.sort_unstable();
    keys
}

impl TryFrom<&str> for Orchestra {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        let name = s.trim().to_ascii_lowercase();
        Orchestra::ALL
            .into_iter()
            .find(|orchestra| orchestra.to_string().to_ascii_lowercase() == name)
            .ok_or_else(|| format!("invalid orchestra '{}'", s))
    }
}

impl Display for Orchestra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Orchestra::GeneralMidi => "generalMidi",
            Orchestra::GeneralMidiPercussion => "generalMidiPercussion",
            Orchestra::CsoundNative => "csoundNative",
            Orchestra::CsoundExternal => "csoundExternal",
            Orchestra::CsoundSilence => "csoundSilence",
            Orchestra::SuperColliderNative => "superColliderNative",
        };
        write!(f, "{}", name)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instruments() -> Result<(), Error> {
        let gm = Orchestra::GeneralMidi;
        assert_eq!(gm.instrument_name(0)?, "acousticGrandPiano");
        assert_eq!(gm.instrument_name(127)?, "gunshot");
        assert!(gm.instrument_name(128).is_err());
        assert!(gm.aux_parameters(0, 3)?.is_empty());
        assert_eq!(gm.midi_program(12), Some(12));

        let percussion = Orchestra::GeneralMidiPercussion;
        assert_eq!(percussion.instrument_name(35)?, "acousticBassDrum");
        assert_eq!(percussion.instrument_name(81)?, "openTriangle");
        assert!(!percussion.is_valid(34));
        assert_eq!(percussion.midi_channel(), Some(10));

        let sc = Orchestra::SuperColliderNative;
        assert_eq!(sc.instrument_name(0)?, "noiseBasic");
        assert_eq!(sc.aux_parameters(0, 0)?.len(), 3);

        let external = Orchestra::CsoundExternal;
        assert!(external.is_valid(1234));
        assert_eq!(external.aux_parameters(20, 2)?, vec![CSOUND_EXTERNAL_AUX; 2]);

        assert_eq!(Orchestra::CsoundSilence.aux_parameters(1, 0)?.len(), 4);
        assert_eq!(Orchestra::CsoundNative.instruments(), Some(vec![3, 4, 5, 11]));
        Ok(())
    }

    #[test]
    fn post_map() {
        let gm = Orchestra::GeneralMidi;
        assert_eq!(gm.post_map(MapField::Pitch, 0.4, true), 60.0);
        assert_eq!(gm.post_map(MapField::Pitch, -0.5, true), 60.0);
        assert_eq!(gm.post_map(MapField::Pitch, 100.0, false), 127.0);
        assert_eq!(gm.post_map(MapField::Amplitude, 0.5, true), 64.0);
        assert_eq!(gm.post_map(MapField::Amplitude, 1.5, true), 127.0);
        assert_eq!(gm.post_map(MapField::Amplitude, -1.0, false), 0.0);
        assert_eq!(gm.post_map(MapField::Pan, 1.5, true), 64.0);

        let native = Orchestra::CsoundNative;
        assert!((native.post_map(MapField::Pitch, 0.0, true) - 8.0).abs() < 1e-9);
        assert!((native.post_map(MapField::Pitch, 13.0, true) - 9.01).abs() < 1e-9);
        assert_eq!(native.post_map(MapField::Amplitude, 1.5, false), 1.5);
        assert_eq!(native.post_map(MapField::Pan, 1.25, false), 0.25);

        let silence = Orchestra::CsoundSilence;
        assert_eq!(silence.post_map(MapField::Pitch, 0.5, true), 60.5);
        assert_eq!(silence.post_map(MapField::Amplitude, 0.5, true), 63.5);
    }

    #[test]
    fn names() {
        for orchestra in Orchestra::ALL {
            assert_eq!(Orchestra::try_from(orchestra.to_string().as_str()), Ok(orchestra));
        }
        assert!(Orchestra::try_from("foo").is_err());
    }
}
