//! Simultaneities assembled from selected multisets.

use super::{DynamicParameter, Scorer, TextureModule};
use crate::parameter::options::PolyphonicLevel;

// -------------------------------------------------------------------------------------------------

/// Builds chords from generator controlled multiset and pitch positions. Path durations
/// are ignored: a multiset is chosen, a number of simultaneities is drawn from it, then
/// the next multiset is chosen until the time range is filled.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicAssembly;

impl TextureModule for HarmonicAssembly {
    fn name(&self) -> &'static str {
        "HarmonicAssembly"
    }

    fn doc(&self) -> &'static str {
        "Simultaneities built by selecting multisets and pitches by index. Rhythm, \
        amplitude and pan are chosen once per simultaneity, aux values once per pitch."
    }

    fn statics(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("mto", "maxTimeOffset"),
            ("lfp", "levelFieldPolyphonic"),
            ("lop", "levelOctavePolyphonic"),
        ]
    }

    fn dynamics(&self) -> &'static [DynamicParameter] {
        &[
            DynamicParameter {
                name: "multisetPosition",
                default: "bg, oc, (0, 1, 2, 3, 4, 5, 6, 7, 8)",
                doc: "index position used to select a multiset",
            },
            DynamicParameter {
                name: "pitchPosition",
                default: "bg, oc, (0, 1, 2, 3, 4, 5, 6, 7, 8)",
                doc: "index position used to select pitches from a multiset",
            },
            DynamicParameter {
                name: "countPerMultiset",
                default: "c, 2",
                doc: "number of simultaneities created from the selected multiset",
            },
            DynamicParameter {
                name: "countPerSimultaneity",
                default: "c, 0",
                doc: "number of pitches of a simultaneity, where zero is all pitches",
            },
        ]
    }

    fn score(&self, scorer: &mut Scorer) -> Result<(), String> {
        let max_offset = scorer.seconds("mto")?;
        let field_level = scorer.polyphonic_level("lfp")?;
        let octave_level = scorer.polyphonic_level("lop")?;

        let (start, end) = scorer.time_range();
        let len = scorer.len() as i64;
        let mut t = start;
        let mut field = 0.0;
        let mut octave = 0.0;
        while t < end {
            let selected = scorer.dynamic("multisetPosition", t)?;
            let position = (scorer.weighted_round(selected).abs() % len) as usize;
            let chord = scorer.chord(position).to_vec();
            let count = scorer.dynamic("countPerMultiset", t)?;
            let count = scorer.weighted_round(count).unsigned_abs().max(1);
            scorer.set_position(position);
            if field_level == PolyphonicLevel::Set {
                field = scorer.field(t)?;
            }
            if octave_level == PolyphonicLevel::Set {
                octave = scorer.octave(t)?;
            }
            for _ in 0..count {
                if t > end {
                    break;
                }
                let size = scorer.dynamic("countPerSimultaneity", t)?;
                let size = match scorer.weighted_round(size).unsigned_abs() as usize {
                    0 => chord.len(),
                    size => size.min(chord.len()),
                };
                if field_level == PolyphonicLevel::Event {
                    field = scorer.field(t)?;
                }
                if octave_level == PolyphonicLevel::Event {
                    octave = scorer.octave(t)?;
                }
                let beat = scorer.beat(t)?;
                if beat.is_rest() && !scorer.is_silence() {
                    t += beat.dur;
                    continue;
                }
                let amp = scorer.amp(t)? * beat.acc;
                let pan = scorer.pan(t)?;
                for _ in 0..size {
                    let selected = scorer.dynamic("pitchPosition", t)?;
                    let index = (scorer.weighted_round(selected).abs() % chord.len() as i64) as usize;
                    let ps = chord[index];
                    scorer.set_pitch(ps);
                    if field_level == PolyphonicLevel::Voice {
                        field = scorer.field(t)?;
                    }
                    if octave_level == PolyphonicLevel::Voice {
                        octave = scorer.octave(t)?;
                    }
                    let ps_real = scorer.realize_pitch(ps, field, octave);
                    let aux = scorer.aux(t)?;
                    let mut time = t + scorer.time_offset(max_offset);
                    if time < 0.0 {
                        time = t;
                    }
                    let event = scorer.new_event(time, &beat, ps_real, amp, pan, aux);
                    scorer.store(event)?;
                }
                t += beat.dur;
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use crate::{
        error::Error,
        orchestra::Orchestra,
        path::Path,
        texture::{Texture, TextureSeeds},
    };

    fn texture() -> Result<(Texture, Path), Error> {
        let path = Path::from_strings("p", &["c,e,g", "d,f"]).map_err(Error::PitchSyntax)?;
        let mut texture = Texture::new(
            "ha",
            "ha",
            "p",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds::default(),
        )?;
        texture.edit("r", "l, ((1,1,1))")?;
        texture.edit("t", "0, 2")?;
        texture.edit("mto", "0")?;
        Ok((texture, path))
    }

    #[test]
    fn whole_simultaneities() -> Result<(), Error> {
        let (mut texture, path) = texture()?;
        texture.score(&path)?;
        let chords = texture
            .events()
            .chunk_by(|a, b| a.time == b.time)
            .map(|chord| chord.iter().map(|e| e.ps).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        // two simultaneities per multiset, multisets in cyclic order
        assert_eq!(chords.len(), 4);
        assert_eq!(chords[0].len(), 3);
        assert_eq!(chords[1].len(), 3);
        assert_eq!(chords[2].len(), 2);
        assert_eq!(chords[3].len(), 2);
        Ok(())
    }

    #[test]
    fn simultaneity_size() -> Result<(), Error> {
        let (mut texture, path) = texture()?;
        texture.edit("countPerSimultaneity", "1")?;
        texture.edit("multisetPosition", "0")?;
        texture.edit("pitchPosition", "4")?;
        texture.score(&path)?;
        let pitches = texture.events().iter().map(|e| e.ps).collect::<Vec<_>>();
        // index 4 wraps to the second pitch of the first multiset
        assert_eq!(pitches, vec![4.0; 4]);
        Ok(())
    }
}
