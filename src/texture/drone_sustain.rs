//! Sustained simultaneities, one per path position.

use super::{Scorer, TextureModule};
use crate::parameter::options::PolyphonicLevel;

// -------------------------------------------------------------------------------------------------

/// Sounds each multiset as a single chord that lasts for the whole window of its path
/// position. The rhythm generator is not used. Amplitude and pan are chosen per chord, aux
/// values per voice, and every voice starts with a small positive gaussian time offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DroneSustain;

impl TextureModule for DroneSustain {
    fn name(&self) -> &'static str {
        "DroneSustain"
    }

    fn doc(&self) -> &'static str {
        "Each multiset is a simultaneity sustained for the multiset's duration. Rhythm \
        values are ignored."
    }

    fn statics(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("mto", "maxTimeOffset"),
            ("lfp", "levelFieldPolyphonic"),
            ("lop", "levelOctavePolyphonic"),
            ("pdf", "pathDurationFraction"),
        ]
    }

    fn score(&self, scorer: &mut Scorer) -> Result<(), String> {
        let max_offset = scorer.seconds("mto")?;
        let field_level = scorer.polyphonic_level("lfp")?;
        let octave_level = scorer.polyphonic_level("lop")?;

        let mut field = 0.0;
        let mut octave = 0.0;
        for position in 0..scorer.len() {
            let chord = scorer.chord(position).to_vec();
            let (t, end) = scorer.window(position);
            if t >= end {
                continue;
            }
            scorer.set_position(position);
            if field_level != PolyphonicLevel::Voice {
                field = scorer.field(t)?;
            }
            if octave_level != PolyphonicLevel::Voice {
                octave = scorer.octave(t)?;
            }
            let beat = scorer.sustained_beat(end - t);
            let amp = scorer.amp(t)?;
            let pan = scorer.pan(t)?;
            for ps in chord {
                if field_level == PolyphonicLevel::Voice {
                    field = scorer.field(t)?;
                }
                if octave_level == PolyphonicLevel::Voice {
                    octave = scorer.octave(t)?;
                }
                scorer.set_pitch(ps);
                let ps_real = scorer.realize_pitch(ps, field, octave);
                let aux = scorer.aux(t)?;
                let offset = scorer.time_offset(max_offset).abs();
                let event = scorer.new_event(t + offset, &beat, ps_real, amp, pan, aux);
                scorer.store(event)?;
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

    fn scored(edits: &[(&str, &str)]) -> Result<Texture, Error> {
        let path = Path::from_strings("p", &["c,e,g", "d,f"]).map_err(Error::PitchSyntax)?;
        let mut texture = Texture::new(
            "ds",
            "ds",
            "p",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds {
                parameter: 2,
                module: 5,
            },
        )?;
        texture.edit("t", "0, 10")?;
        for (role, text) in edits {
            texture.edit(role, text)?;
        }
        texture.score(&path)?;
        Ok(texture)
    }

    #[test]
    fn one_chord_per_position() -> Result<(), Error> {
        let texture = scored(&[("mto", "0")])?;
        let events = texture.events();
        assert_eq!(events.len(), 5);
        let first = events.iter().filter(|e| e.time == 0.0).collect::<Vec<_>>();
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|e| e.dur == 5.0 && e.sus == 5.0));
        let second = events.iter().filter(|e| e.time == 5.0).collect::<Vec<_>>();
        assert_eq!(second.len(), 2);
        assert!(second.iter().all(|e| e.dur == 5.0 && e.acc == 1.0));
        assert_eq!(texture.time_range_abs(), (0.0, 10.0));
        Ok(())
    }

    #[test]
    fn rhythm_is_ignored() -> Result<(), Error> {
        let texture = scored(&[("mto", "0"), ("r", "l, ((1,1,0))")])?;
        assert_eq!(texture.events().len(), 5);
        Ok(())
    }

    #[test]
    fn offsets_only_delay() -> Result<(), Error> {
        let texture = scored(&[("mto", ".5"), ("lfp", "voice"), ("f", "ru, -2, 2")])?;
        let events = texture.events();
        assert_eq!(events.len(), 5);
        assert!(events
            .iter()
            .all(|e| (0.0..=0.5).contains(&e.time) || (5.0..=5.5).contains(&e.time)));
        Ok(())
    }
}
