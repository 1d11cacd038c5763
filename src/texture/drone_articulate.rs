//! Every pitch of a multiset as its own articulated voice.

use super::{Scorer, TextureModule};
use crate::parameter::options::Level;

// -------------------------------------------------------------------------------------------------

/// Runs one voice per multiset pitch through each path position's window. All voices
/// share the rhythm and the other generators; each attack gets a small gaussian time
/// offset. The next position starts where the longest voice ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct DroneArticulate;

impl TextureModule for DroneArticulate {
    fn name(&self) -> &'static str {
        "DroneArticulate"
    }

    fn doc(&self) -> &'static str {
        "Each pitch of a multiset is a separate voice with independent articulations \
        within the multiset's duration."
    }

    fn statics(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("mto", "maxTimeOffset"),
            ("lfm", "levelFieldMonophonic"),
            ("lom", "levelOctaveMonophonic"),
            ("pdf", "pathDurationFraction"),
        ]
    }

    fn score(&self, scorer: &mut Scorer) -> Result<(), String> {
        let max_offset = scorer.seconds("mto")?;
        let field_level = scorer.level("lfm")?;
        let octave_level = scorer.level("lom")?;

        let mut t_set = scorer.time_range().0;
        // generators are called with one continuous time line over all voices
        let mut t_cumulative = t_set;
        let mut field = 0.0;
        let mut octave = 0.0;
        for position in 0..scorer.len() {
            let chord = scorer.chord(position).to_vec();
            let (_, end) = scorer.window(position);
            scorer.set_position(position);
            if field_level == Level::Set {
                field = scorer.field(t_set)?;
            }
            if octave_level == Level::Set {
                octave = scorer.octave(t_set)?;
            }
            let mut t_max = t_set;
            for ps in chord {
                let mut t = t_set;
                scorer.set_pitch(ps);
                while t < end {
                    let beat = scorer.beat(t_cumulative)?;
                    if beat.is_rest() && !scorer.is_silence() {
                        t += beat.dur;
                        t_cumulative += beat.dur;
                        continue;
                    }
                    if field_level == Level::Event {
                        field = scorer.field(t_cumulative)?;
                    }
                    if octave_level == Level::Event {
                        octave = scorer.octave(t_cumulative)?;
                    }
                    let ps_real = scorer.realize_pitch(ps, field, octave);
                    let mut event = scorer.event(t_cumulative, &beat, ps_real)?;
                    let offset = scorer.time_offset(max_offset);
                    t += offset;
                    t_cumulative += offset;
                    if t < 0.0 {
                        t = t_set;
                    }
                    event.time = t;
                    scorer.store(event)?;
                    t += beat.dur;
                    t_cumulative += beat.dur;
                }
                t_max = t_max.max(t);
            }
            t_set = t_max;
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

    #[test]
    fn voices() -> Result<(), Error> {
        let path = Path::from_strings("p", &["c,e,g", "d"]).map_err(Error::PitchSyntax)?;
        let mut texture = Texture::new(
            "da",
            "da",
            "p",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds::default(),
        )?;
        texture.edit("r", "l, ((1,1,1))")?;
        texture.edit("t", "0, 4")?;
        texture.edit("mto", "0")?;
        texture.score(&path)?;
        let events = texture.events();
        // three voices over the first window, one over the second
        assert_eq!(events.len(), 3 * 4 + 4);
        assert_eq!(events.iter().filter(|e| e.ps == 2.0).count(), 4);
        assert_eq!(events.iter().filter(|e| e.time == 0.0).count(), 3);
        assert!(events.iter().filter(|e| e.ps == 2.0).all(|e| e.time >= 2.0));
        Ok(())
    }

    #[test]
    fn offsets_stay_bounded() -> Result<(), Error> {
        let path = Path::from_strings("p", &["c,e,g"]).map_err(Error::PitchSyntax)?;
        let mut texture = Texture::new(
            "da",
            "DroneArticulate",
            "p",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds {
                parameter: 3,
                module: 4,
            },
        )?;
        texture.edit("r", "l, ((1,1,1))")?;
        texture.edit("mto", ".1")?;
        texture.score(&path)?;
        assert!(texture.events().iter().all(|e| e.time >= 0.0));
        assert!(!texture.events().is_empty());
        Ok(())
    }
}
