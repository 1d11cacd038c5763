//! A line of chords through the path.

use super::{Scorer, TextureModule};
use crate::{parameter::options::PolyphonicLevel, selector::Selector};

// -------------------------------------------------------------------------------------------------

/// Walks the path positions in order like a line, but every rhythm step sounds the whole
/// multiset. The pitch selector picks the reference pitch of each chord. Amplitude and pan
/// are chosen per chord, aux values per voice. Optional parallel voices repeat each chord
/// tone transposed and delayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCluster;

impl TextureModule for LineCluster {
    fn name(&self) -> &'static str {
        "LineCluster"
    }

    fn doc(&self) -> &'static str {
        "A line of chords. Each path position is sounded as a simultaneity on every \
        rhythm step within the position's fraction of the texture duration."
    }

    fn statics(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("pml", "parallelMotionList"),
            ("psc", "pitchSelectorControl"),
            ("lfp", "levelFieldPolyphonic"),
            ("lop", "levelOctavePolyphonic"),
            ("pdf", "pathDurationFraction"),
        ]
    }

    fn score(&self, scorer: &mut Scorer) -> Result<(), String> {
        let (transpositions, delay) = scorer.parallel_motion("pml")?;
        let selection = scorer.selection("psc")?;
        let field_level = scorer.polyphonic_level("lfp")?;
        let octave_level = scorer.polyphonic_level("lop")?;

        let mut t = scorer.time_range().0;
        let mut field = 0.0;
        let mut octave = 0.0;
        for position in 0..scorer.len() {
            let chord = scorer.chord(position).to_vec();
            let (_, end) = scorer.window(position);
            let mut selector = Selector::new((0..chord.len()).collect(), selection);
            scorer.set_position(position);
            if field_level == PolyphonicLevel::Set {
                field = scorer.field(t)?;
            }
            if octave_level == PolyphonicLevel::Set {
                octave = scorer.octave(t)?;
            }
            while t < end {
                let beat = scorer.beat(t)?;
                if beat.is_rest() && !scorer.is_silence() {
                    t += beat.dur;
                    continue;
                }
                let root = chord[selector.select(scorer.random())?];
                scorer.set_pitch(root);
                if field_level == PolyphonicLevel::Event {
                    field = scorer.field(t)?;
                }
                if octave_level == PolyphonicLevel::Event {
                    octave = scorer.octave(t)?;
                }
                let mut voices = Vec::with_capacity(chord.len());
                for ps in &chord {
                    if field_level == PolyphonicLevel::Voice {
                        field = scorer.field(t)?;
                    }
                    if octave_level == PolyphonicLevel::Voice {
                        octave = scorer.octave(t)?;
                    }
                    voices.push(scorer.realize_pitch(*ps, field, octave));
                }
                let amp = scorer.amp(t)? * beat.acc;
                let pan = scorer.pan(t)?;
                for ps_real in voices {
                    let aux = scorer.aux(t)?;
                    let event = scorer.new_event(t, &beat, ps_real, amp, pan, aux);
                    for (index, transposition) in transpositions.iter().enumerate() {
                        let mut voice = event.clone();
                        voice.time = t + delay * (index + 1) as f64;
                        voice.ps = ps_real + transposition;
                        scorer.store(voice)?;
                    }
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

    fn scored(edits: &[(&str, &str)]) -> Result<Texture, Error> {
        let path = Path::from_strings("p", &["c4,e4,g4", "d4"]).map_err(Error::PitchSyntax)?;
        let mut texture = Texture::new(
            "lc",
            "LineCluster",
            "p",
            Orchestra::GeneralMidi,
            0,
            TextureSeeds::default(),
        )?;
        texture.edit("r", "l, ((1,1,1))")?;
        texture.edit("t", "0, 4")?;
        for (role, text) in edits {
            texture.edit(role, text)?;
        }
        texture.score(&path)?;
        Ok(texture)
    }

    #[test]
    fn chords_on_every_step() -> Result<(), Error> {
        let texture = scored(&[])?;
        let events = texture.events();
        // four steps of three voices, then four single pitches
        assert_eq!(events.len(), 4 * 3 + 4);
        let first = events.iter().filter(|e| e.time == 0.5).collect::<Vec<_>>();
        let mut pitches = first.iter().map(|e| e.ps).collect::<Vec<_>>();
        pitches.sort_by(f64::total_cmp);
        assert_eq!(pitches, vec![0.0, 4.0, 7.0]);
        // amplitude is shared by all voices of a chord
        assert!(first.iter().all(|e| e.amp == first[0].amp));
        assert!(events.iter().filter(|e| e.time >= 2.0).all(|e| e.ps == 2.0));
        Ok(())
    }

    #[test]
    fn rests_are_skipped() -> Result<(), Error> {
        let texture = scored(&[("r", "l, ((1,1,1), (1,1,0))")])?;
        assert_eq!(texture.events().len(), 2 * 3 + 2);
        Ok(())
    }

    #[test]
    fn parallel_voices() -> Result<(), Error> {
        let texture = scored(&[("pml", "(-12), .125"), ("t", "0, 2")])?;
        let events = texture.events();
        assert_eq!(events.len(), 2 * (3 + 3) + 2 * 2);
        let delayed = events.iter().filter(|e| e.time == 0.125).collect::<Vec<_>>();
        let mut pitches = delayed.iter().map(|e| e.ps).collect::<Vec<_>>();
        pitches.sort_by(f64::total_cmp);
        assert_eq!(pitches, vec![-12.0, -8.0, -5.0]);
        Ok(())
    }
}
