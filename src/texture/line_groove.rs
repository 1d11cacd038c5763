//! A monophonic line through the path.

use super::{Scorer, TextureModule};
use crate::{parameter::options::Level, selector::Selector};

// -------------------------------------------------------------------------------------------------

/// Walks the path positions in order. Within each position's time window, rhythms are
/// pulled until the window is filled and pitches are selected from the position's
/// multiset. Optional parallel voices repeat each event transposed and delayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineGroove;

impl TextureModule for LineGroove {
    fn name(&self) -> &'static str {
        "LineGroove"
    }

    fn doc(&self) -> &'static str {
        "A single line. Each path position is sustained for its fraction of the texture \
        duration; pitches are chosen from the multiset with the pitch selector."
    }

    fn statics(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("pml", "parallelMotionList"),
            ("psc", "pitchSelectorControl"),
            ("lfm", "levelFieldMonophonic"),
            ("lom", "levelOctaveMonophonic"),
            ("pdf", "pathDurationFraction"),
        ]
    }

    fn score(&self, scorer: &mut Scorer) -> Result<(), String> {
        let (transpositions, delay) = scorer.parallel_motion("pml")?;
        let selection = scorer.selection("psc")?;
        let field_level = scorer.level("lfm")?;
        let octave_level = scorer.level("lom")?;

        let mut t = scorer.time_range().0;
        let mut field = 0.0;
        let mut octave = 0.0;
        for position in 0..scorer.len() {
            let chord = scorer.chord(position).to_vec();
            let (_, end) = scorer.window(position);
            let mut selector = Selector::new((0..chord.len()).collect(), selection);
            scorer.set_position(position);
            if field_level == Level::Set {
                field = scorer.field(t)?;
            }
            if octave_level == Level::Set {
                octave = scorer.octave(t)?;
            }
            while t < end {
                let ps = chord[selector.select(scorer.random())?];
                scorer.set_pitch(ps);
                if field_level == Level::Event {
                    field = scorer.field(t)?;
                }
                if octave_level == Level::Event {
                    octave = scorer.octave(t)?;
                }
                let ps_real = scorer.realize_pitch(ps, field, octave);
                let beat = scorer.beat(t)?;
                if beat.is_rest() && !scorer.is_silence() {
                    t += beat.dur;
                    continue;
                }
                let event = scorer.event(t, &beat, ps_real)?;
                for (index, transposition) in transpositions.iter().enumerate() {
                    let mut voice = event.clone();
                    voice.time = t + delay * (index + 1) as f64;
                    voice.ps = ps_real + transposition;
                    scorer.store(voice)?;
                }
                scorer.store(event)?;
                t += beat.dur;
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
