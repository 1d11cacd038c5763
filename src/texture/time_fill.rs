//! Density driven event placement.

use super::{DynamicParameter, Scorer, TextureModule};
use crate::{
    parameter::options::{DensityPartition, EventPartition, Level},
    selector::Selector,
    unit,
};

// -------------------------------------------------------------------------------------------------

/// Places a fixed number of events. Each path position gets a share of the total event
/// count, either equal or proportional to its duration fraction. Event start times are
/// drawn from the fill generator, read as unit interval position within the set window
/// or within the whole texture.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeFill;

impl TextureModule for TimeFill {
    fn name(&self) -> &'static str {
        "TimeFill"
    }

    fn doc(&self) -> &'static str {
        "Fills the texture time range with a total number of events, placed with a \
        fill generator."
    }

    fn statics(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("psc", "pitchSelectorControl"),
            ("lfm", "levelFieldMonophonic"),
            ("lom", "levelOctaveMonophonic"),
            ("tec", "totalEventCount"),
            ("lep", "levelEventPartition"),
            ("edp", "eventDensityPartition"),
            ("pdf", "pathDurationFraction"),
        ]
    }

    fn dynamics(&self) -> &'static [DynamicParameter] {
        &[DynamicParameter {
            name: "fillGenerator",
            default: "ru, 0, 1",
            doc: "event start time within the unit interval",
        }]
    }

    fn score(&self, scorer: &mut Scorer) -> Result<(), String> {
        let selection = scorer.selection("psc")?;
        let field_level = scorer.level("lfm")?;
        let octave_level = scorer.level("lom")?;
        let total = scorer.count("tec")?;
        let event_partition = scorer.event_partition("lep")?;
        let density_partition = scorer.density_partition("edp")?;

        let (start, end) = scorer.time_range();
        let span = end - start;
        let counts = (0..scorer.len())
            .map(|position| match density_partition {
                DensityPartition::Set => (total as f64 / scorer.len() as f64).round() as usize,
                DensityPartition::Duration => {
                    let (window_start, window_end) = scorer.window(position);
                    ((window_end - window_start) / span * total as f64).round() as usize
                }
            })
            .collect::<Vec<_>>();

        let mut index = 0;
        let mut field = 0.0;
        let mut octave = 0.0;
        for (position, count) in counts.into_iter().enumerate() {
            let chord = scorer.chord(position).to_vec();
            let (set_start, set_end) = match event_partition {
                EventPartition::Set => scorer.window(position),
                EventPartition::Path => (start, end),
            };
            let mut selector = Selector::new((0..chord.len()).collect(), selection);
            let mut t = set_start;
            scorer.set_position(position);
            if field_level == Level::Set {
                field = scorer.field(t)?;
            }
            if octave_level == Level::Set {
                octave = scorer.octave(t)?;
            }
            for _ in 0..count {
                index += 1;
                if index > total {
                    break;
                }
                let fill = unit::limit(scorer.dynamic("fillGenerator", t)?);
                t = unit::denorm(fill, set_start, set_end)?;
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
                    continue;
                }
                let event = scorer.event(t, &beat, ps_real)?;
                scorer.store(event)?;
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
