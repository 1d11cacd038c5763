//! Event placement within generated time segments.

use super::{DynamicParameter, Scorer, TextureModule};
use crate::{
    parameter::options::{EventCountLevel, Level},
    selector::Selector,
    unit,
};

// -------------------------------------------------------------------------------------------------

/// Splits the texture time range into a number of segments with generated width weights,
/// then places a generated number of events within each segment with the fill generator.
/// The path position of an event is the one whose window contains its start time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSegment;

impl TextureModule for TimeSegment {
    fn name(&self) -> &'static str {
        "TimeSegment"
    }

    fn doc(&self) -> &'static str {
        "Fills time segments of generated widths with a generated number of events. \
        Pitches come from the path position active at each event's start time."
    }

    fn statics(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("psc", "pitchSelectorControl"),
            ("lfm", "levelFieldMonophonic"),
            ("lom", "levelOctaveMonophonic"),
            ("lec", "levelEventCount"),
            ("tsc", "totalSegmentCount"),
            ("pdf", "pathDurationFraction"),
        ]
    }

    fn dynamics(&self) -> &'static [DynamicParameter] {
        &[
            DynamicParameter {
                name: "segmentWidthGenerator",
                default: "bg, rc, (1, 2, 3)",
                doc: "width weight of a segment",
            },
            DynamicParameter {
                name: "eventCountGenerator",
                default: "cg, ud, 3, 40, 2",
                doc: "event count per segment, or for the whole texture",
            },
            DynamicParameter {
                name: "fillGenerator",
                default: "ru, 0, 1",
                doc: "event start time within the unit interval of a segment",
            },
        ]
    }

    fn score(&self, scorer: &mut Scorer) -> Result<(), String> {
        let selection = scorer.selection("psc")?;
        let field_level = scorer.level("lfm")?;
        let octave_level = scorer.level("lom")?;
        let count_level = scorer.event_count_level("lec")?;
        let segment_count = scorer.count("tsc")?;

        // generators of the segment layout step with the segment index
        let counts = match count_level {
            EventCountLevel::Segment => (0..segment_count)
                .map(|index| {
                    let count = scorer.dynamic("eventCountGenerator", index as f64)?;
                    Ok(count.round().max(0.0) as usize)
                })
                .collect::<Result<Vec<_>, String>>()?,
            EventCountLevel::Texture => {
                let total = scorer.dynamic("eventCountGenerator", 0.0)?;
                let count = (total / segment_count as f64).round().max(1.0) as usize;
                vec![count; segment_count]
            }
        };
        let widths = (0..segment_count)
            .map(|index| scorer.dynamic("segmentWidthGenerator", index as f64))
            .collect::<Result<Vec<_>, String>>()?;
        if widths.iter().any(|width| !(*width > 0.0)) {
            return Err(format!(
                "segmentWidthGenerator: segment widths must be positive, got {:?}",
                widths
            ));
        }
        let bounds = unit::boundary_proportion(&widths)?;

        let (start, end) = scorer.time_range();
        let span = end - start;
        // set level field and octave values are taken at the start of each position
        let mut set_fields = Vec::new();
        let mut set_octaves = Vec::new();
        for position in 0..scorer.len() {
            let (window_start, _) = scorer.window(position);
            if field_level == Level::Set {
                set_fields.push(scorer.field(window_start)?);
            }
            if octave_level == Level::Set {
                set_octaves.push(scorer.octave(window_start)?);
            }
        }
        let mut selectors = (0..scorer.len())
            .map(|position| {
                let indices = (0..scorer.chord(position).len()).collect();
                Selector::new(indices, selection)
            })
            .collect::<Vec<_>>();

        let mut t = start;
        for ((lower, _, upper), count) in bounds.into_iter().zip(counts) {
            let segment_start = start + lower * span;
            let segment_end = start + upper * span;
            for _ in 0..count {
                let fill = unit::limit(scorer.dynamic("fillGenerator", t)?);
                t = unit::denorm(fill, segment_start, segment_end)?;
                let position = scorer.position_at(t);
                let index = selectors[position].select(scorer.random())?;
                let ps = scorer.chord(position)[index];
                scorer.set_position(position);
                scorer.set_pitch(ps);
                let field = match field_level {
                    Level::Event => scorer.field(t)?,
                    Level::Set => set_fields[position],
                };
                let octave = match octave_level {
                    Level::Event => scorer.octave(t)?,
                    Level::Set => set_octaves[position],
                };
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

#[cfg(test)]
mod test {
    use crate::{
        error::Error,
        orchestra::Orchestra,
        path::Path,
        texture::{Texture, TextureSeeds},
    };

    fn texture(path: &Path) -> Result<Texture, Error> {
        let mut texture = Texture::new(
            "ts",
            "ts",
            path.name(),
            Orchestra::GeneralMidi,
            0,
            TextureSeeds {
                parameter: 11,
                module: 13,
            },
        )?;
        texture.edit("r", "l, ((4,1,1))")?;
        texture.edit("t", "0, 12")?;
        Ok(texture)
    }

    #[test]
    fn counts_per_segment() -> Result<(), Error> {
        let path = Path::from_strings("p", &["c,e", "g"]).map_err(Error::PitchSyntax)?;
        let mut texture = texture(&path)?;
        texture.edit("tsc", "3")?;
        texture.edit("eventCountGenerator", "bg, oc, (1, 2, 3)")?;
        texture.score(&path)?;
        assert_eq!(texture.events().len(), 6);

        texture.edit("lec", "texture")?;
        texture.edit("eventCountGenerator", "c, 10")?;
        texture.score(&path)?;
        // 10 over 3 segments rounds to 3 each
        assert_eq!(texture.events().len(), 9);
        assert!(texture
            .events()
            .iter()
            .all(|e| (0.0..=12.0).contains(&e.time)));
        Ok(())
    }

    #[test]
    fn segments_follow_width_weights() -> Result<(), Error> {
        let path = Path::from_strings("p", &["c", "g"]).map_err(Error::PitchSyntax)?;
        let mut texture = texture(&path)?;
        texture.edit("tsc", "2")?;
        texture.edit("segmentWidthGenerator", "bg, oc, (1, 3)")?;
        texture.edit("eventCountGenerator", "c, 4")?;
        texture.edit("fillGenerator", "c, 0")?;
        texture.score(&path)?;
        let times = texture.events().iter().map(|e| e.time).collect::<Vec<_>>();
        assert_eq!(times, vec![0.0, 0.0, 0.0, 0.0, 3.0, 3.0, 3.0, 3.0]);
        // both segment starts lie in the window of the first position
        assert!(texture.events().iter().all(|e| e.ps == 0.0));
        Ok(())
    }

    #[test]
    fn pitches_follow_event_time() -> Result<(), Error> {
        let path = Path::from_strings("p", &["c", "g"]).map_err(Error::PitchSyntax)?;
        let mut texture = texture(&path)?;
        texture.edit("tsc", "1")?;
        texture.edit("eventCountGenerator", "c, 2")?;
        texture.edit("fillGenerator", "bg, oc, (.25, .75)")?;
        texture.score(&path)?;
        let events = texture.events();
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].time, events[0].ps), (3.0, 0.0));
        assert_eq!((events[1].time, events[1].ps), (9.0, 7.0));
        Ok(())
    }

    #[test]
    fn zero_width_fails() -> Result<(), Error> {
        let path = Path::from_strings("p", &["c"]).map_err(Error::PitchSyntax)?;
        let mut texture = texture(&path)?;
        texture.edit("segmentWidthGenerator", "c, 0")?;
        assert!(texture.score(&path).is_err());
        assert!(texture.events().is_empty());
        Ok(())
    }
}
