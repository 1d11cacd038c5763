//! Static parameter objects: options of textures and clones which are fixed for a whole
//! score. They are built from argument text like dynamic objects, but produce a single
//! typed value.

use std::fmt::Display;

use crate::{
    error::Error,
    parameter::{
        args,
        options::{
            DensityPartition, EventCountLevel, EventPartition, InterpolationMethod, Level,
            PolyphonicLevel, RetrogradeMethod, Switch, TimeReference,
        },
        ArgType, Argument, Arguments, Entry, Library, ReprFormat,
    },
    seed::SeedSource,
    selector::SelectionMode,
};

// -------------------------------------------------------------------------------------------------

/// The value of a static parameter object.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    /// Transpositions of parallel voices with a time delay between them.
    ParallelMotion { transpositions: Vec<f64>, delay: f64 },
    /// A duration in seconds.
    Seconds(f64),
    Count(usize),
    Switch(bool),
    Selection(SelectionMode),
    Level(Level),
    PolyphonicLevel(PolyphonicLevel),
    EventPartition(EventPartition),
    DensityPartition(DensityPartition),
    EventCountLevel(EventCountLevel),
    Interpolation(InterpolationMethod),
    TimeReference(TimeReference),
    Retrograde(RetrogradeMethod),
    /// Absolute start and end time in seconds.
    Range(f64, f64),
    Instrument(u32),
}

macro_rules! accessors {
    ($($fn_name:ident: $variant:ident => $ty:ty),+ $(,)?) => {
        impl StaticValue {
            $(
                pub fn $fn_name(&self) -> Option<$ty> {
                    match self {
                        StaticValue::$variant(value) => Some(*value),
                        _ => None,
                    }
                }
            )+
        }
    };
}

accessors! {
    seconds: Seconds => f64,
    count: Count => usize,
    switch: Switch => bool,
    selection: Selection => SelectionMode,
    level: Level => Level,
    polyphonic_level: PolyphonicLevel => PolyphonicLevel,
    event_partition: EventPartition => EventPartition,
    density_partition: DensityPartition => DensityPartition,
    event_count_level: EventCountLevel => EventCountLevel,
    interpolation: Interpolation => InterpolationMethod,
    time_reference: TimeReference => TimeReference,
    retrograde: Retrograde => RetrogradeMethod,
    instrument: Instrument => u32,
}

impl StaticValue {
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            StaticValue::Range(start, end) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn parallel_motion(&self) -> Option<(&[f64], f64)> {
        match self {
            StaticValue::ParallelMotion {
                transpositions,
                delay,
            } => Some((transpositions, *delay)),
            _ => None,
        }
    }
}

// -------------------------------------------------------------------------------------------------

fn switch(args: &mut Arguments) -> Result<StaticValue, String> {
    Ok(StaticValue::Switch(args.option::<Switch>(0)? == Switch::On))
}

const ON_OFF: &[(&str, ArgType)] = &[("onOff", ArgType::Text)];
const SELECTION: &[(&str, ArgType)] = &[("selectionString", ArgType::Text)];
const LEVEL: &[(&str, ArgType)] = &[("level", ArgType::Text)];

pub(crate) static TEXTURE_STATICS: &[Entry<StaticValue>] = &[
    Entry {
        short: "pml",
        long: "parallelMotionList",
        args: &[
            ("transpositionList", ArgType::List),
            ("timeDelay", ArgType::Number),
        ],
        defaults: "(), 0",
        build: |args| {
            let transpositions = args.numbers(0)?;
            let delay = args.number(1)?;
            if delay < 0.0 {
                return Err("timeDelay must be greater than or equal to zero.".to_string());
            }
            Ok(StaticValue::ParallelMotion {
                transpositions,
                delay,
            })
        },
    },
    Entry {
        short: "mto",
        long: "maxTimeOffset",
        args: &[("time", ArgType::Number)],
        defaults: ".025",
        build: |args| {
            let time = args.number(0)?;
            if time < 0.0 {
                return Err("time must be greater than or equal to zero.".to_string());
            }
            Ok(StaticValue::Seconds(time))
        },
    },
    Entry {
        short: "lws",
        long: "loopWithinSet",
        args: ON_OFF,
        defaults: "on",
        build: switch,
    },
    Entry {
        short: "pdf",
        long: "pathDurationFraction",
        args: ON_OFF,
        defaults: "on",
        build: switch,
    },
    Entry {
        short: "psc",
        long: "pitchSelectorControl",
        args: SELECTION,
        defaults: "randomPermutate",
        build: |args| Ok(StaticValue::Selection(args.selection(0)?)),
    },
    Entry {
        short: "msc",
        long: "multisetSelectorControl",
        args: SELECTION,
        defaults: "randomPermutate",
        build: |args| Ok(StaticValue::Selection(args.selection(0)?)),
    },
    Entry {
        short: "lfm",
        long: "levelFieldMonophonic",
        args: LEVEL,
        defaults: "event",
        build: |args| Ok(StaticValue::Level(args.option::<Level>(0)?)),
    },
    Entry {
        short: "lom",
        long: "levelOctaveMonophonic",
        args: LEVEL,
        defaults: "event",
        build: |args| Ok(StaticValue::Level(args.option::<Level>(0)?)),
    },
    Entry {
        short: "lfp",
        long: "levelFieldPolyphonic",
        args: LEVEL,
        defaults: "event",
        build: |args| Ok(StaticValue::PolyphonicLevel(args.option::<PolyphonicLevel>(0)?)),
    },
    Entry {
        short: "lop",
        long: "levelOctavePolyphonic",
        args: LEVEL,
        defaults: "event",
        build: |args| Ok(StaticValue::PolyphonicLevel(args.option::<PolyphonicLevel>(0)?)),
    },
    Entry {
        short: "tec",
        long: "totalEventCount",
        args: &[("count", ArgType::Number)],
        defaults: "20",
        build: |args| {
            let count = args.integer(0)?;
            if count <= 0 {
                return Err("count must be greater than zero.".to_string());
            }
            Ok(StaticValue::Count(count as usize))
        },
    },
    Entry {
        short: "lep",
        long: "levelEventPartition",
        args: LEVEL,
        defaults: "path",
        build: |args| Ok(StaticValue::EventPartition(args.option::<EventPartition>(0)?)),
    },
    Entry {
        short: "edp",
        long: "eventDensityPartition",
        args: LEVEL,
        defaults: "duration",
        build: |args| Ok(StaticValue::DensityPartition(args.option::<DensityPartition>(0)?)),
    },
    Entry {
        short: "lec",
        long: "levelEventCount",
        args: LEVEL,
        defaults: "segment",
        build: |args| Ok(StaticValue::EventCountLevel(args.option::<EventCountLevel>(0)?)),
    },
    Entry {
        short: "tsc",
        long: "totalSegmentCount",
        args: &[("count", ArgType::Number)],
        defaults: "10",
        build: |args| {
            let count = args.integer(0)?;
            if count <= 0 {
                return Err("count must be greater than zero.".to_string());
            }
            Ok(StaticValue::Count(count as usize))
        },
    },
    Entry {
        short: "imc",
        long: "interpolationMethodControl",
        args: &[("method", ArgType::Text)],
        defaults: "linear",
        build: |args| Ok(StaticValue::Interpolation(args.option::<InterpolationMethod>(0)?)),
    },
];

pub(crate) static CLONE_STATICS: &[Entry<StaticValue>] = &[
    Entry {
        short: "trs",
        long: "timeReferenceSource",
        args: &[("name", ArgType::Text)],
        defaults: "textureTime",
        build: |args| Ok(StaticValue::TimeReference(args.option::<TimeReference>(0)?)),
    },
    Entry {
        short: "rmt",
        long: "retrogradeMethodToggle",
        args: &[("name", ArgType::Text)],
        defaults: "off",
        build: |args| Ok(StaticValue::Retrograde(args.option::<RetrogradeMethod>(0)?)),
    },
];

pub(crate) static STATICS: &[Entry<StaticValue>] = &[
    Entry {
        short: "sr",
        long: "staticRange",
        args: &[("timeRange", ArgType::List)],
        defaults: "(0, 20)",
        build: |args| match args.numbers(0)?[..] {
            [start, end] if start >= 0.0 && end >= 0.0 && start < end => {
                Ok(StaticValue::Range(start, end))
            }
            [_, _] => Err(
                "time range must be positive and the start must precede the end.".to_string(),
            ),
            _ => Err("time range must be a list of two numbers.".to_string()),
        },
    },
    Entry {
        short: "si",
        long: "staticInst",
        args: &[("instrument", ArgType::Number)],
        defaults: "0",
        build: |args| {
            let number = args.number(0)?;
            if number < 0.0 || number.fract() != 0.0 {
                return Err(format!(
                    "instrument number must be a positive integer, got {}",
                    args::format_number(number)
                ));
            }
            Ok(StaticValue::Instrument(number as u32))
        },
    },
];

// -------------------------------------------------------------------------------------------------

/// A constructed static parameter object with its canonical arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticObject {
    library: Library,
    args: Vec<Argument>,
    value: StaticValue,
}

impl StaticObject {
    /// Build a static object of the given library from its argument tree.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use athenacl::parameter::{Library, StaticObject};
    /// let count = StaticObject::parse(Library::TextureStatic, "tec, 12").unwrap();
    /// assert_eq!(count.value().count(), Some(12));
    /// assert_eq!(count.to_string(), "totalEventCount, 12");
    /// ```
    pub fn new(library: Library, args: &[Argument]) -> Result<Self, Error> {
        Self::build(library, args).map_err(Error::ParameterObjectSyntax)
    }

    pub fn parse(library: Library, text: &str) -> Result<Self, Error> {
        Self::new(
            library,
            &Argument::parse(text).map_err(Error::ParameterObjectSyntax)?,
        )
    }

    pub(crate) fn build(library: Library, args: &[Argument]) -> Result<Self, String> {
        let table = match library {
            Library::TextureStatic => &*super::TEXTURE_STATICS,
            Library::CloneStatic => &*super::CLONE_STATICS,
            Library::Static => &*super::STATICS,
            _ => return Err(format!("{} is not a static parameter library", library)),
        };
        let mut seeds = SeedSource::new(0);
        let (args, value) = super::build(library, table, args, &mut seeds)?;
        Ok(Self {
            library,
            args,
            value,
        })
    }

    pub fn library(&self) -> Library {
        self.library
    }

    /// The long type name.
    pub fn name(&self) -> &str {
        self.args.first().and_then(Argument::as_text).unwrap_or_default()
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn value(&self) -> &StaticValue {
        &self.value
    }

    /// Static objects have no computed state, so all formats are the argument text.
    pub fn repr(&self, _format: ReprFormat) -> String {
        args::format_arguments(&self.args)
    }
}

impl Display for StaticObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repr(ReprFormat::ArgsOnly))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    fn texture(text: &str) -> Result<StaticObject, String> {
        StaticObject::build(Library::TextureStatic, &Argument::parse(text)?)
    }

    #[test]
    fn texture_statics() -> Result<(), String> {
        assert_eq!(texture("tec")?.value(), &StaticValue::Count(20));
        assert!(texture("tec, 0").is_err());
        assert_eq!(texture("mto")?.value().seconds(), Some(0.025));
        assert!(texture("mto, -1").is_err());
        assert_eq!(texture("lws, off")?.value().switch(), Some(false));
        assert_eq!(texture("pdf")?.value().switch(), Some(true));
        assert!(texture("lws, maybe").is_err());

        let selector = texture("psc, oc")?;
        assert_eq!(selector.value().selection(), Some(SelectionMode::OrderedCyclic));
        assert_eq!(selector.to_string(), "pitchSelectorControl, orderedCyclic");
        assert_eq!(
            texture("msc")?.value().selection(),
            Some(SelectionMode::RandomPermutate)
        );

        assert_eq!(texture("lfm, s")?.value().level(), Some(Level::Set));
        assert!(texture("lom, voice").is_err());
        assert_eq!(
            texture("lop, v")?.value().polyphonic_level(),
            Some(PolyphonicLevel::Voice)
        );
        assert_eq!(
            texture("lep")?.value().event_partition(),
            Some(EventPartition::Path)
        );
        assert_eq!(
            texture("edp, s")?.value().density_partition(),
            Some(DensityPartition::Set)
        );
        assert_eq!(
            texture("imc, hc")?.value().interpolation(),
            Some(InterpolationMethod::HalfCosine)
        );

        let motion = texture("pml, (7, -5), .5")?;
        assert_eq!(motion.value().parallel_motion(), Some((&[7.0, -5.0][..], 0.5)));
        assert_eq!(texture("pml")?.value().parallel_motion(), Some((&[][..], 0.0)));
        assert!(texture("pml, (7), -1").is_err());
        Ok(())
    }

    #[test]
    fn clone_statics() -> Result<(), String> {
        let reference = StaticObject::build(Library::CloneStatic, &Argument::parse("trs, ct")?)?;
        assert_eq!(
            reference.value().time_reference(),
            Some(TimeReference::CloneTime)
        );
        assert_eq!(reference.to_string(), "timeReferenceSource, cloneTime");
        let retrograde = StaticObject::build(Library::CloneStatic, &Argument::parse("rmt")?)?;
        assert_eq!(retrograde.value().retrograde(), Some(RetrogradeMethod::Off));
        assert!(StaticObject::build(Library::CloneStatic, &Argument::parse("tec")?).is_err());
        Ok(())
    }

    #[test]
    fn statics() -> Result<(), String> {
        let build = |text: &str| StaticObject::build(Library::Static, &Argument::parse(text)?);
        assert_eq!(build("sr, (2, 10)")?.value().range(), Some((2.0, 10.0)));
        assert_eq!(build("sr")?.value().range(), Some((0.0, 20.0)));
        assert!(build("sr, (10, 2)").is_err());
        assert!(build("sr, (-1, 2)").is_err());
        assert!(build("sr, (1, 2, 3)").is_err());
        assert_eq!(build("si, 3")?.value().instrument(), Some(3));
        assert!(build("si, 1.5").is_err());
        assert!(StaticObject::build(Library::Generator, &Argument::parse("c, 1")?).is_err());
        Ok(())
    }
}
