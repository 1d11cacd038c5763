//! Control string vocabularies of parameter objects. All strings parse case-insensitively
//! and accept their documented abbreviations; they display in their long form.

// -------------------------------------------------------------------------------------------------

macro_rules! control_strings {
    ($(#[$meta:meta])* $name:ident, $what:literal {
        $($variant:ident => $long:literal $(| $alias:literal)*),+ $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl TryFrom<&str> for $name {
            type Error = String;

            fn try_from(s: &str) -> Result<Self, String> {
                let name = s.trim().to_ascii_lowercase();
                $(
                    if name == $long.to_ascii_lowercase() $(|| name == $alias)* {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!(
                    "invalid {} '{}': expecting one of {}",
                    $what,
                    s,
                    [$($long),+].join(", ")
                ))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let name = match self {
                    $($name::$variant => $long),+
                };
                write!(f, "{}", name)
            }
        }
    };
}

pub(crate) use control_strings;

// -------------------------------------------------------------------------------------------------

control_strings!(
    /// Time source of periodic generators: the call index or the event time.
    StepMode, "step control" {
        Event => "event" | "e",
        Time => "time" | "t",
    }
);

control_strings!(
    Direction, "direction" {
        UpDown => "upDown" | "ud",
        DownUp => "downUp" | "du",
        Up => "up" | "u",
        Down => "down" | "d",
    }
);

control_strings!(
    /// Break point behavior past the last point.
    Edge, "edge" {
        Loop => "loop" | "l",
        Single => "single" | "s",
    }
);

control_strings!(
    Comparison, "comparison" {
        Equal => "equal" | "e",
        GreaterThan => "greaterThan" | "gt",
        GreaterThanOrEqual => "greaterThanOrEqual" | "gte",
        LessThan => "lessThan" | "lt",
        LessThanOrEqual => "lessThanOrEqual" | "lte",
    }
);

control_strings!(
    /// Result of binary funnels when the value equals the threshold.
    ThresholdMatch, "threshold match" {
        Upper => "upper" | "u",
        Lower => "lower" | "l",
        Match => "match" | "m",
    }
);

control_strings!(
    Anchor, "anchor" {
        Lower => "lower" | "l",
        Upper => "upper" | "u",
        Average => "average" | "a",
        Median => "median" | "m",
    }
);

control_strings!(
    TypeFormat, "type format" {
        String => "string" | "s",
        StringQuote => "stringQuote" | "sq",
    }
);

control_strings!(
    /// Interpretation of sieve segments in pulse sieves.
    Articulation, "articulation" {
        Attack => "attack" | "a",
        Sustain => "sustain" | "s",
    }
);

control_strings!(
    /// Representation used when reading the current pitch or multiset.
    PitchReadFormat, "pitch format" {
        Forte => "forte",
        Mason => "mason",
        Frequency => "fq" | "frequency",
        PitchSpace => "ps" | "pitchspace",
        Midi => "midi",
        Pch => "pch",
        Name => "name",
    }
);

control_strings!(
    Switch, "switch" {
        On => "on" | "1" | "true",
        Off => "off" | "0" | "false",
    }
);

control_strings!(
    /// Resolution of monophonic field and octave values.
    Level, "level" {
        Set => "set" | "s",
        Event => "event" | "e",
    }
);

control_strings!(
    /// Resolution of polyphonic field and octave values.
    PolyphonicLevel, "level" {
        Set => "set" | "s",
        Event => "event" | "e",
        Voice => "voice" | "v",
    }
);

control_strings!(
    EventPartition, "event partition" {
        Set => "set" | "s",
        Path => "path" | "p",
    }
);

control_strings!(
    DensityPartition, "density partition" {
        Set => "set" | "s",
        Duration => "duration" | "d",
    }
);

control_strings!(
    /// Whether event counts are drawn per time segment or once for the whole texture.
    EventCountLevel, "level" {
        Segment => "segment" | "s" | "seg",
        Texture => "texture" | "t" | "text",
    }
);

control_strings!(
    InterpolationMethod, "interpolation method" {
        Linear => "linear" | "l",
        HalfCosine => "halfCosine" | "hc",
        Power => "power" | "p",
    }
);

control_strings!(
    TimeReference, "time reference" {
        CloneTime => "cloneTime" | "ct",
        TextureTime => "textureTime" | "tt",
    }
);

control_strings!(
    RetrogradeMethod, "retrograde method" {
        TimeInverse => "timeInverse" | "ti",
        EventInverse => "eventInverse" | "ei",
        Off => "off" | "o",
    }
);

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(StepMode::try_from("E"), Ok(StepMode::Event));
        assert_eq!(Direction::try_from("upDown"), Ok(Direction::UpDown));
        assert_eq!(Comparison::try_from(" GTE "), Ok(Comparison::GreaterThanOrEqual));
        assert_eq!(InterpolationMethod::try_from("hc"), Ok(InterpolationMethod::HalfCosine));
        assert_eq!(Switch::try_from("off"), Ok(Switch::Off));
        assert!(Edge::try_from("x").is_err());
        assert!(Anchor::try_from("").is_err());
    }

    #[test]
    fn display() {
        for value in PolyphonicLevel::ALL {
            assert_eq!(PolyphonicLevel::try_from(value.to_string().as_str()), Ok(*value));
        }
        assert_eq!(ThresholdMatch::Match.to_string(), "match");
        assert_eq!(RetrogradeMethod::TimeInverse.to_string(), "timeInverse");
        assert_eq!(PitchReadFormat::Frequency.to_string(), "fq");
    }
}
