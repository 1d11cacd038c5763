//! Realized events of textures and clones, and transformations of whole event sequences.

use std::fmt::Display;

use crate::{
    parameter::{args::format_number, options::RetrogradeMethod, Value},
    pulse::Pulse,
};

// -------------------------------------------------------------------------------------------------

/// A single realized event. Events are plain values: textures create them, clones copy
/// and transform them, and event lists merge them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    /// Absolute start time in seconds.
    pub time: f64,
    /// Tempo at the moment the event was created.
    pub bpm: f64,
    /// The symbolic pulse of the rhythm, when the duration was created from a pulse.
    pub pulse: Option<Pulse>,
    /// Duration in seconds until the next event of the same voice.
    pub dur: f64,
    /// Sounding duration in seconds.
    pub sus: f64,
    /// Accent: 0 is a rest.
    pub acc: f64,
    pub amp: f64,
    /// Realized pitch in pitch space, with field, octave and temperament applied.
    pub ps: f64,
    pub pan: f64,
    /// Auxiliary values, one per aux parameter of the instrument.
    pub aux: Vec<Value>,
    pub inst: u32,
    /// Name of the texture which created the event.
    pub texture: String,
    /// Name of the clone which transformed the event, if any.
    pub clone: Option<String>,
}

impl Event {
    pub fn is_rest(&self) -> bool {
        self.acc == 0.0
    }

    /// End of the sounding part of the event.
    pub fn end(&self) -> f64 {
        self.time + self.sus
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            format_number(self.time),
            format_number(self.dur),
            format_number(self.sus),
            format_number(self.acc),
            format_number(self.amp),
            format_number(self.ps),
            format_number(self.pan),
        )?;
        for value in &self.aux {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Sort events by start time. Events with equal times keep their order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
}

/// The absolute time range of the events: earliest start and latest sustain end.
/// Returns `(0, 0)` for an empty sequence.
pub fn time_range_abs(events: &[Event]) -> (f64, f64) {
    let mut iter = events.iter();
    match iter.next() {
        None => (0.0, 0.0),
        Some(first) => iter.fold((first.time, first.end()), |(start, end), event| {
            (start.min(event.time), end.max(event.end()))
        }),
    }
}

/// Reverse a time sorted event sequence.
///
/// `EventInverse` reverses the order of the events but keeps the forward start times.
/// `TimeInverse` reverses the events and recalculates start times from the distances
/// between the forward events, so the last forward gap becomes the first one.
pub fn retrograde(events: &mut Vec<Event>, method: RetrogradeMethod) {
    if events.is_empty() {
        return;
    }
    match method {
        RetrogradeMethod::Off => {}
        RetrogradeMethod::EventInverse => {
            let times = events.iter().map(|e| e.time).collect::<Vec<_>>();
            events.reverse();
            for (event, time) in events.iter_mut().zip(times) {
                event.time = time;
            }
        }
        RetrogradeMethod::TimeInverse => {
            let count = events.len();
            let mut time = events[0].time;
            let mut reversed = Vec::with_capacity(count);
            for i in 0..count {
                let j = count - 1 - i;
                let dur = if i + 1 < count {
                    (events[j].time - events[j - 1].time).abs()
                } else {
                    events[j].dur
                };
                let mut event = events[j].clone();
                event.time = time;
                event.dur = dur;
                time += dur;
                reversed.push(event);
            }
            *events = reversed;
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn events(times_and_durs: &[(f64, f64)]) -> Vec<Event> {
        times_and_durs
            .iter()
            .enumerate()
            .map(|(i, (time, dur))| Event {
                time: *time,
                dur: *dur,
                sus: *dur,
                acc: 1.0,
                ps: i as f64,
                ..Event::default()
            })
            .collect()
    }

    #[test]
    fn range_and_sort() {
        let mut list = events(&[(2.0, 1.0), (0.5, 3.0), (2.0, 0.5)]);
        sort_events(&mut list);
        assert_eq!(
            list.iter().map(|e| (e.time, e.ps)).collect::<Vec<_>>(),
            vec![(0.5, 1.0), (2.0, 0.0), (2.0, 2.0)]
        );
        assert_eq!(time_range_abs(&list), (0.5, 3.5));
        assert_eq!(time_range_abs(&[]), (0.0, 0.0));
    }

    #[test]
    fn event_inverse() {
        let mut list = events(&[(100.0, 3.0), (103.0, 13.0), (116.0, 7.0)]);
        retrograde(&mut list, RetrogradeMethod::EventInverse);
        assert_eq!(
            list.iter().map(|e| (e.time, e.dur)).collect::<Vec<_>>(),
            vec![(100.0, 7.0), (103.0, 13.0), (116.0, 3.0)]
        );
    }

    #[test]
    fn time_inverse() {
        let mut list = events(&[(100.0, 1.0), (101.0, 1.0), (102.0, 3.0), (105.0, 13.0)]);
        retrograde(&mut list, RetrogradeMethod::TimeInverse);
        assert_eq!(
            list.iter().map(|e| (e.time, e.ps)).collect::<Vec<_>>(),
            vec![(100.0, 3.0), (103.0, 2.0), (104.0, 1.0), (105.0, 0.0)]
        );
        assert_eq!(list.last().map(|e| e.dur), Some(1.0));
    }
}
