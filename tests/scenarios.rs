use athenacl::{
    parameter::{GeneratorObject, ReferenceState, RhythmObject},
    pulse::Pulse,
    seed::{RandomStream, SeedSource},
    sieve::Sieve,
    texture::Role,
    Error, EventMode, Session, SessionOptions,
};

use pretty_assertions::assert_eq;

// -------------------------------------------------------------------------------------------------

fn session() -> Session {
    Session::new(SessionOptions {
        event_mode: EventMode::Midi,
        texture_seed: Some(10),
        parameter_seed: Some(20),
        ..SessionOptions::default()
    })
}

#[test]
fn default_texture_fills_its_time_range() -> Result<(), Error> {
    let mut session = session();
    session.path_new("a", &["3-2"])?;
    session.texture_new("a", "lg", 0)?;
    session.texture_edit("a", "t", "0, 20", false)?;
    session.texture_edit("a", "b", "120", false)?;

    let list = session.event_list(EventMode::Midi)?;
    assert!(!list.is_empty());
    assert!(list.failures().is_empty());
    let times = list
        .events()
        .iter()
        .map(|mapped| mapped.event.time)
        .collect::<Vec<_>>();
    assert_eq!(times.first().copied(), Some(0.0));
    assert!(times.iter().all(|time| *time <= 20.0));
    // pitches of 3-2 in middle C
    assert!(list
        .events()
        .iter()
        .all(|mapped| [60.0, 61.0, 63.0].contains(&mapped.pitch)));
    Ok(())
}

#[test]
fn copied_textures_are_independent() -> Result<(), Error> {
    let mut session = session();
    session.path_new("a", &["3-2"])?;
    session.path_new("b", &["8,12,21,34"])?;
    session.path_select("a")?;
    session.texture_new("a", "lg", 0)?;
    session.texture_copy("a", "b")?;

    let a = session.texture("a").ok_or(Error::TextureState("a".into()))?;
    let b = session.texture("b").ok_or(Error::TextureState("b".into()))?;
    assert_eq!(a.parameters()?, b.parameters()?);
    assert_eq!(b.path(), "a");

    let rhythm = b.args(&Role::Rhythm)?;
    session.texture_edit("a", "r", "l, ((4,1,1), (4,3,1))", false)?;
    let b = session.texture("b").ok_or(Error::TextureState("b".into()))?;
    assert_eq!(b.args(&Role::Rhythm)?, rhythm);
    let a = session.texture("a").ok_or(Error::TextureState("a".into()))?;
    assert!(a.args(&Role::Rhythm)? != rhythm);
    Ok(())
}

#[test]
fn pulse_realization() -> Result<(), String> {
    // three sixteenth notes at 120 bpm: 3/4 of a half second beat
    let pulse = Pulse::try_from("(4,3,0)")?;
    let realized = pulse.realize(120.0);
    assert_eq!((realized.dur, realized.sus, realized.acc), (0.375, 0.375, 0.0));
    assert!(pulse.is_rest());
    Ok(())
}

#[test]
fn sieve_logic() -> Result<(), String> {
    let sieve = Sieve::try_from("3@2 & 4@1 | 2@0 & 3@1 | 3@3 | -4@2")?;
    let expected = (0..100)
        .filter(|x| {
            let a = x % 3 == 2 && x % 4 == 1;
            let b = x % 2 == 0 && x % 3 == 1;
            let c = x % 3 == 0;
            let d = x % 4 != 2;
            a || b || c || d
        })
        .collect::<Vec<i64>>();
    assert_eq!(sieve.integers(0, 0..100), expected);
    assert_eq!(sieve.period(), 12);
    Ok(())
}

#[test]
fn markov_pulse_frequencies() -> Result<(), Error> {
    let mut rhythm = RhythmObject::parse(
        "mp, a{3,1,1}b{2,1,1}c{3,2,0}:{a=3|b=4|c=1}",
        &mut SeedSource::new(42),
    )?;
    let refs = ReferenceState::with_bpm(120.0);
    let mut counts = [0usize; 3];
    for step in 0..1000 {
        let realized = rhythm
            .run(step as f64, &refs)
            .map_err(Error::ParameterObjectSyntax)?;
        let dur = realized.dur;
        if (dur - 0.5 / 3.0).abs() < 1e-9 {
            counts[0] += 1;
        } else if (dur - 0.25).abs() < 1e-9 {
            counts[1] += 1;
        } else if (dur - 1.0 / 3.0).abs() < 1e-9 {
            assert_eq!(realized.acc, 0.0);
            counts[2] += 1;
        } else {
            panic!("unexpected duration {}", dur);
        }
    }
    for (count, expected) in counts.iter().zip([3.0 / 8.0, 4.0 / 8.0, 1.0 / 8.0]) {
        let frequency = *count as f64 / 1000.0;
        assert!(
            (frequency - expected).abs() < 0.06,
            "frequency {} expected {}",
            frequency,
            expected
        );
    }
    Ok(())
}

#[test]
fn reseeding_repeats_values() -> Result<(), Error> {
    let mut stream = RandomStream::new(Some(300));
    let first = stream.unit();
    stream.reseed(300);
    assert_eq!(stream.unit(), first);

    let refs = ReferenceState::default();
    let mut generator = GeneratorObject::parse("ru, 0, 1", &mut SeedSource::new(300))?;
    let first = generator.number(0.0, &refs).map_err(Error::ParameterObjectSyntax)?;
    let mut generator = GeneratorObject::parse("ru, 0, 1", &mut SeedSource::new(300))?;
    let second = generator.number(0.0, &refs).map_err(Error::ParameterObjectSyntax)?;
    assert_eq!(first, second);
    Ok(())
}
