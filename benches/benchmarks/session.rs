use std::hint::black_box;

use criterion::{criterion_group, Criterion};

use athenacl::{EventMode, Session, SessionOptions};

// ---------------------------------------------------------------------------------------------

fn create_session() -> Session {
    let mut session = Session::new(SessionOptions {
        texture_seed: Some(1),
        parameter_seed: Some(2),
        ..SessionOptions::default()
    });
    session
        .path_new("a", &["3-2", "4-1", "c4,e4,g4", "7-35"])
        .unwrap();
    for (name, module) in [("line", "lg"), ("fill", "tf"), ("chords", "ha"), ("drift", "da")] {
        session.texture_new(name, module, 0).unwrap();
        session.texture_edit(name, "t", "0, 60", false).unwrap();
    }
    session.texture_edit("line", "a", "ru, .3, .9", false).unwrap();
    session.clone_new("line", "echo").unwrap();
    session
        .clone_edit("line", "echo", "t", "fa, (ru, .5, 1.5)", false)
        .unwrap();
    session
}

// ---------------------------------------------------------------------------------------------

pub fn score(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session");
    let mut session = create_session();
    group.bench_function("Score", |b| {
        b.iter(|| black_box(session.event_list(EventMode::Midi).unwrap()))
    });
    group.finish();
}

pub fn save(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session");
    let session = create_session();
    group.bench_function("Save", |b| b.iter(|| black_box(session.to_json().unwrap())));
    group.bench_function("Load", |b| {
        let document = session.to_json().unwrap();
        b.iter(|| black_box(Session::from_json(&document).unwrap()))
    });
    group.finish();
}

// ---------------------------------------------------------------------------------------------

criterion_group! {
    name = session;
    config = Criterion::default();
    targets = score, save
}
