use std::hint::black_box;

use criterion::{criterion_group, Criterion};

use athenacl::{
    parameter::{GeneratorObject, ReferenceState, RhythmObject},
    seed::SeedSource,
};

// ---------------------------------------------------------------------------------------------

// nested generators, trying to touch the most expensive parts of the library
const GENERATORS: [&str; 4] = [
    "ws, e, (bg, rc, (2, 4, 8)), 0, (ru, 0, .5), (bphc, e, l, ((0,1),(6,.25),(12,.75)))",
    "mv, a{1}b{2}c{3}:{a=4|b=2|c=1}, (c, 2)",
    "wt, e, 8, 0, (ru, 0, .25), 1",
    "sl, 3@2|4@1, 0, 48, int, rw",
];

pub fn generators(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parameter");
    let refs = ReferenceState::default();
    for text in GENERATORS {
        let mut generator = GeneratorObject::parse(text, &mut SeedSource::new(1)).unwrap();
        group.bench_function(text.split(',').next().unwrap_or(text), |b| {
            let mut t = 0.0;
            b.iter(|| {
                t += 0.125;
                black_box(generator.number(t, &refs).unwrap())
            })
        });
    }
    group.finish();
}

pub fn rhythms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parameter");
    let refs = ReferenceState::with_bpm(132.0);
    let mut rhythm = RhythmObject::parse(
        "mp, a{3,1,1}b{2,1,1}c{3,2,0}:{a=3|b=4|c=1}",
        &mut SeedSource::new(1),
    )
    .unwrap();
    group.bench_function("markovPulse", |b| {
        let mut t = 0.0;
        b.iter(|| {
            t += 1.0;
            black_box(rhythm.run(t, &refs).unwrap())
        })
    });
    group.finish();
}

// ---------------------------------------------------------------------------------------------

criterion_group! {
    name = parameter;
    config = Criterion::default();
    targets = generators, rhythms
}
