use std::hint::black_box;

use criterion::{criterion_group, Criterion};

use athenacl::sieve::{SegmentFormat, Sieve};

// ---------------------------------------------------------------------------------------------

const SIEVE: &str = "3@2 & 4@1 | 2@0 & 3@1 | 3@3 | -4@2 | {-5@1 | 7@2} & 11@4";

pub fn parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sieve");
    group.bench_function("Parse", |b| {
        b.iter(|| black_box(Sieve::try_from(SIEVE).unwrap()))
    });
    group.finish();
}

pub fn segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sieve");
    let sieve = Sieve::try_from(SIEVE).unwrap();
    group.bench_function("Segment", |b| {
        b.iter(|| {
            for format in [
                SegmentFormat::Integer,
                SegmentFormat::Width,
                SegmentFormat::Binary,
                SegmentFormat::Unit,
            ] {
                black_box(sieve.segment(0, 0..1000, format));
            }
        })
    });
    group.finish();
}

// ---------------------------------------------------------------------------------------------

criterion_group! {
    name = sieve;
    config = Criterion::default();
    targets = parse, segment
}
