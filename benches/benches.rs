use criterion::criterion_main;

// ---------------------------------------------------------------------------------------------

mod benchmarks;

// ---------------------------------------------------------------------------------------------

criterion_main!(
    benchmarks::sieve::sieve, //
    benchmarks::parameter::parameter,
    benchmarks::session::session,
);
