//! Benchmarks for accent dot products and axpy.

use std::hint::black_box;

use criterion::Criterion;
use saavy_params::AccentVector;

pub fn bench_accent(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/accent");

    let zero = AccentVector::ZERO;
    let a = AccentVector::from_slots([0.5, 0.0, 0.25, 0.0, 1.0, 0.0, 0.0, 0.125]);
    let b = AccentVector::from_slots([1.0, 2.0, 0.0, 0.0, 0.5, 0.0, 0.0, 4.0]);

    // Both flags clear: no slot is read
    group.bench_function("dot_zero", |bench| {
        bench.iter(|| black_box(&zero).dot(black_box(&zero)))
    });

    group.bench_function("dot_nonzero", |bench| {
        bench.iter(|| black_box(&a).dot(black_box(&b)))
    });

    let mut target = a;
    group.bench_function("axpy_aliased", |bench| {
        bench.iter(|| target.scale_add(black_box(0.5), black_box(&b)))
    });

    group.finish();
}
