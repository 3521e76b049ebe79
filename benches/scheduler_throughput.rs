//! Scheduler throughput benchmarks.
//!
//! Measures one full `parallel_for` invocation (spawn, claim loop, join)
//! across chunk sizes, thread counts, and workload shapes.

use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use parfor::{parallel_for, ScheduleConfig};

const RANGE: i64 = 100_000;

fn bench_chunk_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_size");
    group.throughput(Throughput::Elements(RANGE as u64));

    for chunk in [1i64, 16, 256, 4096] {
        let config = ScheduleConfig {
            chunk,
            threads: 4,
            ..Default::default()
        };
        group.bench_function(BenchmarkId::new("claim", chunk), |b| {
            b.iter(|| {
                let sum = AtomicU64::new(0);
                parallel_for(0, RANGE, &config, |i| {
                    sum.fetch_add(i as u64, Ordering::Relaxed);
                })
                .unwrap();
                black_box(sum.into_inner())
            })
        });
    }

    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    group.throughput(Throughput::Elements(RANGE as u64));

    for threads in [1usize, 2, 4, 8] {
        let config = ScheduleConfig {
            chunk: 64,
            threads,
            ..Default::default()
        };
        group.bench_function(BenchmarkId::new("uniform", threads), |b| {
            b.iter(|| {
                let sum = AtomicU64::new(0);
                parallel_for(0, RANGE, &config, |i| {
                    // A few dozen cycles per index, enough to expose
                    // claim overhead without drowning it.
                    let mut acc = i as u64;
                    for _ in 0..16 {
                        acc = acc.wrapping_mul(0x9e37_79b9_7f4a_7c15).rotate_left(7);
                    }
                    sum.fetch_add(acc, Ordering::Relaxed);
                })
                .unwrap();
                black_box(sum.into_inner())
            })
        });
    }

    group.finish();
}

fn bench_uneven_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("uneven_workload");
    const SPIKY_RANGE: i64 = 4_096;
    group.throughput(Throughput::Elements(SPIKY_RANGE as u64));

    // Every 64th index is ~100x heavier: the shape dynamic balancing is
    // for. Small chunks let fast workers absorb the spikes.
    for chunk in [1i64, 8, 512] {
        let config = ScheduleConfig {
            chunk,
            threads: 4,
            ..Default::default()
        };
        group.bench_function(BenchmarkId::new("spiky", chunk), |b| {
            b.iter(|| {
                let sum = AtomicU64::new(0);
                parallel_for(0, SPIKY_RANGE, &config, |i| {
                    let spins = if i % 64 == 0 { 1_600 } else { 16 };
                    let mut acc = i as u64;
                    for _ in 0..spins {
                        acc = acc.wrapping_mul(0x9e37_79b9_7f4a_7c15).rotate_left(7);
                    }
                    sum.fetch_add(acc, Ordering::Relaxed);
                })
                .unwrap();
                black_box(sum.into_inner())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_chunk_size,
    bench_thread_scaling,
    bench_uneven_workload
);
criterion_main!(benches);
