//! Micro-benchmarks for the pressure fold and a small end-to-end run.

use std::hint::black_box;

use autosched::api::{Config, Query, QueryId, QueryKind, QueryPosition, TimeBoundary, TimeDuration};
use autosched::services::{
    atomic_to_potentiality, compute_pressure_chunks, schedule, update_potentials_pressure,
    Potentiality,
};
use criterion::{criterion_group, criterion_main, Criterion};

fn pinned_query(id: i64, start: f64, end: f64, min: f64, target: f64) -> Query {
    let mut position = QueryPosition::with_duration(TimeDuration::new(min, target));
    position.start = Some(TimeBoundary::at(start));
    position.end = Some(TimeBoundary::at(end));
    Query::new(QueryId::new(id), format!("bench-{id}"), QueryKind::Atomic, position)
}

fn overlapping_potentialities(config: &Config, count: usize) -> Vec<Potentiality> {
    (0..count)
        .map(|i| {
            let offset = i as f64 * 5_000.0;
            let query = pinned_query(i as i64, offset, offset + 40_000.0, 5_000.0, 15_000.0);
            let pot = atomic_to_potentiality(config, &query);
            update_potentials_pressure(config, &query.position, &pot, &[], &[])
        })
        .collect()
}

fn chunk_fold_benchmark(c: &mut Criterion) {
    let config = Config::new(0.0, 1_000_000.0);
    let pots = overlapping_potentialities(&config, 100);

    c.bench_function("compute_pressure_chunks/100", |b| {
        b.iter(|| compute_pressure_chunks(black_box(&config), black_box(&pots)))
    });
}

fn schedule_benchmark(c: &mut Criterion) {
    let config = Config::new(0.0, 1_000_000.0);
    let queries: Vec<Query> = (0..20)
        .map(|i| {
            let offset = i as f64 * 30_000.0;
            pinned_query(i, offset, offset + 200_000.0, 10_000.0, 30_000.0)
        })
        .collect();

    c.bench_function("schedule/20", |b| {
        b.iter(|| schedule(black_box(&config), black_box(&queries)))
    });
}

criterion_group!(benches, chunk_fold_benchmark, schedule_benchmark);
criterion_main!(benches);
