// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::hint::black_box;
use std::num::NonZeroUsize;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use petri_benches::{dish_population, organism_queries};
use petri_index::{ActorType, IndexBuilder, IndexConfig, WorkerCount};

const DISH_RADIUS: f32 = 10.0;

fn builder(capacity: usize, workers: WorkerCount) -> IndexBuilder {
    let mut config = IndexConfig::enclosing_dish(DISH_RADIUS).with_capacity(capacity);
    config.workers = workers;
    IndexBuilder::new(config).expect("valid bench config")
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    for &n in &[1_000_usize, 10_000, 50_000] {
        let population = dish_population(n, DISH_RADIUS, 0x5eed);
        group.throughput(Throughput::Elements(n as u64));

        let mut auto = builder(n, WorkerCount::Auto);
        group.bench_function(format!("auto_n{n}"), |b| {
            b.iter(|| black_box(auto.rebuild(&population).map(|i| i.len())));
        });

        for workers in [1_usize, 4] {
            let count = WorkerCount::Fixed(NonZeroUsize::new(workers).expect("non-zero"));
            let mut fixed = builder(n, count);
            group.bench_function(format!("w{workers}_n{n}"), |b| {
                b.iter(|| black_box(fixed.rebuild(&population).map(|i| i.len())));
            });
        }
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    for &n in &[1_000_usize, 10_000, 50_000] {
        let population = dish_population(n, DISH_RADIUS, 0x5eed);
        let requests = organism_queries(&population, 0.3);
        let mut b = builder(n, WorkerCount::Auto);
        let index = b.rebuild(&population).expect("capacity fits population");
        group.throughput(Throughput::Elements(requests.len() as u64));

        group.bench_function(format!("serial_n{n}"), |bench| {
            bench.iter(|| {
                let hits = requests
                    .iter()
                    .filter_map(|r| index.query(r.position, r.radius, r.mask, r.querier))
                    .count();
                black_box(hits)
            });
        });

        group.bench_function(format!("batch_n{n}"), |bench| {
            bench.iter(|| black_box(index.query_batch(&requests)));
        });

        // Wide reach over a single type: many cells, mostly no match.
        group.bench_function(format!("wide_guanine_n{n}"), |bench| {
            bench.iter(|| {
                let hits = requests
                    .iter()
                    .filter_map(|r| index.query(r.position, 2.0, ActorType::GUANINE, r.querier))
                    .count();
                black_box(hits)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_query);
criterion_main!(benches);
