// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use std::hint::black_box;

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use petri_benches::{dish_population, organism_queries};
use petri_index::{ActorType, Element, IndexBuilder, IndexConfig};

use rstar::primitives::GeomWithData;
use rstar::RTree;

const DISH_RADIUS: f32 = 10.0;

type Point = GeomWithData<[f32; 3], (u64, ActorType)>;

fn to_rstar_points(population: &[Element]) -> Vec<Point> {
    population
        .iter()
        .map(|e| GeomWithData::new(e.position.to_array(), (e.actor.to_bits(), e.kind)))
        .collect()
}

fn bench_rstar_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rstar_external_compare");
    for &n in &[1_000_usize, 10_000] {
        let population = dish_population(n, DISH_RADIUS, 0xd15c);
        let requests = organism_queries(&population, 0.3);
        group.throughput(Throughput::Elements(n as u64));

        let mut builder = IndexBuilder::new(
            IndexConfig::enclosing_dish(DISH_RADIUS).with_capacity(n),
        )
        .expect("valid bench config");
        group.bench_function(format!("petri_rebuild_query_n{n}"), |b| {
            b.iter(|| {
                let index = builder.rebuild(&population).expect("capacity fits");
                black_box(index.query_batch(&requests))
            });
        });

        group.bench_function(format!("rstar_bulk_load_query_n{n}"), |b| {
            b.iter_batched(
                || to_rstar_points(&population),
                |points| {
                    let tree = RTree::bulk_load(points);
                    let hits: Vec<Option<u64>> = requests
                        .iter()
                        .map(|r| {
                            let reach_sq = r.radius * r.radius + 0.01;
                            tree.nearest_neighbor_iter_with_distance_2(&r.position.to_array())
                                .take_while(|(_, d2)| *d2 < reach_sq)
                                .find(|(p, _)| {
                                    p.data.1.matches(r.mask) && p.data.0 != r.querier.to_bits()
                                })
                                .map(|(p, _)| p.data.0)
                        })
                        .collect();
                    black_box(hits)
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rstar_compare);
criterion_main!(benches);
