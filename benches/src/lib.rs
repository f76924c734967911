// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared workload generators for the Petri benchmarks.

use glam::Vec3;
use petri_index::{ActorId, ActorType, Element, QueryRequest};

/// Small deterministic xorshift generator, so runs are comparable.
#[derive(Clone, Debug)]
pub struct Rng(u64);

impl Rng {
    /// Seeded generator. A zero seed is bumped to one.
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    #[allow(
        clippy::cast_precision_loss,
        reason = "24 random bits fit an f32 mantissa exactly."
    )]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1_u32 << 24) as f32
    }

    /// Uniform point inside a ball of `radius` around the origin.
    pub fn point_in_ball(&mut self, radius: f32) -> Vec3 {
        loop {
            let p = Vec3::new(self.next_f32(), self.next_f32(), self.next_f32()) * 2.0
                - Vec3::ONE;
            if p.length_squared() <= 1.0 {
                return p * radius;
            }
        }
    }
}

/// A dish population: one organism per ten actors, the rest spread over the four
/// nucleotides.
pub fn dish_population(count: usize, dish_radius: f32, seed: u64) -> Vec<Element> {
    const NUCLEOTIDES: [ActorType; 4] = [
        ActorType::ADENINE,
        ActorType::CYTOSINE,
        ActorType::GUANINE,
        ActorType::THYMINE,
    ];
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|i| {
            let kind = if i % 10 == 0 {
                ActorType::ORGANISM
            } else {
                NUCLEOTIDES[i % NUCLEOTIDES.len()]
            };
            let index = u32::try_from(i).unwrap_or(u32::MAX - 1);
            Element::new(ActorId::new(index, 1), rng.point_in_ball(dish_radius), kind)
        })
        .collect()
}

/// One nucleotide query per organism in `population`.
pub fn organism_queries(population: &[Element], radius: f32) -> Vec<QueryRequest> {
    population
        .iter()
        .filter(|e| e.kind == ActorType::ORGANISM)
        .map(|e| QueryRequest {
            querier: e.actor,
            position: e.position,
            radius,
            mask: ActorType::NUCLEOTIDE,
        })
        .collect()
}
