// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A petri dish ticking along.
//!
//! Organisms drift through the dish and eat the nucleotides they touch. Every tick the
//! world is snapshotted, the index is rebuilt, all organisms query in parallel, and the
//! hits are re-validated against the live world before they are consumed.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p petri_demos --example dish_tick`

use glam::Vec3;
use petri_index::{
    ActorId, ActorType, Element, IndexBuilder, IndexConfig, IndexError, QueryRequest,
    SpatialIndex,
};
use rayon::prelude::*;
use slotmap::{DefaultKey, Key, KeyData, SlotMap};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DISH_RADIUS: f32 = 6.0;
const TICKS: u32 = 60;
const NUCLEOTIDES: [ActorType; 4] = [
    ActorType::ADENINE,
    ActorType::CYTOSINE,
    ActorType::GUANINE,
    ActorType::THYMINE,
];

#[derive(Clone, Debug)]
struct Actor {
    position: Vec3,
    velocity: Vec3,
    kind: ActorType,
    size: f32,
    eaten: u32,
}

struct Rng(u64);

impl Rng {
    fn next_f32(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 40) as f32 / (1_u32 << 24) as f32
    }

    fn unit(&mut self) -> Vec3 {
        Vec3::new(self.next_f32(), self.next_f32(), self.next_f32()) * 2.0 - Vec3::ONE
    }

    fn in_dish(&mut self) -> Vec3 {
        loop {
            let p = self.unit();
            if p.length_squared() <= 1.0 {
                return p * DISH_RADIUS;
            }
        }
    }
}

fn id_of(key: DefaultKey) -> ActorId {
    ActorId::from_bits(key.data().as_ffi())
}

fn key_of(id: ActorId) -> DefaultKey {
    KeyData::from_ffi(id.to_bits()).into()
}

fn spawn_nucleotides(world: &mut SlotMap<DefaultKey, Actor>, rng: &mut Rng, count: usize) {
    for i in 0..count {
        world.insert(Actor {
            position: rng.in_dish(),
            velocity: rng.unit() * 0.02,
            kind: NUCLEOTIDES[i % NUCLEOTIDES.len()],
            size: 1.0,
            eaten: 0,
        });
    }
}

fn step(world: &mut SlotMap<DefaultKey, Actor>) {
    world.values_mut().collect::<Vec<_>>().into_par_iter().for_each(|a| {
        a.position += a.velocity;
        // Bounce off the dish wall.
        if a.position.length() > DISH_RADIUS {
            a.velocity = -a.velocity;
            a.position = a.position.clamp_length_max(DISH_RADIUS);
        }
    });
}

fn rebuild<'a>(
    builder: &'a mut IndexBuilder,
    snapshot: &[Element],
) -> Result<&'a SpatialIndex, IndexError> {
    if snapshot.len() > builder.capacity() {
        warn!(
            population = snapshot.len(),
            capacity = builder.capacity(),
            "population outgrew the index, growing it"
        );
        builder.reserve_capacity(snapshot.len().next_power_of_two())?;
    }
    builder.rebuild(snapshot)
}

fn main() -> Result<(), IndexError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = Rng(0x00c0_ffee);
    let mut world: SlotMap<DefaultKey, Actor> = SlotMap::new();
    for _ in 0..40 {
        world.insert(Actor {
            position: rng.in_dish(),
            velocity: rng.unit() * 0.05,
            kind: ActorType::ORGANISM,
            size: 1.0,
            eaten: 0,
        });
    }
    spawn_nucleotides(&mut world, &mut rng, 400);

    // Start small on purpose so the capacity path gets exercised.
    let config = IndexConfig::enclosing_dish(DISH_RADIUS).with_capacity(256);
    let mut builder = IndexBuilder::new(config)?;
    let radii = config.radii;

    for tick in 0..TICKS {
        step(&mut world);
        if tick % 10 == 0 {
            spawn_nucleotides(&mut world, &mut rng, 60);
        }

        let snapshot: Vec<Element> = world
            .iter()
            .map(|(key, a)| Element::new(id_of(key), a.position, a.kind))
            .collect();
        let index = rebuild(&mut builder, &snapshot)?;

        let requests: Vec<QueryRequest> = world
            .iter()
            .filter(|(_, a)| a.kind == ActorType::ORGANISM)
            .map(|(key, a)| QueryRequest {
                querier: id_of(key),
                position: a.position,
                radius: radii.querier_radius_sq(a.kind, a.size).sqrt(),
                mask: ActorType::NUCLEOTIDE,
            })
            .collect();
        let hits = index.query_batch(&requests);

        let (mut consumed, mut stale) = (0_u32, 0_u32);
        for (request, hit) in requests.iter().zip(hits) {
            let Some(food) = hit else { continue };
            // Another organism may have eaten it earlier this tick.
            let alive = world
                .get(key_of(food))
                .is_some_and(|a| a.kind.matches(ActorType::NUCLEOTIDE));
            if !alive {
                stale += 1;
                continue;
            }
            world.remove(key_of(food));
            if let Some(eater) = world.get_mut(key_of(request.querier)) {
                eater.size += 0.05;
                eater.eaten += 1;
            }
            consumed += 1;
        }
        debug!(tick, population = world.len(), consumed, stale, "tick done");
    }

    let best = world
        .values()
        .filter(|a| a.kind == ActorType::ORGANISM)
        .map(|a| a.eaten)
        .max()
        .unwrap_or(0);
    info!(
        population = world.len(),
        capacity = builder.capacity(),
        best,
        stats = ?builder.last_stats(),
        "dish finished"
    );
    Ok(())
}
