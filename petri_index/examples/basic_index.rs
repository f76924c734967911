// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Petri Index: rebuild from a snapshot, then query.

use glam::Vec3;
use petri_index::{ActorId, ActorOverlaps, ActorType, Element, IndexBuilder, IndexConfig};

fn main() -> Result<(), petri_index::IndexError> {
    let mut builder = IndexBuilder::new(IndexConfig::enclosing_dish(5.0).with_capacity(16))?;

    let organism = ActorId::new(0, 1);
    let snapshot = [
        Element::new(organism, Vec3::new(1.0, 0.0, 0.0), ActorType::ORGANISM),
        Element::new(ActorId::new(1, 1), Vec3::new(1.2, 0.0, 0.0), ActorType::ADENINE),
        Element::new(ActorId::new(2, 1), Vec3::new(1.0, 0.25, 0.0), ActorType::THYMINE),
        Element::new(ActorId::new(3, 1), Vec3::new(-3.0, 2.0, 1.0), ActorType::GUANINE),
    ];

    let index = builder.rebuild(&snapshot)?;

    // Look for any nucleotide touching the organism.
    let mut overlaps = ActorOverlaps::for_actor(
        organism,
        snapshot[0].position,
        ActorType::ORGANISM,
        1.0,
        ActorType::NUCLEOTIDE,
        *index.radii(),
    );
    println!("touching: {:?}", index.query_overlaps(&mut overlaps));

    // Only guanines this time, with a much larger reach.
    let hit = index.query(snapshot[0].position, 5.0, ActorType::GUANINE, organism);
    println!("guanine: {hit:?}");

    // The index borrows the builder until its last use above.
    println!("stats: {:?}", builder.last_stats());
    Ok(())
}
