// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A hand-written cell visitor.
//!
//! Collects the first few actors of any nucleotide type around a point, cell shell by
//! cell shell, and stops the walk once it has enough.
//!
//! Run:
//! - `cargo run -p petri_demos --example custom_visitor`

use core::ops::ControlFlow;

use glam::Vec3;
use petri_index::{
    ActorId, ActorType, Cell, CellVisitor, Element, IndexBuilder, IndexConfig, IndexError,
};

struct FirstFew {
    wanted: usize,
    found: Vec<Element>,
    cells: usize,
}

impl CellVisitor for FirstFew {
    fn on_visit_cell(&mut self, _cell: Cell, elements: &[Element]) -> ControlFlow<()> {
        self.cells += 1;
        for e in elements.iter().filter(|e| e.kind.is_single_nucleotide()) {
            self.found.push(*e);
            if self.found.len() == self.wanted {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

fn main() -> Result<(), IndexError> {
    let mut builder = IndexBuilder::new(IndexConfig::enclosing_dish(4.0).with_capacity(64))?;

    let kinds = [
        ActorType::ADENINE,
        ActorType::CYTOSINE,
        ActorType::GUANINE,
        ActorType::THYMINE,
        ActorType::ORGANISM,
    ];
    let snapshot: Vec<Element> = (0..40_u32)
        .map(|i| {
            let t = i as f32 * 0.4;
            let p = Vec3::new(t.cos(), t.sin(), 0.0) * (0.2 + t * 0.1);
            Element::new(ActorId::new(i, 1), p, kinds[i as usize % kinds.len()])
        })
        .collect();
    let index = builder.rebuild(&snapshot)?;

    let mut visitor = FirstFew {
        wanted: 5,
        found: Vec::new(),
        cells: 0,
    };
    let flow = index.query_nearest(Vec3::ZERO, 4.0, ActorType::NUCLEOTIDE, &mut visitor);

    println!(
        "stopped early: {}, cells visited: {}",
        flow.is_break(),
        visitor.cells
    );
    for e in &visitor.found {
        println!(
            "  {:?} {:?} at distance {:.2}",
            e.actor,
            e.kind,
            e.position.length()
        );
    }
    Ok(())
}
