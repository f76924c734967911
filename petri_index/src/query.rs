// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proximity-ordered queries against a built index.

use core::ops::ControlFlow;

use glam::Vec3;
use rayon::prelude::*;

use crate::index::SpatialIndex;
use crate::types::{ActorId, ActorType, Cell, ContactRadii, Element};

/// Per-cell callback driven by [`SpatialIndex::query_nearest`].
///
/// Cells arrive nearest-first; returning `ControlFlow::Break` stops the walk.
pub trait CellVisitor {
    /// Inspect one non-empty cell and its elements.
    fn on_visit_cell(&mut self, cell: Cell, elements: &[Element]) -> ControlFlow<()>;
}

impl<F> CellVisitor for F
where
    F: FnMut(Cell, &[Element]) -> ControlFlow<()>,
{
    fn on_visit_cell(&mut self, cell: Cell, elements: &[Element]) -> ControlFlow<()> {
        self(cell, elements)
    }
}

/// Finds the first element that overlaps a querier.
///
/// An element overlaps when its type matches the mask, it is not the querier itself,
/// and `distance² < querier_radius² + element_radius²`. Radii are summed in squared
/// form, never maxed.
#[derive(Clone, Debug)]
pub struct ActorOverlaps {
    querier: ActorId,
    position: Vec3,
    radius_sq: f32,
    mask: ActorType,
    radii: ContactRadii,
    matched: Option<Element>,
}

impl ActorOverlaps {
    /// Collector for a querier with an explicit squared radius.
    pub fn new(
        querier: ActorId,
        position: Vec3,
        radius_sq: f32,
        mask: ActorType,
        radii: ContactRadii,
    ) -> Self {
        Self {
            querier,
            position,
            radius_sq,
            mask,
            radii,
            matched: None,
        }
    }

    /// Collector for a querier whose radius comes from its type, scaled by its size.
    pub fn for_actor(
        querier: ActorId,
        position: Vec3,
        kind: ActorType,
        size_multiplier: f32,
        mask: ActorType,
        radii: ContactRadii,
    ) -> Self {
        let radius_sq = radii.querier_radius_sq(kind, size_multiplier);
        Self::new(querier, position, radius_sq, mask, radii)
    }

    /// Type mask being searched for.
    pub const fn mask(&self) -> ActorType {
        self.mask
    }

    /// Query position.
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Distance from the query position beyond which no element can overlap.
    pub fn search_reach(&self) -> f32 {
        (self.radius_sq.max(0.0) + self.radii.max_radius_sq(self.mask)).sqrt()
    }

    /// The matched element, if any.
    pub const fn matched(&self) -> Option<Element> {
        self.matched
    }

    /// Handle of the matched actor, if any.
    pub fn matched_actor(&self) -> Option<ActorId> {
        self.matched.map(|e| e.actor)
    }

    #[inline]
    fn overlaps(&self, element: &Element) -> bool {
        element.kind.matches(self.mask)
            && self.position.distance_squared(element.position)
                < self.radius_sq + self.radii.radius_sq(element.kind)
            && element.actor != self.querier
    }
}

impl CellVisitor for ActorOverlaps {
    fn on_visit_cell(&mut self, _cell: Cell, elements: &[Element]) -> ControlFlow<()> {
        match elements.iter().find(|e| self.overlaps(e)) {
            Some(hit) => {
                self.matched = Some(*hit);
                ControlFlow::Break(())
            }
            None => ControlFlow::Continue(()),
        }
    }
}

/// One entry of a [`SpatialIndex::query_batch`] call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QueryRequest {
    /// The querying actor; never matched against itself.
    pub querier: ActorId,
    /// Query position.
    pub position: Vec3,
    /// Querier contact radius (not squared).
    pub radius: f32,
    /// Acceptable element types.
    pub mask: ActorType,
}

impl SpatialIndex {
    /// Walk the non-empty cells overlapping the cube of half-size `reach` around
    /// `position`, nearest cell shell first, handing each to `visitor`.
    ///
    /// Returns `Break` if the visitor stopped the walk. An empty `mask` visits nothing.
    pub fn query_nearest<V>(
        &self,
        position: Vec3,
        reach: f32,
        mask: ActorType,
        visitor: &mut V,
    ) -> ControlFlow<()>
    where
        V: CellVisitor + ?Sized,
    {
        if mask.is_empty() {
            return ControlFlow::Continue(());
        }
        for cell_index in self.grid().cells_around(position, reach) {
            let cell = self.cell_at(cell_index);
            if cell.is_empty() {
                continue;
            }
            visitor.on_visit_cell(cell, self.elements_in_range(cell.range()))?;
        }
        ControlFlow::Continue(())
    }

    /// Run an overlap collector over every cell that could hold a match.
    pub fn query_overlaps(&self, collector: &mut ActorOverlaps) -> Option<ActorId> {
        let reach = collector.search_reach();
        let _ = self.query_nearest(collector.position(), reach, collector.mask(), collector);
        collector.matched_actor()
    }

    /// First overlapping actor of a type in `mask`, in nearest-cell-first order.
    ///
    /// `radius` is the querier's own contact radius; each candidate adds its per-type
    /// radius on top. A negative or NaN radius counts as zero. The result was valid
    /// when the index was built and must be re-validated before acting on it.
    pub fn query(
        &self,
        position: Vec3,
        radius: f32,
        mask: ActorType,
        excluding: ActorId,
    ) -> Option<ActorId> {
        let radius = radius.max(0.0);
        let mut collector =
            ActorOverlaps::new(excluding, position, radius * radius, mask, *self.radii());
        self.query_overlaps(&mut collector)
    }

    /// Run independent queries in parallel. Results are in request order.
    pub fn query_batch(&self, requests: &[QueryRequest]) -> Vec<Option<ActorId>> {
        requests
            .par_iter()
            .map(|r| self.query(r.position, r.radius, r.mask, r.querier))
            .collect()
    }
}
