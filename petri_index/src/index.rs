// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index storage: the cell table and the element buffer.

use core::fmt::Debug;
use core::ops::Range;

use crate::error::IndexError;
use crate::grid::UniformGrid;
use crate::types::{Cell, ContactRadii, Element};

/// A built spatial index: one [`Cell`] per grid cell, and a flat element buffer grouped
/// contiguously by cell.
///
/// After a completed build the cell ranges are pairwise disjoint and cover the element
/// buffer exactly. Instances handed out by [`IndexBuilder`](crate::IndexBuilder) are
/// always completed builds; the builder holds the only mutable access while it writes.
pub struct SpatialIndex {
    grid: UniformGrid,
    radii: ContactRadii,
    capacity: usize,
    cells: Vec<Cell>,
    elements: Vec<Element>,
}

impl SpatialIndex {
    /// Create an empty index with buffers preallocated for `capacity` elements.
    pub fn new(grid: UniformGrid, radii: ContactRadii, capacity: usize) -> Self {
        Self {
            grid,
            radii,
            capacity,
            cells: vec![Cell::default(); grid.cell_count() as usize],
            elements: Vec::with_capacity(capacity),
        }
    }

    /// Clear every cell and size the element buffer for `population` elements.
    ///
    /// Nothing is deallocated. Fails without touching anything if `population` exceeds
    /// the preallocated capacity.
    pub fn reset(&mut self, population: usize) -> Result<(), IndexError> {
        if population > self.capacity {
            return Err(IndexError::CapacityExceeded {
                requested: population,
                capacity: self.capacity,
            });
        }
        self.cells.fill(Cell::default());
        self.elements.clear();
        self.elements.resize(population, Element::default());
        Ok(())
    }

    /// Grow the preallocated element capacity. Never shrinks.
    ///
    /// Cell ranges are `u32`, so a capacity that does not fit `u32` is rejected before
    /// anything is allocated.
    pub fn reserve_capacity(&mut self, capacity: usize) -> Result<(), IndexError> {
        if u32::try_from(capacity).is_err() {
            return Err(IndexError::InvalidConfig("capacity must fit in u32"));
        }
        if capacity > self.capacity {
            self.elements
                .reserve(capacity.saturating_sub(self.elements.len()));
            self.capacity = capacity;
        }
        Ok(())
    }

    /// Grid geometry of this index.
    pub const fn grid(&self) -> &UniformGrid {
        &self.grid
    }

    /// Contact radii used by the built-in overlap queries.
    pub const fn radii(&self) -> &ContactRadii {
        &self.radii
    }

    /// Preallocated element capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements in the index.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the index holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The cell table, indexed by cell index.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The element buffer.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Range of the cell at `cell_index`.
    #[inline]
    pub fn cell_at(&self, cell_index: u32) -> Cell {
        self.cells[cell_index as usize]
    }

    /// Elements in a range of the element buffer.
    #[inline]
    pub fn elements_in_range(&self, range: Range<u32>) -> &[Element] {
        &self.elements[range.start as usize..range.end as usize]
    }

    /// Elements of the cell at `cell_index`.
    #[inline]
    pub fn elements_in_cell(&self, cell_index: u32) -> &[Element] {
        self.elements_in_range(self.cell_at(cell_index).range())
    }

    /// Number of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Disjoint mutable views of the cell table and element buffer, for the builder.
    pub(crate) fn parts_mut(&mut self) -> (&mut [Cell], &mut [Element]) {
        (&mut self.cells, &mut self.elements)
    }
}

impl Debug for SpatialIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("grid", &self.grid)
            .field("capacity", &self.capacity)
            .field("elements", &self.elements.len())
            .field("occupied_cells", &self.occupied_cells())
            .finish_non_exhaustive()
    }
}
