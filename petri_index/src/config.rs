// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index configuration.

use core::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::grid::UniformGrid;
use crate::types::ContactRadii;

/// Margin applied around a dish radius by [`IndexConfig::enclosing_dish`].
pub const DISH_MARGIN: f32 = 1.2;

/// Number of workers used by the partitioned insertion phase.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerCount {
    /// One worker per thread of the current rayon pool.
    #[default]
    Auto,
    /// A fixed worker count.
    Fixed(NonZeroUsize),
}

impl WorkerCount {
    /// Effective worker count for a grid of `cell_count` cells.
    ///
    /// Never below 1, and never above the number of cells: a worker with no owned cell
    /// would scan the population for nothing.
    pub fn resolve(self, cell_count: u32) -> usize {
        let wanted = match self {
            Self::Auto => rayon::current_num_threads(),
            Self::Fixed(n) => n.get(),
        };
        let cells = usize::try_from(cell_count).unwrap_or(usize::MAX);
        wanted.clamp(1, cells.max(1))
    }
}

/// Configuration of an [`IndexBuilder`](crate::IndexBuilder).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Half side length of the indexed cube, centred at the origin.
    pub half_extent: f32,
    /// Target cell side length; the actual size is the largest that divides the cube
    /// evenly without exceeding this.
    pub cell_size: f32,
    /// Preallocated element capacity; larger snapshots are rejected.
    pub capacity: usize,
    /// Insertion worker count.
    pub workers: WorkerCount,
    /// Base contact radii per actor type.
    pub radii: ContactRadii,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            half_extent: 12.0,
            cell_size: 0.75,
            capacity: 16 * 1024,
            workers: WorkerCount::Auto,
            radii: ContactRadii::default(),
        }
    }
}

impl IndexConfig {
    /// Defaults sized for a dish of the given radius, with a margin so actors pressed
    /// against the wall still land in interior cells.
    pub fn enclosing_dish(radius: f32) -> Self {
        Self {
            half_extent: radius * DISH_MARGIN,
            ..Self::default()
        }
    }

    /// Set the element capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set a fixed worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = WorkerCount::Fixed(workers);
        self
    }

    /// Set the target cell size.
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Check every value and derive the grid.
    pub fn grid(&self) -> Result<UniformGrid, IndexError> {
        UniformGrid::new(self.half_extent, self.cell_size)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), IndexError> {
        self.grid()?;
        if self.capacity == 0 {
            return Err(IndexError::InvalidConfig("capacity must be non-zero"));
        }
        if u32::try_from(self.capacity).is_err() {
            return Err(IndexError::InvalidConfig("capacity must fit in u32"));
        }
        let ContactRadii {
            organism_sq,
            nucleotide_sq,
        } = self.radii;
        if !(organism_sq.is_finite() && organism_sq >= 0.0)
            || !(nucleotide_sq.is_finite() && nucleotide_sq >= 0.0)
        {
            return Err(IndexError::InvalidConfig(
                "contact radii must be non-negative and finite",
            ));
        }
        Ok(())
    }
}
