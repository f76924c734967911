// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid geometry: a pure mapping from 3D positions to flat cell indices.
//!
//! The grid covers the cube `[-half_extent, half_extent]^3` with `cells_per_axis^3`
//! cubic cells. Cells are flattened with `x` varying fastest, then `y`, then `z`.
//! Positions outside the cube (and NaN coordinates) clamp to a boundary cell, so every
//! index produced here is in range.

use core::iter::FusedIterator;

use glam::{IVec3, UVec3, Vec3};

use crate::error::IndexError;

/// Largest supported cell count along one axis; keeps `cells_per_axis^3` within `u32`.
pub const MAX_CELLS_PER_AXIS: u32 = 1024;

/// Immutable uniform grid centred at the origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UniformGrid {
    half_extent: f32,
    cells_per_axis: u32,
    cell_size: f32,
    inv_cell_size: f32,
}

impl UniformGrid {
    /// Create a grid covering `[-half_extent, half_extent]^3`, using the largest cell
    /// count per axis whose cells are no larger than `target_cell_size`.
    pub fn new(half_extent: f32, target_cell_size: f32) -> Result<Self, IndexError> {
        if !(half_extent.is_finite() && half_extent > 0.0) {
            return Err(IndexError::InvalidConfig(
                "half_extent must be positive and finite",
            ));
        }
        if !(target_cell_size.is_finite() && target_cell_size > 0.0) {
            return Err(IndexError::InvalidConfig(
                "cell_size must be positive and finite",
            ));
        }
        let cells = (2.0 * half_extent / target_cell_size).ceil();
        if cells > MAX_CELLS_PER_AXIS as f32 {
            return Err(IndexError::InvalidConfig(
                "cell_size too small for half_extent: too many cells per axis",
            ));
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Checked against MAX_CELLS_PER_AXIS above; ceil of a positive value."
        )]
        let cells = (cells as u32).max(1);
        Ok(Self::with_cells(half_extent, cells))
    }

    /// Create a grid with `2^subdivisions` cells per axis.
    pub fn from_subdivisions(half_extent: f32, subdivisions: u32) -> Result<Self, IndexError> {
        if !(half_extent.is_finite() && half_extent > 0.0) {
            return Err(IndexError::InvalidConfig(
                "half_extent must be positive and finite",
            ));
        }
        if subdivisions > MAX_CELLS_PER_AXIS.trailing_zeros() {
            return Err(IndexError::InvalidConfig("too many subdivisions"));
        }
        Ok(Self::with_cells(half_extent, 1 << subdivisions))
    }

    fn with_cells(half_extent: f32, cells_per_axis: u32) -> Self {
        let cell_size = 2.0 * half_extent / cells_per_axis as f32;
        Self {
            half_extent,
            cells_per_axis,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
        }
    }

    /// Half of the covered cube's side length.
    pub const fn half_extent(&self) -> f32 {
        self.half_extent
    }

    /// Number of cells along each axis.
    pub const fn cells_per_axis(&self) -> u32 {
        self.cells_per_axis
    }

    /// Side length of one cell.
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Total number of cells, `cells_per_axis^3`.
    pub const fn cell_count(&self) -> u32 {
        self.cells_per_axis * self.cells_per_axis * self.cells_per_axis
    }

    #[inline]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Saturating float cast, then clamped to [0, cells_per_axis - 1]."
    )]
    fn axis_coord(&self, v: f32) -> u32 {
        let f = ((v + self.half_extent) * self.inv_cell_size).floor();
        // Float-to-int casts saturate and map NaN to 0, so this only needs the clamp.
        (f as i64).clamp(0, i64::from(self.cells_per_axis) - 1) as u32
    }

    /// Per-axis cell coordinates of a position, clamped to the grid.
    #[inline]
    pub fn cell_coords_of(&self, position: Vec3) -> UVec3 {
        UVec3::new(
            self.axis_coord(position.x),
            self.axis_coord(position.y),
            self.axis_coord(position.z),
        )
    }

    /// Flatten cell coordinates into a cell index.
    #[inline]
    pub const fn flatten(&self, coords: UVec3) -> u32 {
        let n = self.cells_per_axis;
        coords.x + n * (coords.y + n * coords.z)
    }

    /// Inverse of [`UniformGrid::flatten`].
    #[inline]
    pub const fn coords_of_index(&self, cell_index: u32) -> UVec3 {
        let n = self.cells_per_axis;
        UVec3::new(cell_index % n, (cell_index / n) % n, cell_index / (n * n))
    }

    /// Flat index of the cell containing `position`. Always in `[0, cell_count)`.
    #[inline]
    pub fn cell_index_of(&self, position: Vec3) -> u32 {
        self.flatten(self.cell_coords_of(position))
    }

    /// World-space centre of a cell.
    pub fn cell_center_of(&self, cell_index: u32) -> Vec3 {
        debug_assert!(
            cell_index < self.cell_count(),
            "cell index {cell_index} out of range"
        );
        let c = self.coords_of_index(cell_index).as_vec3();
        (c + Vec3::splat(0.5)) * self.cell_size - Vec3::splat(self.half_extent)
    }

    /// Cells within `radius` of the given cell (measured in whole cells, rounding up),
    /// ordered by increasing Chebyshev distance from it.
    ///
    /// This is the cell-centred form: it ignores where inside its cell a position
    /// sits, so it always covers [`cells_around`](Self::cells_around) for the same
    /// radius. Queries use `cells_around`, which visits fewer cells.
    pub fn neighbors_in_radius(&self, cell_index: u32, radius: f32) -> ProximityCells {
        let center = self.coords_of_index(cell_index).as_ivec3();
        let reach = self.reach_in_cells(radius);
        let last = IVec3::splat(self.last_coord());
        ProximityCells::new(
            self.cells_per_axis,
            center,
            (center - IVec3::splat(reach)).max(IVec3::ZERO),
            (center + IVec3::splat(reach)).min(last),
        )
    }

    /// Cells overlapping the cube of half-size `reach` around `position`, ordered by
    /// increasing Chebyshev distance from the cell containing `position`.
    pub fn cells_around(&self, position: Vec3, reach: f32) -> ProximityCells {
        let reach = Vec3::splat(reach.max(0.0));
        ProximityCells::new(
            self.cells_per_axis,
            self.cell_coords_of(position).as_ivec3(),
            self.cell_coords_of(position - reach).as_ivec3(),
            self.cell_coords_of(position + reach).as_ivec3(),
        )
    }

    fn reach_in_cells(&self, radius: f32) -> i32 {
        let cells = (radius.max(0.0) * self.inv_cell_size).ceil();
        if cells.is_nan() {
            return 0;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Saturating cast, then bounded by the grid size."
        )]
        let cells = cells as i32;
        cells.min(self.last_coord())
    }

    #[allow(
        clippy::cast_possible_wrap,
        reason = "cells_per_axis is at most MAX_CELLS_PER_AXIS."
    )]
    const fn last_coord(&self) -> i32 {
        self.cells_per_axis as i32 - 1
    }
}

/// Iterator over a box of grid cells in nearest-first shells.
///
/// Shell `d` holds the cells at Chebyshev distance exactly `d` from the centre cell.
/// Every cell of the box is produced exactly once; within a shell, cells come out in
/// flattened order.
#[derive(Clone, Debug)]
pub struct ProximityCells {
    cells_per_axis: u32,
    center: IVec3,
    min: IVec3,
    max: IVec3,
    max_shell: i32,
    shell: i32,
    // Clamped bounds of the current shell.
    lo: IVec3,
    hi: IVec3,
    y: i32,
    z: i32,
    x: i32,
    x_end: i32,
    x_step: i32,
}

impl ProximityCells {
    fn new(cells_per_axis: u32, center: IVec3, min: IVec3, max: IVec3) -> Self {
        debug_assert!(
            min.cmple(center).all() && center.cmple(max).all(),
            "centre cell must lie inside the box"
        );
        let max_shell = (center - min).max(max - center).max_element();
        let mut it = Self {
            cells_per_axis,
            center,
            min,
            max,
            max_shell,
            shell: 0,
            lo: center,
            hi: center,
            y: center.y,
            z: center.z,
            x: center.x,
            x_end: center.x,
            x_step: 1,
        };
        it.begin_shell();
        it
    }

    /// Chebyshev distance of the shell currently being produced.
    pub const fn current_shell(&self) -> i32 {
        self.shell
    }

    fn begin_shell(&mut self) {
        let d = IVec3::splat(self.shell);
        self.lo = (self.center - d).max(self.min);
        self.hi = (self.center + d).min(self.max);
        self.z = self.lo.z;
        self.y = self.lo.y;
        self.begin_row();
    }

    fn begin_row(&mut self) {
        let d = self.shell;
        let on_face = (self.z - self.center.z).abs() == d || (self.y - self.center.y).abs() == d;
        if on_face {
            self.x = self.lo.x;
            self.x_end = self.hi.x;
            self.x_step = 1;
        } else {
            // Interior row of the shell: only the two x faces belong to it. d > 0 here.
            self.x = self.center.x - d;
            self.x_end = self.center.x + d;
            self.x_step = 2 * d;
        }
    }

    /// Move to the next row of the current shell; false once the shell is exhausted.
    fn advance_row(&mut self) -> bool {
        self.y += 1;
        if self.y > self.hi.y {
            self.y = self.lo.y;
            self.z += 1;
            if self.z > self.hi.z {
                return false;
            }
        }
        self.begin_row();
        true
    }
}

impl Iterator for ProximityCells {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if self.shell > self.max_shell {
                return None;
            }
            if self.x <= self.x_end {
                let x = self.x;
                self.x += self.x_step;
                if x < self.lo.x || x > self.hi.x {
                    continue;
                }
                let c = IVec3::new(x, self.y, self.z).as_uvec3();
                let n = self.cells_per_axis;
                return Some(c.x + n * (c.y + n * c.z));
            }
            if !self.advance_row() {
                self.shell += 1;
                if self.shell <= self.max_shell {
                    self.begin_shell();
                }
            }
        }
    }
}

impl FusedIterator for ProximityCells {}
