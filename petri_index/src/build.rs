// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-phase concurrent build pipeline.
//!
//! A rebuild runs, per tick:
//!
//! 1. **Cell index assignment.** Every actor's cell index is computed in parallel into
//!    a scratch buffer, one slot per actor.
//! 2. **Partitioned insertion.** Cells are split across `W` workers by residue class:
//!    worker `w` owns every cell `c` with `c % W == w`. Each worker scans the whole
//!    snapshot, counts the actors landing in its cells, and (after cell start offsets
//!    are fixed by a prefix sum) copies those actors into its cells' ranges using its
//!    own per-cell write cursor.
//!
//! Workers receive exclusive `&mut` views of the cells and element ranges they own, so
//! the insertion needs neither locks nor atomics. A rayon join separates each step.

use core::mem;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::config::{IndexConfig, WorkerCount};
use crate::error::IndexError;
use crate::index::SpatialIndex;
use crate::types::{Cell, Element};

/// Where a builder is in its per-tick state machine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    /// No build has completed yet.
    #[default]
    Idle,
    /// Computing each actor's cell index.
    CellIndexAssignment,
    /// Workers are writing their owned cells.
    PartitionedInsertion,
    /// The index is complete and read-only until the next rebuild.
    Ready,
}

/// Residue-class ownership of cells by insertion workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkerPartition {
    workers: usize,
}

impl WorkerPartition {
    /// Partition over `workers` workers (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Number of workers.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// The worker that owns `cell`.
    #[inline]
    pub const fn owner_of(&self, cell: u32) -> usize {
        cell as usize % self.workers
    }

    /// Position of `cell` among its owner's cells.
    #[inline]
    pub const fn local_slot(&self, cell: u32) -> usize {
        cell as usize / self.workers
    }

    /// Cells owned by `worker`, in increasing order.
    pub fn owned_cells(&self, worker: usize, cell_count: u32) -> impl Iterator<Item = u32> {
        (worker..cell_count as usize)
            .step_by(self.workers)
            .filter_map(|c| u32::try_from(c).ok())
    }

    /// Number of cells owned by `worker`.
    pub fn owned_count(&self, worker: usize, cell_count: u32) -> usize {
        (cell_count as usize).saturating_sub(worker).div_ceil(self.workers)
    }

    /// Split `items` (one per cell, in cell order) into per-worker lists of exclusive
    /// references, each in increasing cell order.
    fn distribute<T>(&self, items: impl Iterator<Item = T>, cell_count: u32) -> Vec<Vec<T>> {
        let mut out: Vec<Vec<T>> = (0..self.workers)
            .map(|w| Vec::with_capacity(self.owned_count(w, cell_count)))
            .collect();
        for (i, item) in items.enumerate() {
            out[i % self.workers].push(item);
        }
        out
    }
}

/// Summary of the last completed rebuild.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Actors in the snapshot.
    pub population: usize,
    /// Insertion workers used.
    pub workers: usize,
    /// Cells holding at least one actor.
    pub occupied_cells: usize,
    /// Actors in the densest cell.
    pub max_cell_occupancy: u32,
}

/// Single-writer cursor over one cell's element range.
struct CellWriter<'a> {
    slots: &'a mut [Element],
    cursor: usize,
}

impl<'a> CellWriter<'a> {
    fn new(slots: &'a mut [Element]) -> Self {
        Self { slots, cursor: 0 }
    }

    #[inline]
    fn push(&mut self, element: Element) {
        self.slots[self.cursor] = element;
        self.cursor += 1;
    }

    fn is_full(&self) -> bool {
        self.cursor == self.slots.len()
    }
}

/// Owns a [`SpatialIndex`] and rebuilds it from a fresh snapshot every tick.
///
/// The index is only reachable through [`IndexBuilder::rebuild`]'s return value or
/// [`IndexBuilder::index`], both shared borrows. The borrow checker therefore keeps
/// queries and rebuilds from overlapping.
#[derive(Debug)]
pub struct IndexBuilder {
    index: SpatialIndex,
    cell_of: Vec<u32>,
    partition: WorkerPartition,
    phase: BuildPhase,
    last_stats: Option<BuildStats>,
}

impl IndexBuilder {
    /// Validate `config` and preallocate every buffer.
    pub fn new(config: IndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        let grid = config.grid()?;
        let workers = config.workers.resolve(grid.cell_count());
        debug!(
            cells_per_axis = grid.cells_per_axis(),
            cell_size = grid.cell_size(),
            capacity = config.capacity,
            workers,
            "index builder created"
        );
        Ok(Self {
            index: SpatialIndex::new(grid, config.radii, config.capacity),
            cell_of: Vec::with_capacity(config.capacity),
            partition: WorkerPartition::new(workers),
            phase: BuildPhase::Idle,
            last_stats: None,
        })
    }

    /// Current phase.
    pub const fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Insertion workers per rebuild.
    pub const fn workers(&self) -> usize {
        self.partition.workers()
    }

    /// Change the insertion worker count for subsequent rebuilds.
    pub fn set_workers(&mut self, workers: WorkerCount) {
        let count = workers.resolve(self.index.grid().cell_count());
        self.partition = WorkerPartition::new(count);
    }

    /// Preallocated element capacity.
    pub const fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Grow the element capacity ahead of a larger snapshot. Never shrinks.
    ///
    /// Fails with [`IndexError::InvalidConfig`] if `capacity` does not fit `u32`.
    pub fn reserve_capacity(&mut self, capacity: usize) -> Result<(), IndexError> {
        self.index.reserve_capacity(capacity)?;
        self.cell_of
            .reserve(capacity.saturating_sub(self.cell_of.len()));
        Ok(())
    }

    /// Statistics of the last completed rebuild.
    pub const fn last_stats(&self) -> Option<BuildStats> {
        self.last_stats
    }

    /// The last completed index, or `None` if no rebuild has completed yet.
    pub fn index(&self) -> Option<&SpatialIndex> {
        (self.phase == BuildPhase::Ready).then_some(&self.index)
    }

    /// Rebuild the index from `snapshot` and return it.
    ///
    /// A snapshot larger than the capacity is rejected with
    /// [`IndexError::CapacityExceeded`] before anything is written; the previous index
    /// stays available. If a worker panics, the panic propagates to the caller and
    /// [`IndexBuilder::index`] reports `None` until the next successful rebuild.
    pub fn rebuild(&mut self, snapshot: &[Element]) -> Result<&SpatialIndex, IndexError> {
        let population = snapshot.len();
        if population > self.index.capacity() {
            warn!(
                population,
                capacity = self.index.capacity(),
                "rebuild rejected: snapshot exceeds capacity"
            );
            return Err(IndexError::CapacityExceeded {
                requested: population,
                capacity: self.index.capacity(),
            });
        }

        self.phase = BuildPhase::CellIndexAssignment;
        self.index.reset(population)?;
        let grid = *self.index.grid();
        self.cell_of.clear();
        self.cell_of.par_extend(
            snapshot
                .par_iter()
                .map(|element| grid.cell_index_of(element.position)),
        );
        trace!(population, "cell indices assigned");

        self.phase = BuildPhase::PartitionedInsertion;
        let stats = insert_partitioned(
            &mut self.index,
            snapshot,
            &self.cell_of,
            self.partition,
        );
        trace!(workers = stats.workers, "partitioned insertion finished");

        self.phase = BuildPhase::Ready;
        self.last_stats = Some(stats);
        debug!(
            population = stats.population,
            workers = stats.workers,
            occupied_cells = stats.occupied_cells,
            max_cell_occupancy = stats.max_cell_occupancy,
            "index rebuilt"
        );
        Ok(&self.index)
    }
}

/// Count, lay out, and fill every cell. `cell_of[i]` is the cell of `snapshot[i]`.
fn insert_partitioned(
    index: &mut SpatialIndex,
    snapshot: &[Element],
    cell_of: &[u32],
    partition: WorkerPartition,
) -> BuildStats {
    debug_assert_eq!(snapshot.len(), cell_of.len(), "one cell index per actor");
    let cell_count = index.grid().cell_count();
    let (cells, elements) = index.parts_mut();

    // Each worker counts the actors of its own cells.
    partition
        .distribute(cells.iter_mut(), cell_count)
        .into_par_iter()
        .enumerate()
        .for_each(|(worker, mut owned)| {
            for &cell in cell_of {
                if partition.owner_of(cell) == worker {
                    owned[partition.local_slot(cell)].count += 1;
                }
            }
        });

    let mut stats = BuildStats {
        population: snapshot.len(),
        workers: partition.workers(),
        ..BuildStats::default()
    };
    let mut start = 0_u32;
    for cell in cells.iter_mut() {
        cell.start = start;
        start += cell.count;
        if cell.count > 0 {
            stats.occupied_cells += 1;
            stats.max_cell_occupancy = stats.max_cell_occupancy.max(cell.count);
        }
    }
    debug_assert_eq!(start as usize, snapshot.len(), "cell ranges cover every actor");

    // Hand each worker exclusive slices for its cells, then let it fill them.
    let mut rest: &mut [Element] = elements;
    let writers = cells.iter().map(|cell: &Cell| {
        let (head, tail) = mem::take(&mut rest).split_at_mut(cell.count as usize);
        rest = tail;
        CellWriter::new(head)
    });
    partition
        .distribute(writers, cell_count)
        .into_par_iter()
        .enumerate()
        .for_each(|(worker, mut owned)| {
            for (element, &cell) in snapshot.iter().zip(cell_of) {
                if partition.owner_of(cell) == worker {
                    owned[partition.local_slot(cell)].push(*element);
                }
            }
            debug_assert!(
                owned.iter().all(CellWriter::is_full),
                "worker {worker} left a cell partially written"
            );
        });

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActorId, ActorType};
    use core::num::NonZeroUsize;
    use glam::Vec3;
    use std::collections::BTreeSet;

    fn config(capacity: usize) -> IndexConfig {
        IndexConfig {
            half_extent: 4.0,
            cell_size: 1.0,
            ..IndexConfig::default()
        }
        .with_capacity(capacity)
    }

    fn actor(i: u32, p: Vec3) -> Element {
        Element::new(ActorId::new(i, 1), p, ActorType::ADENINE)
    }

    fn line(n: u32) -> Vec<Element> {
        (0..n)
            .map(|i| actor(i, Vec3::new(-3.9 + 0.37 * i as f32, 0.1 * i as f32 - 2.0, 0.5)))
            .collect()
    }

    #[test]
    fn partition_is_disjoint_and_complete() {
        for workers in 1..=7 {
            let p = WorkerPartition::new(workers);
            let mut seen = BTreeSet::new();
            for w in 0..workers {
                let owned: Vec<u32> = p.owned_cells(w, 100).collect();
                assert_eq!(owned.len(), p.owned_count(w, 100));
                for (slot, &c) in owned.iter().enumerate() {
                    assert_eq!(p.owner_of(c), w);
                    assert_eq!(p.local_slot(c), slot);
                    assert!(seen.insert(c), "cell {c} owned twice");
                }
            }
            assert_eq!(seen.len(), 100);
        }
        assert_eq!(WorkerPartition::new(0).workers(), 1);
    }

    #[test]
    fn phases() {
        let mut b = IndexBuilder::new(config(16)).unwrap();
        assert_eq!(b.phase(), BuildPhase::Idle);
        assert!(b.index().is_none());
        b.rebuild(&line(5)).unwrap();
        assert_eq!(b.phase(), BuildPhase::Ready);
        assert_eq!(b.index().map(SpatialIndex::len), Some(5));
    }

    #[test]
    fn rebuild_groups_elements_by_cell() {
        let mut b = IndexBuilder::new(config(64)).unwrap();
        let snapshot = line(20);
        let idx = b.rebuild(&snapshot).unwrap();
        assert_eq!(idx.len(), 20);

        let mut next = 0;
        for (cell_index, cell) in idx.cells().iter().enumerate() {
            assert_eq!(cell.start, next);
            next += cell.count;
            for e in idx.elements_in_range(cell.range()) {
                assert_eq!(idx.grid().cell_index_of(e.position) as usize, cell_index);
            }
        }
        assert_eq!(next, 20);

        let ids: BTreeSet<ActorId> = idx.elements().iter().map(|e| e.actor).collect();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn layout_does_not_depend_on_worker_count() {
        let snapshot = line(40);
        let mut reference = IndexBuilder::new(config(64)).unwrap();
        reference.set_workers(WorkerCount::Fixed(NonZeroUsize::MIN));
        let expected = reference.rebuild(&snapshot).unwrap().cells().to_vec();

        for workers in [2, 3, 8, 1000] {
            let mut b = IndexBuilder::new(config(64)).unwrap();
            b.set_workers(WorkerCount::Fixed(NonZeroUsize::new(workers).unwrap()));
            assert_eq!(b.rebuild(&snapshot).unwrap().cells(), expected.as_slice());
            // Repeated builds are stable too.
            assert_eq!(b.rebuild(&snapshot).unwrap().cells(), expected.as_slice());
        }
    }

    #[test]
    fn capacity_boundary() {
        let mut b = IndexBuilder::new(config(8)).unwrap();
        let first = line(8);
        b.rebuild(&first).unwrap();
        let before = b.index().unwrap().elements().to_vec();

        let err = b.rebuild(&line(9)).unwrap_err();
        assert_eq!(
            err,
            IndexError::CapacityExceeded {
                requested: 9,
                capacity: 8
            }
        );
        assert_eq!(b.phase(), BuildPhase::Ready);
        assert_eq!(b.index().unwrap().elements(), before.as_slice());

        b.reserve_capacity(9).unwrap();
        assert_eq!(b.rebuild(&line(9)).unwrap().len(), 9);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn reserve_beyond_u32_keeps_the_old_capacity() {
        let mut b = IndexBuilder::new(config(8)).unwrap();
        assert!(matches!(
            b.reserve_capacity(u32::MAX as usize + 1),
            Err(IndexError::InvalidConfig(_))
        ));
        assert_eq!(b.capacity(), 8);
        assert!(b.rebuild(&line(8)).is_ok());
    }

    #[test]
    fn empty_snapshot_builds_empty_index() {
        let mut b = IndexBuilder::new(config(8)).unwrap();
        b.rebuild(&line(3)).unwrap();
        let idx = b.rebuild(&[]).unwrap();
        assert!(idx.is_empty());
        assert_eq!(idx.occupied_cells(), 0);
        assert_eq!(b.last_stats().map(|s| s.population), Some(0));
    }

    #[test]
    fn stats_track_density() {
        let mut b = IndexBuilder::new(config(8)).unwrap();
        b.set_workers(WorkerCount::Fixed(NonZeroUsize::new(3).unwrap()));
        let snapshot = [
            actor(0, Vec3::splat(0.5)),
            actor(1, Vec3::splat(0.6)),
            actor(2, Vec3::splat(0.7)),
            actor(3, Vec3::splat(-2.5)),
        ];
        b.rebuild(&snapshot).unwrap();
        let stats = b.last_stats().unwrap();
        assert_eq!(stats.workers, 3);
        assert_eq!(stats.occupied_cells, 2);
        assert_eq!(stats.max_cell_occupancy, 3);
    }
}
