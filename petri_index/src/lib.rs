// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=petri_index --heading-base-level=0

//! Petri Index: a per-tick 3D uniform grid for nearest-match proximity queries.
//!
//! Petri Index is the spatial index behind a simulation where thousands of point-like
//! actors move every tick, and many of them need "the nearest actor of some type
//! within a small radius" every tick.
//!
//! - Rebuild from scratch every tick from a snapshot of `(actor, position, type)`.
//! - Build in two parallel phases with residue-class cell ownership per worker, so no
//!   locks or atomics are needed.
//! - Query cells nearest-first with an early-exit visitor.
//!
//! The index is replaced, not patched: there are no incremental updates. Buffers are
//! preallocated once and reused every tick.
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use petri_index::{ActorId, ActorType, Element, IndexBuilder, IndexConfig};
//!
//! let mut builder = IndexBuilder::new(IndexConfig::default())?;
//!
//! let organism = ActorId::new(0, 1);
//! let adenine = ActorId::new(1, 1);
//! let snapshot = [
//!     Element::new(organism, Vec3::ZERO, ActorType::ORGANISM),
//!     Element::new(adenine, Vec3::new(0.2, 0.0, 0.0), ActorType::ADENINE),
//! ];
//!
//! let index = builder.rebuild(&snapshot)?;
//! let hit = index.query(Vec3::ZERO, 0.3, ActorType::NUCLEOTIDE, organism);
//! assert_eq!(hit, Some(adenine));
//! # Ok::<(), petri_index::IndexError>(())
//! ```
//!
//! Custom per-cell logic plugs in through [`CellVisitor`], which closures implement:
//!
//! ```rust
//! use core::ops::ControlFlow;
//! use glam::Vec3;
//! use petri_index::{ActorId, ActorType, Cell, Element, IndexBuilder, IndexConfig};
//!
//! let mut builder = IndexBuilder::new(IndexConfig::default())?;
//! let snapshot = [Element::new(ActorId::new(0, 1), Vec3::ONE, ActorType::GUANINE)];
//! let index = builder.rebuild(&snapshot)?;
//!
//! // Count guanines in the cells around a point.
//! let mut seen = 0;
//! let _ = index.query_nearest(Vec3::ONE, 1.0, ActorType::GUANINE, &mut |_: Cell, els: &[Element]| {
//!     seen += els.iter().filter(|e| e.kind == ActorType::GUANINE).count();
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(seen, 1);
//! # Ok::<(), petri_index::IndexError>(())
//! ```
//!
//! ## Handles and staleness
//!
//! Query results are [`ActorId`]s copied at build time. An actor may be consumed or
//! destroyed later in the same tick, so consumers must re-check liveness (and that the
//! actor still has the wanted type) against their own store before acting.
//! [`ActorId`] is generational, so a reused slot is detected as a different actor.
//!
//! ## Choosing a cell size
//!
//! Cells a little larger than the typical query reach keep most queries within the
//! home cell and its immediate shell. Very small cells make the cell table large and
//! every rebuild clears it; very large cells put many candidates in each cell.
//!
//! ### Float semantics
//!
//! Positions outside the indexed cube clamp to the boundary cells. NaN coordinates are
//! tolerated (they land in a boundary cell) but never match a distance test.

pub mod build;
pub mod config;
pub mod error;
pub mod grid;
pub mod index;
pub mod query;
pub mod types;

pub use build::{BuildPhase, BuildStats, IndexBuilder, WorkerPartition};
pub use config::{IndexConfig, WorkerCount};
pub use error::IndexError;
pub use grid::{ProximityCells, UniformGrid};
pub use index::SpatialIndex;
pub use query::{ActorOverlaps, CellVisitor, QueryRequest};
pub use types::{ActorId, ActorType, Cell, ContactRadii, Element};
