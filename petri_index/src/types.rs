// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive records stored in the index and the tags that classify them.

use core::ops::Range;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Generational handle for an actor.
///
/// The index only copies handles; it never dereferences them. A handle returned by a
/// query was live when the snapshot was taken, but the actor may have been destroyed or
/// its slot reused since. Holders must check liveness against their own store (the
/// generation changes whenever a slot is reused).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId {
    index: u32,
    generation: u32,
}

impl ActorId {
    /// The null handle. No live actor ever carries it.
    pub const NULL: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    /// Create a handle from a slot index and generation.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// True for [`ActorId::NULL`].
    pub const fn is_null(self) -> bool {
        self.index == Self::NULL.index && self.generation == Self::NULL.generation
    }

    /// Pack into 64 bits: low half is the index, high half the generation.
    ///
    /// This matches the FFI layout of common generational arenas, so foreign keys can
    /// be carried through the index and unpacked again on the consumer side.
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Inverse of [`ActorId::to_bits`].
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Both halves are 32-bit by construction."
    )]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::NULL
    }
}

bitflags! {
    /// Actor type tag. Also used as a type mask: an element matches a mask when the two
    /// share at least one bit.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ActorType: u8 {
        /// Adenine nucleotide.
        const ADENINE = 1;
        /// Cytosine nucleotide.
        const CYTOSINE = 1 << 1;
        /// Guanine nucleotide.
        const GUANINE = 1 << 2;
        /// Thymine nucleotide.
        const THYMINE = 1 << 3;
        /// Any nucleotide.
        const NUCLEOTIDE = Self::ADENINE.bits()
            | Self::CYTOSINE.bits()
            | Self::GUANINE.bits()
            | Self::THYMINE.bits();
        /// Organism.
        const ORGANISM = 1 << 7;
    }
}

impl ActorType {
    /// Whether an element tagged `self` is accepted by `mask`.
    #[inline]
    pub const fn matches(self, mask: Self) -> bool {
        self.bits() & mask.bits() != 0
    }

    /// True if exactly one nucleotide bit is set and nothing else.
    pub const fn is_single_nucleotide(self) -> bool {
        self.bits().count_ones() == 1 && Self::NUCLEOTIDE.bits() & self.bits() != 0
    }
}

/// Base squared contact radii per actor type.
///
/// Squared values are stored directly since every comparison in the query path is
/// done on squared distances.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRadii {
    /// Squared contact radius of an organism.
    pub organism_sq: f32,
    /// Squared contact radius of a single nucleotide.
    pub nucleotide_sq: f32,
}

impl Default for ContactRadii {
    fn default() -> Self {
        Self {
            organism_sq: 0.1,
            nucleotide_sq: 0.01,
        }
    }
}

impl ContactRadii {
    /// Base squared radius for a tag. Tags that are not exactly one known type get 0.
    pub fn radius_sq(&self, kind: ActorType) -> f32 {
        if kind == ActorType::ORGANISM {
            self.organism_sq
        } else if kind.is_single_nucleotide() {
            self.nucleotide_sq
        } else {
            0.0
        }
    }

    /// Squared radius of a querier of type `kind`, scaled by its size multiplier.
    pub fn querier_radius_sq(&self, kind: ActorType, size_multiplier: f32) -> f32 {
        self.radius_sq(kind) * size_multiplier
    }

    /// Largest squared radius any element accepted by `mask` can have.
    pub fn max_radius_sq(&self, mask: ActorType) -> f32 {
        let mut r = 0.0_f32;
        if mask.intersects(ActorType::ORGANISM) {
            r = r.max(self.organism_sq);
        }
        if mask.intersects(ActorType::NUCLEOTIDE) {
            r = r.max(self.nucleotide_sq);
        }
        r
    }
}

/// Snapshot record of one actor: identity, position, and type at build time.
///
/// A snapshot handed to the builder is a slice of these; the element buffer holds the
/// same records regrouped by cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Element {
    /// Actor handle as of the snapshot.
    pub actor: ActorId,
    /// World position as of the snapshot.
    pub position: Vec3,
    /// Type tag.
    pub kind: ActorType,
}

impl Element {
    /// Create an element.
    pub const fn new(actor: ActorId, position: Vec3, kind: ActorType) -> Self {
        Self {
            actor,
            position,
            kind,
        }
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::new(ActorId::NULL, Vec3::ZERO, ActorType::empty())
    }
}

impl From<(ActorId, Vec3, ActorType)> for Element {
    fn from((actor, position, kind): (ActorId, Vec3, ActorType)) -> Self {
        Self::new(actor, position, kind)
    }
}

/// A half-open range of the element buffer owned by one grid cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    /// First element of the cell.
    pub start: u32,
    /// Number of elements in the cell.
    pub count: u32,
}

impl Cell {
    /// Create a cell range.
    pub const fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }

    /// The cell's range in the element buffer.
    pub const fn range(&self) -> Range<u32> {
        self.start..self.start + self.count
    }

    /// True if the cell holds no elements.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}
