// Copyright 2025 the Petri Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by index construction.

use thiserror::Error;

/// Errors emitted while configuring or rebuilding an index.
///
/// A query never fails: finding no match is an ordinary `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The snapshot holds more actors than the preallocated element buffer.
    ///
    /// The rebuild is rejected before anything is written, so the previously built
    /// index stays intact. Grow the capacity ahead of time instead of truncating.
    #[error("snapshot of {requested} actors exceeds index capacity of {capacity}")]
    CapacityExceeded {
        /// Number of actors in the rejected snapshot.
        requested: usize,
        /// Preallocated element capacity.
        capacity: usize,
    },
    /// Configuration values that cannot be used (e.g., non-positive cell size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
