// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Discretized spaces for grid-based safety analysis.
//!
//! A [`Segment`] discretizes a closed interval into evenly spaced points, a
//! [`ProductSpace`] takes the Cartesian product of segments (nested products
//! flatten into their segments) and a [`StateActionSpace`] splits a product
//! into a leading state block and a trailing action block.
//!
//! Every space implements [`DiscretizableSpace`], which resolves continuous
//! coordinates to integer grid indices either strictly (the coordinate must sit
//! on a grid point, up to the segment tolerance) or tolerantly (snap to the
//! nearest grid point).

mod error;
mod product;
mod segment;
mod stateaction;

pub use error::{SpaceError, SpaceResult};
pub use product::{GridIter, ProductSpace};
pub use segment::Segment;
pub use stateaction::StateActionSpace;

/// Capability set shared by every discretized space.
pub trait DiscretizableSpace {
    /// Number of entries in a coordinate or index tuple.
    fn index_dim(&self) -> usize;

    /// Number of grid points along each axis.
    fn shape(&self) -> Vec<usize>;

    /// Total number of grid cells.
    fn n_cells(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether `x` has the right dimensionality and lies inside the bounds.
    fn contains(&self, x: &[f64]) -> bool;

    /// Whether `x` is contained and every entry sits on a grid point.
    fn is_on_grid(&self, x: &[f64]) -> bool;

    /// Resolves `x` to its grid index.
    ///
    /// Fails with [`SpaceError::OutOfSpace`] when `x` is not contained. When
    /// `around_ok` is false, also fails with [`SpaceError::NotOnGrid`] unless
    /// `x` is on the grid; otherwise snaps to the closest index.
    fn get_index_of(&self, x: &[f64], around_ok: bool) -> SpaceResult<Vec<usize>>;

    /// Continuous coordinate of a grid index.
    fn value_of_index(&self, index: &[usize]) -> SpaceResult<Vec<f64>>;

    /// Clamps `x` into the bounds of the space.
    fn closest_in(&self, x: &[f64]) -> SpaceResult<Vec<f64>>;

    /// Enumerates every `(index, coordinate)` pair in lexicographic index order.
    fn cells(&self) -> GridIter<'_>;
}
