// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Errors raised while building a discretized space or resolving coordinates on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpaceError {
    /// The coordinate lies outside the declared bounds along `axis`.
    #[error("coordinate {coordinate:?} lies outside the space along axis {axis}")]
    OutOfSpace { coordinate: Vec<f64>, axis: usize },
    /// The coordinate is in bounds but off the grid along `axis`, and strict
    /// grid alignment was requested.
    #[error("coordinate {coordinate:?} is not on the grid along axis {axis} (closest grid value {closest})")]
    NotOnGrid {
        coordinate: Vec<f64>,
        axis: usize,
        closest: f64,
    },
    /// Segment bounds do not describe a non-empty interval.
    #[error("bounds {low} and {high} create an empty segment")]
    EmptySegment { low: f64, high: f64 },
    /// Segment was asked to discretize into zero points.
    #[error("a segment needs at least one grid point")]
    NoPoints,
    /// Product spaces need at least one component.
    #[error("a product space needs at least one component")]
    EmptyProduct,
    /// A coordinate or index tuple does not match the space dimensionality.
    #[error("expected a tuple with {expected} entries, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// An integer grid index exceeds the number of points along its axis.
    #[error("index {index} on axis {axis} exceeds the {len} grid points of that axis")]
    IndexOutOfRange { axis: usize, index: usize, len: usize },
    /// Per-axis bounds and shape of a box disagree in length.
    #[error("box bounds mismatch: low has {low} entries, high has {high}, shape has {shape}")]
    BoundsMismatch { low: usize, high: usize, shape: usize },
}

impl SpaceError {
    /// Rewrites a per-axis lookup failure so it names the full `coordinate`
    /// and the component `axis` it occurred on.
    pub(crate) fn located(self, axis: usize, coordinate: &[f64]) -> Self {
        match self {
            Self::OutOfSpace { .. } => Self::OutOfSpace {
                coordinate: coordinate.to_vec(),
                axis,
            },
            Self::NotOnGrid { closest, .. } => Self::NotOnGrid {
                coordinate: coordinate.to_vec(),
                axis,
                closest,
            },
            other => other,
        }
    }
}

/// Result alias used across the space helpers.
pub type SpaceResult<T> = Result<T, SpaceError>;
