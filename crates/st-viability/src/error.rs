// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use st_space::SpaceError;
use thiserror::Error;

/// Failures raised while computing, querying or persisting a ground truth.
#[derive(Debug, Error)]
pub enum ViabilityError {
    /// Coordinate lookup failed (out of bounds, off grid, wrong arity).
    #[error(transparent)]
    Space(#[from] SpaceError),
    /// A supplied, loaded or imported array disagrees with the declared grid.
    #[error("{field} has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// Imported grids do not have the dimensionality the environment declares.
    #[error("size mismatch: expected {space} space with {expected} dimensions, got {got}")]
    DimensionMismatch {
        space: &'static str,
        expected: usize,
        got: usize,
    },
    /// An imported dynamics parameter differs from the environment's value.
    #[error(
        "value mismatch: value loaded for {name} from {external_name} does not match, expected {expected}, got {got}"
    )]
    ParameterMismatch {
        name: String,
        external_name: String,
        expected: f64,
        got: f64,
    },
    /// Imported parameter name absent from the environment's lookup table.
    #[error("external parameter '{0}' has no entry in the parameter lookup")]
    UnknownParameter(String),
    /// Lookup points at a parameter the dynamics do not define.
    #[error("dynamics do not define parameter '{0}'")]
    MissingParameter(String),
    /// A transition map entry is not a valid flat state index.
    #[error("transition map points to state {next}, but the state grid only has {states} states")]
    InvalidTransition { next: usize, states: usize },
    /// An imported cell is flagged in both the failure set and the viable set.
    #[error("imported cell {cell:?} is marked both viable and failing")]
    OverlappingSets { cell: Vec<usize> },
    /// The action grid is empty, so no state measure can be formed.
    #[error("state-action grid has no actions")]
    NoActions,
    /// Batched queries received a different number of states and actions.
    #[error("batch has {states} states but {actions} actions")]
    BatchMismatch { states: usize, actions: usize },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] bincode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("array layout error: {0}")]
    Layout(#[from] ndarray::ShapeError),
}

/// Result alias for ground-truth routines.
pub type ViabilityResult<T> = Result<T, ViabilityError>;
