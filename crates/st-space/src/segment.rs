// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};
use std::slice;

use crate::{DiscretizableSpace, GridIter, SpaceError, SpaceResult};

/// Fraction of the segment length under which a value counts as on the grid.
const TOLERANCE_RATIO: f64 = 1e-7;

/// Closed interval `[low, high]` discretized into `n_points` evenly spaced values.
///
/// Deserialization goes through [`Segment::new`]; the tolerance is derived again
/// rather than read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SegmentRepr", into = "SegmentRepr")]
pub struct Segment {
    low: f64,
    high: f64,
    n_points: usize,
    tolerance: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SegmentRepr {
    low: f64,
    high: f64,
    n_points: usize,
}

impl TryFrom<SegmentRepr> for Segment {
    type Error = SpaceError;

    fn try_from(repr: SegmentRepr) -> SpaceResult<Self> {
        Self::new(repr.low, repr.high, repr.n_points)
    }
}

impl From<Segment> for SegmentRepr {
    fn from(segment: Segment) -> Self {
        Self {
            low: segment.low,
            high: segment.high,
            n_points: segment.n_points,
        }
    }
}

impl Segment {
    /// Builds a segment, rejecting empty intervals and empty discretizations.
    pub fn new(low: f64, high: f64, n_points: usize) -> SpaceResult<Self> {
        // Written so that NaN bounds are rejected as well.
        if !(low < high) {
            return Err(SpaceError::EmptySegment { low, high });
        }
        if n_points == 0 {
            return Err(SpaceError::NoPoints);
        }
        Ok(Self {
            low,
            high,
            n_points,
            tolerance: (high - low) * TOLERANCE_RATIO,
        })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Absolute distance under which a value is considered to sit on a grid point.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn contains_value(&self, x: f64) -> bool {
        self.low <= x && x <= self.high
    }

    /// Nearest grid index by linear interpolation. Does not check bounds.
    pub fn closest_index_of(&self, x: f64) -> usize {
        if self.n_points == 1 {
            return 0;
        }
        let scaled = (self.n_points - 1) as f64 * (x - self.low) / (self.high - self.low);
        scaled.round_ties_even().max(0.0) as usize
    }

    /// Continuous value of grid index `index`.
    pub fn value_at(&self, index: usize) -> f64 {
        if self.n_points == 1 {
            return self.low;
        }
        let t = index as f64 / (self.n_points - 1) as f64;
        (1.0 - t) * self.low + t * self.high
    }

    pub fn is_value_on_grid(&self, x: f64) -> bool {
        if !self.contains_value(x) {
            return false;
        }
        let closest = self.value_at(self.closest_index_of(x));
        (closest - x).abs() <= self.tolerance
    }

    /// Scalar form of [`DiscretizableSpace::get_index_of`].
    pub fn index_of(&self, x: f64, around_ok: bool) -> SpaceResult<usize> {
        if !self.contains_value(x) {
            return Err(SpaceError::OutOfSpace {
                coordinate: vec![x],
                axis: 0,
            });
        }
        let index = self.closest_index_of(x);
        if around_ok || self.is_value_on_grid(x) {
            Ok(index)
        } else {
            Err(SpaceError::NotOnGrid {
                coordinate: vec![x],
                axis: 0,
                closest: self.value_at(index),
            })
        }
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.low, self.high)
    }

    /// Every grid value in increasing order.
    pub fn values(&self) -> Vec<f64> {
        (0..self.n_points).map(|index| self.value_at(index)).collect()
    }

    fn scalar<'a>(&self, x: &'a [f64]) -> SpaceResult<&'a f64> {
        match x {
            [value] => Ok(value),
            _ => Err(SpaceError::DimensionMismatch {
                expected: 1,
                got: x.len(),
            }),
        }
    }
}

impl DiscretizableSpace for Segment {
    fn index_dim(&self) -> usize {
        1
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.n_points]
    }

    fn contains(&self, x: &[f64]) -> bool {
        matches!(x, [value] if self.contains_value(*value))
    }

    fn is_on_grid(&self, x: &[f64]) -> bool {
        matches!(x, [value] if self.is_value_on_grid(*value))
    }

    fn get_index_of(&self, x: &[f64], around_ok: bool) -> SpaceResult<Vec<usize>> {
        if !self.contains(x) {
            return Err(SpaceError::OutOfSpace {
                coordinate: x.to_vec(),
                axis: 0,
            });
        }
        let value = self.scalar(x)?;
        self.index_of(*value, around_ok).map(|index| vec![index])
    }

    fn value_of_index(&self, index: &[usize]) -> SpaceResult<Vec<f64>> {
        match index {
            [i] if *i < self.n_points => Ok(vec![self.value_at(*i)]),
            [i] => Err(SpaceError::IndexOutOfRange {
                axis: 0,
                index: *i,
                len: self.n_points,
            }),
            _ => Err(SpaceError::DimensionMismatch {
                expected: 1,
                got: index.len(),
            }),
        }
    }

    fn closest_in(&self, x: &[f64]) -> SpaceResult<Vec<f64>> {
        let value = self.scalar(x)?;
        Ok(vec![self.clamp(*value)])
    }

    fn cells(&self) -> GridIter<'_> {
        GridIter::new(slice::from_ref(self))
    }
}
