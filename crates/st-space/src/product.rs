// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};

use crate::{DiscretizableSpace, Segment, SpaceError, SpaceResult};

/// Cartesian product of segments.
///
/// Composing products flattens them, so a product of a 2-D and a 1-D space is a
/// 3-D space whose tuples concatenate the component tuples in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProductRepr", into = "ProductRepr")]
pub struct ProductSpace {
    segments: Vec<Segment>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProductRepr {
    segments: Vec<Segment>,
}

impl TryFrom<ProductRepr> for ProductSpace {
    type Error = SpaceError;

    fn try_from(repr: ProductRepr) -> SpaceResult<Self> {
        Self::new(repr.segments)
    }
}

impl From<ProductSpace> for ProductRepr {
    fn from(space: ProductSpace) -> Self {
        Self {
            segments: space.segments,
        }
    }
}

impl ProductSpace {
    pub fn new(segments: Vec<Segment>) -> SpaceResult<Self> {
        if segments.is_empty() {
            return Err(SpaceError::EmptyProduct);
        }
        Ok(Self { segments })
    }

    /// Concatenates the segments of several products, in order.
    pub fn compose<I>(spaces: I) -> SpaceResult<Self>
    where
        I: IntoIterator<Item = ProductSpace>,
    {
        let segments = spaces
            .into_iter()
            .flat_map(|space| space.segments)
            .collect();
        Self::new(segments)
    }

    /// Box with one segment per axis, built from per-axis bounds.
    pub fn from_bounds(low: &[f64], high: &[f64], shape: &[usize]) -> SpaceResult<Self> {
        if low.len() != high.len() || low.len() != shape.len() {
            return Err(SpaceError::BoundsMismatch {
                low: low.len(),
                high: high.len(),
                shape: shape.len(),
            });
        }
        let segments = low
            .iter()
            .zip(high)
            .zip(shape)
            .map(|((&lo, &hi), &n)| Segment::new(lo, hi, n))
            .collect::<SpaceResult<Vec<_>>>()?;
        Self::new(segments)
    }

    /// Box sharing the same bounds on every axis.
    pub fn uniform(low: f64, high: f64, shape: &[usize]) -> SpaceResult<Self> {
        let segments = shape
            .iter()
            .map(|&n| Segment::new(low, high, n))
            .collect::<SpaceResult<Vec<_>>>()?;
        Self::new(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, axis: usize) -> Option<&Segment> {
        self.segments.get(axis)
    }

    /// Row-major position of `index` among all cells of the space.
    pub fn ravel_index(&self, index: &[usize]) -> SpaceResult<usize> {
        self.check_dim(index.len())?;
        let mut flat = 0usize;
        for (axis, (&i, segment)) in index.iter().zip(&self.segments).enumerate() {
            let len = segment.n_points();
            if i >= len {
                return Err(SpaceError::IndexOutOfRange {
                    axis,
                    index: i,
                    len,
                });
            }
            flat = flat * len + i;
        }
        Ok(flat)
    }

    /// Inverse of [`ProductSpace::ravel_index`].
    pub fn unravel_index(&self, flat: usize) -> SpaceResult<Vec<usize>> {
        let total = self.n_cells();
        if flat >= total {
            return Err(SpaceError::IndexOutOfRange {
                axis: 0,
                index: flat,
                len: total,
            });
        }
        let mut rest = flat;
        let mut index = vec![0; self.segments.len()];
        for (slot, segment) in index.iter_mut().zip(&self.segments).rev() {
            let len = segment.n_points();
            *slot = rest % len;
            rest /= len;
        }
        Ok(index)
    }

    pub fn iter(&self) -> GridIter<'_> {
        GridIter::new(&self.segments)
    }

    fn check_dim(&self, got: usize) -> SpaceResult<()> {
        if got == self.segments.len() {
            Ok(())
        } else {
            Err(SpaceError::DimensionMismatch {
                expected: self.segments.len(),
                got,
            })
        }
    }
}

impl From<Segment> for ProductSpace {
    fn from(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl DiscretizableSpace for ProductSpace {
    fn index_dim(&self) -> usize {
        self.segments.len()
    }

    fn shape(&self) -> Vec<usize> {
        self.segments.iter().map(Segment::n_points).collect()
    }

    fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.segments.len()
            && x
                .iter()
                .zip(&self.segments)
                .all(|(&value, segment)| segment.contains_value(value))
    }

    fn is_on_grid(&self, x: &[f64]) -> bool {
        x.len() == self.segments.len()
            && x
                .iter()
                .zip(&self.segments)
                .all(|(&value, segment)| segment.is_value_on_grid(value))
    }

    fn get_index_of(&self, x: &[f64], around_ok: bool) -> SpaceResult<Vec<usize>> {
        self.check_dim(x.len())?;
        x.iter()
            .zip(&self.segments)
            .enumerate()
            .map(|(axis, (&value, segment))| {
                segment
                    .index_of(value, around_ok)
                    .map_err(|err| err.located(axis, x))
            })
            .collect()
    }

    fn value_of_index(&self, index: &[usize]) -> SpaceResult<Vec<f64>> {
        self.check_dim(index.len())?;
        index
            .iter()
            .zip(&self.segments)
            .enumerate()
            .map(|(axis, (&i, segment))| {
                if i < segment.n_points() {
                    Ok(segment.value_at(i))
                } else {
                    Err(SpaceError::IndexOutOfRange {
                        axis,
                        index: i,
                        len: segment.n_points(),
                    })
                }
            })
            .collect()
    }

    fn closest_in(&self, x: &[f64]) -> SpaceResult<Vec<f64>> {
        self.check_dim(x.len())?;
        Ok(x.iter()
            .zip(&self.segments)
            .map(|(&value, segment)| segment.clamp(value))
            .collect())
    }

    fn cells(&self) -> GridIter<'_> {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a ProductSpace {
    type Item = (Vec<usize>, Vec<f64>);
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy enumeration of the cells of a grid, trailing axis fastest.
#[derive(Clone, Debug)]
pub struct GridIter<'a> {
    segments: &'a [Segment],
    next: Option<Vec<usize>>,
    remaining: usize,
}

impl<'a> GridIter<'a> {
    pub(crate) fn new(segments: &'a [Segment]) -> Self {
        let remaining = segments.iter().map(Segment::n_points).product();
        let next = (remaining > 0).then(|| vec![0; segments.len()]);
        Self {
            segments,
            next,
            remaining,
        }
    }

    fn advance(&self, index: &[usize]) -> Option<Vec<usize>> {
        let mut successor = index.to_vec();
        for (slot, segment) in successor.iter_mut().zip(self.segments).rev() {
            *slot += 1;
            if *slot < segment.n_points() {
                return Some(successor);
            }
            *slot = 0;
        }
        None
    }
}

impl Iterator for GridIter<'_> {
    type Item = (Vec<usize>, Vec<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next.take()?;
        self.next = self.advance(&index);
        self.remaining = self.remaining.saturating_sub(1);
        let coordinate = index
            .iter()
            .zip(self.segments)
            .map(|(&i, segment)| segment.value_at(i))
            .collect();
        Some((index, coordinate))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane() -> ProductSpace {
        ProductSpace::from_bounds(&[0.0, -1.0], &[1.0, 1.0], &[3, 5]).unwrap()
    }

    #[test]
    fn shape_and_dimension_follow_segments() {
        let space = plane();
        assert_eq!(space.index_dim(), 2);
        assert_eq!(space.shape(), vec![3, 5]);
        assert_eq!(space.n_cells(), 15);
    }

    #[test]
    fn compose_flattens_nested_products() {
        let line = ProductSpace::from(Segment::new(0.0, 2.0, 3).unwrap());
        let joint = ProductSpace::compose([plane(), line]).unwrap();
        assert_eq!(joint.index_dim(), 3);
        assert_eq!(joint.shape(), vec![3, 5, 3]);
        assert_eq!(
            joint.get_index_of(&[0.5, 0.0, 2.0], false),
            Ok(vec![1, 2, 2])
        );
    }

    #[test]
    fn lookup_reports_first_failing_axis() {
        let space = plane();
        assert_eq!(
            space.get_index_of(&[2.0, 0.3], true),
            Err(SpaceError::OutOfSpace {
                coordinate: vec![2.0, 0.3],
                axis: 0
            })
        );
        assert_eq!(
            space.get_index_of(&[0.5, 1.4], true),
            Err(SpaceError::OutOfSpace {
                coordinate: vec![0.5, 1.4],
                axis: 1
            })
        );
        let err = space.get_index_of(&[0.5, 0.3], false).unwrap_err();
        assert_eq!(
            err,
            SpaceError::NotOnGrid {
                coordinate: vec![0.5, 0.3],
                axis: 1,
                closest: 0.5
            }
        );
        assert!(err.to_string().contains("along axis 1"));
        assert_eq!(space.get_index_of(&[0.5, 0.3], true), Ok(vec![1, 3]));
        assert_eq!(
            space.get_index_of(&[0.5], true),
            Err(SpaceError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn iteration_is_lexicographic_and_restartable() {
        let space = plane();
        let first: Vec<_> = space.iter().map(|(index, _)| index).collect();
        assert_eq!(first.len(), 15);
        assert_eq!(first[0], vec![0, 0]);
        assert_eq!(first[1], vec![0, 1]);
        assert_eq!(first[5], vec![1, 0]);
        assert_eq!(first[14], vec![2, 4]);
        let second: Vec<_> = space.iter().map(|(index, _)| index).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn ravel_matches_iteration_order() {
        let space = plane();
        for (position, (index, _)) in space.iter().enumerate() {
            assert_eq!(space.ravel_index(&index), Ok(position));
            assert_eq!(space.unravel_index(position), Ok(index));
        }
        assert!(space.unravel_index(15).is_err());
        assert_eq!(
            space.ravel_index(&[3, 0]),
            Err(SpaceError::IndexOutOfRange {
                axis: 0,
                index: 3,
                len: 3
            })
        );
    }

    #[test]
    fn box_constructors_validate_bounds() {
        assert_eq!(
            ProductSpace::from_bounds(&[0.0], &[1.0, 2.0], &[3, 3]),
            Err(SpaceError::BoundsMismatch {
                low: 1,
                high: 2,
                shape: 2
            })
        );
        let cube = ProductSpace::uniform(0.0, 1.0, &[2, 2, 2]).unwrap();
        assert_eq!(cube.n_cells(), 8);
        assert!(ProductSpace::uniform(1.0, 0.0, &[2]).is_err());
        assert_eq!(ProductSpace::new(Vec::new()), Err(SpaceError::EmptyProduct));
    }

    #[test]
    fn closest_in_projects_every_axis() {
        let space = plane();
        assert_eq!(space.closest_in(&[1.5, -3.0]), Ok(vec![1.0, -1.0]));
    }

    #[test]
    fn deserialization_rejects_empty_products_and_bad_segments() {
        let err = serde_json::from_str::<ProductSpace>(r#"{"segments": []}"#).unwrap_err();
        assert!(err.to_string().contains("at least one component"));

        let zero_points = r#"{"segments": [{"low": 0.0, "high": 1.0, "n_points": 0}]}"#;
        assert!(serde_json::from_str::<ProductSpace>(zero_points).is_err());

        let encoded = serde_json::to_string(&plane()).unwrap();
        assert_eq!(serde_json::from_str::<ProductSpace>(&encoded).unwrap(), plane());
    }
}
