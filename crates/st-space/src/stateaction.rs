// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{DiscretizableSpace, GridIter, ProductSpace, SpaceError, SpaceResult};

/// Product of a state space and an action space.
///
/// Joint tuples list the state entries first, followed by the action entries.
/// Only the two halves are serialized; the joint space is rebuilt on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StateActionRepr", into = "StateActionRepr")]
pub struct StateActionSpace {
    state_space: ProductSpace,
    action_space: ProductSpace,
    joint: ProductSpace,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateActionRepr {
    state_space: ProductSpace,
    action_space: ProductSpace,
}

impl TryFrom<StateActionRepr> for StateActionSpace {
    type Error = SpaceError;

    fn try_from(repr: StateActionRepr) -> SpaceResult<Self> {
        Self::new(repr.state_space, repr.action_space)
    }
}

impl From<StateActionSpace> for StateActionRepr {
    fn from(space: StateActionSpace) -> Self {
        Self {
            state_space: space.state_space,
            action_space: space.action_space,
        }
    }
}

impl StateActionSpace {
    pub fn new(state_space: ProductSpace, action_space: ProductSpace) -> SpaceResult<Self> {
        let joint = ProductSpace::compose([state_space.clone(), action_space.clone()])?;
        Ok(Self {
            state_space,
            action_space,
            joint,
        })
    }

    pub fn state_space(&self) -> &ProductSpace {
        &self.state_space
    }

    pub fn action_space(&self) -> &ProductSpace {
        &self.action_space
    }

    /// The flattened product of both halves.
    pub fn joint(&self) -> &ProductSpace {
        &self.joint
    }

    /// Number of states in the state grid.
    pub fn n_states(&self) -> usize {
        self.state_space.n_cells()
    }

    /// Number of actions available from every state.
    pub fn n_actions(&self) -> usize {
        self.action_space.n_cells()
    }

    /// Positions of the action axes inside a joint tuple.
    pub fn action_axes(&self) -> Range<usize> {
        let boundary = self.state_space.index_dim();
        boundary..boundary + self.action_space.index_dim()
    }

    /// Splits a joint index or coordinate into its state and action halves.
    pub fn split<'a, T>(&self, joint: &'a [T]) -> SpaceResult<(&'a [T], &'a [T])> {
        let expected = self.joint.index_dim();
        if joint.len() != expected {
            return Err(SpaceError::DimensionMismatch {
                expected,
                got: joint.len(),
            });
        }
        Ok(joint.split_at(self.state_space.index_dim()))
    }

    /// Concatenates a state tuple and an action tuple into a joint tuple.
    pub fn join<T: Clone>(&self, state: &[T], action: &[T]) -> SpaceResult<Vec<T>> {
        let state_dim = self.state_space.index_dim();
        if state.len() != state_dim {
            return Err(SpaceError::DimensionMismatch {
                expected: state_dim,
                got: state.len(),
            });
        }
        let action_dim = self.action_space.index_dim();
        if action.len() != action_dim {
            return Err(SpaceError::DimensionMismatch {
                expected: action_dim,
                got: action.len(),
            });
        }
        let mut joint = Vec::with_capacity(state_dim + action_dim);
        joint.extend_from_slice(state);
        joint.extend_from_slice(action);
        Ok(joint)
    }

    pub fn iter(&self) -> GridIter<'_> {
        self.joint.iter()
    }
}

impl DiscretizableSpace for StateActionSpace {
    fn index_dim(&self) -> usize {
        self.joint.index_dim()
    }

    fn shape(&self) -> Vec<usize> {
        self.joint.shape()
    }

    fn contains(&self, x: &[f64]) -> bool {
        self.joint.contains(x)
    }

    fn is_on_grid(&self, x: &[f64]) -> bool {
        self.joint.is_on_grid(x)
    }

    fn get_index_of(&self, x: &[f64], around_ok: bool) -> SpaceResult<Vec<usize>> {
        self.joint.get_index_of(x, around_ok)
    }

    fn value_of_index(&self, index: &[usize]) -> SpaceResult<Vec<f64>> {
        self.joint.value_of_index(index)
    }

    fn closest_in(&self, x: &[f64]) -> SpaceResult<Vec<f64>> {
        self.joint.closest_in(x)
    }

    fn cells(&self) -> GridIter<'_> {
        self.joint.iter()
    }
}

impl<'a> IntoIterator for &'a StateActionSpace {
    type Item = (Vec<usize>, Vec<f64>);
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
