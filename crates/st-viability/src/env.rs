// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{ArrayD, IxDyn};
use st_space::{DiscretizableSpace, ProductSpace, StateActionSpace};

use crate::ViabilityResult;

/// Flat row-major state index reached from every state-action cell.
///
/// Shaped like the state-action grid.
pub type TransitionMap = ArrayD<usize>;

/// External parameter name to internal parameter name. `None` marks an
/// external parameter the environment does not track.
pub type ParameterLookup = BTreeMap<String, Option<String>>;

/// Deterministic, grid-quantized dynamics.
pub trait Dynamics {
    fn compute_map(&self) -> ViabilityResult<TransitionMap>;

    fn parameters(&self) -> &BTreeMap<String, f64>;
}

/// What the ground-truth computation needs to know about an environment.
pub trait Environment {
    type Dynamics: Dynamics;

    fn stateaction_space(&self) -> &StateActionSpace;

    fn state_space(&self) -> &ProductSpace {
        self.stateaction_space().state_space()
    }

    fn action_space(&self) -> &ProductSpace {
        self.stateaction_space().action_space()
    }

    fn dynamics(&self) -> &Self::Dynamics;

    fn is_failure_state(&self, state: &[f64]) -> bool;

    /// Translation table used to cross-check imported ground truths.
    fn parameter_lookup(&self) -> ParameterLookup {
        ParameterLookup::new()
    }
}

type StepFn = dyn Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync;
type FailureFn = dyn Fn(&[f64]) -> bool + Send + Sync;

/// Dynamics given by a continuous step function, quantized onto the grid.
///
/// The next state is clamped into the state space and snapped to its nearest
/// grid cell.
pub struct DiscreteDynamics {
    space: StateActionSpace,
    step: Box<StepFn>,
    parameters: BTreeMap<String, f64>,
}

impl DiscreteDynamics {
    pub fn new<F>(space: StateActionSpace, step: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        Self {
            space,
            step: Box::new(step),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Flat index of the grid state reached from `state` under `action`.
    pub fn next_state_index(&self, state: &[f64], action: &[f64]) -> ViabilityResult<usize> {
        let state_space = self.space.state_space();
        let next = state_space.closest_in(&(self.step)(state, action))?;
        let index = state_space.get_index_of(&next, true)?;
        Ok(state_space.ravel_index(&index)?)
    }
}

impl Dynamics for DiscreteDynamics {
    fn compute_map(&self) -> ViabilityResult<TransitionMap> {
        let mut flat = Vec::with_capacity(self.space.n_cells());
        for (_, coordinate) in self.space.iter() {
            let (state, action) = self.space.split(&coordinate)?;
            flat.push(self.next_state_index(state, action)?);
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&self.space.shape()), flat)?)
    }

    fn parameters(&self) -> &BTreeMap<String, f64> {
        &self.parameters
    }
}

impl fmt::Debug for DiscreteDynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscreteDynamics")
            .field("space", &self.space)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Environment assembled from a grid, a step function and a failure predicate.
pub struct GridEnvironment {
    space: StateActionSpace,
    dynamics: DiscreteDynamics,
    failure: Box<FailureFn>,
    lookup: ParameterLookup,
}

impl GridEnvironment {
    pub fn new<S, F>(space: StateActionSpace, step: S, is_failure: F) -> Self
    where
        S: Fn(&[f64], &[f64]) -> Vec<f64> + Send + Sync + 'static,
        F: Fn(&[f64]) -> bool + Send + Sync + 'static,
    {
        Self {
            dynamics: DiscreteDynamics::new(space.clone(), step),
            space,
            failure: Box::new(is_failure),
            lookup: ParameterLookup::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.dynamics = self.dynamics.with_parameter(name, value);
        self
    }

    /// Maps an external parameter name onto an internal one (or `None` to ignore it).
    pub fn with_external_name(mut self, external: impl Into<String>, internal: Option<&str>) -> Self {
        self.lookup
            .insert(external.into(), internal.map(str::to_string));
        self
    }
}

impl Environment for GridEnvironment {
    type Dynamics = DiscreteDynamics;

    fn stateaction_space(&self) -> &StateActionSpace {
        &self.space
    }

    fn dynamics(&self) -> &DiscreteDynamics {
        &self.dynamics
    }

    fn is_failure_state(&self, state: &[f64]) -> bool {
        (self.failure)(state)
    }

    fn parameter_lookup(&self) -> ParameterLookup {
        self.lookup.clone()
    }
}

impl fmt::Debug for GridEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEnvironment")
            .field("space", &self.space)
            .field("dynamics", &self.dynamics)
            .field("lookup", &self.lookup)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> StateActionSpace {
        let states = ProductSpace::uniform(0.0, 4.0, &[5]).unwrap();
        let actions = ProductSpace::uniform(-1.0, 1.0, &[3]).unwrap();
        StateActionSpace::new(states, actions).unwrap()
    }

    #[test]
    fn compute_map_clamps_and_snaps_next_states() {
        let dynamics = DiscreteDynamics::new(line(), |s, a| vec![s[0] + 1.4 * a[0]]);
        let map = dynamics.compute_map().unwrap();
        assert_eq!(map.shape(), &[5, 3]);
        // From 0: 0 - 1.4 clamps to 0, 0 stays, 1.4 snaps to 1.
        assert_eq!(map[[0, 0]], 0);
        assert_eq!(map[[0, 1]], 0);
        assert_eq!(map[[0, 2]], 1);
        // From 4: 2.6 snaps to 3, 5.4 clamps to 4.
        assert_eq!(map[[4, 0]], 3);
        assert_eq!(map[[4, 2]], 4);
    }

    #[test]
    fn grid_environment_exposes_its_collaborators() {
        let env = GridEnvironment::new(line(), |s, _| s.to_vec(), |s| s[0] < 0.5)
            .with_parameter("gravity", 9.81)
            .with_external_name("g", Some("gravity"))
            .with_external_name("unused", None);
        assert_eq!(env.state_space().index_dim(), 1);
        assert_eq!(env.action_space().shape(), vec![3]);
        assert!(env.is_failure_state(&[0.0]));
        assert!(!env.is_failure_state(&[1.0]));
        assert_eq!(env.dynamics().parameters().get("gravity"), Some(&9.81));
        assert_eq!(
            env.parameter_lookup().get("g"),
            Some(&Some("gravity".to_string()))
        );
        assert_eq!(env.parameter_lookup().get("unused"), Some(&None));
    }
}
