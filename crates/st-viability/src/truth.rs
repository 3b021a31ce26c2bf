// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use ndarray::{Array1, ArrayD, ArrayView2};
use st_space::{DiscretizableSpace, ProductSpace, StateActionSpace};
use tracing::info;

use crate::env::{Dynamics, Environment};
use crate::kernel::{compute_viability, KernelReport, ViabilitySets};
use crate::{TransitionMap, ViabilityError, ViabilityResult};

/// Ground truth that has not been populated yet.
///
/// Holds only the environment; every initialiser consumes the builder and
/// returns a fully populated [`SafetyTruth`].
#[derive(Clone, Copy, Debug)]
pub struct SafetyTruthBuilder<'env, E> {
    pub(crate) env: &'env E,
}

impl<'env, E: Environment> SafetyTruthBuilder<'env, E> {
    pub fn new(env: &'env E) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &'env E {
        self.env
    }

    /// Computes the transition map from the environment's dynamics, then the kernel.
    pub fn compute(self) -> ViabilityResult<SafetyTruth> {
        let map = self.env.dynamics().compute_map()?;
        self.compute_with_map(&map)
    }

    /// Computes the kernel from a precomputed transition map.
    pub fn compute_with_map(self, map: &TransitionMap) -> ViabilityResult<SafetyTruth> {
        let env = self.env;
        let space = env.stateaction_space();
        let (sets, report) = compute_viability(space, map, |state| env.is_failure_state(state))?;
        Ok(SafetyTruth {
            space: space.clone(),
            sets,
            report: Some(report),
        })
    }
}

/// Computed or imported viability structure of a state-action grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SafetyTruth {
    space: StateActionSpace,
    sets: ViabilitySets,
    report: Option<KernelReport>,
}

impl SafetyTruth {
    pub fn builder<E: Environment>(env: &E) -> SafetyTruthBuilder<'_, E> {
        SafetyTruthBuilder::new(env)
    }

    /// Assembles a truth from arrays whose shapes were already checked.
    pub(crate) fn from_parts(space: StateActionSpace, sets: ViabilitySets) -> Self {
        Self {
            space,
            sets,
            report: None,
        }
    }

    pub fn stateaction_space(&self) -> &StateActionSpace {
        &self.space
    }

    pub fn state_space(&self) -> &ProductSpace {
        self.space.state_space()
    }

    pub fn action_space(&self) -> &ProductSpace {
        self.space.action_space()
    }

    pub fn sets(&self) -> &ViabilitySets {
        &self.sets
    }

    pub fn viable_set(&self) -> &ArrayD<f64> {
        &self.sets.viable_set
    }

    pub fn unviable_set(&self) -> &ArrayD<f64> {
        &self.sets.unviable_set
    }

    pub fn failure_set(&self) -> &ArrayD<f64> {
        &self.sets.failure_set
    }

    pub fn state_measure(&self) -> &ArrayD<f64> {
        &self.sets.state_measure
    }

    pub fn measure_value(&self) -> &ArrayD<f64> {
        &self.sets.measure_value
    }

    /// Sweep statistics, present only when the truth was computed in this process.
    pub fn kernel_report(&self) -> Option<&KernelReport> {
        self.report.as_ref()
    }

    /// Measure of the grid cell nearest to `(state, action)`.
    pub fn measure(&self, state: &[f64], action: &[f64]) -> ViabilityResult<f64> {
        let joint = self.space.join(state, action)?;
        self.lookup(&self.sets.measure_value, &joint)
    }

    /// Row-wise [`SafetyTruth::measure`] over a batch, preserving order.
    pub fn measure_batch(
        &self,
        states: ArrayView2<'_, f64>,
        actions: ArrayView2<'_, f64>,
    ) -> ViabilityResult<Array1<f64>> {
        if states.nrows() != actions.nrows() {
            return Err(ViabilityError::BatchMismatch {
                states: states.nrows(),
                actions: actions.nrows(),
            });
        }
        let measures = states
            .outer_iter()
            .zip(actions.outer_iter())
            .map(|(state, action)| self.measure(&state.to_vec(), &action.to_vec()))
            .collect::<ViabilityResult<Vec<_>>>()?;
        Ok(Array1::from(measures))
    }

    pub fn is_viable(&self, state: &[f64], action: &[f64]) -> ViabilityResult<bool> {
        let joint = self.space.join(state, action)?;
        self.is_viable_stateaction(&joint)
    }

    /// Viability of a joint coordinate (state entries first).
    pub fn is_viable_stateaction(&self, stateaction: &[f64]) -> ViabilityResult<bool> {
        self.flag(&self.sets.viable_set, stateaction)
    }

    pub fn is_unviable(&self, state: &[f64], action: &[f64]) -> ViabilityResult<bool> {
        let joint = self.space.join(state, action)?;
        self.flag(&self.sets.unviable_set, &joint)
    }

    pub fn is_failure(&self, state: &[f64], action: &[f64]) -> ViabilityResult<bool> {
        let joint = self.space.join(state, action)?;
        self.flag(&self.sets.failure_set, &joint)
    }

    fn flag(&self, set: &ArrayD<f64>, stateaction: &[f64]) -> ViabilityResult<bool> {
        Ok(self.lookup(set, stateaction)? != 0.0)
    }

    fn lookup(&self, array: &ArrayD<f64>, stateaction: &[f64]) -> ViabilityResult<f64> {
        let cell = self.space.get_index_of(stateaction, true)?;
        array
            .get(cell.as_slice())
            .copied()
            .ok_or_else(|| ViabilityError::ShapeMismatch {
                field: "query",
                expected: array.shape().to_vec(),
                got: cell,
            })
    }

    pub(crate) fn log_loaded(&self, source: &str) {
        info!(
            source,
            shape = ?self.space.shape(),
            viable_cells = self.sets.viable_set.iter().filter(|&&flag| flag != 0.0).count(),
            "ground truth loaded"
        );
    }
}
