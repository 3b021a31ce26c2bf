// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Viability kernel of a deterministic grid transition system.
//!
//! A state-action cell is viable when some infinite sequence of actions starting
//! with it never reaches a failure state. Viability is a greatest fixed point:
//! start from every cell that does not fail immediately and repeatedly demote
//! cells whose successor state has no viable action left. The viable set only
//! shrinks, so the sweep terminates after at most one pass per cell.
//!
//! Internally the grids are viewed as `(n_states, n_actions)` matrices; this is
//! a pure reshape because state axes lead the row-major layout.

use ndarray::{Array1, Array2, ArrayD, Axis, IxDyn, Zip};
use serde::{Deserialize, Serialize};
use st_space::{DiscretizableSpace, StateActionSpace};
use tracing::{debug, info};

use crate::{TransitionMap, ViabilityError, ViabilityResult};

/// The dense arrays describing a ground truth.
///
/// Flags are stored as `0.0`/`1.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct ViabilitySets {
    /// Cells from which failure can be avoided forever.
    pub viable_set: ArrayD<f64>,
    /// Cells that do not fail immediately but cannot avoid failure.
    pub unviable_set: ArrayD<f64>,
    /// Cells whose successor is a failure state.
    pub failure_set: ArrayD<f64>,
    /// Fraction of viable actions per state, shaped like the state grid.
    pub state_measure: ArrayD<f64>,
    /// `state_measure` of each cell's successor state.
    pub measure_value: ArrayD<f64>,
}

/// Diagnostics recorded while computing a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelReport {
    /// Demotion sweeps run until the kernel stopped changing.
    pub sweeps: usize,
    /// States with at least one viable action.
    pub kernel_states: usize,
    pub viable_cells: usize,
    pub failure_cells: usize,
}

/// Computes the viability structure of `space` under `transitions`.
pub fn compute_viability<F>(
    space: &StateActionSpace,
    transitions: &TransitionMap,
    is_failure_state: F,
) -> ViabilityResult<(ViabilitySets, KernelReport)>
where
    F: Fn(&[f64]) -> bool,
{
    let shape = space.shape();
    if transitions.shape() != shape.as_slice() {
        return Err(ViabilityError::ShapeMismatch {
            field: "Q_map",
            expected: shape,
            got: transitions.shape().to_vec(),
        });
    }
    let n_states = space.n_states();
    let n_actions = space.n_actions();
    let transitions = Array2::from_shape_vec(
        (n_states, n_actions),
        transitions.iter().copied().collect(),
    )?;
    if let Some(&next) = transitions.iter().find(|&&next| next >= n_states) {
        return Err(ViabilityError::InvalidTransition {
            next,
            states: n_states,
        });
    }

    info!(
        states = n_states,
        actions = n_actions,
        "computing viability kernel"
    );

    // The predicate runs once per state rather than once per cell.
    let failing_states: Array1<bool> = space
        .state_space()
        .iter()
        .map(|(_, state)| is_failure_state(&state))
        .collect();
    let failure = transitions.mapv(|next| failing_states[next]);

    let mut viable = failure.mapv(|fails| !fails);
    let mut kernel = any_viable_action(&viable);
    let mut sweeps = 0;
    loop {
        sweeps += 1;
        // Every cell is revisited; demoted cells simply stay demoted.
        Zip::from(&mut viable)
            .and(&transitions)
            .for_each(|is_viable, &next| {
                if *is_viable && !kernel[next] {
                    *is_viable = false;
                }
            });
        let next_kernel = any_viable_action(&viable);
        debug!(
            sweep = sweeps,
            kernel_states = count(&next_kernel),
            "viability sweep"
        );
        if next_kernel == kernel {
            break;
        }
        kernel = next_kernel;
    }

    let unviable = Zip::from(&viable)
        .and(&failure)
        .map_collect(|&is_viable, &fails| !is_viable && !fails);
    let viable = viable.mapv(f64::from);
    let state_measure = viable
        .mean_axis(Axis(1))
        .ok_or(ViabilityError::NoActions)?;
    let measure_value = transitions.mapv(|next| state_measure[next]);

    let report = KernelReport {
        sweeps,
        kernel_states: count(&kernel),
        viable_cells: viable.iter().filter(|&&flag| flag != 0.0).count(),
        failure_cells: count(&failure),
    };
    info!(
        sweeps = report.sweeps,
        kernel_states = report.kernel_states,
        viable_cells = report.viable_cells,
        failure_cells = report.failure_cells,
        "viability kernel converged"
    );

    let state_shape = IxDyn(&space.state_space().shape());
    let sets = ViabilitySets {
        viable_set: viable.into_shape(IxDyn(&shape))?,
        unviable_set: unviable.mapv(f64::from).into_shape(IxDyn(&shape))?,
        failure_set: failure.mapv(f64::from).into_shape(IxDyn(&shape))?,
        state_measure: state_measure.into_shape(state_shape)?,
        measure_value: measure_value.into_shape(IxDyn(&shape))?,
    };
    Ok((sets, report))
}

fn any_viable_action(viable: &Array2<bool>) -> Array1<bool> {
    viable.map_axis(Axis(1), |actions| actions.iter().any(|&flag| flag))
}

fn count<D: ndarray::Dimension>(flags: &ndarray::Array<bool, D>) -> usize {
    flags.iter().filter(|&&flag| flag).count()
}
