// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Ground-truth viability kernels for grid-discretized control problems.
//!
//! Given a state-action grid, a deterministic transition map and a failure
//! predicate, [`SafetyTruth`] holds which cells can keep the system out of
//! failure forever, a continuous safety measure per state and per cell, and
//! offers nearest-cell queries, stratified training-set sampling and
//! persistence. Truths are built through [`SafetyTruthBuilder`], either by
//! computing the kernel or by importing a document produced by an external
//! viability tool; [`SafetyTruth::load`] restores a saved archive.
//!
//! ```no_run
//! use st_space::{ProductSpace, StateActionSpace};
//! use st_viability::{GridEnvironment, SafetyTruth, TrainingRequest};
//!
//! # fn main() -> st_viability::ViabilityResult<()> {
//! let states = ProductSpace::uniform(0.0, 1.0, &[50])?;
//! let actions = ProductSpace::uniform(-0.1, 0.1, &[21])?;
//! let space = StateActionSpace::new(states, actions)?;
//! let env = GridEnvironment::new(space, |s, a| vec![s[0] + a[0] - 0.02], |s| s[0] < 0.1);
//!
//! let truth = SafetyTruth::builder(&env).compute()?;
//! let examples = truth.get_training_examples(&TrainingRequest::default())?;
//! truth.save("truth.bin")?;
//! # let _ = examples;
//! # Ok(())
//! # }
//! ```

mod archive;
mod env;
mod error;
mod external;
mod kernel;
mod sampling;
mod truth;

pub use archive::{load_transition_map, save_transition_map, ArchiveFormat};
pub use env::{DiscreteDynamics, Dynamics, Environment, GridEnvironment, ParameterLookup, TransitionMap};
pub use error::{ViabilityError, ViabilityResult};
pub use kernel::{compute_viability, KernelReport, ViabilitySets};
pub use sampling::{TrainingExamples, TrainingRequest};
pub use truth::{SafetyTruth, SafetyTruthBuilder};

use st_space::StateActionSpace;

/// Reference safety information that learned models are trained and scored against.
pub trait GroundTruth {
    fn stateaction_space(&self) -> &StateActionSpace;

    fn measure(&self, state: &[f64], action: &[f64]) -> ViabilityResult<f64>;

    fn get_training_examples(&self, request: &TrainingRequest) -> ViabilityResult<TrainingExamples>;
}

impl GroundTruth for SafetyTruth {
    fn stateaction_space(&self) -> &StateActionSpace {
        SafetyTruth::stateaction_space(self)
    }

    fn measure(&self, state: &[f64], action: &[f64]) -> ViabilityResult<f64> {
        SafetyTruth::measure(self, state, action)
    }

    fn get_training_examples(&self, request: &TrainingRequest) -> ViabilityResult<TrainingExamples> {
        SafetyTruth::get_training_examples(self, request)
    }
}
