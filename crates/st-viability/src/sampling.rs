// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Stratified draws of labelled state-action cells for training safety models.

use ndarray::{Array1, Array2, ArrayD, Dimension};
use rand::Rng;
use serde::{Deserialize, Serialize};
use st_space::DiscretizableSpace;
use tracing::{debug, warn};

use crate::{SafetyTruth, ViabilityResult};

const SAMPLER_LABEL: &str = "st-viability.sampler";

/// How many examples to draw and from which sets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingRequest {
    pub n_examples: usize,
    pub from_viable: bool,
    pub from_failure: bool,
    /// Share of viable examples when drawing from both sets.
    pub viable_proportion: f64,
    /// Fixed seed for [`SafetyTruth::get_training_examples`]; `None` uses the
    /// process-wide sampler stream.
    pub seed: Option<u64>,
}

impl Default for TrainingRequest {
    fn default() -> Self {
        Self {
            n_examples: 2000,
            from_viable: true,
            from_failure: false,
            viable_proportion: 0.6,
            seed: None,
        }
    }
}

impl TrainingRequest {
    pub fn new(n_examples: usize) -> Self {
        Self {
            n_examples,
            ..Self::default()
        }
    }

    pub fn from_viable(mut self, enabled: bool) -> Self {
        self.from_viable = enabled;
        self
    }

    pub fn from_failure(mut self, enabled: bool) -> Self {
        self.from_failure = enabled;
        self
    }

    pub fn viable_proportion(mut self, proportion: f64) -> Self {
        self.viable_proportion = proportion;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Requested `(viable, failure)` counts before capping by availability.
    pub fn split(&self) -> (usize, usize) {
        let n_viable = match (self.from_viable, self.from_failure) {
            (false, _) => 0,
            (true, false) => self.n_examples,
            (true, true) => {
                let proportion = self.viable_proportion.clamp(0.0, 1.0);
                // The product can round past `n_examples` once it exceeds 2^53.
                ((proportion * self.n_examples as f64).floor() as usize).min(self.n_examples)
            }
        };
        let n_failure = if self.from_failure {
            self.n_examples - n_viable
        } else {
            0
        };
        (n_viable, n_failure)
    }
}

/// Coordinates of the drawn cells and their labels, row-aligned.
///
/// Viable rows come first, labelled with their measure; failure rows follow
/// with label `0.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingExamples {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl TrainingExamples {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

impl SafetyTruth {
    /// Draws examples seeded by `request.seed`, or from the process-wide
    /// sampler stream when no seed is given.
    pub fn get_training_examples(
        &self,
        request: &TrainingRequest,
    ) -> ViabilityResult<TrainingExamples> {
        let mut rng = spiral_config::determinism::rng_from_optional(request.seed, SAMPLER_LABEL);
        self.get_training_examples_with_rng(request, &mut rng)
    }

    /// Draws examples without replacement from `rng`.
    pub fn get_training_examples_with_rng<R: Rng + ?Sized>(
        &self,
        request: &TrainingRequest,
        rng: &mut R,
    ) -> ViabilityResult<TrainingExamples> {
        let (n_viable, n_failure) = request.split();
        let viable = sample_when_true(self.viable_set(), n_viable, rng, "viable");
        let failure = sample_when_true(self.failure_set(), n_failure, rng, "failure");

        let space = self.stateaction_space();
        let dim = space.index_dim();
        let rows = viable.len() + failure.len();
        let mut coordinates = Vec::with_capacity(rows * dim);
        let mut labels = Vec::with_capacity(rows);
        for index in &viable {
            coordinates.extend(space.value_of_index(index)?);
            labels.push(self.measure_value()[index.as_slice()]);
        }
        for index in &failure {
            coordinates.extend(space.value_of_index(index)?);
            labels.push(0.0);
        }
        debug!(
            viable = viable.len(),
            failure = failure.len(),
            "drew training examples"
        );
        Ok(TrainingExamples {
            x: Array2::from_shape_vec((rows, dim), coordinates)?,
            y: Array1::from(labels),
        })
    }
}

fn sample_when_true<R: Rng + ?Sized>(
    set: &ArrayD<f64>,
    requested: usize,
    rng: &mut R,
    name: &str,
) -> Vec<Vec<usize>> {
    if requested == 0 {
        return Vec::new();
    }
    let candidates: Vec<Vec<usize>> = set
        .indexed_iter()
        .filter(|&(_, &flag)| flag != 0.0)
        .map(|(index, _)| index.slice().to_vec())
        .collect();
    let amount = requested.min(candidates.len());
    if amount < requested {
        warn!(
            set = name,
            requested,
            available = candidates.len(),
            "not enough cells to sample from, drawing all of them"
        );
    }
    rand::seq::index::sample(rng, candidates.len(), amount)
        .into_iter()
        .map(|position| candidates[position].clone())
        .collect()
}
