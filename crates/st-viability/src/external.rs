// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Import of ground truths computed by external viability tools.
//!
//! The document lists the grids as explicit per-axis coordinates, the four
//! result arrays (`Q_F`, `Q_V`, `Q_M`, `S_M`) and the dynamics parameters
//! (`p`) it was computed with. `Q_map` and `x0` may be present but are not read.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{ArrayD, Dimension, Zip};
use serde::de::IgnoredAny;
use serde::Deserialize;
use st_space::{DiscretizableSpace, ProductSpace, Segment, SpaceError, StateActionSpace};
use tracing::debug;

use crate::archive::StoredArray;
use crate::env::{Dynamics, Environment};
use crate::kernel::ViabilitySets;
use crate::{SafetyTruth, SafetyTruthBuilder, ViabilityError, ViabilityResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalGrids {
    states: Vec<Vec<f64>>,
    actions: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExternalGroundTruth {
    grids: ExternalGrids,
    #[serde(rename = "Q_map", default)]
    _q_map: Option<IgnoredAny>,
    #[serde(rename = "Q_F")]
    failure: StoredArray<bool>,
    #[serde(rename = "Q_V")]
    viable: StoredArray<bool>,
    #[serde(rename = "Q_M")]
    measure_value: StoredArray<f64>,
    #[serde(rename = "S_M")]
    state_measure: StoredArray<f64>,
    p: BTreeMap<String, f64>,
    #[serde(rename = "x0", default)]
    _x0: Option<IgnoredAny>,
}

impl<E: Environment> SafetyTruthBuilder<'_, E> {
    /// Imports an external ground-truth document and checks it against the environment.
    ///
    /// Grid dimensionality is validated before any array is read into the
    /// truth; the recorded dynamics parameters must equal the environment's.
    pub fn from_external_file<P: AsRef<Path>>(self, path: P) -> ViabilityResult<SafetyTruth> {
        let file = File::open(path.as_ref())?;
        let document: ExternalGroundTruth = serde_json::from_reader(BufReader::new(file))?;
        let truth = self.import_document(document)?;
        truth.log_loaded("external");
        Ok(truth)
    }

    fn import_document(self, document: ExternalGroundTruth) -> ViabilityResult<SafetyTruth> {
        let ExternalGroundTruth {
            grids,
            failure,
            viable,
            measure_value,
            state_measure,
            p,
            ..
        } = document;

        check_dimension("state", self.env.state_space().index_dim(), grids.states.len())?;
        check_dimension("action", self.env.action_space().index_dim(), grids.actions.len())?;

        let space = StateActionSpace::new(
            product_from_axes(&grids.states)?,
            product_from_axes(&grids.actions)?,
        )?;
        let shape = space.shape();
        let state_shape = space.state_space().shape();

        let failure = failure.into_array("Q_F", &shape)?;
        let viable = viable.into_array("Q_V", &shape)?;
        let measure_value = measure_value.into_array("Q_M", &shape)?;
        let state_measure = state_measure.into_array("S_M", &state_shape)?;
        check_disjoint(&failure, &viable)?;

        check_parameters(self.env, &p)?;

        let unviable = Zip::from(&failure)
            .and(&viable)
            .map_collect(|&fails, &is_viable| !fails && !is_viable);
        let sets = ViabilitySets {
            viable_set: viable.mapv(f64::from),
            unviable_set: unviable.mapv(f64::from),
            failure_set: failure.mapv(f64::from),
            state_measure,
            measure_value,
        };
        Ok(SafetyTruth::from_parts(space, sets))
    }
}

fn check_dimension(space: &'static str, expected: usize, got: usize) -> ViabilityResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(ViabilityError::DimensionMismatch {
            space,
            expected,
            got,
        })
    }
}

/// A cell cannot be failing and viable at once; the first offending cell is reported.
fn check_disjoint(failure: &ArrayD<bool>, viable: &ArrayD<bool>) -> ViabilityResult<()> {
    let overlap = failure
        .indexed_iter()
        .zip(viable.iter())
        .find(|((_, &fails), &is_viable)| fails && is_viable);
    match overlap {
        Some(((cell, _), _)) => Err(ViabilityError::OverlappingSets {
            cell: cell.slice().to_vec(),
        }),
        None => Ok(()),
    }
}

/// One segment per axis: first and last coordinate as bounds, length as point count.
fn product_from_axes(axes: &[Vec<f64>]) -> ViabilityResult<ProductSpace> {
    let segments = axes
        .iter()
        .map(|axis| match (axis.first(), axis.last()) {
            (Some(&low), Some(&high)) => Segment::new(low, high, axis.len()),
            _ => Err(SpaceError::NoPoints),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ProductSpace::new(segments)?)
}

fn check_parameters<E: Environment>(env: &E, recorded: &BTreeMap<String, f64>) -> ViabilityResult<()> {
    let lookup = env.parameter_lookup();
    let parameters = env.dynamics().parameters();
    for (external_name, &got) in recorded {
        let name = match lookup.get(external_name) {
            None => return Err(ViabilityError::UnknownParameter(external_name.clone())),
            Some(None) => {
                debug!(parameter = %external_name, "skipping untracked external parameter");
                continue;
            }
            Some(Some(name)) => name,
        };
        let expected = *parameters
            .get(name)
            .ok_or_else(|| ViabilityError::MissingParameter(name.clone()))?;
        if expected != got {
            return Err(ViabilityError::ParameterMismatch {
                name: name.clone(),
                external_name: external_name.clone(),
                expected,
                got,
            });
        }
    }
    Ok(())
}
