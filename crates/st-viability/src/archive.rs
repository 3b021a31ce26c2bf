// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use st_space::DiscretizableSpace;
use tracing::info;

use crate::env::Environment;
use crate::kernel::ViabilitySets;
use crate::{SafetyTruth, SafetyTruthBuilder, TransitionMap, ViabilityError, ViabilityResult};

/// Dense array flattened in row-major order next to its shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StoredArray<T> {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<T>,
}

impl<T: Clone> StoredArray<T> {
    pub(crate) fn from_array(array: &ArrayD<T>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().cloned().collect(),
        }
    }

    /// Rebuilds the array, rejecting it when its shape is not `expected`.
    pub(crate) fn into_array(self, field: &'static str, expected: &[usize]) -> ViabilityResult<ArrayD<T>> {
        if self.shape != expected {
            return Err(ViabilityError::ShapeMismatch {
                field,
                expected: expected.to_vec(),
                got: self.shape,
            });
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), self.data)?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ViabilityArchive {
    viable_set: StoredArray<f64>,
    unviable_set: StoredArray<f64>,
    failure_set: StoredArray<f64>,
    state_measure: StoredArray<f64>,
    measure_value: StoredArray<f64>,
}

impl ViabilityArchive {
    fn from_sets(sets: &ViabilitySets) -> Self {
        Self {
            viable_set: StoredArray::from_array(&sets.viable_set),
            unviable_set: StoredArray::from_array(&sets.unviable_set),
            failure_set: StoredArray::from_array(&sets.failure_set),
            state_measure: StoredArray::from_array(&sets.state_measure),
            measure_value: StoredArray::from_array(&sets.measure_value),
        }
    }

    /// `viable_set` is checked first so a wrong grid reports on it.
    fn into_sets(self, shape: &[usize], state_shape: &[usize]) -> ViabilityResult<ViabilitySets> {
        Ok(ViabilitySets {
            viable_set: self.viable_set.into_array("viable_set", shape)?,
            unviable_set: self.unviable_set.into_array("unviable_set", shape)?,
            failure_set: self.failure_set.into_array("failure_set", shape)?,
            state_measure: self.state_measure.into_array("state_measure", state_shape)?,
            measure_value: self.measure_value.into_array("measure_value", shape)?,
        })
    }
}

/// Encoding of a ground-truth archive on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Bincode,
    Json,
}

impl ArchiveFormat {
    /// Guesses the format from a file extension; anything but `.json` is bincode.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Bincode,
        }
    }

    fn write<T: Serialize, P: AsRef<Path>>(self, value: &T, path: P) -> ViabilityResult<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        match self {
            Self::Bincode => bincode::serialize_into(&mut writer, value)?,
            Self::Json => serde_json::to_writer(&mut writer, value)?,
        }
        writer.flush()?;
        Ok(())
    }

    fn read<T: DeserializeOwned, P: AsRef<Path>>(self, path: P) -> ViabilityResult<T> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        Ok(match self {
            Self::Bincode => bincode::deserialize_from(reader)?,
            Self::Json => serde_json::from_reader(reader)?,
        })
    }
}

impl SafetyTruth {
    /// Writes the five arrays to a bincode archive.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ViabilityResult<()> {
        self.save_as(path, ArchiveFormat::Bincode)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ViabilityResult<()> {
        self.save_as(path, ArchiveFormat::Json)
    }

    pub fn save_as<P: AsRef<Path>>(&self, path: P, format: ArchiveFormat) -> ViabilityResult<()> {
        format.write(&ViabilityArchive::from_sets(self.sets()), path.as_ref())?;
        info!(path = %path.as_ref().display(), ?format, "ground truth saved");
        Ok(())
    }

    /// Reads a bincode archive; the grid comes from `env`, not from the file.
    pub fn load<E: Environment, P: AsRef<Path>>(env: &E, path: P) -> ViabilityResult<Self> {
        Self::load_as(env, path, ArchiveFormat::Bincode)
    }

    pub fn load_json<E: Environment, P: AsRef<Path>>(env: &E, path: P) -> ViabilityResult<Self> {
        Self::load_as(env, path, ArchiveFormat::Json)
    }

    pub fn load_as<E: Environment, P: AsRef<Path>>(
        env: &E,
        path: P,
        format: ArchiveFormat,
    ) -> ViabilityResult<Self> {
        let space = env.stateaction_space().clone();
        let archive: ViabilityArchive = format.read(path.as_ref())?;
        let sets = archive.into_sets(&space.shape(), &space.state_space().shape())?;
        let truth = Self::from_parts(space, sets);
        truth.log_loaded("archive");
        Ok(truth)
    }
}

impl<E: Environment> SafetyTruthBuilder<'_, E> {
    /// Computes the kernel from a transition map stored with [`save_transition_map`].
    pub fn compute_from_map_file<P: AsRef<Path>>(self, path: P) -> ViabilityResult<SafetyTruth> {
        let map = load_transition_map(path)?;
        let expected = self.env.stateaction_space().shape();
        if map.shape() != expected.as_slice() {
            return Err(ViabilityError::ShapeMismatch {
                field: "Q_map",
                expected,
                got: map.shape().to_vec(),
            });
        }
        self.compute_with_map(&map)
    }
}

/// Persists a transition map in the bincode array layout.
pub fn save_transition_map<P: AsRef<Path>>(map: &TransitionMap, path: P) -> ViabilityResult<()> {
    ArchiveFormat::Bincode.write(&StoredArray::from_array(map), path)
}

pub fn load_transition_map<P: AsRef<Path>>(path: P) -> ViabilityResult<TransitionMap> {
    let stored: StoredArray<usize> = ArchiveFormat::Bincode.read(path)?;
    let shape = stored.shape.clone();
    stored.into_array("Q_map", &shape)
}
