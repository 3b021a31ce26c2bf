// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::fs;

use st_space::{ProductSpace, StateActionSpace};
use st_viability::{
    load_transition_map, save_transition_map, ArchiveFormat, Dynamics, Environment,
    GridEnvironment, SafetyTruth, ViabilityError, ViabilitySets,
};
use tempfile::tempdir;

/// Pendulum-like swing on a coarse grid; both ends of the first axis fail.
fn swing(n_angles: usize) -> GridEnvironment {
    let states = ProductSpace::from_bounds(&[-1.0, -0.5], &[1.0, 0.5], &[n_angles, 5]).unwrap();
    let actions = ProductSpace::uniform(-0.3, 0.3, &[4]).unwrap();
    let space = StateActionSpace::new(states, actions).unwrap();
    GridEnvironment::new(
        space,
        |s, a| vec![s[0] + 0.5 * s[1], s[1] + a[0] - 0.2 * s[0]],
        |s| s[0].abs() > 0.9,
    )
}

fn assert_bit_identical(lhs: &ViabilitySets, rhs: &ViabilitySets) {
    let pairs = [
        (&lhs.viable_set, &rhs.viable_set),
        (&lhs.unviable_set, &rhs.unviable_set),
        (&lhs.failure_set, &rhs.failure_set),
        (&lhs.state_measure, &rhs.state_measure),
        (&lhs.measure_value, &rhs.measure_value),
    ];
    for (left, right) in pairs {
        assert_eq!(left.shape(), right.shape());
        for (a, b) in left.iter().zip(right.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}

#[test]
fn bincode_round_trip_is_bit_identical() {
    let env = swing(9);
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("truth.bin");

    truth.save(&path).unwrap();
    assert!(fs::metadata(&path).unwrap().len() > 0);
    let loaded = SafetyTruth::load(&env, &path).unwrap();

    assert_bit_identical(truth.sets(), loaded.sets());
    assert_eq!(loaded.stateaction_space(), env.stateaction_space());
    assert!(loaded.kernel_report().is_none());
}

#[test]
fn json_round_trip_is_bit_identical() {
    let env = swing(9);
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("truth.json");

    truth.save_json(&path).unwrap();
    let loaded = SafetyTruth::load_json(&env, &path).unwrap();
    assert_bit_identical(truth.sets(), loaded.sets());

    let via_format = SafetyTruth::load_as(&env, &path, ArchiveFormat::from_path(&path)).unwrap();
    assert_bit_identical(truth.sets(), via_format.sets());
}

#[test]
fn loading_into_a_different_grid_fails_on_viable_set() {
    let env = swing(9);
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("truth.bin");
    truth.save(&path).unwrap();

    let other = swing(7);
    match SafetyTruth::load(&other, &path) {
        Err(ViabilityError::ShapeMismatch {
            field,
            expected,
            got,
        }) => {
            assert_eq!(field, "viable_set");
            assert_eq!(expected, vec![7, 5, 4]);
            assert_eq!(got, vec![9, 5, 4]);
        }
        other => panic!("unexpected load result: {other:?}"),
    }
}

#[test]
fn missing_archive_is_an_io_error() {
    let env = swing(9);
    let dir = tempdir().unwrap();
    assert!(matches!(
        SafetyTruth::load(&env, dir.path().join("absent.bin")),
        Err(ViabilityError::Io(_))
    ));
}

#[test]
fn json_archive_with_unexpected_field_is_rejected() {
    let env = swing(9);
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("truth.json");
    truth.save_json(&path).unwrap();

    let mut document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    document["q_values"] = serde_json::json!({"shape": [1], "data": [0.0]});
    fs::write(&path, document.to_string()).unwrap();
    assert!(matches!(
        SafetyTruth::load_json(&env, &path),
        Err(ViabilityError::Json(_))
    ));

    let mut document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let fields = document.as_object_mut().unwrap();
    fields.remove("q_values");
    fields.remove("state_measure");
    fs::write(&path, document.to_string()).unwrap();
    assert!(matches!(
        SafetyTruth::load_json(&env, &path),
        Err(ViabilityError::Json(_))
    ));
}

#[test]
fn transition_map_files_feed_the_builder() {
    let env = swing(9);
    let map = env.dynamics().compute_map().unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("q_map.bin");

    save_transition_map(&map, &path).unwrap();
    assert_eq!(load_transition_map(&path).unwrap(), map);

    let from_file = SafetyTruth::builder(&env)
        .compute_from_map_file(&path)
        .unwrap();
    let computed = SafetyTruth::builder(&env).compute().unwrap();
    assert_eq!(from_file, computed);
}

#[test]
fn transition_map_for_another_grid_is_rejected() {
    let other = swing(7);
    let map = other.dynamics().compute_map().unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("q_map.bin");
    save_transition_map(&map, &path).unwrap();

    let env = swing(9);
    assert!(matches!(
        SafetyTruth::builder(&env).compute_from_map_file(&path),
        Err(ViabilityError::ShapeMismatch { field: "Q_map", .. })
    ));
}
