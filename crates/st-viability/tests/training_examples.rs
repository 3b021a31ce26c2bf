// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use st_space::{DiscretizableSpace, ProductSpace, StateActionSpace};
use st_viability::{GridEnvironment, GroundTruth, SafetyTruth, TrainingRequest};

/// 50 x 50 grid. Action `a` moves the state by `a - 25`; states below `edge` fail.
///
/// Every safe state can hold its position with `a = 25`, so each cell either
/// fails immediately or is viable. With the edge at 19.5, 1035 cells fail and
/// 1465 are viable; with the edge at 2.5, 406 fail and 2094 are viable.
fn cliff_at(edge: f64) -> GridEnvironment {
    let states = ProductSpace::uniform(0.0, 49.0, &[50]).unwrap();
    let actions = ProductSpace::uniform(0.0, 49.0, &[50]).unwrap();
    let space = StateActionSpace::new(states, actions).unwrap();
    GridEnvironment::new(space, |s, a| vec![s[0] + a[0] - 25.0], move |s| s[0] < edge)
}

fn cliff() -> GridEnvironment {
    cliff_at(19.5)
}

fn count_ones(values: &ndarray::ArrayD<f64>) -> usize {
    values.iter().filter(|&&flag| flag == 1.0).count()
}

#[test]
fn cliff_has_enough_cells_of_each_kind() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    assert_eq!(count_ones(truth.failure_set()), 1035);
    assert_eq!(count_ones(truth.viable_set()), 1465);
    assert_eq!(count_ones(truth.unviable_set()), 0);
}

#[test]
fn viable_only_request_draws_viable_cells() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let request = TrainingRequest::new(1000);
    let examples = truth
        .get_training_examples_with_rng(&request, &mut rng)
        .unwrap();

    assert_eq!(examples.x.dim(), (1000, 2));
    assert_eq!(examples.y.len(), 1000);
    let mut seen = HashSet::new();
    for (row, &label) in examples.x.outer_iter().zip(examples.y.iter()) {
        let cell = row.to_vec();
        assert!(truth.is_viable_stateaction(&cell).unwrap());
        assert_eq!(label, truth.measure(&cell[..1], &cell[1..]).unwrap());
        assert!(seen.insert(cell.iter().map(|v| v.round() as i64).collect::<Vec<_>>()));
    }
}

#[test]
fn default_request_returns_two_thousand_viable_rows() {
    let env = cliff_at(2.5);
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    assert_eq!(count_ones(truth.viable_set()), 2094);
    let examples = truth
        .get_training_examples(&TrainingRequest::default())
        .unwrap();
    assert_eq!(examples.x.nrows(), 2000);
    assert!(examples.y.iter().all(|&label| label > 0.0));
    for row in examples.x.outer_iter() {
        assert!(truth.is_viable_stateaction(&row.to_vec()).unwrap());
    }
}

#[test]
fn viable_draws_are_capped_by_availability() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let examples = truth
        .get_training_examples_with_rng(&TrainingRequest::default(), &mut rng)
        .unwrap();
    assert_eq!(examples.len(), 1465);
}

#[test]
fn mixed_request_puts_viable_rows_first() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let request = TrainingRequest::new(2000).from_failure(true);
    let mut rng = StdRng::seed_from_u64(11);
    let examples = truth
        .get_training_examples_with_rng(&request, &mut rng)
        .unwrap();

    assert_eq!(examples.x.nrows(), 2000);
    assert!(examples.y.slice(ndarray::s![..1200]).iter().all(|&y| y > 0.0));
    assert!(examples.y.slice(ndarray::s![1200..]).iter().all(|&y| y == 0.0));
    for row in examples.x.slice(ndarray::s![1200.., ..]).outer_iter() {
        let cell = row.to_vec();
        assert!(truth.is_failure(&cell[..1], &cell[1..]).unwrap());
    }
}

#[test]
fn failure_draws_are_capped_by_availability() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let request = TrainingRequest::new(1500)
        .from_viable(false)
        .from_failure(true);
    let mut rng = StdRng::seed_from_u64(3);
    let examples = truth
        .get_training_examples_with_rng(&request, &mut rng)
        .unwrap();
    assert_eq!(examples.len(), 1035);
    assert!(examples.y.iter().all(|&y| y == 0.0));
}

#[test]
fn seeded_draws_repeat() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let request = TrainingRequest::new(300).from_failure(true);
    let first = truth
        .get_training_examples_with_rng(&request, &mut StdRng::seed_from_u64(5))
        .unwrap();
    let second = truth
        .get_training_examples_with_rng(&request, &mut StdRng::seed_from_u64(5))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn ground_truth_trait_exposes_the_same_queries() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let dynamic: &dyn GroundTruth = &truth;
    assert_eq!(dynamic.stateaction_space().shape(), vec![50, 50]);
    assert_eq!(
        dynamic.measure(&[30.0], &[25.0]).unwrap(),
        truth.measure(&[30.0], &[25.0]).unwrap()
    );
    let examples = dynamic
        .get_training_examples(&TrainingRequest::new(10))
        .unwrap();
    assert_eq!(examples.len(), 10);
}

#[test]
fn request_seed_fixes_the_draw() {
    let env = cliff();
    let truth = SafetyTruth::builder(&env).compute().unwrap();
    let request = TrainingRequest::new(200).from_failure(true).seed(42);
    let first = truth.get_training_examples(&request).unwrap();
    let second = truth.get_training_examples(&request).unwrap();
    assert_eq!(first, second);

    let expected = truth
        .get_training_examples_with_rng(&request, &mut StdRng::seed_from_u64(42))
        .unwrap();
    assert_eq!(first, expected);
}
