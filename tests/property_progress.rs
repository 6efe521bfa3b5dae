// tests/property_progress.rs

use milestone_engine::model::Task;
use milestone_engine::progress::compute_progress;
use milestone_engine::types::Status;
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Pending),
        Just(Status::InProgress),
        Just(Status::Completed),
        Just(Status::Cancelled),
        Just(Status::OnHold),
    ]
}

fn weight_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => 0.01f64..100.0,
        1 => Just(1.0),
        1 => Just(0.0),
        1 => -10.0f64..0.0,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
    ]
}

fn tasks(weights: Vec<f64>, statuses: Vec<Status>) -> Vec<Task> {
    weights
        .into_iter()
        .zip(statuses)
        .enumerate()
        .map(|(i, (weight, status))| {
            let mut t = Task::new(format!("t{i}"), "m1", format!("task {i}"));
            t.weight = weight;
            t.status = status;
            t
        })
        .collect()
}

proptest! {
    #[test]
    fn progress_is_always_a_percentage(
        pairs in proptest::collection::vec((weight_strategy(), status_strategy()), 0..20)
    ) {
        let (weights, statuses): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let progress = compute_progress(&tasks(weights, statuses));
        prop_assert!(progress <= 100);
    }

    #[test]
    fn all_completed_is_always_one_hundred(
        weights in proptest::collection::vec(weight_strategy(), 1..20)
    ) {
        let statuses = vec![Status::Completed; weights.len()];
        prop_assert_eq!(compute_progress(&tasks(weights, statuses)), 100);
    }

    #[test]
    fn nothing_completed_is_zero(
        pairs in proptest::collection::vec(
            (weight_strategy(), prop_oneof![Just(Status::Pending), Just(Status::InProgress)]),
            1..20,
        )
    ) {
        let (weights, statuses): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        prop_assert_eq!(compute_progress(&tasks(weights, statuses)), 0);
    }
}
