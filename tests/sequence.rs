// tests/sequence.rs

use milestone_engine::engine::sequence::{is_dense, move_down, move_up, normalize, reorder};
use milestone_engine::errors::{EngineError, EntityKind};
use milestone_engine::model::{Booking, MilestoneId};
use milestone_engine_test_utils::{BookingBuilder, MilestoneBuilder};

fn booking(ids: &[&str]) -> Booking {
    ids.iter()
        .fold(BookingBuilder::new("b1"), |b, id| b.milestone(MilestoneBuilder::new(id)))
        .build()
}

fn order(b: &Booking) -> Vec<&str> {
    b.ordered_milestones().into_iter().map(|m| m.id.as_str()).collect()
}

fn ids(list: &[&str]) -> Vec<MilestoneId> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn reorder_assigns_target_positions() {
    let mut b = booking(&["A", "B", "C", "D"]);
    let assignment = reorder(&mut b, &ids(&["C", "A", "B", "D"])).unwrap();

    let index = |id: &str| b.milestone(id).unwrap().order_index;
    assert_eq!((index("A"), index("B"), index("C"), index("D")), (1, 2, 0, 3));
    assert_eq!(assignment.len(), 4);
    assert_eq!(assignment[0].milestone_id, "C");
    assert!(is_dense(&b));
}

#[test]
fn unknown_id_is_not_found() {
    let mut b = booking(&["A", "B"]);
    match reorder(&mut b, &ids(&["A", "X"])) {
        Err(EngineError::NotFound { kind, id }) => {
            assert_eq!(kind, EntityKind::Milestone);
            assert_eq!(id, "X");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(order(&b), vec!["A", "B"]);
}

#[test]
fn partial_list_moves_listed_ids_to_the_front() {
    let mut b = booking(&["A", "B", "C", "D"]);
    reorder(&mut b, &ids(&["D", "B"])).unwrap();
    assert_eq!(order(&b), vec!["D", "B", "A", "C"]);
}

#[test]
fn moving_past_the_edges_is_a_no_op() {
    let mut b = booking(&["A", "B"]);
    move_up(&mut b, "A").unwrap();
    move_down(&mut b, "B").unwrap();
    assert_eq!(order(&b), vec!["A", "B"]);
    move_down(&mut b, "A").unwrap();
    assert_eq!(order(&b), vec!["B", "A"]);
    assert!(move_up(&mut b, "Z").is_err());
}

#[test]
fn normalize_repairs_duplicates() {
    let mut b = booking(&["A", "B", "C"]);
    b.milestone_mut("C").unwrap().order_index = 0;
    assert!(!is_dense(&b));
    normalize(&mut b);
    assert!(is_dense(&b));
    assert_eq!(order(&b), vec!["A", "C", "B"]);
}
