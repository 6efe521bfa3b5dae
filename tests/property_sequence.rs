// tests/property_sequence.rs

use milestone_engine::engine::sequence::reorder;
use milestone_engine::model::MilestoneId;
use milestone_engine_test_utils::{BookingBuilder, MilestoneBuilder};
use proptest::prelude::*;

proptest! {
    #[test]
    fn reorder_always_yields_a_permutation(
        (n, target) in (1usize..12).prop_flat_map(|n| {
            (Just(n), Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        }),
        keep in 0usize..12,
    ) {
        let mut builder = BookingBuilder::new("b1");
        for i in 0..n {
            builder = builder.milestone(MilestoneBuilder::new(&format!("m{i}")));
        }
        let mut booking = builder.build();

        // Any prefix of a shuffled order is a valid (possibly partial) request.
        let requested: Vec<MilestoneId> = target
            .iter()
            .take(keep.min(n))
            .map(|i| format!("m{i}"))
            .collect();
        reorder(&mut booking, &requested).unwrap();

        let mut indices: Vec<usize> = booking.milestones.iter().map(|m| m.order_index).collect();
        indices.sort_unstable();
        prop_assert_eq!(indices, (0..n).collect::<Vec<_>>());

        for (position, id) in requested.iter().enumerate() {
            prop_assert_eq!(booking.milestone(id).unwrap().order_index, position);
        }
    }
}
