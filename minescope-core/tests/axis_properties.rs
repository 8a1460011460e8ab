use minescope_core::{compute_axis_positions, find_closest_axis_index, AxisExtent};
use proptest::prelude::*;

fn maybe(range: std::ops::Range<f64>) -> impl Strategy<Value = Option<f64>> {
    prop_oneof![Just(None), range.prop_map(Some)]
}

proptest! {
    #[test]
    fn axis_has_count_finite_positions(
        count in 0usize..64,
        min in maybe(-1.0e6..1.0e6),
        max in maybe(-1.0e6..1.0e6),
        resolution in maybe(-500.0..500.0),
        provided in proptest::collection::vec(maybe(-1.0e6..1.0e6), 0..64),
    ) {
        let extent = AxisExtent::new(min, max, resolution);
        let positions = compute_axis_positions(Some(provided.as_slice()), count, &extent);
        prop_assert_eq!(positions.len(), count);
        prop_assert!(positions.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn complete_axis_is_returned_unchanged(
        values in proptest::collection::vec(-1.0e6..1.0e6f64, 1..64),
        resolution in maybe(0.1..500.0),
    ) {
        let provided: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let extent = AxisExtent::new(Some(0.0), Some(1.0), resolution);
        let positions = compute_axis_positions(Some(provided.as_slice()), values.len(), &extent);
        prop_assert_eq!(positions, values);
    }

    #[test]
    fn closest_index_minimizes_distance(
        axis in proptest::collection::vec(-1.0e4..1.0e4f64, 1..40),
        value in -2.0e4..2.0e4f64,
    ) {
        let index = find_closest_axis_index(Some(value), &axis);
        prop_assert!(index.is_some());
        let best = (axis[index.unwrap_or_default()] - value).abs();
        prop_assert!(axis.iter().all(|p| (p - value).abs() >= best));
    }
}

#[test]
fn closest_index_example() {
    assert_eq!(find_closest_axis_index(Some(12.0), &[0.0, 10.0, 20.0]), Some(1));
    assert_eq!(find_closest_axis_index(None, &[0.0, 10.0]), None);
    assert_eq!(find_closest_axis_index(Some(1.0), &[]), None);
}
