//! Proptest strategies for planner property-based tests.
//!
//! Generated stops and orders sit inside a small box around central
//! Bangalore so that distances stay realistic for a courier fleet.

use std::collections::HashSet;

use dispatch_core::{Order, OrderId, OrderStatus, Priority, Stop};
use geo::Coord;
use proptest::prelude::*;

/// Strategy for a single stop with random location, weight and priority.
pub fn stop_strategy() -> impl Strategy<Value = Stop> {
    (12.90_f64..13.10, 77.50_f64..77.70, 0.5_f64..4.0, 1_u8..=3).prop_map(
        |(lat, lng, weight, tier)| {
            Stop::new(Coord { x: lng, y: lat })
                .expect("generated coordinates are valid")
                .with_weight(weight)
                .with_priority(Priority::new(tier))
        },
    )
}

/// Strategy for `min_count..=max_count` stops, each tagged with a unique
/// order id equal to its input position.
pub fn tagged_stop_set_strategy(
    min_count: usize,
    max_count: usize,
) -> impl Strategy<Value = Vec<Stop>> {
    proptest::collection::vec(stop_strategy(), min_count..=max_count).prop_map(|stops| {
        stops
            .into_iter()
            .enumerate()
            .map(|(idx, stop)| stop.for_order(OrderId(idx as u64)))
            .collect()
    })
}

/// Strategy for pending orders with unique ids.
pub fn pending_order_set_strategy(
    min_count: usize,
    max_count: usize,
) -> impl Strategy<Value = Vec<Order>> {
    proptest::collection::vec(stop_strategy(), min_count..=max_count).prop_map(|stops| {
        stops
            .into_iter()
            .enumerate()
            .map(|(idx, stop)| Order::pending(OrderId(idx as u64 + 1), stop))
            .collect()
    })
}

/// Strategy for a non-pending status.
pub fn settled_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Assigned),
        Just(OrderStatus::InTransit),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

/// Order ids carried by `stops`, sorted.
pub fn sorted_ids(stops: &[Stop]) -> Vec<OrderId> {
    let mut ids: Vec<_> = stops.iter().filter_map(Stop::order_id).collect();
    ids.sort_unstable();
    ids
}

/// Assert that no order id appears twice.
///
/// # Errors
///
/// Returns a test-case error naming the ids when a duplicate is found.
pub fn assert_unique_ids(ids: &[OrderId]) -> Result<(), proptest::test_runner::TestCaseError> {
    let unique: HashSet<_> = ids.iter().copied().collect();
    proptest::prop_assert_eq!(ids.len(), unique.len(), "duplicate ids: {:?}", ids);
    Ok(())
}
