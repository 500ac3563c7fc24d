//! Benchmark support utilities for the planner.
//!
//! Provides deterministic order and courier fleets scattered around
//! hotspots in central Bangalore.

use dispatch_core::{Courier, CourierId, Order, OrderId, Priority, Stop};
use geo::Coord;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seed for deterministic random number generation in benchmarks.
pub const BENCHMARK_SEED: u64 = 42;

/// Number of demand hotspots orders are drawn around.
const HOTSPOT_COUNT: usize = 6;

/// Spread of orders around a hotspot in degrees (roughly 1 km).
const HOTSPOT_SPREAD: f64 = 0.01;

/// South-west corner of the generated area.
const AREA_ORIGIN: Coord<f64> = Coord { x: 77.50, y: 12.90 };

/// Side of the generated area in degrees (roughly 20 km).
const AREA_SIZE: f64 = 0.2;

fn random_point<R: Rng>(rng: &mut R) -> Coord<f64> {
    #[expect(clippy::float_arithmetic, reason = "Required for coordinate offset")]
    let point = Coord {
        x: AREA_ORIGIN.x + rng.gen_range(0.0..AREA_SIZE),
        y: AREA_ORIGIN.y + rng.gen_range(0.0..AREA_SIZE),
    };
    point
}

/// Generate `count` pending orders clustered around a few hotspots.
///
/// Weights fall between half a unit and three units and priorities cycle
/// through the three named tiers.
#[must_use]
pub fn generate_orders(count: usize, seed: u64) -> Vec<Order> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let hotspots: Vec<Coord<f64>> = (0..HOTSPOT_COUNT).map(|_| random_point(&mut rng)).collect();

    (0..count)
        .filter_map(|i| {
            #[expect(
                clippy::integer_division_remainder_used,
                reason = "Modulo for cyclic hotspot assignment is intentional"
            )]
            let centre = hotspots.get(i % HOTSPOT_COUNT).copied()?;

            #[expect(clippy::float_arithmetic, reason = "Required for coordinate offset")]
            let location = Coord {
                x: centre.x + rng.gen_range(-HOTSPOT_SPREAD..HOTSPOT_SPREAD),
                y: centre.y + rng.gen_range(-HOTSPOT_SPREAD..HOTSPOT_SPREAD),
            };

            #[expect(
                clippy::integer_division_remainder_used,
                clippy::as_conversions,
                clippy::cast_possible_truncation,
                reason = "Tier index is always below three"
            )]
            let tier = (i % 3) as u8 + 1;

            #[expect(clippy::as_conversions, reason = "Safe conversion for small indices")]
            let id = (i + 1) as u64;

            let stop = Stop::new(location)
                .ok()?
                .with_weight(rng.gen_range(0.5..3.0))
                .with_priority(Priority::new(tier))
                .for_order(OrderId(id));
            Some(Order::pending(OrderId(id), stop))
        })
        .collect()
}

/// Generate `count` available couriers at random positions.
#[must_use]
pub fn generate_couriers(count: usize, seed: u64) -> Vec<Courier> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .filter_map(|i| {
            #[expect(clippy::as_conversions, reason = "Safe conversion for small indices")]
            let id = (i + 1) as u64;
            Courier::available(CourierId(id), format!("courier-{id}"))
                .at(random_point(&mut rng))
                .ok()
                .map(|courier| courier.with_capacity(rng.gen_range(10.0..40.0)))
        })
        .collect()
}

/// Stops of `orders`, in order.
#[must_use]
pub fn stops_of(orders: &[Order]) -> Vec<Stop> {
    orders.iter().map(Order::to_stop).collect()
}
