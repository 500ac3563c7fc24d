//! Capacity-aware, priority-tiered nearest-neighbour sequencing.
//!
//! The heuristic is a greedy O(n²) construction, not an optimal tour. It
//! guarantees two things: the aggregate weight of the sequenced stops never
//! exceeds the courier's capacity, and priority tiers are visited as
//! contiguous blocks in descending order.

use chrono::{DateTime, TimeDelta, Utc};
use dispatch_core::geodesy::{self, GeoError};
use dispatch_core::{OrderId, Priority, Stop, TimeWindow};
use geo::Coord;
use thiserror::Error;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Errors raised by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SequenceError {
    /// The start or a stop carried an invalid coordinate.
    #[error(transparent)]
    Geo(#[from] GeoError),
    /// Capacity was negative, NaN or infinite.
    #[error("capacity must be a finite, non-negative weight, got {capacity}")]
    InvalidCapacity {
        /// Capacity supplied.
        capacity: f64,
    },
    /// Average speed was not a finite positive number.
    #[error("average speed must be a finite, positive km/h value, got {speed_kmh}")]
    InvalidSpeed {
        /// Speed supplied.
        speed_kmh: f64,
    },
}

/// Output of [`sequence`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceResult {
    /// Feasible stops in visiting order.
    pub ordered_stops: Vec<Stop>,
    /// Stops left out by capacity filtering, in input order.
    pub excluded: Vec<Stop>,
}

/// Order `stops` for a courier at `start` carrying at most `capacity`.
///
/// 1. When the total weight exceeds `capacity`, stops are considered in
///    descending priority (stable on input order) and accepted while they
///    still fit; the rest are reported in `excluded`.
/// 2. The accepted stops are visited tier by tier, highest priority first,
///    always moving to the nearest unvisited stop of the current tier. Ties
///    go to the stop that came first in the input.
///
/// Zero or one stop is returned unchanged with no exclusions.
///
/// # Errors
/// [`SequenceError::Geo`] when `start` or any stop is invalid, and
/// [`SequenceError::InvalidCapacity`] for a negative or non-finite capacity.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_core::{Priority, Stop};
/// use dispatch_planner::sequence;
///
/// let start = Coord { x: 77.59, y: 12.97 };
/// let near = Stop::new(Coord { x: 77.610, y: 12.972 })?.with_weight(2.5);
/// let urgent = Stop::new(Coord { x: 77.619, y: 12.981 })?
///     .with_weight(1.5)
///     .with_priority(Priority::new(2));
/// let result = sequence(start, &[near.clone(), urgent.clone()], 10.0)?;
/// assert_eq!(result.ordered_stops, vec![urgent, near]);
/// assert!(result.excluded.is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn sequence(
    start: Coord<f64>,
    stops: &[Stop],
    capacity: f64,
) -> Result<SequenceResult, SequenceError> {
    if !capacity.is_finite() || capacity.is_sign_negative() {
        return Err(SequenceError::InvalidCapacity { capacity });
    }
    geodesy::validate(start)?;
    for stop in stops {
        geodesy::validate(stop.location())?;
    }
    if stops.len() <= 1 {
        return Ok(SequenceResult {
            ordered_stops: stops.to_vec(),
            excluded: Vec::new(),
        });
    }

    let (accepted, excluded) = filter_by_capacity(stops, capacity);
    if !excluded.is_empty() {
        log::debug!(
            "capacity {capacity} excludes {} of {} stops",
            excluded.len(),
            stops.len()
        );
    }

    let mut tiers: Vec<Priority> = accepted.iter().map(Stop::priority).collect();
    tiers.sort_unstable_by(|a, b| b.cmp(a));
    tiers.dedup();

    let mut ordered_stops = Vec::with_capacity(accepted.len());
    let mut current = start;
    for tier in tiers {
        let members: Vec<Stop> = accepted
            .iter()
            .filter(|stop| stop.priority() == tier)
            .cloned()
            .collect();
        let visited = nearest_neighbour(current, members, Stop::location);
        if let Some(last) = visited.last() {
            current = last.location();
        }
        ordered_stops.extend(visited);
    }

    Ok(SequenceResult {
        ordered_stops,
        excluded,
    })
}

/// Plain nearest-neighbour ordering of raw coordinates.
///
/// Used when no weight, priority or window metadata is available. The
/// returned path starts at `start`. Inputs of at most one point are returned
/// as given.
///
/// # Errors
/// [`GeoError::InvalidCoordinate`] when any coordinate is invalid.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_planner::sequence_points;
///
/// let start = Coord { x: 0.0, y: 0.0 };
/// let far = Coord { x: 0.0, y: 2.0 };
/// let near = Coord { x: 0.0, y: 1.0 };
/// assert_eq!(sequence_points(start, &[far, near])?, vec![start, near, far]);
/// # Ok::<(), dispatch_core::GeoError>(())
/// ```
pub fn sequence_points(start: Coord<f64>, points: &[Coord<f64>]) -> Result<Vec<Coord<f64>>, GeoError> {
    geodesy::validate(start)?;
    for point in points {
        geodesy::validate(*point)?;
    }
    let mut path = Vec::with_capacity(points.len() + 1);
    path.push(start);
    if points.len() <= 1 {
        path.extend_from_slice(points);
    } else {
        path.extend(nearest_neighbour(start, points.to_vec(), |point| *point));
    }
    Ok(path)
}

/// Estimated arrival at each stop of `ordered`, travelling in straight lines
/// from `start` at `average_speed_kmh`.
///
/// # Errors
/// [`SequenceError::InvalidSpeed`] for a non-positive or non-finite speed and
/// [`SequenceError::Geo`] for invalid coordinates.
pub fn estimate_arrivals(
    start_time: DateTime<Utc>,
    average_speed_kmh: f64,
    start: Coord<f64>,
    ordered: &[Stop],
) -> Result<Vec<DateTime<Utc>>, SequenceError> {
    if !average_speed_kmh.is_finite() || average_speed_kmh <= 0.0 {
        return Err(SequenceError::InvalidSpeed {
            speed_kmh: average_speed_kmh,
        });
    }
    let mut arrivals = Vec::with_capacity(ordered.len());
    let mut clock = start_time;
    let mut position = start;
    for stop in ordered {
        let km = geodesy::distance_km(position, stop.location())?;
        clock = clock
            .checked_add_signed(travel_time(km, average_speed_kmh))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        position = stop.location();
        arrivals.push(clock);
    }
    Ok(arrivals)
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "travel time is derived from floating-point distance and speed"
)]
fn travel_time(km: f64, speed_kmh: f64) -> TimeDelta {
    let millis = (km / speed_kmh * MILLIS_PER_HOUR).round();
    TimeDelta::try_milliseconds(millis as i64).unwrap_or(TimeDelta::MAX)
}

/// A stop whose estimated arrival misses its delivery window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowViolation {
    /// Position of the stop in the sequence.
    pub position: usize,
    /// Order the stop belongs to, if known.
    pub order_id: Option<OrderId>,
    /// Estimated arrival.
    pub arrival: DateTime<Utc>,
    /// Window that was missed.
    pub window: TimeWindow,
}

/// Stops of `ordered` whose straight-line arrival estimate falls outside
/// their time window.
///
/// Stops without a window never violate. The sequence itself is not
/// changed.
///
/// # Errors
/// As for [`estimate_arrivals`].
pub fn window_violations(
    start_time: DateTime<Utc>,
    average_speed_kmh: f64,
    start: Coord<f64>,
    ordered: &[Stop],
) -> Result<Vec<WindowViolation>, SequenceError> {
    let arrivals = estimate_arrivals(start_time, average_speed_kmh, start, ordered)?;
    Ok(ordered
        .iter()
        .zip(arrivals)
        .enumerate()
        .filter_map(|(position, (stop, arrival))| {
            let window = stop.time_window()?;
            (!window.contains(arrival)).then(|| WindowViolation {
                position,
                order_id: stop.order_id(),
                arrival,
                window: *window,
            })
        })
        .collect())
}

/// Split `stops` into those accepted under `capacity` and those excluded.
/// Both halves keep input order.
#[expect(
    clippy::float_arithmetic,
    reason = "capacity filtering accumulates floating-point weights"
)]
fn filter_by_capacity(stops: &[Stop], capacity: f64) -> (Vec<Stop>, Vec<Stop>) {
    let total: f64 = stops.iter().map(Stop::weight).sum();
    if total <= capacity {
        return (stops.to_vec(), Vec::new());
    }

    let mut by_priority: Vec<(usize, &Stop)> = stops.iter().enumerate().collect();
    by_priority.sort_by(|(_, a), (_, b)| b.priority().cmp(&a.priority()));

    let mut keep = vec![false; stops.len()];
    let mut load = 0.0;
    for (idx, stop) in by_priority {
        if load + stop.weight() <= capacity {
            load += stop.weight();
            if let Some(flag) = keep.get_mut(idx) {
                *flag = true;
            }
        }
    }

    let (accepted, excluded): (Vec<_>, Vec<_>) = stops
        .iter()
        .zip(keep)
        .partition(|(_, kept)| *kept);
    (
        accepted.into_iter().map(|(stop, _)| stop.clone()).collect(),
        excluded.into_iter().map(|(stop, _)| stop.clone()).collect(),
    )
}

/// Greedy nearest-neighbour walk from `start` over `items`.
///
/// Ties go to the item earliest in `items`.
fn nearest_neighbour<T>(
    start: Coord<f64>,
    mut items: Vec<T>,
    location: impl Fn(&T) -> Coord<f64>,
) -> Vec<T> {
    let mut visited = Vec::with_capacity(items.len());
    let mut current = start;
    while let Some(idx) = nearest_index(current, &items, &location) {
        let item = items.remove(idx);
        current = location(&item);
        visited.push(item);
    }
    visited
}

fn nearest_index<T>(
    from: Coord<f64>,
    items: &[T],
    location: &impl Fn(&T) -> Coord<f64>,
) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let km = geodesy::distance_km(from, location(item)).unwrap_or(f64::INFINITY);
            (idx, km)
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    fn stop(lat: f64, lng: f64) -> Stop {
        Stop::new(Coord { x: lng, y: lat }).expect("valid stop")
    }

    #[fixture]
    fn start() -> Coord<f64> {
        Coord { x: 77.59, y: 12.97 }
    }

    #[rstest]
    fn higher_tier_is_visited_first(start: Coord<f64>) {
        let near = stop(12.972, 77.610).with_weight(2.5).with_priority(Priority::new(1));
        let far = stop(12.981, 77.619).with_weight(1.5).with_priority(Priority::new(2));
        let result = sequence(start, &[near.clone(), far.clone()], 10.0).expect("sequence");
        assert_eq!(result.ordered_stops, vec![far, near]);
    }

    #[rstest]
    fn within_a_tier_nearest_comes_first(start: Coord<f64>) {
        let far = stop(13.10, 77.59);
        let near = stop(12.98, 77.59);
        let mid = stop(13.00, 77.59);
        let result = sequence(start, &[far.clone(), near.clone(), mid.clone()], 10.0)
            .expect("sequence");
        assert_eq!(result.ordered_stops, vec![near, mid, far]);
    }

    #[rstest]
    fn capacity_filter_prefers_priority_and_skips_non_fitting(start: Coord<f64>) {
        let heavy = stop(12.98, 77.60).with_weight(6.0);
        let urgent = stop(12.99, 77.60).with_weight(5.0).with_priority(Priority::new(3));
        let light = stop(13.00, 77.60).with_weight(4.0);
        let result = sequence(start, &[heavy.clone(), urgent.clone(), light.clone()], 10.0)
            .expect("sequence");
        assert_eq!(result.ordered_stops, vec![urgent, light]);
        assert_eq!(result.excluded, vec![heavy]);
    }

    #[rstest]
    fn single_stop_is_returned_even_when_overweight(start: Coord<f64>) {
        let heavy = stop(12.98, 77.60).with_weight(50.0);
        let result = sequence(start, std::slice::from_ref(&heavy), 10.0).expect("sequence");
        assert_eq!(result.ordered_stops, vec![heavy]);
        assert!(result.excluded.is_empty());
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_invalid_capacity(start: Coord<f64>, #[case] capacity: f64) {
        assert!(matches!(
            sequence(start, &[], capacity),
            Err(SequenceError::InvalidCapacity { .. })
        ));
    }

    #[rstest]
    fn rejects_invalid_start() {
        let result = sequence(Coord { x: f64::NAN, y: 0.0 }, &[], 10.0);
        assert!(matches!(result, Err(SequenceError::Geo(_))));
    }

    #[rstest]
    fn equidistant_tie_goes_to_first_input() {
        let origin = Coord { x: 0.0, y: 0.0 };
        let east = stop(0.0, 0.01);
        let west = stop(0.0, -0.01);
        let result = sequence(origin, &[west.clone(), east.clone()], 10.0).expect("sequence");
        assert_eq!(result.ordered_stops.first(), Some(&west));
    }

    #[rstest]
    fn legacy_two_point_input_is_unchanged(start: Coord<f64>) {
        let only = Coord { x: 77.7, y: 13.1 };
        assert_eq!(sequence_points(start, &[only]).expect("path"), vec![start, only]);
    }

    #[rstest]
    fn late_stops_are_reported(start: Coord<f64>) {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().expect("valid time");
        let tight = TimeWindow::new(t0, t0 + TimeDelta::minutes(1)).expect("window");
        let loose = TimeWindow::new(t0, t0 + TimeDelta::hours(4)).expect("window");
        let first = stop(13.07, 77.59).with_time_window(loose).for_order(OrderId(1));
        let second = stop(13.17, 77.59).with_time_window(tight).for_order(OrderId(2));
        let violations =
            window_violations(t0, 25.0, start, &[first, second]).expect("violations");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].order_id, Some(OrderId(2)));
        assert_eq!(violations[0].position, 1);
    }

    #[rstest]
    fn arrivals_accumulate_travel_time(start: Coord<f64>) {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().expect("valid time");
        let arrivals =
            estimate_arrivals(t0, 25.0, start, &[stop(13.07, 77.59), stop(13.17, 77.59)])
                .expect("arrivals");
        assert!(arrivals[0] > t0);
        assert!(arrivals[1] > arrivals[0]);
    }
}
