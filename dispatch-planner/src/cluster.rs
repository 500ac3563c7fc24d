//! Proximity clustering of unassigned orders.
//!
//! Clustering is seed-driven single linkage: the first unclustered order
//! seeds a cluster, which then absorbs every remaining order within the
//! radius of any member until a full pass absorbs nothing. The result depends
//! on input order and is not globally optimal.

use dispatch_core::geodesy::{self, GeoError};
use dispatch_core::{Order, OrderId};
use geo::Coord;
use thiserror::Error;

/// Radius used when grouping orders for auto-assignment.
pub const DEFAULT_CLUSTER_RADIUS_KM: f64 = 5.0;

/// Errors raised by [`cluster_orders`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ClusterError {
    /// The radius was negative or NaN.
    #[error("cluster radius must be a non-negative number of kilometres, got {radius_km}")]
    InvalidRadius {
        /// Radius supplied.
        radius_km: f64,
    },
    /// An order carried an invalid coordinate.
    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// A proximity-grouped batch of orders for one assignment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    orders: Vec<Order>,
    centroid: Coord<f64>,
    total_weight: f64,
}

impl Cluster {
    #[expect(
        clippy::float_arithmetic,
        reason = "aggregate weight is a floating-point sum"
    )]
    fn from_members(orders: Vec<Order>, fallback_centroid: Coord<f64>) -> Self {
        let locations: Vec<_> = orders.iter().map(|order| order.stop.location()).collect();
        let centroid = geodesy::centroid(&locations).unwrap_or(fallback_centroid);
        let total_weight = orders.iter().map(|order| order.stop.weight()).sum();
        Self {
            orders,
            centroid,
            total_weight,
        }
    }

    /// Members in absorption order, seed first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Consume the cluster, yielding its members.
    #[must_use]
    pub fn into_orders(self) -> Vec<Order> {
        self.orders
    }

    /// Identifiers of the members.
    #[must_use]
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.iter().map(|order| order.id).collect()
    }

    /// Arithmetic mean of member locations.
    #[must_use]
    pub const fn centroid(&self) -> Coord<f64> {
        self.centroid
    }

    /// Sum of member stop weights.
    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the cluster has no members. Never true for clusters produced
    /// by [`cluster_orders`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Partition `orders` into proximity clusters.
///
/// Every order lands in exactly one cluster. Members keep their input order
/// and clusters appear in seed order. Empty input yields no clusters.
///
/// # Errors
/// [`ClusterError::InvalidRadius`] for a negative or NaN radius and
/// [`ClusterError::Geo`] when any order has an invalid location.
///
/// # Examples
/// ```
/// use dispatch_core::test_support::order_at;
/// use dispatch_planner::cluster_orders;
///
/// let orders = vec![
///     order_at(1, 12.970, 77.590),
///     order_at(2, 12.975, 77.595),
///     order_at(3, 13.300, 77.900),
/// ];
/// let clusters = cluster_orders(&orders, 5.0)?;
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].len(), 2);
/// # Ok::<(), dispatch_planner::ClusterError>(())
/// ```
pub fn cluster_orders(orders: &[Order], max_distance_km: f64) -> Result<Vec<Cluster>, ClusterError> {
    if max_distance_km.is_nan() || max_distance_km.is_sign_negative() {
        return Err(ClusterError::InvalidRadius {
            radius_km: max_distance_km,
        });
    }
    for order in orders {
        geodesy::validate(order.stop.location())?;
    }

    let mut unclustered: Vec<Order> = orders.to_vec();
    let mut clusters = Vec::new();
    while !unclustered.is_empty() {
        let seed = unclustered.remove(0);
        let seed_location = seed.stop.location();
        let mut members = vec![seed];
        while absorb_pass(&mut members, &mut unclustered, max_distance_km)? {}
        clusters.push(Cluster::from_members(members, seed_location));
    }
    Ok(clusters)
}

/// Move every order within range of any member into `members`.
///
/// Returns whether anything was absorbed.
fn absorb_pass(
    members: &mut Vec<Order>,
    unclustered: &mut Vec<Order>,
    max_distance_km: f64,
) -> Result<bool, GeoError> {
    let mut absorbed = false;
    let mut idx = 0;
    while let Some(candidate) = unclustered.get(idx) {
        if within_range(members, candidate, max_distance_km)? {
            members.push(unclustered.remove(idx));
            absorbed = true;
        } else {
            idx += 1;
        }
    }
    Ok(absorbed)
}

fn within_range(members: &[Order], candidate: &Order, max_distance_km: f64) -> Result<bool, GeoError> {
    let target = candidate.stop.location();
    for member in members {
        if geodesy::distance_km(member.stop.location(), target)? <= max_distance_km {
            return Ok(true);
        }
    }
    Ok(false)
}
