//! Matching orders to couriers.
//!
//! Two policies coexist. [`auto_assign`] is strict: it clusters pending
//! orders and gives each cluster to the nearest available courier with
//! enough capacity, consuming couriers from a [`CourierPool`].
//! [`force_assign_pending`] and [`assign_direct`] are administrative
//! overrides that ignore capacity.
//!
//! Policies never touch the store. They return an [`AssignmentPlan`] that
//! the caller commits as one batch.

use dispatch_core::{ChangeSet, Courier, CourierId, CourierStatus, Order, OrderId, OrderStatus};
use geo::Coord;

use crate::cluster::{ClusterError, cluster_orders};

/// Couriers still free to take a cluster during one assignment pass.
///
/// A courier is removed as soon as it receives a cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourierPool {
    couriers: Vec<Courier>,
}

impl CourierPool {
    /// Pool of the [`CourierStatus::Available`] couriers in `couriers`, in
    /// the given order.
    pub fn available(couriers: impl IntoIterator<Item = Courier>) -> Self {
        Self {
            couriers: couriers
                .into_iter()
                .filter(|courier| courier.status == CourierStatus::Available)
                .collect(),
        }
    }

    /// Couriers not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &[Courier] {
        &self.couriers
    }

    /// Number of couriers not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    /// Whether every courier has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }

    /// Remove and return the nearest courier to `target` whose capacity
    /// covers `weight`.
    ///
    /// Couriers with no known location count as infinitely far. Ties go to
    /// the earliest courier in the pool.
    pub fn take_nearest_fitting(&mut self, target: Coord<f64>, weight: f64) -> Option<Courier> {
        let idx = self
            .couriers
            .iter()
            .enumerate()
            .filter(|(_, courier)| courier.capacity >= weight)
            .map(|(idx, courier)| (idx, courier.distance_to_km(target)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)?;
        Some(self.couriers.remove(idx))
    }
}

/// A cluster no courier could carry. Its orders stay pending.
#[derive(Debug, Clone, PartialEq)]
pub struct InfeasibleCluster {
    /// Members of the cluster.
    pub order_ids: Vec<OrderId>,
    /// Aggregate weight that no courier could cover.
    pub total_weight: f64,
    /// Cluster centroid.
    pub centroid: Coord<f64>,
}

/// Mutations produced by one assignment pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentPlan {
    /// Orders that changed, carrying the revisions they were read with.
    pub orders: Vec<Order>,
    /// Couriers whose status changed.
    pub couriers: Vec<Courier>,
    /// Clusters left unassigned.
    pub infeasible: Vec<InfeasibleCluster>,
}

impl AssignmentPlan {
    /// Whether the pass assigned nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.couriers.is_empty()
    }

    /// Number of orders assigned.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.orders.len()
    }

    /// Couriers that received orders, ascending and without duplicates.
    #[must_use]
    pub fn affected_couriers(&self) -> Vec<CourierId> {
        let mut ids: Vec<_> = self.orders.iter().filter_map(|order| order.rider_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Stage every mutation of the plan as one batch.
    #[must_use]
    pub fn to_change_set(&self) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for courier in &self.couriers {
            changes.put_courier(courier.clone());
        }
        for order in &self.orders {
            changes.put_order(order.clone());
        }
        changes
    }
}

/// Result of [`assign_direct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The order now belongs to the courier.
    Assigned,
    /// The order was not pending and was left alone.
    Unchanged {
        /// Status the order was found in.
        status: OrderStatus,
    },
}

/// Give `order` to `courier` regardless of capacity or distance.
///
/// Only pending orders change; anything else is reported as
/// [`AssignOutcome::Unchanged`]. An available courier becomes busy.
///
/// # Examples
/// ```
/// use dispatch_core::{CourierStatus, OrderStatus};
/// use dispatch_core::test_support::{courier_at, order_at};
/// use dispatch_planner::{AssignOutcome, assign_direct};
///
/// let mut order = order_at(1, 12.97, 77.59);
/// let mut courier = courier_at(7, "Asha", 12.95, 77.60);
/// assert_eq!(assign_direct(&mut order, &mut courier), AssignOutcome::Assigned);
/// assert_eq!(order.status, OrderStatus::Assigned);
/// assert_eq!(courier.status, CourierStatus::Busy);
/// assert_eq!(
///     assign_direct(&mut order, &mut courier),
///     AssignOutcome::Unchanged { status: OrderStatus::Assigned }
/// );
/// ```
pub fn assign_direct(order: &mut Order, courier: &mut Courier) -> AssignOutcome {
    if order.status != OrderStatus::Pending {
        return AssignOutcome::Unchanged {
            status: order.status,
        };
    }
    order.rider_id = Some(courier.id);
    order.status = OrderStatus::Assigned;
    if courier.status == CourierStatus::Available {
        courier.status = CourierStatus::Busy;
    }
    AssignOutcome::Assigned
}

/// Give every pending order to its nearest courier, ignoring capacity.
///
/// All supplied couriers are candidates whatever their status. With exactly
/// one courier no distances are computed. With none, the plan is empty.
#[must_use]
pub fn force_assign_pending(orders: &[Order], couriers: &[Courier]) -> AssignmentPlan {
    let mut fleet = couriers.to_vec();
    let mut touched = vec![false; fleet.len()];
    let mut plan = AssignmentPlan::default();

    for order in orders.iter().filter(|order| order.status == OrderStatus::Pending) {
        let Some(idx) = nearest_courier(&fleet, order.stop.location()) else {
            break;
        };
        let (Some(courier), Some(flag)) = (fleet.get_mut(idx), touched.get_mut(idx)) else {
            continue;
        };
        let mut assigned = order.clone();
        let was_available = courier.status == CourierStatus::Available;
        assign_direct(&mut assigned, courier);
        *flag |= was_available;
        plan.orders.push(assigned);
    }

    plan.couriers = fleet
        .into_iter()
        .zip(touched)
        .filter_map(|(courier, changed)| changed.then_some(courier))
        .collect();
    plan
}

fn nearest_courier(couriers: &[Courier], target: Coord<f64>) -> Option<usize> {
    if couriers.len() == 1 {
        return Some(0);
    }
    couriers
        .iter()
        .enumerate()
        .map(|(idx, courier)| (idx, courier.distance_to_km(target)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx)
}

/// Clustered assignment of pending orders to couriers from `pool`.
///
/// Clusters are handled in clustering output order. Each goes to the nearest
/// remaining courier whose capacity covers the cluster weight; that courier
/// becomes busy and leaves the pool. Clusters without an eligible courier are
/// reported in [`AssignmentPlan::infeasible`] and their orders stay pending.
///
/// # Errors
/// Propagates [`ClusterError`] for an invalid radius or coordinate.
///
/// # Examples
/// ```
/// use dispatch_core::test_support::{courier_at, order_at};
/// use dispatch_planner::{CourierPool, auto_assign};
///
/// let orders = vec![order_at(1, 12.970, 77.590), order_at(2, 12.975, 77.595)];
/// let mut pool = CourierPool::available([courier_at(7, "Asha", 12.95, 77.60)]);
/// let plan = auto_assign(&orders, &mut pool, 5.0)?;
/// assert_eq!(plan.assigned_count(), 2);
/// assert!(pool.is_empty());
/// # Ok::<(), dispatch_planner::ClusterError>(())
/// ```
pub fn auto_assign(
    orders: &[Order],
    pool: &mut CourierPool,
    radius_km: f64,
) -> Result<AssignmentPlan, ClusterError> {
    let pending: Vec<Order> = orders
        .iter()
        .filter(|order| order.status == OrderStatus::Pending)
        .cloned()
        .collect();
    let mut plan = AssignmentPlan::default();

    for cluster in cluster_orders(&pending, radius_km)? {
        let centroid = cluster.centroid();
        let total_weight = cluster.total_weight();
        let Some(mut courier) = pool.take_nearest_fitting(centroid, total_weight) else {
            log::warn!(
                "no courier can carry cluster of {} orders weighing {total_weight}",
                cluster.len()
            );
            plan.infeasible.push(InfeasibleCluster {
                order_ids: cluster.order_ids(),
                total_weight,
                centroid,
            });
            continue;
        };
        for mut order in cluster.into_orders() {
            order.rider_id = Some(courier.id);
            order.status = OrderStatus::Assigned;
            plan.orders.push(order);
        }
        courier.status = CourierStatus::Busy;
        plan.couriers.push(courier);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::test_support::{courier_at, order_at};
    use rstest::{fixture, rstest};

    #[fixture]
    fn nearby_orders() -> Vec<Order> {
        vec![
            order_at(1, 12.970, 77.590),
            order_at(2, 12.975, 77.595),
            order_at(3, 12.980, 77.600),
        ]
    }

    #[rstest]
    fn one_cluster_goes_to_one_courier(nearby_orders: Vec<Order>) {
        let mut pool = CourierPool::available([courier_at(7, "Asha", 12.95, 77.60)]);
        let plan = auto_assign(&nearby_orders, &mut pool, 5.0).expect("plan");
        assert_eq!(plan.assigned_count(), 3);
        assert!(plan.orders.iter().all(|order| order.rider_id == Some(CourierId(7))));
        assert_eq!(plan.couriers[0].status, CourierStatus::Busy);
        assert!(plan.infeasible.is_empty());
    }

    #[rstest]
    fn nearest_fitting_courier_wins(nearby_orders: Vec<Order>) {
        let mut pool = CourierPool::available([
            courier_at(1, "Far", 13.50, 77.60),
            courier_at(2, "Small", 12.975, 77.595).with_capacity(2.0),
            courier_at(3, "Near", 12.90, 77.60),
        ]);
        let plan = auto_assign(&nearby_orders, &mut pool, 5.0).expect("plan");
        assert_eq!(plan.affected_couriers(), vec![CourierId(3)]);
        assert_eq!(pool.len(), 2);
    }

    #[rstest]
    fn cluster_without_capacity_is_reported(nearby_orders: Vec<Order>) {
        let mut pool =
            CourierPool::available([courier_at(1, "Small", 12.97, 77.59).with_capacity(2.0)]);
        let plan = auto_assign(&nearby_orders, &mut pool, 5.0).expect("plan");
        assert!(plan.orders.is_empty());
        assert_eq!(plan.infeasible.len(), 1);
        assert_eq!(plan.infeasible[0].total_weight, 3.0);
        assert_eq!(pool.len(), 1);
    }

    #[rstest]
    fn busy_couriers_do_not_join_the_pool() {
        let pool = CourierPool::available([
            courier_at(1, "Busy", 0.0, 0.0).with_status(CourierStatus::Busy),
            courier_at(2, "Free", 0.0, 0.0),
        ]);
        assert_eq!(pool.len(), 1);
    }

    #[rstest]
    fn courier_without_location_loses_to_located_one(nearby_orders: Vec<Order>) {
        let mut pool = CourierPool::available([
            Courier::available(CourierId(1), "Unknown"),
            courier_at(2, "Located", 14.0, 78.0),
        ]);
        let plan = auto_assign(&nearby_orders, &mut pool, 5.0).expect("plan");
        assert_eq!(plan.affected_couriers(), vec![CourierId(2)]);
    }

    #[rstest]
    fn rerunning_without_pending_orders_is_a_no_op(nearby_orders: Vec<Order>) {
        let mut pool = CourierPool::available([courier_at(7, "Asha", 12.95, 77.60)]);
        let plan = auto_assign(&nearby_orders, &mut pool, 5.0).expect("plan");
        let mut second_pool = CourierPool::available([courier_at(8, "Ravi", 12.95, 77.60)]);
        let again = auto_assign(&plan.orders, &mut second_pool, 5.0).expect("plan");
        assert!(again.is_empty());
        assert_eq!(second_pool.len(), 1);
    }

    #[rstest]
    fn forced_assignment_ignores_capacity(nearby_orders: Vec<Order>) {
        let couriers = [
            courier_at(1, "Tiny", 12.97, 77.59).with_capacity(0.5),
            courier_at(2, "Far", 14.0, 78.0),
        ];
        let plan = force_assign_pending(&nearby_orders, &couriers);
        assert_eq!(plan.assigned_count(), 3);
        assert_eq!(plan.affected_couriers(), vec![CourierId(1)]);
        assert_eq!(plan.couriers.len(), 1);
        assert_eq!(plan.couriers[0].status, CourierStatus::Busy);
    }

    #[rstest]
    fn forced_assignment_with_single_courier_skips_distance(nearby_orders: Vec<Order>) {
        let plan = force_assign_pending(
            &nearby_orders,
            &[Courier::available(CourierId(9), "Nowhere")],
        );
        assert_eq!(plan.affected_couriers(), vec![CourierId(9)]);
    }

    #[rstest]
    fn forced_assignment_without_couriers_changes_nothing(nearby_orders: Vec<Order>) {
        assert!(force_assign_pending(&nearby_orders, &[]).is_empty());
    }

    #[rstest]
    fn plan_stages_every_mutation(nearby_orders: Vec<Order>) {
        let mut pool = CourierPool::available([courier_at(7, "Asha", 12.95, 77.60)]);
        let plan = auto_assign(&nearby_orders, &mut pool, 5.0).expect("plan");
        assert_eq!(plan.to_change_set().len(), 4);
    }
}
