//! Order lifecycle handling and per-courier route re-optimization.
//!
//! Every operation follows the same shape: lock the couriers it touches,
//! read, stage one [`ChangeSet`], commit it, then re-sequence the affected
//! couriers and publish what changed. Road-routing enrichment runs on the
//! blocking pool under [`CoordinatorConfig::enrichment_timeout`] and falls
//! back to straight lines when it fails or runs late.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dispatch_core::route::{self, enrich};
use dispatch_core::{
    AvoidZone, ChangeSet, Courier, CourierFilter, CourierId, CourierStats, CourierStatus,
    DEFAULT_AVOID_RADIUS_M, DispatchEvent, DispatchStore, Enrichment, Order, OrderFilter,
    OrderId, OrderStats, OrderStatus, RouteGeometry, RouteProvider, RouteRequest, RouteResult,
    Stop, TrafficLog,
};
use dispatch_planner::{
    AssignOutcome, AssignmentPlan, CourierPool, DEFAULT_CLUSTER_RADIUS_KM, InfeasibleCluster,
    assign_direct, force_assign_pending, sequence, window_violations,
};
use geo::Coord;

use crate::error::DispatchError;
use crate::locks::{CourierGuard, CourierLocks};
use crate::notifier::ChangeNotifier;

/// Straight-line speed used for arrival estimates, in km/h.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 25.0;

/// Upper bound on one road-routing call before falling back.
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_LOCK_ATTEMPTS: usize = 3;

/// Tunables for [`ReoptimizationCoordinator`].
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use dispatch_service::CoordinatorConfig;
///
/// let config = CoordinatorConfig::default()
///     .with_cluster_radius_km(2.5)
///     .with_enrichment_timeout(Duration::from_secs(3));
/// assert_eq!(config.cluster_radius_km, 2.5);
/// assert_eq!(config.average_speed_kmh, 25.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Linkage radius for clustered assignment.
    pub cluster_radius_km: f64,
    /// Longest wait for the road-routing provider.
    pub enrichment_timeout: Duration,
    /// Speed behind delivery-window arrival estimates.
    pub average_speed_kmh: f64,
    /// Radius of the zone built around each traffic report.
    pub avoid_radius_m: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cluster_radius_km: DEFAULT_CLUSTER_RADIUS_KM,
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            avoid_radius_m: DEFAULT_AVOID_RADIUS_M,
        }
    }
}

impl CoordinatorConfig {
    /// Override the clustering radius.
    #[must_use]
    pub const fn with_cluster_radius_km(mut self, radius_km: f64) -> Self {
        self.cluster_radius_km = radius_km;
        self
    }

    /// Override the enrichment timeout.
    #[must_use]
    pub const fn with_enrichment_timeout(mut self, timeout: Duration) -> Self {
        self.enrichment_timeout = timeout;
        self
    }

    /// Override the arrival-estimate speed.
    #[must_use]
    pub const fn with_average_speed_kmh(mut self, speed_kmh: f64) -> Self {
        self.average_speed_kmh = speed_kmh;
        self
    }

    /// Override the traffic avoidance radius.
    #[must_use]
    pub const fn with_avoid_radius_m(mut self, radius_m: f64) -> Self {
        self.avoid_radius_m = radius_m;
        self
    }
}

/// Which of a courier's orders a re-sequence covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteScope {
    /// Only orders already picked up.
    InTransit,
    /// Orders assigned or picked up.
    Active,
}

impl RouteScope {
    const fn statuses(self) -> &'static [OrderStatus] {
        match self {
            Self::InTransit => &[OrderStatus::InTransit],
            Self::Active => &[OrderStatus::Assigned, OrderStatus::InTransit],
        }
    }
}

/// Result of a single-order or single-courier operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleOutcome {
    /// Orders as stored after the commit. Deleted orders are absent.
    pub orders: Vec<Order>,
    /// Routes published by the operation.
    pub routes: Vec<RouteResult>,
}

/// Result of a bulk assignment pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentOutcome {
    /// Orders assigned in the pass.
    pub assigned: usize,
    /// Couriers that received orders, ascending.
    pub couriers: Vec<CourierId>,
    /// Clusters no courier could carry.
    pub infeasible: Vec<InfeasibleCluster>,
    /// Routes published for the affected couriers.
    pub routes: Vec<RouteResult>,
}

/// Serializes lifecycle events per courier and keeps routes current.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use dispatch_core::test_support::{courier_at, order_at};
/// use dispatch_core::{ChangeSet, DispatchStore, MemoryDispatchStore};
/// use dispatch_service::{ChangeNotifier, ReoptimizationCoordinator};
///
/// # tokio::runtime::Runtime::new()?.block_on(async {
/// let store = Arc::new(MemoryDispatchStore::default());
/// let mut changes = ChangeSet::default();
/// changes
///     .put_courier(courier_at(1, "Asha", 12.95, 77.60))
///     .put_order(order_at(10, 12.97, 77.59));
/// store.commit(changes)?;
///
/// let coordinator = ReoptimizationCoordinator::new(store, Arc::new(ChangeNotifier::default()));
/// let outcome = coordinator.auto_assign().await?;
/// assert_eq!(outcome.assigned, 1);
/// assert_eq!(outcome.routes.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ReoptimizationCoordinator {
    store: Arc<dyn DispatchStore>,
    provider: Option<Arc<dyn RouteProvider>>,
    notifier: Arc<ChangeNotifier>,
    traffic: Arc<TrafficLog>,
    locks: CourierLocks,
    config: CoordinatorConfig,
}

impl std::fmt::Debug for ReoptimizationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReoptimizationCoordinator")
            .field("has_provider", &self.provider.is_some())
            .field("notifier", &self.notifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReoptimizationCoordinator {
    /// Coordinator over `store` with no road-routing provider.
    #[must_use]
    pub fn new(store: Arc<dyn DispatchStore>, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            store,
            provider: None,
            notifier,
            traffic: Arc::new(TrafficLog::default()),
            locks: CourierLocks::default(),
            config: CoordinatorConfig::default(),
        }
    }

    /// Enrich routes through `provider`.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn RouteProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share an existing traffic log.
    #[must_use]
    pub fn with_traffic_log(mut self, traffic: Arc<TrafficLog>) -> Self {
        self.traffic = traffic;
        self
    }

    /// Replace the tunables.
    #[must_use]
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Active tunables.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Notifier events are published through.
    #[must_use]
    pub const fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Traffic reports used by [`Self::optimize`].
    #[must_use]
    pub const fn traffic(&self) -> &Arc<TrafficLog> {
        &self.traffic
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &dyn DispatchStore {
        self.store.as_ref()
    }

    /// Mark an assigned order as picked up.
    ///
    /// The courier's in-transit stops are re-sequenced from its current
    /// position. Publishes `route_updated` then `order_assigned`.
    ///
    /// # Errors
    /// [`DispatchError::InvalidTransition`] unless the order is assigned, and
    /// store failures.
    pub async fn pick_up(&self, order_id: OrderId) -> Result<LifecycleOutcome, DispatchError> {
        let (order, _guard) = self.lock_for_order(order_id, None).await?;
        let courier_id = Self::expect_status(&order, OrderStatus::Assigned, "pick up")?;

        let mut picked = order;
        picked.status = OrderStatus::InTransit;
        let mut changes = ChangeSet::default();
        changes.put_order(picked);
        self.store.commit(changes)?;

        let routes = self
            .publish_route(courier_id, RouteScope::InTransit, Vec::new())
            .await;
        self.notifier.publish(&DispatchEvent::OrderAssigned {
            order_id,
            rider_id: courier_id,
            status: OrderStatus::InTransit,
        });
        Ok(LifecycleOutcome {
            orders: vec![self.store.order(order_id)?],
            routes,
        })
    }

    /// Pick up every assigned order of a courier at once.
    ///
    /// Re-sequences once, then publishes `order_assigned` per order.
    ///
    /// # Errors
    /// Store failures, including an unknown courier.
    pub async fn pick_up_all(
        &self,
        courier_id: CourierId,
    ) -> Result<LifecycleOutcome, DispatchError> {
        let _guard = self.locks.lock([courier_id]).await;
        self.store.courier(courier_id)?;
        let assigned = self.store.orders(
            &OrderFilter::all()
                .with_status(OrderStatus::Assigned)
                .for_rider(courier_id),
        )?;

        let mut changes = ChangeSet::default();
        for order in &assigned {
            let mut picked = order.clone();
            picked.status = OrderStatus::InTransit;
            changes.put_order(picked);
        }
        if !changes.is_empty() {
            self.store.commit(changes)?;
            log::debug!("{courier_id} picked up {} orders", assigned.len());
        }

        let routes = self
            .publish_route(courier_id, RouteScope::InTransit, Vec::new())
            .await;
        let mut orders = Vec::with_capacity(assigned.len());
        for order in &assigned {
            self.notifier.publish(&DispatchEvent::OrderAssigned {
                order_id: order.id,
                rider_id: courier_id,
                status: OrderStatus::InTransit,
            });
            orders.push(self.store.order(order.id)?);
        }
        Ok(LifecycleOutcome { orders, routes })
    }

    /// Withdraw an order that has not been delivered.
    ///
    /// Publishes `order_cancelled`, then re-sequences the former courier's
    /// remaining assigned and in-transit stops. A courier left with nothing
    /// to do becomes available again.
    ///
    /// # Errors
    /// [`DispatchError::InvalidTransition`] for a delivered order, and store
    /// failures.
    pub async fn cancel(&self, order_id: OrderId) -> Result<LifecycleOutcome, DispatchError> {
        let (order, _guard) = self.lock_for_order(order_id, None).await?;
        if order.status == OrderStatus::Delivered {
            return Err(DispatchError::InvalidTransition {
                order_id,
                from: order.status,
                action: "cancel",
            });
        }
        let old_status = order.status;
        let former = order.rider_id;

        let mut cancelled = order;
        cancelled.status = OrderStatus::Cancelled;
        cancelled.rider_id = None;
        let mut changes = ChangeSet::default();
        changes.put_order(cancelled);
        if let Some(courier_id) = former {
            self.release_if_idle(courier_id, order_id, &mut changes)?;
        }
        self.store.commit(changes)?;

        self.notifier.publish(&DispatchEvent::OrderCancelled {
            order_id,
            rider_id: former,
            old_status,
        });
        let routes = match former {
            Some(courier_id) => {
                self.publish_route(courier_id, RouteScope::Active, Vec::new())
                    .await
            }
            None => Vec::new(),
        };
        Ok(LifecycleOutcome {
            orders: vec![self.store.order(order_id)?],
            routes,
        })
    }

    /// Mark an in-transit order as delivered.
    ///
    /// The courier keeps the order for its history. Remaining stops are
    /// re-sequenced and `route_updated` then `order_assigned` are published.
    ///
    /// # Errors
    /// [`DispatchError::InvalidTransition`] unless the order is in transit,
    /// and store failures.
    pub async fn deliver(&self, order_id: OrderId) -> Result<LifecycleOutcome, DispatchError> {
        let (order, _guard) = self.lock_for_order(order_id, None).await?;
        let courier_id = Self::expect_status(&order, OrderStatus::InTransit, "deliver")?;

        let mut delivered = order;
        delivered.status = OrderStatus::Delivered;
        let mut changes = ChangeSet::default();
        changes.put_order(delivered);
        self.release_if_idle(courier_id, order_id, &mut changes)?;
        self.store.commit(changes)?;

        let routes = self
            .publish_route(courier_id, RouteScope::Active, Vec::new())
            .await;
        self.notifier.publish(&DispatchEvent::OrderAssigned {
            order_id,
            rider_id: courier_id,
            status: OrderStatus::Delivered,
        });
        Ok(LifecycleOutcome {
            orders: vec![self.store.order(order_id)?],
            routes,
        })
    }

    /// Remove an order permanently, whatever its status.
    ///
    /// Publishes `order_deleted`, then re-sequences the former owner.
    ///
    /// # Errors
    /// Store failures, including an unknown order.
    pub async fn delete(&self, order_id: OrderId) -> Result<LifecycleOutcome, DispatchError> {
        let (order, _guard) = self.lock_for_order(order_id, None).await?;
        let former = order.rider_id;

        let mut changes = ChangeSet::default();
        changes.delete_order(&order);
        if let Some(courier_id) = former {
            self.release_if_idle(courier_id, order_id, &mut changes)?;
        }
        self.store.commit(changes)?;

        self.notifier.publish(&DispatchEvent::OrderDeleted {
            order_id,
            rider_id: former,
        });
        let routes = match former {
            Some(courier_id) => {
                self.publish_route(courier_id, RouteScope::Active, Vec::new())
                    .await
            }
            None => Vec::new(),
        };
        Ok(LifecycleOutcome {
            orders: Vec::new(),
            routes,
        })
    }

    /// Give a pending order to a named courier, ignoring capacity.
    ///
    /// Publishes `route_updated` then `order_assigned`.
    ///
    /// # Errors
    /// [`DispatchError::InvalidTransition`] unless the order is pending, and
    /// store failures, including an unknown courier.
    pub async fn assign(
        &self,
        order_id: OrderId,
        courier_id: CourierId,
    ) -> Result<LifecycleOutcome, DispatchError> {
        let (order, _guard) = self.lock_for_order(order_id, Some(courier_id)).await?;
        let courier = self.store.courier(courier_id)?;

        let mut assigned = order;
        let mut owner = courier.clone();
        if let AssignOutcome::Unchanged { status } = assign_direct(&mut assigned, &mut owner) {
            return Err(DispatchError::InvalidTransition {
                order_id,
                from: status,
                action: "assign",
            });
        }
        let mut changes = ChangeSet::default();
        if owner.status != courier.status {
            changes.put_courier(owner);
        }
        changes.put_order(assigned);
        self.store.commit(changes)?;

        let routes = self
            .publish_route(courier_id, RouteScope::Active, Vec::new())
            .await;
        self.notifier.publish(&DispatchEvent::OrderAssigned {
            order_id,
            rider_id: courier_id,
            status: OrderStatus::Assigned,
        });
        Ok(LifecycleOutcome {
            orders: vec![self.store.order(order_id)?],
            routes,
        })
    }

    /// Clustered assignment of every pending order to available couriers.
    ///
    /// Holds the whole fleet for the duration of the pass.
    ///
    /// # Errors
    /// Store failures and an invalid clustering radius.
    pub async fn auto_assign(&self) -> Result<AssignmentOutcome, DispatchError> {
        let _fleet = self.locks.lock_fleet().await;
        let pending = self
            .store
            .orders(&OrderFilter::all().with_status(OrderStatus::Pending))?;
        let mut pool = CourierPool::available(
            self.store
                .couriers(&CourierFilter::all().with_status(CourierStatus::Available))?,
        );
        let plan =
            dispatch_planner::auto_assign(&pending, &mut pool, self.config.cluster_radius_km)?;
        self.apply_plan(plan).await
    }

    /// Give every pending order to its nearest courier, ignoring capacity.
    ///
    /// # Errors
    /// Store failures.
    pub async fn force_assign(&self) -> Result<AssignmentOutcome, DispatchError> {
        let _fleet = self.locks.lock_fleet().await;
        let pending = self
            .store
            .orders(&OrderFilter::all().with_status(OrderStatus::Pending))?;
        let couriers = self.store.couriers(&CourierFilter::all())?;
        let plan = force_assign_pending(&pending, &couriers);
        self.apply_plan(plan).await
    }

    /// Re-sequence a courier's in-transit stops on demand.
    ///
    /// With `avoid_traffic`, every reported traffic point becomes an
    /// avoidance zone for the road route. Nothing is published; the route is
    /// returned to the caller. `None` means the courier has nothing in
    /// transit.
    ///
    /// # Errors
    /// Store failures, including an unknown courier.
    pub async fn optimize(
        &self,
        courier_id: CourierId,
        avoid_traffic: bool,
    ) -> Result<Option<RouteResult>, DispatchError> {
        let _guard = self.locks.lock([courier_id]).await;
        let avoid = if avoid_traffic {
            self.traffic.avoid_zones(self.config.avoid_radius_m)
        } else {
            Vec::new()
        };
        self.resequence(courier_id, RouteScope::InTransit, avoid)
            .await
    }

    /// Store a courier's new position and publish `rider_update`.
    ///
    /// # Errors
    /// [`DispatchError::Geo`] for an invalid coordinate, and store failures.
    pub async fn update_location(
        &self,
        courier_id: CourierId,
        location: Coord<f64>,
    ) -> Result<Courier, DispatchError> {
        let _guard = self.locks.lock([courier_id]).await;
        let moved = self.store.courier(courier_id)?.at(location)?;
        let name = moved.name.clone();
        let mut changes = ChangeSet::default();
        changes.put_courier(moved);
        self.store.commit(changes)?;

        self.notifier.publish(&DispatchEvent::RiderUpdate {
            rider_id: courier_id,
            lat: location.y,
            lng: location.x,
            name,
        });
        Ok(self.store.courier(courier_id)?)
    }

    /// Record a congestion point for later avoidance.
    ///
    /// # Errors
    /// [`DispatchError::Geo`] for an invalid coordinate.
    pub fn report_traffic(&self, location: Coord<f64>) -> Result<(), DispatchError> {
        self.traffic.report(location)?;
        Ok(())
    }

    /// Order counts per status.
    ///
    /// # Errors
    /// Store failures.
    pub fn order_stats(&self) -> Result<OrderStats, DispatchError> {
        let orders = self.store.orders(&OrderFilter::all())?;
        Ok(OrderStats::tally(&orders))
    }

    /// Workload summary of one courier.
    ///
    /// # Errors
    /// Store failures, including an unknown courier.
    pub fn courier_stats(&self, courier_id: CourierId) -> Result<CourierStats, DispatchError> {
        let courier = self.store.courier(courier_id)?;
        let orders = self
            .store
            .orders(&OrderFilter::all().for_rider(courier_id))?;
        Ok(CourierStats::tally(&courier, &orders))
    }

    async fn apply_plan(&self, plan: AssignmentPlan) -> Result<AssignmentOutcome, DispatchError> {
        let couriers = plan.affected_couriers();
        let assigned = plan.assigned_count();
        if !plan.is_empty() {
            self.store.commit(plan.to_change_set())?;
            log::debug!("assigned {assigned} orders across {} couriers", couriers.len());
        }

        let mut routes = Vec::with_capacity(couriers.len());
        for courier_id in &couriers {
            routes.extend(
                self.publish_route(*courier_id, RouteScope::Active, Vec::new())
                    .await,
            );
        }
        if assigned > 0 {
            self.notifier.publish(&DispatchEvent::OrdersAssigned {
                count: assigned,
                riders_used: couriers.len(),
            });
        }
        Ok(AssignmentOutcome {
            assigned,
            couriers,
            infeasible: plan.infeasible,
            routes,
        })
    }

    /// Lock the owner of `order_id`, plus `extra`, and return the order as
    /// read under those locks.
    ///
    /// The owner can move between the unlocked read and the lock, so the read
    /// is repeated until it is stable.
    async fn lock_for_order(
        &self,
        order_id: OrderId,
        extra: Option<CourierId>,
    ) -> Result<(Order, CourierGuard), DispatchError> {
        for _ in 0..MAX_LOCK_ATTEMPTS {
            let seen = self.store.order(order_id)?.rider_id;
            let guard = self.locks.lock(seen.into_iter().chain(extra)).await;
            let order = self.store.order(order_id)?;
            if order.rider_id == seen {
                return Ok((order, guard));
            }
            log::debug!("{order_id} changed courier while locking, retrying");
        }
        Err(DispatchError::Contended { order_id })
    }

    fn expect_status(
        order: &Order,
        expected: OrderStatus,
        action: &'static str,
    ) -> Result<CourierId, DispatchError> {
        let invalid = DispatchError::InvalidTransition {
            order_id: order.id,
            from: order.status,
            action,
        };
        if order.status != expected {
            return Err(invalid);
        }
        order.rider_id.ok_or(invalid)
    }

    /// Stage a busy courier back to available when `leaving` was its last
    /// active order.
    fn release_if_idle(
        &self,
        courier_id: CourierId,
        leaving: OrderId,
        changes: &mut ChangeSet,
    ) -> Result<(), DispatchError> {
        let courier = self.store.courier(courier_id)?;
        if courier.status != CourierStatus::Busy {
            return Ok(());
        }
        let still_active = self
            .store
            .orders(
                &OrderFilter::all()
                    .with_statuses(RouteScope::Active.statuses().iter().copied())
                    .for_rider(courier_id),
            )?
            .iter()
            .any(|order| order.id != leaving);
        if !still_active {
            log::debug!("{courier_id} has no active orders left, releasing");
            changes.put_courier(courier.with_status(CourierStatus::Available));
        }
        Ok(())
    }

    /// Re-sequence and publish `route_updated` when there is a route.
    ///
    /// Runs after the commit, so a failure is logged and leaves the courier
    /// without a route update instead of failing the operation.
    async fn publish_route(
        &self,
        courier_id: CourierId,
        scope: RouteScope,
        avoid: Vec<AvoidZone>,
    ) -> Vec<RouteResult> {
        let route = match self.resequence(courier_id, scope, avoid).await {
            Ok(Some(route)) => route,
            Ok(None) => return Vec::new(),
            Err(err) => {
                log::warn!("{courier_id} could not be re-sequenced, no route published: {err}");
                return Vec::new();
            }
        };
        self.notifier.publish(&DispatchEvent::RouteUpdated {
            rider_id: courier_id,
            route: route.clone(),
        });
        vec![route]
    }

    /// Sequence the courier's orders in `scope` and enrich the result.
    ///
    /// Returns `None` when the courier has nothing to visit.
    async fn resequence(
        &self,
        courier_id: CourierId,
        scope: RouteScope,
        avoid: Vec<AvoidZone>,
    ) -> Result<Option<RouteResult>, DispatchError> {
        let courier = self.store.courier(courier_id)?;
        let orders = self.store.orders(
            &OrderFilter::all()
                .with_statuses(scope.statuses().iter().copied())
                .for_rider(courier_id),
        )?;
        let stops: Vec<Stop> = orders.iter().map(Order::to_stop).collect();
        let Some(first) = stops.first() else {
            log::debug!("{courier_id} has no stops to sequence");
            return Ok(None);
        };

        let start = courier.location.unwrap_or(first.location());
        let planned = sequence(start, &stops, courier.capacity)?;
        let late_orders = window_violations(
            Utc::now(),
            self.config.average_speed_kmh,
            start,
            &planned.ordered_stops,
        )?
        .into_iter()
        .filter_map(|violation| violation.order_id)
        .collect();

        let points = courier
            .location
            .into_iter()
            .chain(planned.ordered_stops.iter().map(Stop::location))
            .collect();
        let request = RouteRequest::through(points).avoiding(avoid);
        let (path, enrichment) = self.enrich_route(request).await;
        log::debug!(
            "{courier_id} re-sequenced {} stops ({} excluded)",
            planned.ordered_stops.len(),
            planned.excluded.len()
        );

        Ok(Some(RouteResult {
            courier_id,
            ordered_stops: planned.ordered_stops,
            excluded: planned.excluded,
            late_orders,
            path,
            enrichment,
        }))
    }

    async fn enrich_route(&self, request: RouteRequest) -> (RouteGeometry, Enrichment) {
        let Some(provider) = self.provider.clone() else {
            return enrich(None, &request);
        };
        let timeout = self.config.enrichment_timeout;
        let fallback_request = request.clone();
        let task = tokio::task::spawn_blocking(move || enrich(Some(provider.as_ref()), &request));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(enriched)) => enriched,
            Ok(Err(err)) => {
                log::warn!("road routing task failed, using straight-line geometry: {err}");
                route::fallback(&fallback_request, format!("road routing task failed: {err}"))
            }
            Err(_) => {
                log::warn!("road routing exceeded {timeout:?}, using straight-line geometry");
                route::fallback(
                    &fallback_request,
                    format!("road routing timed out after {timeout:?}"),
                )
            }
        }
    }
}
