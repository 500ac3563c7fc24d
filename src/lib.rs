//! Facade crate for the courier dispatch engine.
//!
//! This crate re-exports the domain model and planners, and exposes the road
//! routing provider and the re-optimization service behind feature flags.

#![forbid(unsafe_code)]

pub use dispatch_core::{
    AvoidZone, ChangeSet, Courier, CourierId, CourierStats, CourierStatus, DispatchEvent,
    DispatchStore, Enrichment, FleetSnapshot, GeoError, MemoryDispatchStore, Order, OrderId,
    OrderStats, OrderStatus, Priority, RouteGeometry, RouteProvider, RouteRequest, RouteResult,
    RoutingError, Stop, StoreError, TimeWindow, TrafficLog,
};

#[cfg(feature = "store-sqlite")]
pub use dispatch_core::{SqliteDispatchStore, SqliteStoreError};

pub use dispatch_planner::{
    AssignmentPlan, ClusterError, CourierPool, auto_assign, cluster_orders, force_assign_pending,
    sequence,
};

#[cfg(feature = "http-routing")]
pub use dispatch_data::routing::{GraphHopperConfig, GraphHopperRouteProvider};

#[cfg(feature = "service")]
pub use dispatch_service::{
    ChangeNotifier, ChannelSubscriber, CoordinatorConfig, DispatchError,
    ReoptimizationCoordinator, Subscriber,
};
