//! Core domain types for the courier dispatch engine.
//!
//! Orders, couriers and stops carry basic validation so that downstream
//! planners can trust their inputs. Constructors return `Result` to surface
//! invalid coordinates early. The crate also defines the two collaborator
//! seams the engine depends on: [`DispatchStore`] for persistence and
//! [`RouteProvider`] for road-routing enrichment.

pub mod courier;
pub mod event;
pub mod geodesy;
pub mod order;
pub mod route;
pub mod stats;
pub mod stop;
pub mod store;
pub mod traffic;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use courier::{Courier, CourierError, CourierId, CourierStatus, DEFAULT_CAPACITY};
pub use event::DispatchEvent;
pub use geodesy::GeoError;
pub use order::{Order, OrderId, OrderInvariantError, OrderStatus};
pub use route::{
    AvoidZone, DEFAULT_AVOID_RADIUS_M, Enrichment, RouteGeometry, RouteProvider, RouteRequest,
    RouteResult, RoutingError,
};
pub use stats::{CourierStats, OrderStats};
pub use stop::{DEFAULT_WEIGHT, Priority, Stop, StopError, TimeWindow, TimeWindowError};
pub use store::{
    Change, ChangeSet, CourierFilter, DispatchStore, EntityRef, FleetSnapshot,
    MemoryDispatchStore, OrderFilter, StoreError,
};
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteDispatchStore, SqliteStoreError};
pub use traffic::TrafficLog;
