//! Live re-optimization of courier routes.
//!
//! [`ReoptimizationCoordinator`] reacts to order lifecycle events (pickup,
//! cancellation, delivery, deletion and assignment) by committing the change
//! through a [`dispatch_core::DispatchStore`], re-sequencing only the
//! couriers it touched and publishing the result through a
//! [`ChangeNotifier`]. Work on one courier is serialized; different couriers
//! proceed in parallel.
//!
//! The crate is async and expects to run inside a Tokio runtime. Road
//! routing is delegated to an optional [`dispatch_core::RouteProvider`] on
//! the blocking pool.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod coordinator;
pub mod error;
pub mod locks;
pub mod notifier;

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;

pub use coordinator::{
    AssignmentOutcome, CoordinatorConfig, DEFAULT_AVERAGE_SPEED_KMH, DEFAULT_ENRICHMENT_TIMEOUT,
    LifecycleOutcome, ReoptimizationCoordinator, RouteScope,
};
pub use error::DispatchError;
pub use locks::{CourierGuard, CourierLocks, FleetGuard};
pub use notifier::{
    ChangeNotifier, ChannelSubscriber, DeliveryError, DeliveryFailure, DeliveryReport, Subscriber,
    SubscriberId,
};
