//! Persistence collaborator for orders and couriers.
//!
//! Reads return owned snapshots. Writes are expressed as a [`ChangeSet`]
//! committed all-or-nothing: every change carries the revision the entity
//! had when it was read, and the store rejects the whole batch with
//! [`StoreError::ConcurrentMutationConflict`] when any of those revisions has
//! moved on. A successful commit bumps the revision of every changed entity.

use std::fmt;

use thiserror::Error;

use crate::{
    Courier, CourierError, CourierId, CourierStatus, Order, OrderId, OrderInvariantError,
    OrderStatus, StopError,
};

mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryDispatchStore;
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteDispatchStore, SqliteStoreError};

/// Entity named by a store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    /// An order.
    Order(OrderId),
    /// A courier.
    Courier(CourierId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order(id) => id.fmt(f),
            Self::Courier(id) => id.fmt(f),
        }
    }
}

/// Errors surfaced by [`DispatchStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer changed an entity after it was read.
    #[error("{entity} changed concurrently: expected revision {expected}, found {found}")]
    ConcurrentMutationConflict {
        /// Entity whose revision moved.
        entity: EntityRef,
        /// Revision recorded in the change set.
        expected: u64,
        /// Revision currently stored.
        found: u64,
    },
    /// No order with this id exists.
    #[error("{0} not found")]
    OrderNotFound(OrderId),
    /// No courier with this id exists.
    #[error("{0} not found")]
    CourierNotFound(CourierId),
    /// A change would break the rider/status pairing rules.
    #[error(transparent)]
    InvariantViolation(#[from] OrderInvariantError),
    /// An order's stop holds values its constructors reject.
    #[error("{order_id} has an invalid stop: {source}")]
    InvalidStop {
        /// Offending order.
        order_id: OrderId,
        /// What was wrong with the stop.
        #[source]
        source: StopError,
    },
    /// A courier holds values its builders reject.
    #[error("{courier_id} is invalid: {source}")]
    InvalidCourier {
        /// Offending courier.
        courier_id: CourierId,
        /// What was wrong with the courier.
        #[source]
        source: CourierError,
    },
    /// The storage backend failed.
    #[error("storage backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Selects orders by status and owning courier.
///
/// An empty filter matches every order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    statuses: Vec<OrderStatus>,
    rider_id: Option<CourierId>,
}

impl OrderFilter {
    /// Match every order.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Match orders in `status` (in addition to statuses already listed).
    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    /// Match orders in any of `statuses`.
    #[must_use]
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        statuses.into_iter().fold(self, Self::with_status)
    }

    /// Match orders owned by `rider_id`.
    #[must_use]
    pub const fn for_rider(mut self, rider_id: CourierId) -> Self {
        self.rider_id = Some(rider_id);
        self
    }

    /// Statuses to match; empty means any.
    #[must_use]
    pub fn statuses(&self) -> &[OrderStatus] {
        &self.statuses
    }

    /// Owning courier to match, if restricted.
    #[must_use]
    pub const fn rider_id(&self) -> Option<CourierId> {
        self.rider_id
    }

    /// Whether `order` passes the filter.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use dispatch_core::{CourierId, Order, OrderFilter, OrderId, OrderStatus, Stop};
    ///
    /// let order = Order::pending(OrderId(1), Stop::new(Coord { x: 77.6, y: 12.9 })?);
    /// assert!(OrderFilter::all().matches(&order));
    /// assert!(OrderFilter::all().with_status(OrderStatus::Pending).matches(&order));
    /// assert!(!OrderFilter::all().for_rider(CourierId(3)).matches(&order));
    /// # Ok::<(), dispatch_core::geodesy::GeoError>(())
    /// ```
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&order.status);
        let rider_ok = self.rider_id.is_none_or(|rider| order.rider_id == Some(rider));
        status_ok && rider_ok
    }
}

/// Selects couriers by status. An empty filter matches every courier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourierFilter {
    statuses: Vec<CourierStatus>,
}

impl CourierFilter {
    /// Match every courier.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Match couriers in `status`.
    #[must_use]
    pub fn with_status(mut self, status: CourierStatus) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    /// Whether `courier` passes the filter.
    #[must_use]
    pub fn matches(&self, courier: &Courier) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&courier.status)
    }
}

/// One mutation inside a [`ChangeSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Insert or replace an order. Its `revision` is the one last read.
    PutOrder(Order),
    /// Remove an order last read at `revision`.
    DeleteOrder {
        /// Order to remove.
        id: OrderId,
        /// Revision last read.
        revision: u64,
    },
    /// Insert or replace a courier. Its `revision` is the one last read.
    PutCourier(Courier),
}

impl Change {
    /// Entity touched by this change.
    #[must_use]
    pub const fn entity(&self) -> EntityRef {
        match self {
            Self::PutOrder(order) => EntityRef::Order(order.id),
            Self::DeleteOrder { id, .. } => EntityRef::Order(*id),
            Self::PutCourier(courier) => EntityRef::Courier(courier.id),
        }
    }

    /// Revision the writer expects to find in the store.
    ///
    /// Zero means the entity is expected to be absent.
    #[must_use]
    pub const fn expected_revision(&self) -> u64 {
        match self {
            Self::PutOrder(order) => order.revision,
            Self::DeleteOrder { revision, .. } => *revision,
            Self::PutCourier(courier) => courier.revision,
        }
    }
}

/// An all-or-nothing batch of mutations.
///
/// At most one change is kept per entity; a later change replaces an earlier
/// one for the same id.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_core::{ChangeSet, Order, OrderId, Stop};
///
/// let order = Order::pending(OrderId(1), Stop::new(Coord { x: 77.6, y: 12.9 })?);
/// let mut changes = ChangeSet::default();
/// changes.put_order(order.clone());
/// changes.put_order(order);
/// assert_eq!(changes.len(), 1);
/// # Ok::<(), dispatch_core::geodesy::GeoError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Stage an order insert or update.
    pub fn put_order(&mut self, order: Order) -> &mut Self {
        self.push(Change::PutOrder(order))
    }

    /// Stage removal of `order` at the revision it was read with.
    pub fn delete_order(&mut self, order: &Order) -> &mut Self {
        self.push(Change::DeleteOrder {
            id: order.id,
            revision: order.revision,
        })
    }

    /// Stage a courier insert or update.
    pub fn put_courier(&mut self, courier: Courier) -> &mut Self {
        self.push(Change::PutCourier(courier))
    }

    fn push(&mut self, change: Change) -> &mut Self {
        let entity = change.entity();
        self.changes.retain(|existing| existing.entity() != entity);
        self.changes.push(change);
        self
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of staged changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Staged changes in staging order.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// Check every staged order and courier before anything is written.
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        self.changes.iter().try_for_each(|change| match change {
            Change::PutOrder(order) => check_order(order),
            Change::PutCourier(courier) => check_courier(courier),
            Change::DeleteOrder { .. } => Ok(()),
        })
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Every order and courier at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FleetSnapshot {
    /// Orders sorted by id.
    #[cfg_attr(feature = "serde", serde(default))]
    pub orders: Vec<Order>,
    /// Couriers sorted by id.
    #[cfg_attr(feature = "serde", serde(default))]
    pub couriers: Vec<Courier>,
}

/// Read and write access to dispatch state.
///
/// Listings are returned sorted by id so that planning over them is
/// deterministic.
pub trait DispatchStore: Send + Sync {
    /// Fetch one order.
    fn order(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Fetch every order matching `filter`.
    fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Fetch one courier.
    fn courier(&self, id: CourierId) -> Result<Courier, StoreError>;

    /// Fetch every courier matching `filter`.
    fn couriers(&self, filter: &CourierFilter) -> Result<Vec<Courier>, StoreError>;

    /// Apply `changes` atomically.
    ///
    /// Fails without applying anything when a revision moved, an order to
    /// delete is missing, an order would break the rider/status rules, or an
    /// order names a courier that does not exist.
    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;

    /// Every order and courier.
    fn snapshot(&self) -> Result<FleetSnapshot, StoreError> {
        Ok(FleetSnapshot {
            orders: self.orders(&OrderFilter::all())?,
            couriers: self.couriers(&CourierFilter::all())?,
        })
    }
}

fn check_revision(entity: EntityRef, expected: u64, found: u64) -> Result<(), StoreError> {
    if expected == found {
        return Ok(());
    }
    Err(StoreError::ConcurrentMutationConflict {
        entity,
        expected,
        found,
    })
}

/// Rider/status pairing plus the stop rules enforced by [`crate::Stop`].
pub(crate) fn check_order(order: &Order) -> Result<(), StoreError> {
    order.check_invariants()?;
    order
        .stop
        .validate()
        .map_err(|source| StoreError::InvalidStop {
            order_id: order.id,
            source,
        })
}

pub(crate) fn check_courier(courier: &Courier) -> Result<(), StoreError> {
    courier
        .validate()
        .map_err(|source| StoreError::InvalidCourier {
            courier_id: courier.id,
            source,
        })
}
