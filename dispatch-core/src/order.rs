//! Delivery orders and their lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{CourierId, Stop};

/// Identifier of a delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order#{}", self.0)
    }
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OrderStatus {
    /// Waiting for a courier.
    #[default]
    Pending,
    /// Owned by a courier, not yet collected.
    Assigned,
    /// Collected and on the way.
    InTransit,
    /// Handed over to the customer.
    Delivered,
    /// Withdrawn before delivery.
    Cancelled,
}

impl OrderStatus {
    /// Statuses that require an owning courier.
    pub const fn requires_rider(self) -> bool {
        matches!(self, Self::Assigned | Self::InTransit)
    }

    /// Whether the order still needs visiting by its courier.
    pub const fn is_active(self) -> bool {
        self.requires_rider()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Breach of the rider/status pairing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderInvariantError {
    /// An order without a courier is in a state that needs one.
    #[error("{order_id} is {status} but has no courier")]
    MissingRider {
        /// Offending order.
        order_id: OrderId,
        /// Status found.
        status: OrderStatus,
    },
    /// An order owned by a courier is in a state that forbids one.
    #[error("{order_id} is {status} but is still owned by {rider_id}")]
    UnexpectedRider {
        /// Offending order.
        order_id: OrderId,
        /// Status found.
        status: OrderStatus,
        /// Courier still attached.
        rider_id: CourierId,
    },
}

/// A customer delivery.
///
/// `revision` is bumped by the store on every committed change and acts as
/// the optimistic concurrency token for [`crate::ChangeSet`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    /// Identity.
    pub id: OrderId,
    /// Where the order goes and under which constraints.
    pub stop: Stop,
    /// Lifecycle state.
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: OrderStatus,
    /// Owning courier.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rider_id: Option<CourierId>,
    /// Recipient name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub customer_name: String,
    /// Free-form delivery address.
    #[cfg_attr(feature = "serde", serde(default))]
    pub delivery_address: String,
    /// Creation instant.
    #[cfg_attr(feature = "serde", serde(default = "Utc::now"))]
    pub created_at: DateTime<Utc>,
    /// Store revision.
    #[cfg_attr(feature = "serde", serde(default))]
    pub revision: u64,
}

impl Order {
    /// Construct a pending, unowned order.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use dispatch_core::{Order, OrderId, OrderStatus, Stop};
    ///
    /// let order = Order::pending(OrderId(7), Stop::new(Coord { x: 77.6, y: 12.9 })?);
    /// assert_eq!(order.status, OrderStatus::Pending);
    /// assert_eq!(order.stop.order_id(), Some(OrderId(7)));
    /// assert!(order.check_invariants().is_ok());
    /// # Ok::<(), dispatch_core::geodesy::GeoError>(())
    /// ```
    pub fn pending(id: OrderId, stop: Stop) -> Self {
        Self {
            id,
            stop: stop.for_order(id),
            status: OrderStatus::Pending,
            rider_id: None,
            customer_name: String::new(),
            delivery_address: String::new(),
            created_at: Utc::now(),
            revision: 0,
        }
    }

    /// Set the customer details.
    #[must_use]
    pub fn with_customer(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.customer_name = name.into();
        self.delivery_address = address.into();
        self
    }

    /// Planning snapshot of this order, tagged with its id.
    pub fn to_stop(&self) -> Stop {
        self.stop.clone().for_order(self.id)
    }

    /// Verify the rider/status pairing rules.
    pub fn check_invariants(&self) -> Result<(), OrderInvariantError> {
        match (self.status, self.rider_id) {
            (status, None) if status.requires_rider() => Err(OrderInvariantError::MissingRider {
                order_id: self.id,
                status,
            }),
            (status @ (OrderStatus::Pending | OrderStatus::Cancelled), Some(rider_id)) => {
                Err(OrderInvariantError::UnexpectedRider {
                    order_id: self.id,
                    status,
                    rider_id,
                })
            }
            _ => Ok(()),
        }
    }
}
