//! Typed state-change events broadcast to live subscribers.
//!
//! On the wire each event is an envelope `{"type": ..., "data": ...}`.

use crate::{CourierId, OrderId, OrderStatus, RouteResult};

/// A change observers may want to react to.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", content = "data", rename_all = "snake_case")
)]
pub enum DispatchEvent {
    /// A courier's visiting sequence changed.
    RouteUpdated {
        /// Courier whose route changed.
        rider_id: CourierId,
        /// The new route.
        route: RouteResult,
    },
    /// One order changed hands or state under its courier.
    OrderAssigned {
        /// Affected order.
        order_id: OrderId,
        /// Owning courier.
        rider_id: CourierId,
        /// Order status after the change.
        status: OrderStatus,
    },
    /// A bulk assignment pass finished.
    OrdersAssigned {
        /// Orders assigned in the pass.
        count: usize,
        /// Distinct couriers that received work.
        riders_used: usize,
    },
    /// An order was cancelled.
    OrderCancelled {
        /// Cancelled order.
        order_id: OrderId,
        /// Courier that owned it before cancellation.
        rider_id: Option<CourierId>,
        /// Status before cancellation.
        old_status: OrderStatus,
    },
    /// An order was removed permanently.
    OrderDeleted {
        /// Removed order.
        order_id: OrderId,
        /// Courier that owned it before removal.
        rider_id: Option<CourierId>,
    },
    /// A courier reported a new position.
    RiderUpdate {
        /// Reporting courier.
        rider_id: CourierId,
        /// Latitude.
        lat: f64,
        /// Longitude.
        lng: f64,
        /// Display name.
        name: String,
    },
}

impl DispatchEvent {
    /// Envelope `type` tag for this event.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RouteUpdated { .. } => "route_updated",
            Self::OrderAssigned { .. } => "order_assigned",
            Self::OrdersAssigned { .. } => "orders_assigned",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::OrderDeleted { .. } => "order_deleted",
            Self::RiderUpdate { .. } => "rider_update",
        }
    }

    /// Render the `{type, data}` JSON envelope.
    #[cfg(feature = "serde")]
    pub fn to_envelope(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
