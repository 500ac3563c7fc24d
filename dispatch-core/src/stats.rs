//! Aggregate counts over orders and couriers.

use geo::Coord;

use crate::{Courier, CourierId, CourierStatus, Order, OrderStatus};

/// Number of orders in each lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderStats {
    /// All orders.
    pub total: usize,
    /// Waiting for a courier.
    pub pending: usize,
    /// Owned, not collected.
    pub assigned: usize,
    /// Collected, on the way.
    pub in_transit: usize,
    /// Handed over.
    pub delivered: usize,
    /// Withdrawn.
    pub cancelled: usize,
}

impl OrderStats {
    /// Count `orders` by status.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use dispatch_core::{Order, OrderId, OrderStats, Stop};
    ///
    /// let stop = Stop::new(Coord { x: 77.6, y: 12.9 })?;
    /// let orders = vec![Order::pending(OrderId(1), stop.clone()), Order::pending(OrderId(2), stop)];
    /// let stats = OrderStats::tally(&orders);
    /// assert_eq!((stats.total, stats.pending), (2, 2));
    /// # Ok::<(), dispatch_core::geodesy::GeoError>(())
    /// ```
    pub fn tally<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        orders.into_iter().fold(Self::default(), |mut stats, order| {
            stats.total += 1;
            match order.status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Assigned => stats.assigned += 1,
                OrderStatus::InTransit => stats.in_transit += 1,
                OrderStatus::Delivered => stats.delivered += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
            stats
        })
    }
}

/// Workload summary for one courier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CourierStats {
    /// Courier summarised.
    pub courier_id: CourierId,
    /// Display name.
    pub name: String,
    /// Availability.
    pub status: CourierStatus,
    /// Orders ever attached to the courier and still owned by it.
    pub total_orders: usize,
    /// Orders still to visit.
    pub active_orders: usize,
    /// Last reported position.
    pub current_location: Option<Coord<f64>>,
}

impl CourierStats {
    /// Summarise `courier` over `orders`, ignoring orders it does not own.
    pub fn tally<'a>(courier: &Courier, orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let (total_orders, active_orders) = orders
            .into_iter()
            .filter(|order| order.rider_id == Some(courier.id))
            .fold((0, 0), |(total, active), order| {
                (total + 1, active + usize::from(order.status.is_active()))
            });
        Self {
            courier_id: courier.id,
            name: courier.name.clone(),
            status: courier.status,
            total_orders,
            active_orders,
            current_location: courier.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderId, Stop};
    use rstest::rstest;

    fn order(id: u64, status: OrderStatus, rider: Option<u64>) -> Order {
        let mut order = Order::pending(
            OrderId(id),
            Stop::new(Coord { x: 77.6, y: 12.9 }).expect("valid stop"),
        );
        order.status = status;
        order.rider_id = rider.map(CourierId);
        order
    }

    #[rstest]
    fn order_stats_count_every_status() {
        let orders = [
            order(1, OrderStatus::Pending, None),
            order(2, OrderStatus::Assigned, Some(1)),
            order(3, OrderStatus::InTransit, Some(1)),
            order(4, OrderStatus::Delivered, Some(1)),
            order(5, OrderStatus::Cancelled, None),
        ];
        let stats = OrderStats::tally(&orders);
        assert_eq!(
            stats,
            OrderStats {
                total: 5,
                pending: 1,
                assigned: 1,
                in_transit: 1,
                delivered: 1,
                cancelled: 1,
            }
        );
    }

    #[rstest]
    fn courier_stats_split_active_from_total() {
        let courier = Courier::available(CourierId(1), "Asha");
        let orders = [
            order(2, OrderStatus::Assigned, Some(1)),
            order(3, OrderStatus::InTransit, Some(1)),
            order(4, OrderStatus::Delivered, Some(1)),
            order(6, OrderStatus::Assigned, Some(2)),
        ];
        let stats = CourierStats::tally(&courier, &orders);
        assert_eq!((stats.total_orders, stats.active_orders), (3, 2));
        assert_eq!(stats.name, "Asha");
    }
}
