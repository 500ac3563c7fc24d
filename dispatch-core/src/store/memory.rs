//! Mutex-guarded in-memory store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    Change, ChangeSet, CourierFilter, DispatchStore, FleetSnapshot, OrderFilter, StoreError,
    check_courier, check_order, check_revision,
};
use crate::{Courier, CourierId, Order, OrderId};

#[derive(Debug, Clone, Default)]
struct Fleet {
    orders: BTreeMap<OrderId, Order>,
    couriers: BTreeMap<CourierId, Courier>,
}

impl Fleet {
    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        changes.check_invariants()?;
        for change in changes {
            let entity = change.entity();
            let expected = change.expected_revision();
            match change {
                Change::PutOrder(mut order) => {
                    let found = self.orders.get(&order.id).map_or(0, |o| o.revision);
                    check_revision(entity, expected, found)?;
                    order.revision = found + 1;
                    self.orders.insert(order.id, order);
                }
                Change::DeleteOrder { id, .. } => {
                    let stored = self.orders.get(&id).ok_or(StoreError::OrderNotFound(id))?;
                    check_revision(entity, expected, stored.revision)?;
                    self.orders.remove(&id);
                }
                Change::PutCourier(mut courier) => {
                    let found = self.couriers.get(&courier.id).map_or(0, |c| c.revision);
                    check_revision(entity, expected, found)?;
                    courier.revision = found + 1;
                    self.couriers.insert(courier.id, courier);
                }
            }
        }
        self.check_riders_exist()
    }

    fn check_riders_exist(&self) -> Result<(), StoreError> {
        self.orders
            .values()
            .filter_map(|order| order.rider_id)
            .find(|rider| !self.couriers.contains_key(rider))
            .map_or(Ok(()), |rider| Err(StoreError::CourierNotFound(rider)))
    }
}

/// In-memory [`DispatchStore`].
///
/// Commits are applied to a staged copy of the fleet and swapped in only when
/// every change succeeds.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_core::{ChangeSet, DispatchStore, MemoryDispatchStore, Order, OrderId, Stop};
///
/// let store = MemoryDispatchStore::default();
/// let mut changes = ChangeSet::default();
/// changes.put_order(Order::pending(OrderId(1), Stop::new(Coord { x: 77.6, y: 12.9 })?));
/// store.commit(changes)?;
/// assert_eq!(store.order(OrderId(1))?.revision, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryDispatchStore {
    fleet: Mutex<Fleet>,
}

impl MemoryDispatchStore {
    /// Build a store holding `snapshot` as-is, keeping its revisions.
    ///
    /// Every order and courier is checked the way a commit would check it.
    pub fn from_snapshot(snapshot: FleetSnapshot) -> Result<Self, StoreError> {
        let fleet = Fleet {
            orders: snapshot
                .orders
                .into_iter()
                .map(|order| (order.id, order))
                .collect(),
            couriers: snapshot
                .couriers
                .into_iter()
                .map(|courier| (courier.id, courier))
                .collect(),
        };
        fleet.orders.values().try_for_each(check_order)?;
        fleet.couriers.values().try_for_each(check_courier)?;
        fleet.check_riders_exist()?;
        Ok(Self {
            fleet: Mutex::new(fleet),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Fleet> {
        self.fleet.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DispatchStore for MemoryDispatchStore {
    fn order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.lock()
            .orders
            .get(&id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))
    }

    fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect())
    }

    fn courier(&self, id: CourierId) -> Result<Courier, StoreError> {
        self.lock()
            .couriers
            .get(&id)
            .cloned()
            .ok_or(StoreError::CourierNotFound(id))
    }

    fn couriers(&self, filter: &CourierFilter) -> Result<Vec<Courier>, StoreError> {
        Ok(self
            .lock()
            .couriers
            .values()
            .filter(|courier| filter.matches(courier))
            .cloned()
            .collect())
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        let mut fleet = self.lock();
        let mut staged = fleet.clone();
        staged.apply(changes)?;
        *fleet = staged;
        Ok(())
    }
}
