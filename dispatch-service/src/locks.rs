//! Per-courier serialization of re-optimization work.
//!
//! Single-order operations hold the fleet gate for reading plus one mutex
//! per affected courier, taken in ascending id order. Bulk assignment holds
//! the gate for writing, which excludes every other operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use dispatch_core::CourierId;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Lock table keyed by courier.
#[derive(Debug, Default)]
pub struct CourierLocks {
    gate: Arc<RwLock<()>>,
    couriers: StdMutex<HashMap<CourierId, Arc<Mutex<()>>>>,
}

/// Held locks for a set of couriers. Dropping it releases them.
#[derive(Debug)]
pub struct CourierGuard {
    held: Vec<(CourierId, OwnedMutexGuard<()>)>,
    _gate: OwnedRwLockReadGuard<()>,
}

impl CourierGuard {
    /// Couriers covered by this guard, ascending.
    #[must_use]
    pub fn couriers(&self) -> Vec<CourierId> {
        self.held.iter().map(|(id, _)| *id).collect()
    }
}

/// Exclusive hold over the whole fleet.
#[derive(Debug)]
pub struct FleetGuard {
    _gate: OwnedRwLockWriteGuard<()>,
}

impl CourierLocks {
    /// Lock every courier in `ids`.
    ///
    /// Duplicates are ignored and locks are taken in ascending id order, so
    /// two callers with overlapping sets cannot deadlock.
    pub async fn lock(&self, ids: impl IntoIterator<Item = CourierId>) -> CourierGuard {
        let mut ids: Vec<CourierId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let gate = Arc::clone(&self.gate).read_owned().await;
        let mut held = Vec::with_capacity(ids.len());
        for id in ids {
            let guard = self.mutex_for(id).lock_owned().await;
            held.push((id, guard));
        }
        CourierGuard { held, _gate: gate }
    }

    /// Wait for every in-flight operation and block new ones.
    pub async fn lock_fleet(&self) -> FleetGuard {
        FleetGuard {
            _gate: Arc::clone(&self.gate).write_owned().await,
        }
    }

    fn mutex_for(&self, id: CourierId) -> Arc<Mutex<()>> {
        let mut table = self
            .couriers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(id).or_default())
    }
}
