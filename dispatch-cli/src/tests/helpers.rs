//! Fleet snapshot fixtures shared by unit tests and behaviour steps.

use camino::{Utf8Path, Utf8PathBuf};
use dispatch_core::test_support::{courier_at, order_at};
use dispatch_core::{CourierId, CourierStatus, FleetSnapshot, Order, OrderStatus};
use tempfile::TempDir;

use crate::fleet::{load_snapshot, save_snapshot};

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write file");
}

/// A temporary directory holding `fleet.json`.
pub(super) struct FleetFiles {
    _dir: TempDir,
    root: Utf8PathBuf,
    snapshot: Utf8PathBuf,
}

impl FleetFiles {
    pub(super) fn new(snapshot: &FleetSnapshot) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let path = root.join("fleet.json");
        save_snapshot(snapshot, &path).expect("write snapshot");
        Self {
            _dir: dir,
            root,
            snapshot: path,
        }
    }

    pub(super) fn snapshot(&self) -> &Utf8Path {
        &self.snapshot
    }

    pub(super) fn output(&self) -> Utf8PathBuf {
        self.root.join("updated.json")
    }

    pub(super) fn read_output(&self) -> FleetSnapshot {
        load_snapshot(&self.output()).expect("updated snapshot")
    }
}

pub(super) fn owned_by(mut order: Order, courier: u64, status: OrderStatus) -> Order {
    order.rider_id = Some(CourierId(courier));
    order.status = status;
    order
}

/// Three pending orders around central Bengaluru and one idle courier.
pub(super) fn pending_fleet() -> FleetSnapshot {
    FleetSnapshot {
        orders: vec![
            order_at(10, 12.9716, 77.5946),
            order_at(11, 12.9730, 77.5960),
            order_at(12, 12.9700, 77.5930),
        ],
        couriers: vec![courier_at(1, "Asha", 12.9600, 77.5800)],
    }
}

/// Courier 1 carries order 10 in transit and owns order 11, still assigned.
/// Order 30 waits for a courier.
pub(super) fn busy_fleet() -> FleetSnapshot {
    FleetSnapshot {
        orders: vec![
            owned_by(order_at(10, 12.9716, 77.5946), 1, OrderStatus::InTransit),
            owned_by(order_at(11, 12.9352, 77.6245), 1, OrderStatus::Assigned),
            order_at(30, 13.0358, 77.5970),
        ],
        couriers: vec![
            courier_at(1, "Asha", 12.9600, 77.5800).with_status(CourierStatus::Busy),
            courier_at(2, "Ravi", 13.0200, 77.6000),
        ],
    }
}
