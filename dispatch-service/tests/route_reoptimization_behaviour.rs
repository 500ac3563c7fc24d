//! Behavioural coverage for the re-optimization coordinator.

use std::cell::RefCell;
use std::sync::Arc;

use dispatch_core::test_support::{courier_at, order_at};
use dispatch_core::{
    CourierId, CourierStatus, DispatchStore, FleetSnapshot, MemoryDispatchStore, Order, OrderId,
    OrderStatus, RouteProvider,
};
use dispatch_data::routing::test_support::StubRouteProvider;
use dispatch_service::test_support::RecordingSubscriber;
use dispatch_service::{ChangeNotifier, LifecycleOutcome, ReoptimizationCoordinator};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Builder;

const FIRST_COURIER: CourierId = CourierId(1);
const IN_TRANSIT: OrderId = OrderId(10);
const ASSIGNED: OrderId = OrderId(11);

fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}

fn owned(mut order: Order, courier: u64, status: OrderStatus) -> Order {
    order.rider_id = Some(CourierId(courier));
    order.status = status;
    order
}

#[derive(Default)]
struct CoordinatorWorld {
    snapshot: RefCell<FleetSnapshot>,
    provider: RefCell<Option<Arc<dyn RouteProvider>>>,
    store: RefCell<Option<Arc<MemoryDispatchStore>>>,
    events: Arc<RecordingSubscriber>,
}

impl CoordinatorWorld {
    fn coordinator(&self) -> ReoptimizationCoordinator {
        let store = Arc::new(
            MemoryDispatchStore::from_snapshot(self.snapshot.borrow().clone())
                .expect("fleet should be valid"),
        );
        self.store.replace(Some(Arc::clone(&store)));
        let notifier = Arc::new(ChangeNotifier::default());
        notifier.subscribe(self.events.clone());
        let coordinator = ReoptimizationCoordinator::new(store, notifier);
        match self.provider.borrow().clone() {
            Some(provider) => coordinator.with_provider(provider),
            None => coordinator,
        }
    }

    fn run<F, Fut>(&self, op: F) -> LifecycleOutcome
    where
        F: FnOnce(ReoptimizationCoordinator) -> Fut,
        Fut: std::future::Future<Output = LifecycleOutcome>,
    {
        block_on(op(self.coordinator()))
    }

    fn stored_order(&self, id: OrderId) -> Order {
        self.store
            .borrow()
            .as_ref()
            .expect("coordinator should have run")
            .order(id)
            .expect("order should exist")
    }
}

#[fixture]
fn world() -> CoordinatorWorld {
    CoordinatorWorld::default()
}

// --- Given steps ---

#[given("two couriers each carrying orders in Bangalore")]
fn given_two_couriers(world: &CoordinatorWorld) {
    world.snapshot.replace(FleetSnapshot {
        orders: vec![
            owned(order_at(10, 12.9716, 77.5946), 1, OrderStatus::InTransit),
            owned(order_at(11, 12.9750, 77.6010), 1, OrderStatus::Assigned),
            owned(order_at(20, 12.9300, 77.6200), 2, OrderStatus::InTransit),
        ],
        couriers: vec![
            courier_at(1, "Asha", 12.9600, 77.5900).with_status(CourierStatus::Busy),
            courier_at(2, "Ravi", 12.9200, 77.6300).with_status(CourierStatus::Busy),
        ],
    });
}

#[given("the road-routing server is unreachable")]
fn given_unreachable(world: &CoordinatorWorld) {
    world
        .provider
        .replace(Some(Arc::new(StubRouteProvider::unreachable())));
}

#[given("one courier and three nearby pending orders")]
fn given_three_orders(world: &CoordinatorWorld) {
    world.snapshot.replace(FleetSnapshot {
        orders: vec![
            order_at(1, 12.9716, 77.5946),
            order_at(2, 12.9720, 77.5950),
            order_at(3, 12.9730, 77.5960),
        ],
        couriers: vec![courier_at(7, "Asha", 12.9600, 77.5900)],
    });
}

// --- When steps ---

#[when("the in-transit order of the first courier is cancelled")]
fn when_cancelled(world: &CoordinatorWorld) {
    world.run(|coordinator| async move {
        coordinator.cancel(IN_TRANSIT).await.expect("cancel")
    });
}

#[when("the assigned order of the first courier is picked up")]
fn when_picked_up(world: &CoordinatorWorld) {
    world.run(|coordinator| async move {
        coordinator.pick_up(ASSIGNED).await.expect("pick up")
    });
}

#[when("automatic assignment runs")]
fn when_auto_assign(world: &CoordinatorWorld) {
    world.run(|coordinator| async move {
        let outcome = coordinator.auto_assign().await.expect("auto assign");
        LifecycleOutcome {
            orders: Vec::new(),
            routes: outcome.routes,
        }
    });
}

// --- Then steps ---

#[then("exactly one route update is published")]
fn then_one_route(world: &CoordinatorWorld) {
    let routes = world
        .events
        .kinds()
        .into_iter()
        .filter(|kind| kind == "route_updated")
        .count();
    assert_eq!(routes, 1);
}

#[then("the route update belongs to the first courier")]
fn then_first_courier(world: &CoordinatorWorld) {
    let envelope = world
        .events
        .envelopes()
        .into_iter()
        .find(|envelope| envelope["type"] == "route_updated")
        .expect("route update");
    assert_eq!(envelope["data"]["rider_id"], FIRST_COURIER.0);
}

#[then("the cancelled order has no courier")]
fn then_cancelled(world: &CoordinatorWorld) {
    let order = world.stored_order(IN_TRANSIT);
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.rider_id, None);
}

#[then("the published events are route_updated then order_assigned")]
fn then_event_order(world: &CoordinatorWorld) {
    assert_eq!(
        world.events.kinds(),
        vec!["route_updated".to_owned(), "order_assigned".to_owned()]
    );
}

#[then("the published route is 0 metres long with straight-line geometry")]
fn then_fallback(world: &CoordinatorWorld) {
    let envelope = world
        .events
        .envelopes()
        .into_iter()
        .find(|envelope| envelope["type"] == "route_updated")
        .expect("route update");
    let route = &envelope["data"]["route"];
    assert_eq!(route["path"]["distance_m"], 0.0);
    assert_eq!(route["path"]["time_ms"], 0);
    assert_eq!(route["enrichment"]["kind"], "straight_line");
}

#[then("all three orders belong to that courier")]
fn then_all_assigned(world: &CoordinatorWorld) {
    for id in 1..=3 {
        let order = world.stored_order(OrderId(id));
        assert_eq!(order.status, OrderStatus::Assigned);
        assert_eq!(order.rider_id, Some(CourierId(7)));
    }
}

#[then("the summary reports 3 orders across 1 courier")]
fn then_summary(world: &CoordinatorWorld) {
    let summary = world
        .events
        .envelopes()
        .into_iter()
        .find(|envelope| envelope["type"] == "orders_assigned")
        .expect("summary");
    assert_eq!(summary["data"]["count"], 3);
    assert_eq!(summary["data"]["riders_used"], 1);
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/route_reoptimization.feature", name = $title)]
        fn $fn_name(world: CoordinatorWorld) {
            let _ = world;
        }
    };
}

register_scenario!(
    cancelling_in_transit_order,
    "cancelling an in-transit order re-sequences one courier"
);
register_scenario!(
    picking_up_order,
    "picking up an order publishes its route first"
);
register_scenario!(
    unreachable_road_routing,
    "unreachable road routing falls back to straight lines"
);
register_scenario!(
    three_nearby_orders,
    "three nearby orders go to the only courier"
);
