//! Unit tests for the `assign` and `stats` commands and configuration layering.

use super::helpers::{FleetFiles, busy_fleet, pending_fleet, write_utf8};
use super::*;
use crate::assign::{AssignArgs, AssignConfig, AssignReport, execute_assign};
use crate::stats::{StatsConfig, StatsReport, execute_stats};
use camino::Utf8PathBuf;
use dispatch_core::{CourierId, OrderId, OrderStatus};
use dispatch_planner::DEFAULT_CLUSTER_RADIUS_KM;
use rstest::rstest;

fn assign_config(files: &FleetFiles, force: bool) -> AssignConfig {
    AssignConfig {
        snapshot: files.snapshot().to_path_buf(),
        radius_km: DEFAULT_CLUSTER_RADIUS_KM,
        force,
        output: Some(files.output()),
    }
}

#[rstest]
fn converting_assign_without_snapshot_errors() {
    let err = AssignConfig::try_from(AssignArgs::default()).expect_err("missing snapshot");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_SNAPSHOT);
            assert_eq!(env, ENV_ASSIGN_SNAPSHOT);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
#[case::negative(-1.0)]
#[case::not_a_number(f64::NAN)]
#[case::infinite(f64::INFINITY)]
fn assign_rejects_unusable_radii(#[case] radius_km: f64) {
    let args = AssignArgs {
        snapshot: Some(Utf8PathBuf::from("fleet.json")),
        radius_km: Some(radius_km),
        ..AssignArgs::default()
    };

    let err = AssignConfig::try_from(args).expect_err("radius should be rejected");
    match err {
        CliError::InvalidNumber { field, .. } => assert_eq!(field, ARG_RADIUS_KM),
        other => panic!("expected InvalidNumber, found {other:?}"),
    }
}

#[rstest]
fn assign_defaults_to_clustered_assignment() {
    let args = AssignArgs {
        snapshot: Some(Utf8PathBuf::from("fleet.json")),
        ..AssignArgs::default()
    };

    let config = AssignConfig::try_from(args).expect("config should build");

    assert!(!config.force);
    assert_eq!(config.radius_km, DEFAULT_CLUSTER_RADIUS_KM);
    assert_eq!(config.output, None);
}

#[rstest]
fn clustered_assignment_gives_nearby_orders_to_one_courier() {
    let files = FleetFiles::new(&pending_fleet());

    let report = execute_assign(&assign_config(&files, false)).expect("assign");

    assert_eq!(report.assigned, 3);
    assert_eq!(report.couriers, [CourierId(1)]);
    assert!(report.infeasible.is_empty());
    assert_eq!(report.routes.len(), 1);
    assert_eq!(report.routes[0].ordered_stops.len(), 3);
    let kinds: Vec<_> = report
        .events
        .iter()
        .filter_map(|event| event["type"].as_str())
        .collect();
    assert_eq!(kinds, ["route_updated", "orders_assigned"]);

    let updated = files.read_output();
    assert!(updated.orders.iter().all(|order| {
        order.status == OrderStatus::Assigned && order.rider_id == Some(CourierId(1))
    }));
}

#[rstest]
fn forced_assignment_uses_the_nearest_courier_even_when_unavailable() {
    let mut fleet = busy_fleet();
    fleet.couriers.retain(|courier| courier.id == CourierId(1));
    let files = FleetFiles::new(&fleet);

    let report = execute_assign(&assign_config(&files, true)).expect("force assign");

    assert_eq!(report.assigned, 1);
    assert_eq!(report.couriers, [CourierId(1)]);
    let updated = files.read_output();
    let order = updated
        .orders
        .iter()
        .find(|order| order.id == OrderId(30))
        .expect("order 30");
    assert_eq!(order.rider_id, Some(CourierId(1)));
}

#[rstest]
fn clusters_beyond_every_capacity_are_reported() {
    let mut fleet = pending_fleet();
    for courier in &mut fleet.couriers {
        courier.capacity = 1.0;
    }
    let files = FleetFiles::new(&fleet);

    let report = execute_assign(&assign_config(&files, false)).expect("assign");

    assert_eq!(report.assigned, 0);
    assert_eq!(report.infeasible.len(), 1);
    assert_eq!(report.infeasible[0].order_ids.len(), 3);
    assert!(report.events.is_empty());
}

#[rstest]
fn assign_reports_round_trip_through_json() {
    let files = FleetFiles::new(&pending_fleet());
    let config = assign_config(&files, false);
    let mut stdout = Vec::new();

    assign::run_assign_with(
        AssignArgs {
            snapshot: Some(config.snapshot.clone()),
            ..AssignArgs::default()
        },
        &mut stdout,
    )
    .expect("assign command");

    let report: AssignReport = serde_json::from_slice(&stdout).expect("JSON report");
    assert_eq!(report.assigned, 3);
}

#[rstest]
fn snapshots_that_are_not_json_fail_to_parse() {
    let files = FleetFiles::new(&pending_fleet());
    write_utf8(files.snapshot(), b"{ not valid json");

    let err = execute_assign(&assign_config(&files, false)).expect_err("invalid JSON");
    match err {
        CliError::ParseSnapshot { path, .. } => assert_eq!(path, files.snapshot()),
        other => panic!("expected ParseSnapshot, found {other:?}"),
    }
}

#[rstest]
fn fleet_stats_count_orders_by_status() {
    let files = FleetFiles::new(&busy_fleet());
    let config = StatsConfig {
        snapshot: files.snapshot().to_path_buf(),
        courier: None,
    };

    let report = execute_stats(&config).expect("stats");

    match report {
        StatsReport::Orders(stats) => {
            assert_eq!(stats.total, 3);
            assert_eq!(stats.pending, 1);
            assert_eq!(stats.assigned, 1);
            assert_eq!(stats.in_transit, 1);
        }
        other => panic!("expected order stats, found {other:?}"),
    }
}

#[rstest]
fn courier_stats_cover_owned_orders() {
    let files = FleetFiles::new(&busy_fleet());
    let config = StatsConfig {
        snapshot: files.snapshot().to_path_buf(),
        courier: Some(CourierId(1)),
    };

    let report = execute_stats(&config).expect("stats");

    match report {
        StatsReport::Courier(stats) => {
            assert_eq!(stats.name, "Asha");
            assert_eq!(stats.total_orders, 2);
            assert_eq!(stats.active_orders, 2);
        }
        other => panic!("expected courier stats, found {other:?}"),
    }
}

#[rstest]
fn stats_for_unknown_couriers_fail() {
    let files = FleetFiles::new(&busy_fleet());
    let config = StatsConfig {
        snapshot: files.snapshot().to_path_buf(),
        courier: Some(CourierId(99)),
    };

    let err = execute_stats(&config).expect_err("unknown courier");

    assert!(matches!(err, CliError::Dispatch(_)));
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "radius_km": "wide" }));

    let err = assign::config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "snapshot": "from-file.json",
            "radius_km": 2.5,
            "force": true,
        }),
        None,
    );
    composer.push_environment(json!({ "snapshot": "from-env.json" }));
    composer.push_cli(json!({ "radius_km": 1.0 }));

    let config =
        assign::config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.snapshot, Utf8PathBuf::from("from-env.json"));
    assert_eq!(config.radius_km, 1.0);
    assert!(config.force);
}
