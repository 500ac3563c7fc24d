//! `assign` command: bulk assignment of pending orders.

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{CourierId, OrderId, RouteResult};
use dispatch_planner::{DEFAULT_CLUSTER_RADIUS_KM, InfeasibleCluster};
use dispatch_service::{AssignmentOutcome, CoordinatorConfig};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

use crate::fleet::{self, Fleet};
use crate::{
    ARG_FORCE, ARG_OUTPUT, ARG_RADIUS_KM, ARG_SNAPSHOT, CliError, ENV_ASSIGN_SNAPSHOT, write_json,
};

/// CLI arguments for the `assign` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Cluster the pending orders of a fleet snapshot and hand each \
                 cluster to the nearest available courier that can carry it. \
                 With --force, every pending order goes to its nearest courier \
                 regardless of capacity or availability.",
    about = "Assign pending orders to couriers"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct AssignArgs {
    /// Path to a JSON fleet snapshot.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) snapshot: Option<Utf8PathBuf>,
    /// Linkage radius for clustering pending orders, in kilometres.
    #[arg(long = ARG_RADIUS_KM, value_name = "km")]
    #[serde(default)]
    pub(crate) radius_km: Option<f64>,
    /// Give every pending order to its nearest courier, ignoring capacity.
    #[arg(
        long = ARG_FORCE,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) force: Option<bool>,
    /// Write the updated fleet snapshot to this path.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl AssignArgs {
    pub(crate) fn into_config(self) -> Result<AssignConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AssignConfig::try_from(merged)
    }
}

/// Resolved `assign` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AssignConfig {
    pub(crate) snapshot: Utf8PathBuf,
    pub(crate) radius_km: f64,
    pub(crate) force: bool,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl TryFrom<AssignArgs> for AssignConfig {
    type Error = CliError;

    fn try_from(args: AssignArgs) -> Result<Self, Self::Error> {
        let snapshot = args.snapshot.ok_or(CliError::MissingArgument {
            field: ARG_SNAPSHOT,
            env: ENV_ASSIGN_SNAPSHOT,
        })?;
        let radius_km = args.radius_km.unwrap_or(DEFAULT_CLUSTER_RADIUS_KM);
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(CliError::InvalidNumber {
                field: ARG_RADIUS_KM,
                value: radius_km,
            });
        }
        Ok(Self {
            snapshot,
            radius_km,
            force: args.force.unwrap_or(false),
            output: args.output,
        })
    }
}

/// Printed result of an assignment pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AssignReport {
    pub(crate) assigned: usize,
    pub(crate) couriers: Vec<CourierId>,
    pub(crate) infeasible: Vec<InfeasibleReport>,
    pub(crate) routes: Vec<RouteResult>,
    pub(crate) events: Vec<Value>,
}

/// A cluster that no courier could carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct InfeasibleReport {
    pub(crate) order_ids: Vec<OrderId>,
    pub(crate) total_weight: f64,
}

impl From<&InfeasibleCluster> for InfeasibleReport {
    fn from(cluster: &InfeasibleCluster) -> Self {
        Self {
            order_ids: cluster.order_ids.clone(),
            total_weight: cluster.total_weight,
        }
    }
}

impl AssignReport {
    fn new(outcome: AssignmentOutcome, events: Vec<Value>) -> Self {
        Self {
            assigned: outcome.assigned,
            couriers: outcome.couriers,
            infeasible: outcome.infeasible.iter().map(InfeasibleReport::from).collect(),
            routes: outcome.routes,
            events,
        }
    }
}

pub(crate) fn run_assign_with(args: AssignArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_assign_config(args)?;
    let report = execute_assign(&config)?;
    write_json(writer, &report)
}

fn resolve_assign_config(args: AssignArgs) -> Result<AssignConfig, CliError> {
    let config = args.into_config()?;
    fleet::require_existing(&config.snapshot, ARG_SNAPSHOT)?;
    Ok(config)
}

pub(crate) fn execute_assign(config: &AssignConfig) -> Result<AssignReport, CliError> {
    let mut fleet = Fleet::open(
        &config.snapshot,
        CoordinatorConfig::default().with_cluster_radius_km(config.radius_km),
    )?;
    let coordinator = fleet.coordinator();
    let outcome = if config.force {
        fleet::block_on(coordinator.force_assign())??
    } else {
        fleet::block_on(coordinator.auto_assign())??
    };
    fleet.save_to(config.output.as_ref())?;
    Ok(AssignReport::new(outcome, fleet.drain_events()))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<AssignConfig, CliError> {
    let merged = AssignArgs::merge_from_layers(layers).map_err(CliError::from)?;
    AssignConfig::try_from(merged)
}
