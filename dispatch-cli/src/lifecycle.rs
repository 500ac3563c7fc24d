//! `update` command: one order lifecycle event against a snapshot.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use dispatch_core::{CourierId, Order, OrderId, RouteResult};
use dispatch_service::{CoordinatorConfig, LifecycleOutcome};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

use crate::fleet::{self, Fleet};
use crate::{
    ARG_ACTION, ARG_COURIER, ARG_ORDER, ARG_OUTPUT, ARG_SNAPSHOT, CliError, ENV_UPDATE_ACTION,
    ENV_UPDATE_COURIER, ENV_UPDATE_ORDER, ENV_UPDATE_SNAPSHOT, write_json,
};

/// Lifecycle event applied by `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum OrderAction {
    /// Give a pending order to `--courier`.
    Assign,
    /// Mark an assigned order as picked up.
    PickUp,
    /// Pick up every order assigned to `--courier`.
    PickUpAll,
    /// Mark an in-transit order as delivered.
    Deliver,
    /// Cancel an order that has not been delivered.
    Cancel,
    /// Remove an order from the fleet.
    Delete,
}

/// CLI arguments for the `update` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Apply one order lifecycle event to a fleet snapshot. The \
                 affected courier's route is re-sequenced and every event the \
                 engine would broadcast is included in the report.",
    about = "Apply one order lifecycle event"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct UpdateArgs {
    /// Path to a JSON fleet snapshot.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) snapshot: Option<Utf8PathBuf>,
    /// Event to apply.
    #[arg(long = ARG_ACTION, value_enum)]
    #[serde(default)]
    pub(crate) action: Option<OrderAction>,
    /// Order the event applies to.
    #[arg(long = ARG_ORDER, value_name = "id")]
    #[serde(default)]
    pub(crate) order: Option<u64>,
    /// Courier for `assign` and `pick-up-all`.
    #[arg(long = ARG_COURIER, value_name = "id")]
    #[serde(default)]
    pub(crate) courier: Option<u64>,
    /// Write the updated fleet snapshot to this path.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl UpdateArgs {
    pub(crate) fn into_config(self) -> Result<UpdateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        UpdateConfig::try_from(merged)
    }
}

/// A lifecycle event with the identifiers it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleRequest {
    Assign(OrderId, CourierId),
    PickUp(OrderId),
    PickUpAll(CourierId),
    Deliver(OrderId),
    Cancel(OrderId),
    Delete(OrderId),
}

/// Resolved `update` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpdateConfig {
    pub(crate) snapshot: Utf8PathBuf,
    pub(crate) request: LifecycleRequest,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl TryFrom<UpdateArgs> for UpdateConfig {
    type Error = CliError;

    fn try_from(args: UpdateArgs) -> Result<Self, Self::Error> {
        let snapshot = args.snapshot.ok_or(CliError::MissingArgument {
            field: ARG_SNAPSHOT,
            env: ENV_UPDATE_SNAPSHOT,
        })?;
        let action = args.action.ok_or(CliError::MissingArgument {
            field: ARG_ACTION,
            env: ENV_UPDATE_ACTION,
        })?;
        let order = || {
            args.order.map(OrderId).ok_or(CliError::MissingArgument {
                field: ARG_ORDER,
                env: ENV_UPDATE_ORDER,
            })
        };
        let courier = || {
            args.courier.map(CourierId).ok_or(CliError::MissingArgument {
                field: ARG_COURIER,
                env: ENV_UPDATE_COURIER,
            })
        };
        let request = match action {
            OrderAction::Assign => LifecycleRequest::Assign(order()?, courier()?),
            OrderAction::PickUp => LifecycleRequest::PickUp(order()?),
            OrderAction::PickUpAll => LifecycleRequest::PickUpAll(courier()?),
            OrderAction::Deliver => LifecycleRequest::Deliver(order()?),
            OrderAction::Cancel => LifecycleRequest::Cancel(order()?),
            OrderAction::Delete => LifecycleRequest::Delete(order()?),
        };
        Ok(Self {
            snapshot,
            request,
            output: args.output,
        })
    }
}

/// Printed result of a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LifecycleReport {
    pub(crate) orders: Vec<Order>,
    pub(crate) routes: Vec<RouteResult>,
    pub(crate) events: Vec<Value>,
}

impl LifecycleReport {
    fn new(outcome: LifecycleOutcome, events: Vec<Value>) -> Self {
        Self {
            orders: outcome.orders,
            routes: outcome.routes,
            events,
        }
    }
}

pub(crate) fn run_update_with(args: UpdateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    fleet::require_existing(&config.snapshot, ARG_SNAPSHOT)?;
    let report = execute_update(&config)?;
    write_json(writer, &report)
}

pub(crate) fn execute_update(config: &UpdateConfig) -> Result<LifecycleReport, CliError> {
    let mut fleet = Fleet::open(&config.snapshot, CoordinatorConfig::default())?;
    let coordinator = fleet.coordinator();
    let outcome = match config.request {
        LifecycleRequest::Assign(order, courier) => {
            fleet::block_on(coordinator.assign(order, courier))?
        }
        LifecycleRequest::PickUp(order) => fleet::block_on(coordinator.pick_up(order))?,
        LifecycleRequest::PickUpAll(courier) => {
            fleet::block_on(coordinator.pick_up_all(courier))?
        }
        LifecycleRequest::Deliver(order) => fleet::block_on(coordinator.deliver(order))?,
        LifecycleRequest::Cancel(order) => fleet::block_on(coordinator.cancel(order))?,
        LifecycleRequest::Delete(order) => fleet::block_on(coordinator.delete(order))?,
    }?;
    fleet.save_to(config.output.as_ref())?;
    Ok(LifecycleReport::new(outcome, fleet.drain_events()))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<UpdateConfig, CliError> {
    let merged = UpdateArgs::merge_from_layers(layers).map_err(CliError::from)?;
    UpdateConfig::try_from(merged)
}
