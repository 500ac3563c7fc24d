//! `stats` command: fleet and courier summaries.

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{CourierId, CourierStats, OrderStats};
use dispatch_service::CoordinatorConfig;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::fleet::{self, Fleet};
use crate::{ARG_COURIER, ARG_SNAPSHOT, CliError, ENV_STATS_SNAPSHOT, write_json};

/// CLI arguments for the `stats` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Count the orders of a fleet snapshot per status, or \
                 summarise the workload of one courier with --courier.",
    about = "Summarise orders or one courier"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct StatsArgs {
    /// Path to a JSON fleet snapshot.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) snapshot: Option<Utf8PathBuf>,
    /// Summarise this courier instead of the whole fleet.
    #[arg(long = ARG_COURIER, value_name = "id")]
    #[serde(default)]
    pub(crate) courier: Option<u64>,
}

/// Resolved `stats` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatsConfig {
    pub(crate) snapshot: Utf8PathBuf,
    pub(crate) courier: Option<CourierId>,
}

impl TryFrom<StatsArgs> for StatsConfig {
    type Error = CliError;

    fn try_from(args: StatsArgs) -> Result<Self, Self::Error> {
        let snapshot = args.snapshot.ok_or(CliError::MissingArgument {
            field: ARG_SNAPSHOT,
            env: ENV_STATS_SNAPSHOT,
        })?;
        Ok(Self {
            snapshot,
            courier: args.courier.map(CourierId),
        })
    }
}

/// Printed summary; untagged so each shape prints as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub(crate) enum StatsReport {
    Orders(OrderStats),
    Courier(CourierStats),
}

pub(crate) fn run_stats_with(args: StatsArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = StatsConfig::try_from(merged)?;
    fleet::require_existing(&config.snapshot, ARG_SNAPSHOT)?;
    let report = execute_stats(&config)?;
    write_json(writer, &report)
}

pub(crate) fn execute_stats(config: &StatsConfig) -> Result<StatsReport, CliError> {
    let fleet = Fleet::open(&config.snapshot, CoordinatorConfig::default())?;
    let coordinator = fleet.coordinator();
    let report = match config.courier {
        Some(courier) => StatsReport::Courier(coordinator.courier_stats(courier)?),
        None => StatsReport::Orders(coordinator.order_stats()?),
    };
    Ok(report)
}
