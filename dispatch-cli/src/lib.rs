//! Command-line interface for offline dispatch over fleet snapshot files.
//!
//! Every command reads a JSON [`dispatch_core::FleetSnapshot`], runs the
//! dispatch engine against it in memory and prints a JSON report. Commands
//! that change the fleet write the updated snapshot to `--output` when given.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;

mod assign;
mod error;
mod fleet;
mod fs;
mod lifecycle;
mod route;
mod stats;

pub use error::CliError;

use assign::AssignArgs;
use lifecycle::UpdateArgs;
use route::{DefaultRouteProviderBuilder, RouteArgs};
use stats::StatsArgs;

pub(crate) const ARG_SNAPSHOT: &str = "snapshot";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_RADIUS_KM: &str = "radius-km";
pub(crate) const ARG_FORCE: &str = "force";
pub(crate) const ARG_COURIER: &str = "courier";
pub(crate) const ARG_ORDER: &str = "order";
pub(crate) const ARG_ACTION: &str = "action";
pub(crate) const ARG_AVOID: &str = "avoid";
pub(crate) const ARG_GRAPHHOPPER_URL: &str = "graphhopper-url";
pub(crate) const ARG_AVERAGE_SPEED: &str = "average-speed-kmh";
pub(crate) const ENV_ASSIGN_SNAPSHOT: &str = "DISPATCH_CMDS_ASSIGN_SNAPSHOT";
pub(crate) const ENV_UPDATE_SNAPSHOT: &str = "DISPATCH_CMDS_UPDATE_SNAPSHOT";
pub(crate) const ENV_UPDATE_ORDER: &str = "DISPATCH_CMDS_UPDATE_ORDER";
pub(crate) const ENV_UPDATE_COURIER: &str = "DISPATCH_CMDS_UPDATE_COURIER";
pub(crate) const ENV_UPDATE_ACTION: &str = "DISPATCH_CMDS_UPDATE_ACTION";
pub(crate) const ENV_ROUTE_SNAPSHOT: &str = "DISPATCH_CMDS_ROUTE_SNAPSHOT";
pub(crate) const ENV_ROUTE_COURIER: &str = "DISPATCH_CMDS_ROUTE_COURIER";
pub(crate) const ENV_STATS_SNAPSHOT: &str = "DISPATCH_CMDS_STATS_SNAPSHOT";

/// Run the dispatch CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Assign(args) => assign::run_assign_with(args, &mut stdout),
        Command::Update(args) => lifecycle::run_update_with(args, &mut stdout),
        Command::Route(args) => {
            route::run_route_with(args, &DefaultRouteProviderBuilder, &mut stdout)
        }
        Command::Stats(args) => stats::run_stats_with(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "dispatch",
    about = "Courier dispatch and route optimisation over fleet snapshots",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Assign pending orders to couriers.
    Assign(AssignArgs),
    /// Apply one order lifecycle event.
    Update(UpdateArgs),
    /// Re-sequence a courier's in-transit stops.
    Route(RouteArgs),
    /// Summarise orders or one courier.
    Stats(StatsArgs),
}

/// Pretty-print `value` as one JSON document followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
