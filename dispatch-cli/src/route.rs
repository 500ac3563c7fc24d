//! `route` command: on-demand re-sequencing for one courier.

use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use dispatch_core::{CourierId, RouteProvider, RouteResult};
use dispatch_service::{CoordinatorConfig, DEFAULT_AVERAGE_SPEED_KMH};
use geo::Coord;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::fleet::{self, Fleet};
use crate::{
    ARG_AVERAGE_SPEED, ARG_AVOID, ARG_COURIER, ARG_GRAPHHOPPER_URL, ARG_SNAPSHOT, CliError,
    ENV_ROUTE_COURIER, ENV_ROUTE_SNAPSHOT, write_json,
};

/// CLI arguments for the `route` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Re-sequence the in-transit stops of one courier. Points \
                 passed with --avoid are reported as traffic and routed \
                 around when a GraphHopper server is configured; otherwise \
                 the route falls back to straight lines.",
    about = "Re-sequence a courier's in-transit stops"
)]
#[ortho_config(prefix = "DISPATCH")]
pub(crate) struct RouteArgs {
    /// Path to a JSON fleet snapshot.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) snapshot: Option<Utf8PathBuf>,
    /// Courier whose route is rebuilt.
    #[arg(long = ARG_COURIER, value_name = "id")]
    #[serde(default)]
    pub(crate) courier: Option<u64>,
    /// Traffic points to avoid, as `lat,lng` pairs separated by `;`.
    #[arg(long = ARG_AVOID, value_name = "points")]
    #[serde(default)]
    pub(crate) avoid: Option<String>,
    /// Base URL for a GraphHopper server (e.g. "http://localhost:8989").
    #[arg(long = ARG_GRAPHHOPPER_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) graphhopper_url: Option<String>,
    /// Average courier speed used for arrival estimates.
    #[arg(long = ARG_AVERAGE_SPEED, value_name = "km/h")]
    #[serde(default)]
    pub(crate) average_speed_kmh: Option<f64>,
}

impl RouteArgs {
    pub(crate) fn into_config(self) -> Result<RouteConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RouteConfig::try_from(merged)
    }
}

/// Resolved `route` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RouteConfig {
    pub(crate) snapshot: Utf8PathBuf,
    pub(crate) courier: CourierId,
    pub(crate) avoid: Vec<Coord<f64>>,
    pub(crate) graphhopper_url: Option<String>,
    pub(crate) average_speed_kmh: f64,
}

impl TryFrom<RouteArgs> for RouteConfig {
    type Error = CliError;

    fn try_from(args: RouteArgs) -> Result<Self, Self::Error> {
        let snapshot = args.snapshot.ok_or(CliError::MissingArgument {
            field: ARG_SNAPSHOT,
            env: ENV_ROUTE_SNAPSHOT,
        })?;
        let courier = args.courier.map(CourierId).ok_or(CliError::MissingArgument {
            field: ARG_COURIER,
            env: ENV_ROUTE_COURIER,
        })?;
        let avoid = args
            .avoid
            .as_deref()
            .map(parse_avoid_points)
            .transpose()?
            .unwrap_or_default();
        let average_speed_kmh = args.average_speed_kmh.unwrap_or(DEFAULT_AVERAGE_SPEED_KMH);
        if !average_speed_kmh.is_finite() || average_speed_kmh <= 0.0 {
            return Err(CliError::InvalidNumber {
                field: ARG_AVERAGE_SPEED,
                value: average_speed_kmh,
            });
        }
        Ok(Self {
            snapshot,
            courier,
            avoid,
            graphhopper_url: args.graphhopper_url,
            average_speed_kmh,
        })
    }
}

/// Parse `"lat,lng;lat,lng"` into coordinates. Blank entries are skipped.
pub(crate) fn parse_avoid_points(raw: &str) -> Result<Vec<Coord<f64>>, CliError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || CliError::InvalidAvoidPoint {
                value: entry.to_owned(),
            };
            let (lat, lng) = entry.split_once(',').ok_or_else(invalid)?;
            let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
            let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
            Ok(Coord { x: lng, y: lat })
        })
        .collect()
}

/// Builds the road-routing provider for the current invocation.
pub(crate) trait RouteProviderBuilder {
    fn build(&self, config: &RouteConfig) -> Result<Option<Arc<dyn RouteProvider>>, CliError>;
}

pub(crate) struct DefaultRouteProviderBuilder;

impl RouteProviderBuilder for DefaultRouteProviderBuilder {
    #[cfg(feature = "http-routing")]
    fn build(&self, config: &RouteConfig) -> Result<Option<Arc<dyn RouteProvider>>, CliError> {
        use dispatch_data::routing::GraphHopperRouteProvider;

        let Some(base_url) = &config.graphhopper_url else {
            return Ok(None);
        };
        let provider = GraphHopperRouteProvider::new(base_url.clone()).map_err(|source| {
            CliError::BuildRouteProvider {
                base_url: base_url.clone(),
                source,
            }
        })?;
        Ok(Some(Arc::new(provider)))
    }

    #[cfg(not(feature = "http-routing"))]
    fn build(&self, config: &RouteConfig) -> Result<Option<Arc<dyn RouteProvider>>, CliError> {
        if config.graphhopper_url.is_none() {
            return Ok(None);
        }
        Err(CliError::MissingFeature {
            feature: "http-routing",
            action: "road routing",
        })
    }
}

pub(crate) fn run_route_with(
    args: RouteArgs,
    builder: &dyn RouteProviderBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    fleet::require_existing(&config.snapshot, ARG_SNAPSHOT)?;
    let route = execute_route(&config, builder)?;
    write_json(writer, &route)
}

/// `None` when the courier has nothing in transit.
pub(crate) fn execute_route(
    config: &RouteConfig,
    builder: &dyn RouteProviderBuilder,
) -> Result<Option<RouteResult>, CliError> {
    let provider = builder.build(config)?;
    let fleet = Fleet::open(
        &config.snapshot,
        CoordinatorConfig::default().with_average_speed_kmh(config.average_speed_kmh),
    )?
    .map_coordinator(|coordinator| match provider {
        Some(provider) => coordinator.with_provider(provider),
        None => coordinator,
    });
    let coordinator = fleet.coordinator();
    for point in &config.avoid {
        coordinator.report_traffic(*point)?;
    }
    let route = fleet::block_on(coordinator.optimize(config.courier, !config.avoid.is_empty()))??;
    Ok(route)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<RouteConfig, CliError> {
    let merged = RouteArgs::merge_from_layers(layers).map_err(CliError::from)?;
    RouteConfig::try_from(merged)
}
