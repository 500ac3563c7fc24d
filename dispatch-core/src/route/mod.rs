//! Road-routing enrichment of sequenced stops.
//!
//! The planner decides the visiting order. A [`RouteProvider`] may then turn
//! that order into real road geometry, distance and travel time. Providers
//! are optional: [`enrich`] always yields a usable [`RouteGeometry`], falling
//! back to straight segments when the provider is missing or fails.

mod error;
mod provider;

pub use error::RoutingError;
pub use provider::{AvoidZone, DEFAULT_AVOID_RADIUS_M, RouteGeometry, RouteProvider, RouteRequest};

use crate::{CourierId, OrderId, Stop};

/// How the geometry of a [`RouteResult`] was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Enrichment {
    /// The road-routing provider answered.
    Road,
    /// No provider answer; geometry is straight segments between stops.
    StraightLine {
        /// Why enrichment was unavailable.
        reason: String,
    },
}

impl Enrichment {
    /// Whether the result came from the fallback path.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::StraightLine { .. })
    }
}

/// A courier's sequenced route, ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteResult {
    /// Courier the route belongs to.
    pub courier_id: CourierId,
    /// Stops in visiting order, excluding the starting position.
    pub ordered_stops: Vec<Stop>,
    /// Stops left out because they did not fit the courier's capacity.
    pub excluded: Vec<Stop>,
    /// Orders whose estimated arrival misses their delivery window.
    pub late_orders: Vec<OrderId>,
    /// Road metrics and geometry, or the straight-line fallback.
    pub path: RouteGeometry,
    /// Provenance of `path`.
    pub enrichment: Enrichment,
}

/// Ask `provider` for road geometry, degrading to straight lines.
///
/// Returns the geometry and how it was obtained. Never fails.
pub fn enrich(
    provider: Option<&dyn RouteProvider>,
    request: &RouteRequest,
) -> (RouteGeometry, Enrichment) {
    let Some(provider) = provider else {
        return fallback(request, "no road-routing provider configured".to_owned());
    };
    match provider.route(request) {
        Ok(geometry) => (geometry, Enrichment::Road),
        Err(err) => {
            log::warn!("road routing unavailable, using straight-line geometry: {err}");
            fallback(request, err.to_string())
        }
    }
}

/// Straight-line geometry for `request` tagged with `reason`.
pub fn fallback(request: &RouteRequest, reason: String) -> (RouteGeometry, Enrichment) {
    (
        RouteGeometry::straight_line(&request.points),
        Enrichment::StraightLine { reason },
    )
}
