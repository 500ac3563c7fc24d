//! HTTP road routing through a GraphHopper server.
//!
//! This module provides [`GraphHopperRouteProvider`], an implementation of
//! [`dispatch_core::RouteProvider`] that asks the GraphHopper Routing API for
//! the road path through an already sequenced list of stops.
//!
//! # Architecture
//!
//! The planner decides the visiting order; GraphHopper only supplies road
//! distance, travel time and a drawable line. Traffic avoidance zones are
//! sent as `block_area` circles, which forces the flexible routing mode.
//! The synchronous [`dispatch_core::RouteProvider`] trait is implemented by
//! blocking on async HTTP calls internally, keeping the core library
//! embeddable in synchronous contexts.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use dispatch_core::{RouteProvider, RouteRequest};
//! use dispatch_data::routing::{GraphHopperConfig, GraphHopperRouteProvider};
//! use geo::Coord;
//!
//! let config = GraphHopperConfig::new("http://localhost:8989")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_profile("bike");
//! let provider = GraphHopperRouteProvider::with_config(config)?;
//!
//! let request = RouteRequest::through(vec![
//!     Coord { x: 77.5946, y: 12.9716 },
//!     Coord { x: 77.6100, y: 12.9720 },
//! ]);
//! let route = provider.route(&request)?;
//! println!("{} m in {} ms", route.distance_m, route.time_ms);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod graphhopper;
mod provider;

#[doc(hidden)]
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use provider::{
    DEFAULT_BASE_URL, DEFAULT_PROFILE, DEFAULT_USER_AGENT, GraphHopperConfig,
    GraphHopperRouteProvider, ProviderBuildError,
};
