//! Outbound adapters for the courier dispatch engine.
//!
//! Responsibilities:
//! - Implement [`dispatch_core::RouteProvider`] against a GraphHopper
//!   routing server over HTTP.
//! - Translate wire formats into core types and transport failures into
//!   [`dispatch_core::RoutingError`].
//!
//! Boundaries:
//! - Do not encode dispatch rules (live in `dispatch-core` and
//!   `dispatch-planner`).
//! - Never surface provider failures as hard errors to callers that can
//!   degrade to straight-line geometry.
//!
//! Invariants:
//! - Thread-safe by default; providers are `Send + Sync`.
//! - No global mutable state.

pub mod routing;

pub use routing::{
    DEFAULT_BASE_URL, DEFAULT_PROFILE, DEFAULT_USER_AGENT, GraphHopperConfig,
    GraphHopperRouteProvider, ProviderBuildError,
};
