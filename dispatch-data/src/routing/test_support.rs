//! Test utilities for routing providers.
//!
//! This module provides [`StubRouteProvider`], a deterministic test double
//! for [`RouteProvider`] that returns pre-configured responses without
//! making actual HTTP requests.

use std::time::Duration;

use dispatch_core::{RouteGeometry, RouteProvider, RouteRequest, RoutingError};

/// Stub `RouteProvider` for testing.
///
/// # Example
///
/// ```
/// use dispatch_core::{RouteProvider, RouteRequest, RoutingError};
/// use dispatch_data::routing::test_support::StubRouteProvider;
/// use geo::Coord;
///
/// let provider = StubRouteProvider::with_road(1_500.0, 240_000);
/// let request = RouteRequest::through(vec![
///     Coord { x: 77.59, y: 12.97 },
///     Coord { x: 77.61, y: 12.98 },
/// ]);
///
/// let route = provider.route(&request)?;
/// assert_eq!(route.time_ms, 240_000);
/// # Ok::<(), RoutingError>(())
/// ```
#[derive(Debug, Clone)]
pub struct StubRouteProvider {
    response: StubResponse,
    delay: Option<Duration>,
}

#[derive(Debug, Clone)]
enum StubResponse {
    Road { distance_m: f64, time_ms: u64 },
    Error(RoutingError),
}

impl StubRouteProvider {
    /// Create a provider that answers every request with the given totals
    /// and a line through the requested points.
    #[must_use]
    pub const fn with_road(distance_m: f64, time_ms: u64) -> Self {
        Self {
            response: StubResponse::Road {
                distance_m,
                time_ms,
            },
            delay: None,
        }
    }

    /// Create a provider that returns the given error.
    ///
    /// Requests with fewer than two points still return
    /// `RoutingError::EmptyInput`.
    #[must_use]
    pub const fn with_error(error: RoutingError) -> Self {
        Self {
            response: StubResponse::Error(error),
            delay: None,
        }
    }

    /// Create a provider that fails as if the server were not running.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::with_error(RoutingError::NetworkError {
            url: "http://localhost:8989/route".to_owned(),
            message: "connection refused".to_owned(),
        })
    }

    /// Sleep the calling thread for `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl RouteProvider for StubRouteProvider {
    fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError> {
        if request.points.len() < 2 {
            return Err(RoutingError::EmptyInput);
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match &self.response {
            StubResponse::Road {
                distance_m,
                time_ms,
            } => Ok(RouteGeometry {
                distance_m: *distance_m,
                time_ms: *time_ms,
                ..RouteGeometry::straight_line(&request.points)
            }),
            StubResponse::Error(error) => Err(error.clone()),
        }
    }
}
