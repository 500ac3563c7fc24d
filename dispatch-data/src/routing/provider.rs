//! `RouteProvider` backed by the GraphHopper Routing API.
//!
//! # Architecture
//!
//! The [`RouteProvider`] trait is synchronous so the planner and core stay
//! free of async plumbing. This provider bridges its async HTTP call to the
//! sync interface by blocking on a Tokio runtime internally.

use std::time::Duration;

use dispatch_core::{RouteGeometry, RouteProvider, RouteRequest, RoutingError};
use geo::Coord;
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::graphhopper::RouteResponse;

/// Errors raised while constructing a [`GraphHopperRouteProvider`].
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default GraphHopper server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8989";

/// Default user agent for GraphHopper requests.
pub const DEFAULT_USER_AGENT: &str = "courier-dispatch/0.1";

/// Default vehicle profile.
pub const DEFAULT_PROFILE: &str = "car";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`GraphHopperRouteProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphHopperConfig {
    /// Base URL of the GraphHopper server (e.g., `"http://localhost:8989"`).
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Vehicle profile configured on the server.
    pub profile: String,
}

impl Default for GraphHopperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            profile: DEFAULT_PROFILE.to_owned(),
        }
    }
}

impl GraphHopperConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the vehicle profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }
}

/// Road routing through a GraphHopper server.
///
/// It owns a Tokio runtime that is reused across calls, avoiding the
/// overhead of creating a new runtime per request.
///
/// # Runtime behaviour
///
/// When called from outside any Tokio runtime, the provider uses its own
/// stored runtime. When called from within an existing multi-threaded Tokio
/// runtime (detected via [`Handle::try_current()`] and
/// [`RuntimeFlavor::MultiThread`]), it uses that runtime's handle with
/// [`tokio::task::block_in_place`] to avoid nested runtime panics.
///
/// When called from within a `current_thread` Tokio runtime, the provider
/// falls back to its own internal runtime. Callers on such runtimes should
/// prefer [`tokio::task::spawn_blocking`].
pub struct GraphHopperRouteProvider {
    client: Client,
    config: GraphHopperConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for GraphHopperRouteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphHopperRouteProvider")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl GraphHopperRouteProvider {
    /// Create a provider for the server at `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(GraphHopperConfig::new(base_url))
    }

    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: GraphHopperConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Configuration the provider was built with.
    #[must_use]
    pub const fn config(&self) -> &GraphHopperConfig {
        &self.config
    }

    /// Routing endpoint URL.
    fn route_url(&self) -> String {
        format!("{}/route", self.config.base_url.trim_end_matches('/'))
    }

    /// Query parameters for `request`.
    ///
    /// Points are sent as repeated `point=lat,lng` pairs in visiting order.
    /// Each avoidance zone becomes a `block_area=lat,lng,radius` circle, and
    /// contraction hierarchies are disabled so the server honours them.
    fn query_params(&self, request: &RouteRequest) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = request
            .points
            .iter()
            .map(|point| ("point", lat_lng(*point)))
            .collect();
        params.extend(request.avoid.iter().map(|zone| {
            (
                "block_area",
                format!("{},{}", lat_lng(zone.location), zone.radius_m),
            )
        }));
        if !request.avoid.is_empty() {
            params.push(("ch.disable", "true".to_owned()));
        }
        params.push(("profile", self.config.profile.clone()));
        params.push(("points_encoded", "false".to_owned()));
        params
    }

    /// Fetch the route asynchronously.
    async fn fetch_route_async(
        &self,
        request: &RouteRequest,
    ) -> Result<RouteGeometry, RoutingError> {
        let url = self.route_url();
        log::debug!(
            "requesting road route through {} points avoiding {} zones",
            request.points.len(),
            request.avoid.len()
        );

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingError::HttpError {
                url,
                status: status.as_u16(),
                message: service_message(&body).unwrap_or(body),
            });
        }

        let body: RouteResponse =
            response
                .json()
                .await
                .map_err(|err| RoutingError::ParseError {
                    message: err.to_string(),
                })?;

        body.into_geometry()
    }

    /// Convert a reqwest error to a `RoutingError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> RoutingError {
        if error.is_timeout() {
            return RoutingError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return RoutingError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        RoutingError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl RouteProvider for GraphHopperRouteProvider {
    /// Fetch the road route through `request.points`.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must be
    /// multi-threaded (`flavor = "multi_thread"`). If called from within a
    /// `current_thread` runtime, the method falls back to its own internal
    /// runtime, which blocks the caller's runtime for the duration of the
    /// request.
    fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError> {
        if request.points.len() < 2 {
            return Err(RoutingError::EmptyInput);
        }

        // block_in_place requires a multi-threaded runtime; for current_thread
        // runtimes we fall back to our own stored runtime.
        let future = self.fetch_route_async(request);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

fn lat_lng(point: Coord<f64>) -> String {
    format!("{},{}", point.y, point.x)
}

/// Extract GraphHopper's `message` field from an error body.
fn service_message(body: &str) -> Option<String> {
    serde_json::from_str::<RouteResponse>(body).ok()?.message
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::AvoidZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn provider() -> GraphHopperRouteProvider {
        GraphHopperRouteProvider::new("http://gh.example.com").expect("provider should build")
    }

    #[fixture]
    fn two_points() -> RouteRequest {
        RouteRequest::through(vec![
            Coord { x: 77.5946, y: 12.9716 },
            Coord { x: 77.61, y: 12.972 },
        ])
    }

    #[rstest]
    fn points_are_sent_as_lat_lng_in_order(
        provider: GraphHopperRouteProvider,
        two_points: RouteRequest,
    ) {
        let params = provider.query_params(&two_points);

        assert_eq!(
            params,
            vec![
                ("point", "12.9716,77.5946".to_owned()),
                ("point", "12.972,77.61".to_owned()),
                ("profile", "car".to_owned()),
                ("points_encoded", "false".to_owned()),
            ]
        );
    }

    #[rstest]
    fn avoid_zones_disable_contraction_hierarchies(
        provider: GraphHopperRouteProvider,
        two_points: RouteRequest,
    ) {
        let request = two_points.avoiding(vec![AvoidZone::around(Coord { x: 77.6, y: 12.97 })]);

        let params = provider.query_params(&request);

        assert!(params.contains(&("block_area", "12.97,77.6,200".to_owned())));
        assert!(params.contains(&("ch.disable", "true".to_owned())));
    }

    #[rstest]
    fn route_url_strips_trailing_slash() {
        let provider =
            GraphHopperRouteProvider::new("http://gh.example.com/").expect("provider should build");

        assert_eq!(provider.route_url(), "http://gh.example.com/route");
    }

    #[rstest]
    fn single_point_is_rejected_without_a_request(provider: GraphHopperRouteProvider) {
        let request = RouteRequest::through(vec![Coord { x: 77.6, y: 12.97 }]);

        let err = provider.route(&request).expect_err("should fail");

        assert_eq!(err, RoutingError::EmptyInput);
    }

    #[rstest]
    fn service_message_is_extracted_from_error_bodies() {
        assert_eq!(
            service_message(r#"{"message":"Point 0 is out of bounds"}"#),
            Some("Point 0 is out of bounds".to_owned())
        );
        assert_eq!(service_message("<html>bad gateway</html>"), None);
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = GraphHopperConfig::new("http://example.com")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent/1.0")
            .with_profile("bike");

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.profile, "bike");
    }

    #[rstest]
    fn default_config_targets_local_server() {
        let config = GraphHopperConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.profile, DEFAULT_PROFILE);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
