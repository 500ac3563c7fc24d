//! Road-routing provider trait and its request/response types.

use geo::{Coord, LineString};

use super::error::RoutingError;

/// Radius in metres applied to reported traffic points.
pub const DEFAULT_AVOID_RADIUS_M: f64 = 200.0;

/// Circular area the road route should steer around.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AvoidZone {
    /// Centre of the zone.
    pub location: Coord<f64>,
    /// Radius in metres.
    pub radius_m: f64,
}

impl AvoidZone {
    /// Zone of [`DEFAULT_AVOID_RADIUS_M`] around `location`.
    pub const fn around(location: Coord<f64>) -> Self {
        Self {
            location,
            radius_m: DEFAULT_AVOID_RADIUS_M,
        }
    }
}

/// Ordered points a road route must pass through.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteRequest {
    /// Visiting order, starting with the courier position.
    pub points: Vec<Coord<f64>>,
    /// Areas to avoid.
    pub avoid: Vec<AvoidZone>,
}

impl RouteRequest {
    /// Request a route through `points` with no avoidance zones.
    pub const fn through(points: Vec<Coord<f64>>) -> Self {
        Self {
            points,
            avoid: Vec::new(),
        }
    }

    /// Attach avoidance zones.
    #[must_use]
    pub fn avoiding(mut self, zones: Vec<AvoidZone>) -> Self {
        self.avoid = zones;
        self
    }
}

/// Real travel metrics and geometry for a route.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteGeometry {
    /// Total length in metres.
    pub distance_m: f64,
    /// Total travel time in milliseconds.
    pub time_ms: u64,
    /// Path to draw, in visiting order.
    pub geometry: LineString<f64>,
}

impl RouteGeometry {
    /// Straight segments through `points` with zero distance and time.
    ///
    /// Used whenever the road-routing provider cannot help.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use dispatch_core::RouteGeometry;
    ///
    /// let fallback = RouteGeometry::straight_line(&[
    ///     Coord { x: 77.59, y: 12.97 },
    ///     Coord { x: 77.61, y: 12.972 },
    /// ]);
    /// assert_eq!(fallback.distance_m, 0.0);
    /// assert_eq!(fallback.time_ms, 0);
    /// assert_eq!(fallback.geometry.0.len(), 2);
    /// ```
    pub fn straight_line(points: &[Coord<f64>]) -> Self {
        Self {
            distance_m: 0.0,
            time_ms: 0,
            geometry: LineString::from(points.to_vec()),
        }
    }
}

/// Fetch road geometry for an ordered list of points.
///
/// Implementations must return `Err(RoutingError::EmptyInput)` when fewer
/// than two points are supplied. Providers are optional collaborators: every
/// error is recoverable by falling back to
/// [`RouteGeometry::straight_line`].
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use dispatch_core::{RouteGeometry, RouteProvider, RouteRequest, RoutingError};
///
/// struct Crow;
///
/// impl RouteProvider for Crow {
///     fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError> {
///         if request.points.len() < 2 {
///             return Err(RoutingError::EmptyInput);
///         }
///         Ok(RouteGeometry::straight_line(&request.points))
///     }
/// }
///
/// let request = RouteRequest::through(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }]);
/// assert!(Crow.route(&request).is_ok());
/// assert_eq!(Crow.route(&RouteRequest::default()), Err(RoutingError::EmptyInput));
/// ```
pub trait RouteProvider: Send + Sync {
    /// Return road geometry for `request.points` in the given order.
    fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError>;
}
