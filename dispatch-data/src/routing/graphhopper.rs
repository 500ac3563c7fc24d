//! GraphHopper Routing API response types.
//!
//! Only the fields the dispatch engine consumes are modelled. Requests are
//! made with `points_encoded=false`, so path geometry arrives as a GeoJSON
//! `LineString` with `[lng, lat]` positions.
//!
//! See: <https://docs.graphhopper.com/#tag/Routing-API>

use dispatch_core::{RouteGeometry, RoutingError};
use geo::{Coord, LineString};
use serde::Deserialize;

/// Top-level `/route` response.
///
/// Successful answers carry at least one path; failures carry a `message`
/// and usually an HTTP 4xx status.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Alternative paths, best first.
    #[serde(default)]
    pub paths: Vec<ResponsePath>,
    /// Error description when no path could be computed.
    pub message: Option<String>,
}

/// One path through every requested point.
#[derive(Debug, Deserialize)]
pub struct ResponsePath {
    /// Length in metres.
    pub distance: f64,
    /// Travel time in milliseconds.
    pub time: u64,
    /// Unencoded geometry.
    pub points: Option<LineGeometry>,
}

/// GeoJSON line geometry.
#[derive(Debug, Deserialize)]
pub struct LineGeometry {
    /// `[lng, lat]` positions. Elevation, when present, is ignored.
    pub coordinates: Vec<Vec<f64>>,
}

impl RouteResponse {
    /// Convert the first path into [`RouteGeometry`].
    ///
    /// # Errors
    /// [`RoutingError::ServiceError`] when no path was returned and
    /// [`RoutingError::ParseError`] when the path is malformed.
    pub fn into_geometry(self) -> Result<RouteGeometry, RoutingError> {
        let Some(path) = self.paths.into_iter().next() else {
            return Err(RoutingError::ServiceError {
                message: self
                    .message
                    .unwrap_or_else(|| "response contained no paths".to_owned()),
            });
        };
        if !path.distance.is_finite() || path.distance.is_sign_negative() {
            return Err(RoutingError::ParseError {
                message: format!("invalid path distance {}", path.distance),
            });
        }
        let line = path.points.ok_or_else(|| RoutingError::ParseError {
            message: "path is missing its points geometry".to_owned(),
        })?;
        let coords = line
            .coordinates
            .into_iter()
            .map(|position| match position.as_slice() {
                [lng, lat, ..] => Ok(Coord { x: *lng, y: *lat }),
                _ => Err(RoutingError::ParseError {
                    message: format!("position {position:?} has fewer than two values"),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RouteGeometry {
            distance_m: path.distance,
            time_ms: path.time,
            geometry: LineString::from(coords),
        })
    }
}
