//! Great-circle geometry helpers.
//!
//! Coordinates are WGS84 with `x = longitude` and `y = latitude`, matching
//! the convention used throughout the crate.

use geo::{Centroid, Coord, MultiPoint, Point};
use thiserror::Error;

/// Mean Earth radius in kilometres used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors raised by geometry helpers.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// A coordinate was NaN, infinite or outside the WGS84 range.
    #[error("invalid coordinate (lat {lat}, lng {lng})")]
    InvalidCoordinate {
        /// Latitude as supplied.
        lat: f64,
        /// Longitude as supplied.
        lng: f64,
    },
}

/// Reject coordinates that cannot describe a point on Earth.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_core::geodesy::{validate, GeoError};
///
/// assert!(validate(Coord { x: 77.59, y: 12.97 }).is_ok());
/// assert!(matches!(
///     validate(Coord { x: f64::NAN, y: 0.0 }),
///     Err(GeoError::InvalidCoordinate { .. })
/// ));
/// ```
pub fn validate(coord: Coord<f64>) -> Result<Coord<f64>, GeoError> {
    let in_range = coord.y.is_finite()
        && coord.x.is_finite()
        && (-90.0..=90.0).contains(&coord.y)
        && (-180.0..=180.0).contains(&coord.x);
    if in_range {
        Ok(coord)
    } else {
        Err(GeoError::InvalidCoordinate {
            lat: coord.y,
            lng: coord.x,
        })
    }
}

/// Haversine distance between two coordinates in kilometres.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_core::geodesy::distance_km;
///
/// let a = Coord { x: 0.0, y: 0.0 };
/// let b = Coord { x: 1.0, y: 0.0 };
/// let km = distance_km(a, b)?;
/// assert!((km - 111.19).abs() < 0.01);
/// # Ok::<(), dispatch_core::geodesy::GeoError>(())
/// ```
pub fn distance_km(a: Coord<f64>, b: Coord<f64>) -> Result<f64, GeoError> {
    let a = validate(a)?;
    let b = validate(b)?;
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let d_lat = (b.y - a.y).to_radians();
    let d_lng = (b.x - a.x).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `h` a hair above one for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();
    Ok(EARTH_RADIUS_KM * c)
}

/// Arithmetic mean of the supplied coordinates.
///
/// Returns `None` for an empty slice.
pub fn centroid(coords: &[Coord<f64>]) -> Option<Coord<f64>> {
    let points: MultiPoint<f64> = coords.iter().copied().map(Point::from).collect();
    points.centroid().map(|point| point.0)
}
