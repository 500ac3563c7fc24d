//! Couriers (riders) and their availability.

use std::fmt;

use geo::Coord;
use thiserror::Error;

use crate::geodesy::{self, GeoError};

/// Capacity assumed for couriers that do not declare one.
pub const DEFAULT_CAPACITY: f64 = 10.0;

/// Identifier of a courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CourierId(pub u64);

impl fmt::Display for CourierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "courier#{}", self.0)
    }
}

/// Availability of a courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CourierStatus {
    /// Free to take new work.
    Available,
    /// Carrying assigned orders.
    Busy,
    /// Not working.
    #[default]
    Offline,
}

/// A courier whose fields cannot be planned with.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CourierError {
    /// The reported location is not a valid WGS84 coordinate.
    #[error(transparent)]
    Location(#[from] GeoError),
    /// The capacity is negative or not finite.
    #[error("courier capacity must be finite and non-negative, got {0}")]
    Capacity(f64),
}

/// A courier able to carry orders.
///
/// Capacity is a planning hint; stores do not enforce it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Courier {
    /// Identity.
    pub id: CourierId,
    /// Display name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// Last reported position, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub location: Option<Coord<f64>>,
    /// Maximum aggregate stop weight.
    #[cfg_attr(feature = "serde", serde(default = "default_capacity"))]
    pub capacity: f64,
    /// Availability.
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: CourierStatus,
    /// Store revision.
    #[cfg_attr(feature = "serde", serde(default))]
    pub revision: u64,
}

#[cfg(feature = "serde")]
const fn default_capacity() -> f64 {
    DEFAULT_CAPACITY
}

impl Courier {
    /// Construct an available courier with default capacity and no location.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use dispatch_core::{Courier, CourierId, CourierStatus};
    ///
    /// let courier = Courier::available(CourierId(1), "Asha")
    ///     .at(Coord { x: 77.59, y: 12.97 })?
    ///     .with_capacity(12.0);
    /// assert_eq!(courier.status, CourierStatus::Available);
    /// assert_eq!(courier.capacity, 12.0);
    /// # Ok::<(), dispatch_core::geodesy::GeoError>(())
    /// ```
    pub fn available(id: CourierId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: None,
            capacity: DEFAULT_CAPACITY,
            status: CourierStatus::Available,
            revision: 0,
        }
    }

    /// Place the courier at a validated location.
    pub fn at(mut self, location: Coord<f64>) -> Result<Self, GeoError> {
        self.location = Some(geodesy::validate(location)?);
        Ok(self)
    }

    /// Override the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Override the status.
    #[must_use]
    pub fn with_status(mut self, status: CourierStatus) -> Self {
        self.status = status;
        self
    }

    /// Re-check a courier that did not come through the builders, such as
    /// one read from a snapshot.
    pub fn validate(&self) -> Result<(), CourierError> {
        if let Some(location) = self.location {
            geodesy::validate(location)?;
        }
        if !self.capacity.is_finite() || self.capacity < 0.0 {
            return Err(CourierError::Capacity(self.capacity));
        }
        Ok(())
    }

    /// Distance to `target`, treating an unknown location as infinitely far.
    ///
    /// Invalid stored coordinates are also treated as unreachable.
    #[must_use]
    pub fn distance_to_km(&self, target: Coord<f64>) -> f64 {
        self.location
            .and_then(|location| geodesy::distance_km(location, target).ok())
            .unwrap_or(f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn unknown_location_is_infinitely_far() {
        let courier = Courier::available(CourierId(1), "Ravi");
        assert_eq!(
            courier.distance_to_km(Coord { x: 0.0, y: 0.0 }),
            f64::INFINITY
        );
    }

    #[rstest]
    fn located_courier_reports_finite_distance() {
        let courier = Courier::available(CourierId(1), "Ravi")
            .at(Coord { x: 0.0, y: 0.0 })
            .expect("valid");
        let km = courier.distance_to_km(Coord { x: 0.0, y: 1.0 });
        assert!(km.is_finite() && km > 100.0);
    }

    #[rstest]
    fn placing_at_invalid_coordinate_fails() {
        let result = Courier::available(CourierId(1), "Ravi").at(Coord { x: 200.0, y: 0.0 });
        assert!(result.is_err());
    }

    #[rstest]
    #[case(
        Courier {
            location: Some(Coord { x: 77.6, y: 200.0 }),
            ..Courier::available(CourierId(1), "Ravi")
        },
        CourierError::Location(GeoError::InvalidCoordinate { lat: 200.0, lng: 77.6 })
    )]
    #[case(
        Courier::available(CourierId(1), "Ravi").with_capacity(-1.0),
        CourierError::Capacity(-1.0)
    )]
    fn validate_rejects_unplannable_couriers(
        #[case] courier: Courier,
        #[case] expected: CourierError,
    ) {
        assert_eq!(courier.validate(), Err(expected));
    }

    #[rstest]
    fn validate_accepts_a_courier_without_location() {
        assert_eq!(Courier::available(CourierId(1), "Ravi").validate(), Ok(()));
    }
}
