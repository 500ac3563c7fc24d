//! Test doubles and builders shared by unit and behaviour tests.

use std::sync::{Mutex, PoisonError};

use geo::Coord;

use crate::geodesy;
use crate::{
    Courier, CourierId, Order, OrderId, RouteGeometry, RouteProvider, RouteRequest, RoutingError,
    Stop,
};

/// Pending order at `(lat, lng)`.
///
/// # Panics
/// Panics when the coordinate is invalid.
pub fn order_at(id: u64, lat: f64, lng: f64) -> Order {
    let stop = Stop::new(Coord { x: lng, y: lat }).expect("valid coordinate");
    Order::pending(OrderId(id), stop)
}

/// Available courier at `(lat, lng)` with default capacity.
///
/// # Panics
/// Panics when the coordinate is invalid.
pub fn courier_at(id: u64, name: &str, lat: f64, lng: f64) -> Courier {
    Courier::available(CourierId(id), name)
        .at(Coord { x: lng, y: lat })
        .expect("valid coordinate")
}

/// `RouteProvider` that records every request it sees.
///
/// Answers with straight segments whose distance is the haversine length of
/// the path, or with the configured error.
#[derive(Debug, Default)]
pub struct RecordingRouteProvider {
    failure: Option<RoutingError>,
    requests: Mutex<Vec<RouteRequest>>,
}

impl RecordingRouteProvider {
    /// Provider that fails every request with `error`.
    pub fn failing_with(error: RoutingError) -> Self {
        Self {
            failure: Some(error),
            requests: Mutex::default(),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RouteProvider for RecordingRouteProvider {
    fn route(&self, request: &RouteRequest) -> Result<RouteGeometry, RoutingError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if request.points.len() < 2 {
            return Err(RoutingError::EmptyInput);
        }
        let distance_km: f64 = request
            .points
            .windows(2)
            .filter_map(|pair| geodesy::distance_km(pair[0], pair[1]).ok())
            .sum();
        let mut geometry = RouteGeometry::straight_line(&request.points);
        geometry.distance_m = distance_km * 1_000.0;
        Ok(geometry)
    }
}
