//! Process-lifetime record of reported traffic points.

use std::sync::{PoisonError, RwLock};

use geo::Coord;

use crate::geodesy::{self, GeoError};
use crate::route::AvoidZone;

/// Reported congestion points, kept for the lifetime of the process.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_core::TrafficLog;
///
/// let log = TrafficLog::default();
/// log.report(Coord { x: 77.6, y: 12.95 })?;
/// let zones = log.avoid_zones(200.0);
/// assert_eq!(zones.len(), 1);
/// assert_eq!(zones[0].radius_m, 200.0);
/// # Ok::<(), dispatch_core::geodesy::GeoError>(())
/// ```
#[derive(Debug, Default)]
pub struct TrafficLog {
    points: RwLock<Vec<Coord<f64>>>,
}

impl TrafficLog {
    /// Record a traffic report.
    pub fn report(&self, location: Coord<f64>) -> Result<(), GeoError> {
        let location = geodesy::validate(location)?;
        self.points
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location);
        Ok(())
    }

    /// Every reported point so far.
    pub fn points(&self) -> Vec<Coord<f64>> {
        self.points
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Turn every report into a circular avoidance zone.
    pub fn avoid_zones(&self, radius_m: f64) -> Vec<AvoidZone> {
        self.points()
            .into_iter()
            .map(|location| AvoidZone { location, radius_m })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn reports_accumulate_in_order() {
        let log = TrafficLog::default();
        log.report(Coord { x: 1.0, y: 1.0 }).expect("valid");
        log.report(Coord { x: 2.0, y: 2.0 }).expect("valid");
        assert_eq!(
            log.points(),
            vec![Coord { x: 1.0, y: 1.0 }, Coord { x: 2.0, y: 2.0 }]
        );
    }

    #[rstest]
    fn invalid_reports_are_rejected() {
        let log = TrafficLog::default();
        assert!(log.report(Coord { x: f64::NAN, y: 0.0 }).is_err());
        assert!(log.points().is_empty());
    }
}
