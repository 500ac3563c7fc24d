//! Planning-time snapshots of deliverable locations.
//!
//! A [`Stop`] copies what the planner needs from an order: where it is, how
//! much it weighs, how urgent it is and when it may be delivered. Optional
//! order fields are resolved to explicit defaults at construction so that the
//! planner never has to guess.

use chrono::{DateTime, Utc};
use geo::Coord;
use thiserror::Error;

use crate::OrderId;
use crate::geodesy::{self, GeoError};

/// Weight assumed for a stop when the order does not carry one.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Ordinal urgency tier; higher values are more urgent.
///
/// # Examples
/// ```
/// use dispatch_core::Priority;
///
/// assert_eq!(Priority::default(), Priority::new(1));
/// assert!(Priority::new(3) > Priority::new(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Priority(u8);

impl Priority {
    /// Lowest tier and the default for orders without a priority.
    pub const LOW: Self = Self(1);
    /// Middle tier.
    pub const MEDIUM: Self = Self(2);
    /// Highest named tier.
    pub const HIGH: Self = Self(3);

    /// Wrap a raw tier value.
    #[must_use]
    pub const fn new(tier: u8) -> Self {
        Self(tier)
    }

    /// Return the raw tier value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::LOW
    }
}

/// Errors returned by [`TimeWindow::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimeWindowError {
    /// The window closes at or before it opens.
    #[error("time window must end after it starts")]
    Empty,
}

/// A stop whose fields break the rules its constructors enforce.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StopError {
    /// The location is not a valid WGS84 coordinate.
    #[error(transparent)]
    Location(#[from] GeoError),
    /// The weight is negative or not finite.
    #[error("stop weight must be finite and non-negative, got {0}")]
    Weight(f64),
    /// The delivery window is empty.
    #[error(transparent)]
    Window(#[from] TimeWindowError),
}

/// Half-open delivery window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Validate and construct a window.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use dispatch_core::{TimeWindow, TimeWindowError};
    ///
    /// let now = Utc::now();
    /// let window = TimeWindow::new(now, now + Duration::hours(1))?;
    /// assert!(window.contains(now));
    /// assert!(!window.contains(now + Duration::hours(1)));
    /// assert_eq!(TimeWindow::new(now, now), Err(TimeWindowError::Empty));
    /// # Ok::<(), TimeWindowError>(())
    /// ```
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeWindowError> {
        if end <= start {
            return Err(TimeWindowError::Empty);
        }
        Ok(Self { start, end })
    }

    /// Opening instant.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Closing instant (exclusive).
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether an arrival at `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// A deliverable location with its planning constraints.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use dispatch_core::{Priority, Stop};
///
/// let stop = Stop::new(Coord { x: 77.61, y: 12.972 })?
///     .with_weight(2.5)
///     .with_priority(Priority::new(2));
/// assert_eq!(stop.weight(), 2.5);
/// assert_eq!(stop.priority(), Priority::MEDIUM);
/// assert!(stop.time_window().is_none());
/// # Ok::<(), dispatch_core::geodesy::GeoError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stop {
    location: Coord<f64>,
    #[cfg_attr(feature = "serde", serde(default = "default_weight"))]
    weight: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    priority: Priority,
    #[cfg_attr(feature = "serde", serde(default))]
    time_window: Option<TimeWindow>,
    #[cfg_attr(feature = "serde", serde(default))]
    order_id: Option<OrderId>,
}

#[cfg(feature = "serde")]
const fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

impl Stop {
    /// Construct a stop with default weight and priority.
    pub fn new(location: Coord<f64>) -> Result<Self, GeoError> {
        Ok(Self {
            location: geodesy::validate(location)?,
            weight: DEFAULT_WEIGHT,
            priority: Priority::default(),
            time_window: None,
            order_id: None,
        })
    }

    /// Set the stop weight. Negative or non-finite weights fall back to
    /// [`DEFAULT_WEIGHT`].
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = if weight.is_finite() && weight >= 0.0 {
            weight
        } else {
            DEFAULT_WEIGHT
        };
        self
    }

    /// Set the urgency tier.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a delivery window.
    #[must_use]
    pub const fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Record the order this stop was taken from.
    #[must_use]
    pub const fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Geographic position.
    #[must_use]
    pub const fn location(&self) -> Coord<f64> {
        self.location
    }

    /// Load contributed towards courier capacity.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Urgency tier.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Delivery window, if any.
    #[must_use]
    pub const fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    /// Originating order, if the stop was built from one.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Re-check a stop that did not come through the constructors, such as
    /// one read from a snapshot.
    pub fn validate(&self) -> Result<(), StopError> {
        geodesy::validate(self.location)?;
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(StopError::Weight(self.weight));
        }
        if let Some(window) = self.time_window {
            TimeWindow::new(window.start, window.end)?;
        }
        Ok(())
    }
}
