use thiserror::Error;

/// Errors from [`crate::route::RouteProvider::route`].
///
/// Every variant means road-routing enrichment is unavailable for this
/// request. Callers degrade to straight-line geometry rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Fewer than two points were supplied.
    ///
    /// A road route needs a start and at least one destination.
    #[error("at least two points are required to build a route")]
    EmptyInput,
    /// The provider did not answer within the configured timeout.
    #[error("routing request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },
    /// The provider could not be reached.
    #[error("routing request to {url} failed: {message}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// Transport failure description.
        message: String,
    },
    /// The provider answered with a non-success HTTP status.
    #[error("routing request to {url} returned HTTP {status}: {message}")]
    HttpError {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The provider answered but reported that no route could be built.
    #[error("routing service reported an error: {message}")]
    ServiceError {
        /// Message returned by the service.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse routing response: {message}")]
    ParseError {
        /// Decoder failure description.
        message: String,
    },
}
