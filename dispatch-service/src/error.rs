//! Errors surfaced by coordinator operations.

use dispatch_core::{GeoError, OrderId, OrderStatus, StoreError};
use dispatch_planner::{ClusterError, SequenceError};
use thiserror::Error;

/// Failure of one coordinator operation.
///
/// Road-routing problems never appear here; they degrade to straight-line
/// geometry inside the published route instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The store rejected a read or commit.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A supplied coordinate was invalid.
    #[error(transparent)]
    Geo(#[from] GeoError),
    /// Clustering rejected its inputs.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    /// Sequencing rejected its inputs.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    /// The order is not in a state the operation accepts.
    #[error("cannot {action} {order_id} while it is {from}")]
    InvalidTransition {
        /// Order the operation targeted.
        order_id: OrderId,
        /// Status the order was found in.
        from: OrderStatus,
        /// Operation attempted.
        action: &'static str,
    },
    /// The order kept changing courier while its locks were being taken.
    #[error("{order_id} kept changing courier while waiting for locks")]
    Contended {
        /// Order whose owner kept moving.
        order_id: OrderId,
    },
}
