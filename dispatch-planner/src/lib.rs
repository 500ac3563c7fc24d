//! Dispatch planning: proximity clustering, route sequencing and courier
//! assignment.
//!
//! Everything here is pure and synchronous. Planners take snapshots of
//! orders and couriers from [`dispatch_core`] and return new values; callers
//! decide when and how to commit them. The heuristics are greedy:
//! [`sequence`] is a capacity-aware, priority-tiered nearest-neighbour walk,
//! not an optimal tour, and [`cluster_orders`] is seed-driven single linkage.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod assignment;
pub mod cluster;
pub mod sequencer;

pub use assignment::{
    AssignOutcome, AssignmentPlan, CourierPool, InfeasibleCluster, assign_direct, auto_assign,
    force_assign_pending,
};
pub use cluster::{Cluster, ClusterError, DEFAULT_CLUSTER_RADIUS_KM, cluster_orders};
pub use sequencer::{
    SequenceError, SequenceResult, WindowViolation, estimate_arrivals, sequence, sequence_points,
    window_violations,
};
