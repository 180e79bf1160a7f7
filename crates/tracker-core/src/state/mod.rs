//! Dispatch state kept in the operator-local namespace.
//!
//! The tracker owns every key under the dispatch prefix and derives the
//! dispatched and completed views from a prefix scan.

pub mod tracker;

pub use tracker::{DispatchScan, OrderTracker, TrackerError};
