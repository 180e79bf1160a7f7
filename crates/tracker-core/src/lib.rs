//! Core of the order dispatch tracker.
//!
//! Ties the record store and the order source together: the [`OrderTracker`]
//! owns the dispatch namespace, the [`DispatchService`] confirms orders with
//! the order source before recording them, and [`TrackerEngine`] bundles both
//! for the service layer.

use std::sync::Arc;
use tracker_config::Config;

pub mod builder;
pub mod dispatch;
pub mod state;

pub use builder::{BuilderError, TrackerBuilder, TrackerFactories};
pub use dispatch::{DispatchError, DispatchOutcome, DispatchService};
pub use state::{DispatchScan, OrderTracker, TrackerError};

/// Assembled tracker, shared by every request handler.
pub struct TrackerEngine {
	config: Config,
	tracker: Arc<OrderTracker>,
	dispatcher: Arc<DispatchService>,
}

impl TrackerEngine {
	pub fn new(
		config: Config,
		tracker: Arc<OrderTracker>,
		dispatcher: Arc<DispatchService>,
	) -> Self {
		Self {
			config,
			tracker,
			dispatcher,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn tracker(&self) -> &Arc<OrderTracker> {
		&self.tracker
	}

	pub fn dispatcher(&self) -> &Arc<DispatchService> {
		&self.dispatcher
	}
}
