//! Dispatching orders from the order source into the tracker.

use crate::state::{OrderTracker, TrackerError};
use std::sync::Arc;
use thiserror::Error;
use tracker_orders::{OrderSourceError, OrderSourceService};
use tracker_types::{truncate_id, DispatchRecord};

/// Errors that can occur while dispatching an order.
#[derive(Debug, Error)]
pub enum DispatchError {
	#[error("Order {0} not found in order source")]
	OrderNotFound(String),
	#[error("Order source returned order '{returned}' for '{requested}'")]
	IdMismatch { requested: String, returned: String },
	#[error("Order source error: {0}")]
	Source(#[from] OrderSourceError),
	#[error("Tracker error: {0}")]
	Tracker(#[from] TrackerError),
}

/// Result of a dispatch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
	pub record: DispatchRecord,
	/// False if the order already had a record and nothing was written.
	pub newly_dispatched: bool,
}

/// Looks orders up and records their dispatch.
pub struct DispatchService {
	orders: Arc<OrderSourceService>,
	tracker: Arc<OrderTracker>,
}

impl DispatchService {
	pub fn new(orders: Arc<OrderSourceService>, tracker: Arc<OrderTracker>) -> Self {
		Self { orders, tracker }
	}

	/// Dispatches the order with the given id.
	///
	/// An order that already has a record is returned as is, without querying
	/// the order source.
	pub async fn dispatch(&self, order_id: &str) -> Result<DispatchOutcome, DispatchError> {
		if let Some(record) = self.tracker.get(order_id).await? {
			if record.id == order_id {
				tracing::debug!(
					order_id = %truncate_id(order_id),
					status = %record.status,
					"Order already tracked"
				);
				return Ok(DispatchOutcome {
					record,
					newly_dispatched: false,
				});
			}
		}

		let order = self
			.orders
			.fetch_order(order_id)
			.await?
			.ok_or_else(|| DispatchError::OrderNotFound(order_id.to_string()))?;

		// The record is keyed by the order's own id.
		if order.id != order_id {
			tracing::warn!(
				order_id = %truncate_id(order_id),
				returned_id = %truncate_id(&order.id),
				"Order source answered with a different order"
			);
			return Err(DispatchError::IdMismatch {
				requested: order_id.to_string(),
				returned: order.id,
			});
		}

		let record = self.tracker.record_dispatch(&order).await?;
		Ok(DispatchOutcome {
			record,
			newly_dispatched: true,
		})
	}
}
