//! Order lookup for the dispatch tracker.
//!
//! The authoritative orders live in a hosted document store. Dispatching an
//! order first confirms it exists there; this crate provides that lookup
//! behind the [`OrderSourceInterface`] trait, with a document-store HTTP
//! client and a static catalogue for development.

use async_trait::async_trait;
use thiserror::Error;
use tracker_types::{truncate_id, ConfigSchema, ImplementationRegistry, OrderSummary};

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod sanity;
}

/// Errors that can occur while looking up an order.
#[derive(Debug, Error)]
pub enum OrderSourceError {
	/// The request never produced a response.
	#[error("Network error: {0}")]
	Network(String),
	/// The document store answered with a non-success status.
	#[error("Document store returned HTTP {status}: {body}")]
	Status { status: u16, body: String },
	/// The response body could not be decoded.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface of an order source.
#[async_trait]
pub trait OrderSourceInterface: Send + Sync {
	/// Looks up an order by id.
	///
	/// Returns `Ok(None)` when the source has no such order.
	async fn fetch_order(&self, order_id: &str) -> Result<Option<OrderSummary>, OrderSourceError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for order source factory functions.
pub type OrderSourceFactory =
	fn(&toml::Value) -> Result<Box<dyn OrderSourceInterface>, OrderSourceError>;

/// Registry trait for order source implementations.
pub trait OrderSourceRegistry: ImplementationRegistry<Factory = OrderSourceFactory> {}

/// Returns `(name, factory)` for every built-in order source.
pub fn get_all_implementations() -> Vec<(&'static str, OrderSourceFactory)> {
	use implementations::{memory, sanity};

	vec![
		(memory::Registry::NAME, memory::Registry::factory()),
		(sanity::Registry::NAME, sanity::Registry::factory()),
	]
}

/// Service wrapping the configured order source.
pub struct OrderSourceService {
	implementation: Box<dyn OrderSourceInterface>,
}

impl OrderSourceService {
	pub fn new(implementation: Box<dyn OrderSourceInterface>) -> Self {
		Self { implementation }
	}

	/// Looks up an order, logging the outcome.
	pub async fn fetch_order(
		&self,
		order_id: &str,
	) -> Result<Option<OrderSummary>, OrderSourceError> {
		match self.implementation.fetch_order(order_id).await {
			Ok(Some(order)) => {
				tracing::debug!(order_id = %truncate_id(order_id), "Order found");
				Ok(Some(order))
			},
			Ok(None) => {
				tracing::debug!(order_id = %truncate_id(order_id), "Order not found");
				Ok(None)
			},
			Err(e) => {
				tracing::warn!(order_id = %truncate_id(order_id), error = %e, "Order lookup failed");
				Err(e)
			},
		}
	}
}
