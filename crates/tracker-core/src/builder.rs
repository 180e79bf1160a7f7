//! Builder for assembling a tracker engine from configuration.
//!
//! Each pluggable component is created through a factory looked up by the
//! implementation name used in the configuration file.

use crate::{dispatch::DispatchService, state::OrderTracker, TrackerEngine};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracker_config::Config;
use tracker_orders::{OrderSourceError, OrderSourceInterface, OrderSourceService};
use tracker_storage::{RecordStore, StorageError, StorageService};

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by name.
pub struct TrackerFactories<SF, OF> {
	pub storage_factories: HashMap<String, SF>,
	pub order_source_factories: HashMap<String, OF>,
}

/// Builds a [`TrackerEngine`].
pub struct TrackerBuilder {
	config: Config,
}

impl TrackerBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates the primary implementation of each component and wires them
	/// into an engine.
	pub fn build<SF, OF>(
		self,
		factories: TrackerFactories<SF, OF>,
	) -> Result<TrackerEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn RecordStore>, StorageError>,
		OF: Fn(&toml::Value) -> Result<Box<dyn OrderSourceInterface>, OrderSourceError>,
	{
		let primary_storage = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(primary_storage)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					primary_storage
				))
			})?;
		let storage_factory = factories
			.storage_factories
			.get(primary_storage)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"No storage implementation named '{}'",
					primary_storage
				))
			})?;
		let backend = storage_factory(storage_config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %primary_storage,
				error = %e,
				"Failed to create storage implementation"
			);
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary_storage, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %primary_storage, "Loaded");

		let primary_source = &self.config.orders.primary;
		let source_config = self
			.config
			.orders
			.implementations
			.get(primary_source)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary order source '{}' has no configuration",
					primary_source
				))
			})?;
		let source_factory = factories
			.order_source_factories
			.get(primary_source)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"No order source implementation named '{}'",
					primary_source
				))
			})?;
		let source = source_factory(source_config).map_err(|e| {
			tracing::error!(
				component = "orders",
				implementation = %primary_source,
				error = %e,
				"Failed to create order source implementation"
			);
			BuilderError::Config(format!(
				"Failed to create order source implementation '{}': {}",
				primary_source, e
			))
		})?;
		tracing::info!(component = "orders", implementation = %primary_source, "Loaded");

		let storage = Arc::new(StorageService::new(backend));
		let tracker = Arc::new(OrderTracker::new(storage));
		let orders = Arc::new(OrderSourceService::new(source));
		let dispatcher = Arc::new(DispatchService::new(orders, tracker.clone()));

		Ok(TrackerEngine::new(self.config, tracker, dispatcher))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_orders::OrderSourceFactory;
	use tracker_storage::StorageFactory;
	use tracker_types::{DispatchRecord, OrderSummary};

	const CONFIG: &str = r#"
[tracker]
id = "test"

[storage]
primary = "memory"
[storage.implementations.memory]

[orders]
primary = "memory"
[orders.implementations.memory]
[[orders.implementations.memory.orders]]
_id = "o1"
fullName = "Jane Doe"
orderDate = "2024-01-05"
"#;

	fn factories() -> TrackerFactories<StorageFactory, OrderSourceFactory> {
		TrackerFactories {
			storage_factories: tracker_storage::get_all_implementations()
				.into_iter()
				.map(|(name, f)| (name.to_string(), f))
				.collect(),
			order_source_factories: tracker_orders::get_all_implementations()
				.into_iter()
				.map(|(name, f)| (name.to_string(), f))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_build_and_dispatch() {
		let config: Config = CONFIG.parse().unwrap();
		let engine = TrackerBuilder::new(config).build(factories()).unwrap();

		assert_eq!(engine.config().tracker.id, "test");
		let outcome = engine.dispatcher().dispatch("o1").await.unwrap();
		assert!(outcome.newly_dispatched);
		assert_eq!(
			outcome.record,
			DispatchRecord::dispatched(&OrderSummary::new("o1", "Jane Doe", "2024-01-05"))
		);
		assert_eq!(engine.tracker().list_dispatched().await.unwrap().len(), 1);
	}

	#[test]
	fn test_unknown_implementation_is_missing_component() {
		let config: Config = CONFIG
			.replace(
				"primary = \"memory\"\n[storage.implementations.memory]",
				"primary = \"redis\"\n[storage.implementations.redis]",
			)
			.parse()
			.unwrap();
		let result = TrackerBuilder::new(config).build(factories());
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[test]
	fn test_invalid_implementation_config_fails() {
		let config: Config = CONFIG
			.replace(
				"primary = \"memory\"\n[storage.implementations.memory]",
				"primary = \"file\"\n[storage.implementations.file]\nstorage_path = \"\"",
			)
			.parse()
			.unwrap();
		let result = TrackerBuilder::new(config).build(factories());
		assert!(matches!(result, Err(BuilderError::Config(msg)) if msg.contains("'file'")));
	}
}
