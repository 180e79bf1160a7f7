//! Static order catalogue configured inline.
//!
//! Lets the tracker run without a document store, e.g. for local
//! development or demos:
//!
//! ```toml
//! [orders.implementations.memory]
//! [[orders.implementations.memory.orders]]
//! _id = "o1"
//! fullName = "Jane Doe"
//! orderDate = "2024-01-05"
//! ```

use crate::{OrderSourceError, OrderSourceFactory, OrderSourceInterface, OrderSourceRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracker_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderSummary, Schema, ValidationError,
};

#[derive(Debug, Default, Deserialize)]
struct MemorySourceConfig {
	#[serde(default)]
	orders: Vec<OrderSummary>,
}

/// Order source answering from a fixed set of orders.
pub struct MemoryOrderSource {
	orders: HashMap<String, OrderSummary>,
}

impl MemoryOrderSource {
	pub fn new(orders: Vec<OrderSummary>) -> Self {
		Self {
			orders: orders.into_iter().map(|o| (o.id.clone(), o)).collect(),
		}
	}
}

#[async_trait]
impl OrderSourceInterface for MemoryOrderSource {
	async fn fetch_order(&self, order_id: &str) -> Result<Option<OrderSummary>, OrderSourceError> {
		Ok(self.orders.get(order_id).cloned())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryOrderSourceSchema)
	}
}

/// Configuration schema for MemoryOrderSource.
pub struct MemoryOrderSourceSchema;

impl ConfigSchema for MemoryOrderSourceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let order = Schema::new(
			vec![Field::new("_id", FieldType::String)],
			vec![
				Field::new("fullName", FieldType::String),
				Field::new("orderDate", FieldType::String),
			],
		);
		Schema::new(
			vec![],
			vec![Field::new(
				"orders",
				FieldType::Array(Box::new(FieldType::Table(order))),
			)],
		)
		.validate(config)
	}
}

/// Factory function to create the static catalogue from configuration.
///
/// Configuration parameters:
/// - `orders`: array of `{ _id, fullName, orderDate }` tables (default: empty)
pub fn create_source(
	config: &toml::Value,
) -> Result<Box<dyn OrderSourceInterface>, OrderSourceError> {
	MemoryOrderSourceSchema
		.validate(config)
		.map_err(|e| OrderSourceError::Configuration(e.to_string()))?;

	let parsed = config
		.clone()
		.try_into::<MemorySourceConfig>()
		.map_err(|e| OrderSourceError::Configuration(e.to_string()))?;

	Ok(Box::new(MemoryOrderSource::new(parsed.orders)))
}

/// Registry for the static catalogue.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = OrderSourceFactory;

	fn factory() -> Self::Factory {
		create_source
	}
}

impl OrderSourceRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_factory_loads_orders_from_toml() {
		let config: toml::Value = toml::from_str(
			r#"
[[orders]]
_id = "o1"
fullName = "Jane Doe"
orderDate = "2024-01-05"

[[orders]]
_id = "o2"
"#,
		)
		.unwrap();

		let source = create_source(&config).unwrap();
		let o1 = source.fetch_order("o1").await.unwrap().unwrap();
		assert_eq!(o1, OrderSummary::new("o1", "Jane Doe", "2024-01-05"));

		let o2 = source.fetch_order("o2").await.unwrap().unwrap();
		assert!(o2.full_name.is_empty());

		assert!(source.fetch_order("o3").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_empty_config_is_empty_catalogue() {
		let source = create_source(&toml::Value::Table(Default::default())).unwrap();
		assert!(source.fetch_order("o1").await.unwrap().is_none());
	}

	#[test]
	fn test_order_without_id_rejected() {
		let config: toml::Value = toml::from_str("[[orders]]\nfullName = \"x\"").unwrap();
		assert!(matches!(
			create_source(&config),
			Err(OrderSourceError::Configuration(_))
		));
	}
}
