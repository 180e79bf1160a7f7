//! In-memory record store.
//!
//! Useful for tests and for running the tracker without persistence; all
//! dispatch state is lost when the process exits.

use crate::{RecordStore, StorageError, StorageFactory, StorageRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracker_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};

/// Record store backed by a `HashMap`.
///
/// Key enumeration follows hash order, which is unspecified.
pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl RecordStore for MemoryStorage {
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		let store = self.store.read().await;
		Ok(store.get(key).cloned())
	}

	async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn keys(&self) -> Result<Vec<String>, StorageError> {
		let store = self.store.read().await;
		Ok(store.keys().cloned().collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory storage has no configuration
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory record store from configuration.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn RecordStore>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory record store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
