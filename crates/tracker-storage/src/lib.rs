//! Record storage for the order dispatch tracker.
//!
//! Dispatch state lives in a flat, operator-local key-value namespace of
//! string values. This crate abstracts that namespace behind the
//! [`RecordStore`] trait so the tracker can run over an in-memory map in tests
//! or a directory of files in production.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracker_types::{ConfigSchema, ImplementationRegistry, StorageKey};

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs during serialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface of a key-value namespace.
///
/// Mirrors the capabilities the tracker relies on: read one key, write one
/// key, enumerate all keys. There is deliberately no delete; dispatch records
/// are never removed.
#[async_trait]
pub trait RecordStore: Send + Sync {
	/// Returns the value stored at `key`, or `None` if the key is absent.
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

	/// Writes `value` at `key`, replacing any previous value.
	async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

	/// Returns every key currently in the namespace, in backend order.
	async fn keys(&self) -> Result<Vec<String>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for record store factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn RecordStore>, StorageError>;

/// Registry trait for record store implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Returns `(name, factory)` for every built-in record store.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// One entry found by a prefix scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
	/// Full key, prefix included.
	pub key: String,
	/// Raw value, `None` if the key vanished between listing and reading.
	pub value: Option<String>,
}

/// Typed access to a record store, addressed by key family and id.
pub struct StorageService {
	backend: Box<dyn RecordStore>,
}

impl StorageService {
	pub fn new(backend: Box<dyn RecordStore>) -> Self {
		Self { backend }
	}

	/// Serializes `data` to JSON and stores it under `family` + `id`.
	pub async fn store<T: Serialize>(
		&self,
		family: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let value =
			serde_json::to_string(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set(&family.key_for(id), value).await
	}

	/// Returns the raw stored value for `family` + `id`.
	///
	/// Values are returned unparsed so callers can decide how to treat
	/// malformed content.
	pub async fn retrieve_raw(
		&self,
		family: StorageKey,
		id: &str,
	) -> Result<Option<String>, StorageError> {
		self.backend.get(&family.key_for(id)).await
	}

	/// Reads every entry whose key belongs to `family`.
	pub async fn scan(&self, family: StorageKey) -> Result<Vec<ScannedEntry>, StorageError> {
		let keys = self.backend.keys().await?;
		let mut entries = Vec::new();
		for key in keys.into_iter().filter(|k| family.matches(k)) {
			let value = self.backend.get(&key).await?;
			entries.push(ScannedEntry { key, value });
		}
		Ok(entries)
	}

	/// Writes a raw value at an arbitrary key.
	///
	/// Used to seed namespaces that are shared with other tooling.
	pub async fn put_raw(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
		self.backend.set(key, value.into()).await
	}
}
