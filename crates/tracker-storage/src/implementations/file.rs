//! File-backed record store.
//!
//! Each key is one file under a base directory, named by the SHA3-256 digest
//! of the key. The file starts with a small header, followed by the full key
//! and the UTF-8 value, so `keys()` returns keys unchanged whatever their
//! length or characters.

use crate::{RecordStore, StorageError, StorageFactory, StorageRegistry};
use async_trait::async_trait;
use sha3::{Digest, Sha3_256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracker_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};

const EXTENSION: &str = "rec";
const TEMP_EXTENSION: &str = "tmp";
const DEFAULT_STORAGE_PATH: &str = "./data/dispatch";

/// Distinguishes temp files of concurrent writes within this process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fixed-size record header.
///
/// Layout (12 bytes): magic "DSPR", version (u16 LE), reserved (2 bytes),
/// key length (u32 LE). The key bytes follow the header in every version;
/// the version only governs how the value after them is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordHeader {
	version: u16,
	key_len: u32,
}

impl RecordHeader {
	const MAGIC: &'static [u8; 4] = b"DSPR";
	const VERSION: u16 = 1;
	const SIZE: usize = 12;

	fn for_key(key: &str) -> Result<Self, StorageError> {
		let key_len = u32::try_from(key.len()).map_err(|_| {
			StorageError::Backend(format!("Key too long: {} bytes", key.len()))
		})?;
		Ok(Self {
			version: Self::VERSION,
			key_len,
		})
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[8..12].copy_from_slice(&self.key_len.to_le_bytes());
		bytes
	}

	/// Parses the header at the start of `bytes`.
	///
	/// Returns `None` if `bytes` does not start with a header.
	fn parse(bytes: &[u8]) -> Option<Self> {
		if bytes.len() < Self::SIZE || &bytes[0..4] != Self::MAGIC {
			return None;
		}
		Some(Self {
			version: u16::from_le_bytes([bytes[4], bytes[5]]),
			key_len: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
		})
	}
}

/// A record file split into its parts.
struct DecodedRecord<'a> {
	version: u16,
	key: String,
	value: &'a [u8],
}

impl<'a> DecodedRecord<'a> {
	fn encode(key: &str, value: &str) -> Result<Vec<u8>, StorageError> {
		let header = RecordHeader::for_key(key)?;
		let mut data = Vec::with_capacity(RecordHeader::SIZE + key.len() + value.len());
		data.extend_from_slice(&header.serialize());
		data.extend_from_slice(key.as_bytes());
		data.extend_from_slice(value.as_bytes());
		Ok(data)
	}

	/// Returns `None` if the header or the embedded key is unreadable.
	fn decode(data: &'a [u8]) -> Option<Self> {
		let header = RecordHeader::parse(data)?;
		let key_end = RecordHeader::SIZE.checked_add(header.key_len as usize)?;
		let key = std::str::from_utf8(data.get(RecordHeader::SIZE..key_end)?).ok()?;
		Some(Self {
			version: header.version,
			key: key.to_string(),
			value: &data[key_end..],
		})
	}
}

/// Record store writing one file per key.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	pub fn base_path(&self) -> &Path {
		&self.base_path
	}

	fn file_path(&self, key: &str) -> PathBuf {
		let digest = Sha3_256::digest(key.as_bytes());
		self.base_path
			.join(format!("{}.{}", hex::encode(digest), EXTENSION))
	}

	fn temp_path(&self, path: &Path) -> PathBuf {
		let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
		let mut name = path.file_name().unwrap_or_default().to_os_string();
		name.push(format!(".{}.{}.{}", std::process::id(), seq, TEMP_EXTENSION));
		path.with_file_name(name)
	}

	/// Reads a file, mapping a missing file to `None`.
	async fn read_file(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		match fs::read(path).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}
}

#[async_trait]
impl RecordStore for FileStorage {
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		let path = self.file_path(key);
		let Some(data) = Self::read_file(&path).await? else {
			return Ok(None);
		};

		// Content problems are the reader's concern, not an I/O failure.
		let value = match DecodedRecord::decode(&data) {
			Some(record) if record.key != key => {
				tracing::warn!(key = %key, stored_key = %record.key, "Record file holds another key");
				return Ok(None);
			},
			Some(record) => {
				if record.version > RecordHeader::VERSION {
					tracing::warn!(
						key = %key,
						version = record.version,
						"Unsupported record version, reading value as is"
					);
				}
				record.value
			},
			None => {
				tracing::warn!(key = %key, "Record file has no readable header");
				&data[..]
			},
		};

		Ok(Some(String::from_utf8_lossy(value).into_owned()))
	}

	async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
		let path = self.file_path(key);
		let file_data = DecodedRecord::encode(key, &value)?;

		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		// Write atomically by writing to a temp file then renaming
		let temp_path = self.temp_path(&path);
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		if let Err(e) = fs::rename(&temp_path, &path).await {
			let _ = fs::remove_file(&temp_path).await;
			return Err(StorageError::Backend(e.to_string()));
		}

		Ok(())
	}

	async fn keys(&self) -> Result<Vec<String>, StorageError> {
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
				tracing::debug!("Skipping foreign file {:?}", path);
				continue;
			}
			// A file may be replaced or removed while the directory is listed.
			let Some(data) = Self::read_file(&path).await? else {
				continue;
			};
			match DecodedRecord::decode(&data) {
				Some(record) => keys.push(record.key),
				None => tracing::warn!("Skipping record file without readable key {:?}", path),
			}
		}
		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(s) if !s.trim().is_empty() => Ok(()),
						_ => Err("storage_path cannot be empty".to_string()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file record store from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the record files (default: "./data/dispatch")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn RecordStore>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file record store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
