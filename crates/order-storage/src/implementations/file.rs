//! File-based storage backend.
//!
//! Stores one file per key, giving simple persistence without an external
//! server. Intended for single-instance deployments and local development.

use crate::{
	cursor_offset, next_offset_cursor, ScanPage, StorageError, StorageFactory, StorageInterface,
	StorageRegistry,
};
use async_trait::async_trait;
use order_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

const FILE_EXTENSION: &str = "bin";
const TEMP_EXTENSION: &str = "tmp";

/// Sequence for temporary file names, so concurrent writes of one key
/// never share a temp file.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

fn backend_error(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at the given directory.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Converts a key to a filesystem-safe file name, without extension.
	fn file_stem(key: &str) -> String {
		key.replace(['/', ':'], "_")
	}

	fn get_file_path(&self, key: &str) -> PathBuf {
		self.base_path
			.join(format!("{}.{}", Self::file_stem(key), FILE_EXTENSION))
	}

	/// Lists the stems of all stored keys starting with `prefix`, sorted.
	async fn matching_stems(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let stem_prefix = Self::file_stem(prefix);

		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			// Nothing has been written yet
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend_error(e)),
		};

		let mut stems = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend_error)? {
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new(FILE_EXTENSION)) {
				continue;
			}
			if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
				if stem.starts_with(&stem_prefix) {
					stems.push(stem.to_string());
				}
			}
		}

		stems.sort();
		Ok(stems)
	}

	/// Removes temp files left by writes interrupted before their rename.
	/// Returns the number removed.
	async fn remove_stale_temp_files(&self) -> Result<usize, StorageError> {
		let mut entries = fs::read_dir(&self.base_path)
			.await
			.map_err(backend_error)?;

		let mut removed = 0;
		while let Some(entry) = entries.next_entry().await.map_err(backend_error)? {
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new(TEMP_EXTENSION)) {
				continue;
			}
			match fs::remove_file(&path).await {
				Ok(()) => removed += 1,
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => return Err(backend_error(e)),
			}
		}
		Ok(removed)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(backend_error(e)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		fs::create_dir_all(&self.base_path)
			.await
			.map_err(backend_error)?;

		// Write atomically by writing to temp file then renaming
		let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
		let temp_path = path.with_extension(format!("{}.{}", seq, TEMP_EXTENSION));
		fs::write(&temp_path, value).await.map_err(backend_error)?;

		if let Err(e) = fs::rename(&temp_path, &path).await {
			let _ = fs::remove_file(&temp_path).await;
			return Err(backend_error(e));
		}

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(true),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(backend_error(e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key);
		fs::try_exists(&path).await.map_err(backend_error)
	}

	async fn scan_prefix(
		&self,
		prefix: &str,
		cursor: u64,
		count: usize,
	) -> Result<ScanPage, StorageError> {
		let stems = self.matching_stems(prefix).await?;
		let offset = cursor_offset(cursor);

		let page: Vec<&String> = stems.iter().skip(offset).take(count.max(1)).collect();
		let mut values = Vec::with_capacity(page.len());
		for stem in &page {
			let path = self.base_path.join(format!("{}.{}", stem, FILE_EXTENSION));
			match fs::read(&path).await {
				Ok(data) => values.push(data),
				// Removed since the directory was listed
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
					tracing::debug!("Skipping {:?}: removed during scan", path);
				}
				Err(e) => return Err(backend_error(e)),
			}
		}

		Ok(ScanPage {
			values,
			cursor: next_offset_cursor(offset, page.len(), stems.len()),
		})
	}

	/// Creates the storage directory and sweeps stale temp files. Called at
	/// startup, before any write is in flight.
	async fn ping(&self) -> Result<(), StorageError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(backend_error)?;

		let removed = self.remove_stale_temp_files().await?;
		if removed > 0 {
			tracing::info!(
				component = "storage",
				implementation = "file",
				removed,
				"Removed stale temp files"
			);
		}
		Ok(())
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
			vec![], // No required fields
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("storage_path cannot be empty".to_string()),
				}
			})],
		);

		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/orders")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/orders")
		.to_string();

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn storage(dir: &TempDir) -> FileStorage {
		FileStorage::new(dir.path().join("orders"))
	}

	#[tokio::test]
	async fn test_basic_operations() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);

		assert!(matches!(
			storage.get_bytes("order:1").await,
			Err(StorageError::NotFound)
		));

		storage.set_bytes("order:1", b"hello".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("order:1").await.unwrap(), b"hello".to_vec());
		assert!(storage.exists("order:1").await.unwrap());
		assert!(dir.path().join("orders").join("order_1.bin").exists());

		assert!(storage.delete("order:1").await.unwrap());
		assert!(!storage.delete("order:1").await.unwrap());
		assert!(!storage.exists("order:1").await.unwrap());
	}

	#[tokio::test]
	async fn test_conditional_overwrite_uses_default() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);

		let result = storage.set_bytes_if_exists("order:5", b"x".to_vec()).await;
		assert!(matches!(result, Err(StorageError::NotFound)));

		storage.set_bytes("order:5", b"x".to_vec()).await.unwrap();
		storage
			.set_bytes_if_exists("order:5", b"y".to_vec())
			.await
			.unwrap();
		assert_eq!(storage.get_bytes("order:5").await.unwrap(), b"y".to_vec());
	}

	#[tokio::test]
	async fn test_scan_pages() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);

		// Scanning a directory that does not exist yet is an empty scan
		let page = storage.scan_prefix("order:", 0, 2).await.unwrap();
		assert_eq!(page, ScanPage::default());

		for i in 0..5u8 {
			storage
				.set_bytes(&format!("order:{}", i), vec![i])
				.await
				.unwrap();
		}
		storage.set_bytes("other:1", vec![42]).await.unwrap();

		let first = storage.scan_prefix("order:", 0, 2).await.unwrap();
		assert_eq!(first.values.len(), 2);
		assert_eq!(first.cursor, 2);

		let second = storage.scan_prefix("order:", first.cursor, 2).await.unwrap();
		let third = storage.scan_prefix("order:", second.cursor, 2).await.unwrap();
		assert_eq!(third.values.len(), 1);
		assert_eq!(third.cursor, 0);

		let mut all: Vec<u8> = first
			.values
			.into_iter()
			.chain(second.values)
			.chain(third.values)
			.map(|v| v[0])
			.collect();
		all.sort();
		assert_eq!(all, vec![0, 1, 2, 3, 4]);
	}

	#[tokio::test]
	async fn test_ping_removes_interrupted_writes() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);
		let base = dir.path().join("orders");

		storage.set_bytes("order:1", b"kept".to_vec()).await.unwrap();
		std::fs::write(base.join("order_2.17.tmp"), b"partial").unwrap();

		storage.ping().await.unwrap();

		assert!(!base.join("order_2.17.tmp").exists());
		assert_eq!(storage.get_bytes("order:1").await.unwrap(), b"kept".to_vec());
		let page = storage.scan_prefix("order:", 0, 10).await.unwrap();
		assert_eq!(page.values, vec![b"kept".to_vec()]);
	}

	#[test]
	fn test_factory_validates_config() {
		let config: toml::Value = toml::from_str("storage_path = \"\"").unwrap();
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(_))
		));

		let config: toml::Value = toml::from_str("storage_path = \"/tmp/orders\"").unwrap();
		assert!(create_storage(&config).is_ok());
	}
}
