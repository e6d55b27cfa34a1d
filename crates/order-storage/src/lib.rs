//! Storage module for the order service.
//!
//! This module provides the key-value abstraction the order repository is
//! built on, with in-memory, file-based and Redis backends. Backends only see
//! opaque keys and byte values; encoding is the caller's concern.

use async_trait::async_trait;
use order_types::{ConfigSchema, ImplementationRegistry, StorageKey};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod redis;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// One page of a prefix scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
	/// Values of the keys visited by this page.
	pub values: Vec<Vec<u8>>,
	/// Cursor to resume the scan from; 0 when the scan is complete.
	pub cursor: u64,
}

/// Trait defining the low-level interface for storage backends.
///
/// Implementations must be safe to share between concurrent requests. No
/// operation retries on failure. Dropping a returned future abandons the
/// call, which is how request cancellation reaches the backend.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, creating or overwriting the key.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Overwrites an existing key.
	///
	/// Returns `StorageError::NotFound` when the key is absent. The default
	/// implementation checks and writes in two steps; backends with a native
	/// conditional write should override it.
	async fn set_bytes_if_exists(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		if !self.exists(key).await? {
			return Err(StorageError::NotFound);
		}
		self.set_bytes(key, value).await
	}

	/// Deletes the value associated with the given key.
	///
	/// Returns whether the key existed.
	async fn delete(&self, key: &str) -> Result<bool, StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Scans the keys starting with `prefix`, resuming from `cursor`.
	///
	/// A cursor of 0 starts a new scan. `count` bounds the number of keys
	/// visited; backends whose native scan treats it as a hint may return
	/// more or fewer values. Ordering across pages is only as stable as the
	/// backend's scan: keys written or removed while a scan is in progress
	/// may be skipped or returned twice.
	async fn scan_prefix(
		&self,
		prefix: &str,
		cursor: u64,
		count: usize,
	) -> Result<ScanPage, StorageError>;

	/// Verifies the backend is reachable.
	async fn ping(&self) -> Result<(), StorageError> {
		Ok(())
	}

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must provide
/// to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples, one per backend.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory, redis};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
		(redis::Registry::NAME, redis::Registry::factory()),
	]
}

/// Storage service shared by all request handlers.
///
/// Wraps the configured backend and is constructed once at startup, then
/// passed down behind an `Arc`.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a value, overwriting any previous value at the key.
	pub async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.backend.set_bytes(key, value).await
	}

	/// Retrieves the value at the key.
	pub async fn retrieve(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.backend.get_bytes(key).await
	}

	/// Updates an existing value in storage.
	///
	/// Unlike `store`, this returns `StorageError::NotFound` if the key
	/// doesn't exist.
	pub async fn update(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.backend.set_bytes_if_exists(key, value).await
	}

	/// Removes a value from storage.
	///
	/// Returns `StorageError::NotFound` if the key doesn't exist.
	pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
		if self.backend.delete(key).await? {
			Ok(())
		} else {
			Err(StorageError::NotFound)
		}
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.backend.exists(key).await
	}

	/// Returns one page of the values stored under a namespace.
	pub async fn scan(
		&self,
		namespace: StorageKey,
		cursor: u64,
		count: usize,
	) -> Result<ScanPage, StorageError> {
		self.backend
			.scan_prefix(&namespace.prefix(), cursor, count)
			.await
	}

	/// Verifies the backend is reachable.
	pub async fn ping(&self) -> Result<(), StorageError> {
		self.backend.ping().await
	}
}

/// Converts a scan cursor into a skip count for offset-based backends.
pub(crate) fn cursor_offset(cursor: u64) -> usize {
	usize::try_from(cursor).unwrap_or(usize::MAX)
}

/// Computes the cursor following a page of an offset-based scan.
pub(crate) fn next_offset_cursor(offset: usize, taken: usize, total: usize) -> u64 {
	let end = offset.saturating_add(taken);
	if taken == 0 || end >= total {
		0
	} else {
		end as u64
	}
}
