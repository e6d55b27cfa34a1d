//! Redis storage backend.
//!
//! Uses a connection manager, opened on first use and shared by all
//! requests. The manager reconnects on its own after the server restarts or
//! the socket drops; the call that hit the failure still errors. Listing uses the native `SCAN` cursor, so its
//! guarantees are Redis's: `COUNT` is only a hint and a key may be returned
//! more than once while the keyspace is being resized.

use crate::{ScanPage, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use order_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

fn backend_error(e: redis::RedisError) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// Escapes glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
	let mut escaped = String::with_capacity(prefix.len());
	for c in prefix.chars() {
		if matches!(c, '*' | '?' | '[' | ']' | '\\') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	escaped
}

/// Redis-backed storage implementation.
pub struct RedisStorage {
	client: redis::Client,
	/// Set on the first successful connect. A failed connect leaves it empty
	/// so the next call retries.
	connection: OnceCell<ConnectionManager>,
	/// Upper bound for connecting and for each command round trip.
	timeout: Duration,
}

impl RedisStorage {
	/// Creates a new RedisStorage. No connection is made until first use.
	pub fn new(client: redis::Client, timeout: Duration) -> Self {
		Self {
			client,
			connection: OnceCell::new(),
			timeout,
		}
	}

	/// Runs a Redis call, failing with a backend error once the timeout passes.
	async fn bounded<T, F>(&self, call: F) -> Result<T, StorageError>
	where
		F: Future<Output = redis::RedisResult<T>>,
	{
		match tokio::time::timeout(self.timeout, call).await {
			Ok(result) => result.map_err(backend_error),
			Err(_) => Err(StorageError::Backend(format!(
				"redis call timed out after {:?}",
				self.timeout
			))),
		}
	}

	/// Returns a handle to the shared connection, connecting on first use.
	async fn connection(&self) -> Result<ConnectionManager, StorageError> {
		self.connection
			.get_or_try_init(|| async {
				let conn = self
					.bounded(ConnectionManager::new(self.client.clone()))
					.await?;
				tracing::info!(component = "storage", implementation = "redis", "Connected");
				Ok::<_, StorageError>(conn)
			})
			.await
			.cloned()
	}
}

#[async_trait]
impl StorageInterface for RedisStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let mut conn = self.connection().await?;
		let value: Option<Vec<u8>> = self
			.bounded(redis::cmd("GET").arg(key).query_async(&mut conn))
			.await?;
		value.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut conn = self.connection().await?;
		let _: () = self
			.bounded(redis::cmd("SET").arg(key).arg(value).query_async(&mut conn))
			.await?;
		Ok(())
	}

	async fn set_bytes_if_exists(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut conn = self.connection().await?;
		// SET .. XX replies nil when the key is absent
		let reply: Option<String> = self
			.bounded(
				redis::cmd("SET")
					.arg(key)
					.arg(value)
					.arg("XX")
					.query_async(&mut conn),
			)
			.await?;
		reply.map(|_| ()).ok_or(StorageError::NotFound)
	}

	async fn delete(&self, key: &str) -> Result<bool, StorageError> {
		let mut conn = self.connection().await?;
		let removed: u64 = self
			.bounded(redis::cmd("DEL").arg(key).query_async(&mut conn))
			.await?;
		Ok(removed > 0)
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let mut conn = self.connection().await?;
		self.bounded(redis::cmd("EXISTS").arg(key).query_async(&mut conn))
			.await
	}

	async fn scan_prefix(
		&self,
		prefix: &str,
		cursor: u64,
		count: usize,
	) -> Result<ScanPage, StorageError> {
		let mut conn = self.connection().await?;
		let pattern = format!("{}*", escape_glob(prefix));

		let (next, keys): (u64, Vec<String>) = self
			.bounded(
				redis::cmd("SCAN")
					.arg(cursor)
					.arg("MATCH")
					.arg(&pattern)
					.arg("COUNT")
					.arg(count.max(1))
					.query_async(&mut conn),
			)
			.await?;

		if keys.is_empty() {
			return Ok(ScanPage {
				values: Vec::new(),
				cursor: next,
			});
		}

		// Keys deleted between SCAN and MGET come back as nil
		let values: Vec<Option<Vec<u8>>> = self
			.bounded(redis::cmd("MGET").arg(&keys).query_async(&mut conn))
			.await?;

		Ok(ScanPage {
			values: values.into_iter().flatten().collect(),
			cursor: next,
		})
	}

	async fn ping(&self) -> Result<(), StorageError> {
		let mut conn = self.connection().await?;
		let _: String = self
			.bounded(redis::cmd("PING").query_async(&mut conn))
			.await?;
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RedisStorageSchema)
	}
}

/// Configuration schema for RedisStorage.
pub struct RedisStorageSchema;

impl ConfigSchema for RedisStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => {
						Ok(())
					}
					_ => Err("must be a redis:// or rediss:// URL".to_string()),
				}
			})],
			vec![Field::new(
				"timeout_ms",
				FieldType::Integer {
					min: Some(1),
					max: Some(60_000),
				},
			)],
		);

		schema.validate(config)
	}
}

/// Factory function to create a Redis storage backend from configuration.
///
/// Configuration parameters:
/// - `url`: Redis connection URL (required)
/// - `timeout_ms`: bound for connecting and for each command (default: 5000)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	RedisStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Configuration("Missing required field: url".into()))?;

	let timeout_ms = config
		.get("timeout_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_MS);

	let client = redis::Client::open(url)
		.map_err(|e| StorageError::Configuration(format!("Invalid redis url: {}", e)))?;

	Ok(Box::new(RedisStorage::new(
		client,
		Duration::from_millis(timeout_ms),
	)))
}

/// Registry for the Redis storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "redis";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
