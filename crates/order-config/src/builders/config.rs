//! Configuration builder for creating test and development configurations.

use crate::{ApiConfig, Config, ServiceConfig, StorageConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to an in-memory store, so a built config is ready to serve.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	shutdown_grace_seconds: u64,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	api: ApiConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);
		Self {
			service_id: "test-orders".to_string(),
			shutdown_grace_seconds: 1,
			storage_primary: "memory".to_string(),
			storage_implementations,
			api: ApiConfig::default(),
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn shutdown_grace_seconds(mut self, seconds: u64) -> Self {
		self.shutdown_grace_seconds = seconds;
		self
	}

	/// Sets the primary storage implementation. Its settings must be added
	/// with [`Self::storage_implementation`] unless it is `memory`.
	pub fn storage_primary(mut self, primary: impl Into<String>) -> Self {
		self.storage_primary = primary.into();
		self
	}

	/// Adds settings for a storage implementation.
	pub fn storage_implementation(mut self, name: impl Into<String>, config: toml::Value) -> Self {
		self.storage_implementations.insert(name.into(), config);
		self
	}

	pub fn page_size(mut self, page_size: usize) -> Self {
		self.api.page_size = page_size;
		self
	}

	/// Replaces the whole API configuration.
	pub fn api(mut self, api: ApiConfig) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
				shutdown_grace_seconds: self.shutdown_grace_seconds,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
			},
			api: self.api,
		}
	}
}
