//! Builder for constructing the order engine.
//!
//! Storage backends are created from the `[storage.implementations]` tables
//! through factory functions keyed by implementation name. Every configured
//! implementation with a known factory is created, so a bad table fails
//! startup even when it is not the primary.

use crate::handlers::OrderHandler;
use crate::repository::StorageOrderRepository;
use crate::OrderEngine;
use order_config::Config;
use order_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory functions for the storage implementations, keyed by name.
pub struct OrderFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for constructing an [`OrderEngine`] from configuration.
pub struct OrderEngineBuilder {
	config: Config,
}

impl OrderEngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine and checks that the primary storage is reachable.
	pub async fn build<SF>(self, factories: OrderFactories<SF>) -> Result<OrderEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(
					component = "storage",
					implementation = %name,
					"Unknown storage implementation, ignoring"
				);
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					storage_impls.insert(name.clone(), implementation);
				}
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				}
			}
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;

		let storage = Arc::new(StorageService::new(storage_backend));
		if let Err(e) = storage.ping().await {
			tracing::error!(
				component = "storage",
				implementation = %primary_storage,
				error = %e,
				"Primary storage is unreachable"
			);
			return Err(BuilderError::Config(format!(
				"Primary storage '{}' is unreachable: {}",
				primary_storage, e
			)));
		}

		let repository = Arc::new(StorageOrderRepository::new(storage.clone()));
		let handler = Arc::new(OrderHandler::new(repository, self.config.api.page_size));

		Ok(OrderEngine::new(self.config, storage, handler))
	}
}
