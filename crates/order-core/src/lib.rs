//! Core of the order service.
//!
//! Ties the order lifecycle together: the repository persisting orders in the
//! key-value store, the state machine validating status changes, and the
//! handler serving requests. [`builder::OrderEngineBuilder`] assembles them
//! from configuration.

use order_config::Config;
use order_storage::StorageService;
use std::sync::Arc;

pub mod builder;
pub mod handlers;
pub mod id;
pub mod repository;
pub mod state;

pub use builder::{BuilderError, OrderEngineBuilder, OrderFactories};
pub use handlers::{HandlerError, OrderHandler};
pub use repository::{
	FindAllPage, FindResult, OrderRepository, RepositoryError, StorageOrderRepository,
};
pub use state::{OrderStateError, OrderStateMachine};

/// The assembled order service.
///
/// Owns the shared storage handle and the handler built on it. Cloning is
/// cheap; clones share the same storage connection.
#[derive(Clone)]
pub struct OrderEngine {
	/// Service configuration.
	config: Config,
	/// Storage shared by every request.
	storage: Arc<StorageService>,
	/// Lifecycle handler serving the API.
	handler: Arc<OrderHandler>,
}

impl OrderEngine {
	pub fn new(config: Config, storage: Arc<StorageService>, handler: Arc<OrderHandler>) -> Self {
		Self {
			config,
			storage,
			handler,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	pub fn handler(&self) -> &Arc<OrderHandler> {
		&self.handler
	}

	/// Releases the engine's hold on the storage connection.
	///
	/// The connection closes once the last request still holding a handle
	/// has finished.
	pub fn shutdown(self) {
		let service_id = self.config.service.id.clone();
		drop(self);
		tracing::info!(component = "storage", service_id = %service_id, "Storage released");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_config::builders::ConfigBuilder;
	use order_storage::implementations::memory::MemoryStorage;

	#[test]
	fn test_shutdown_releases_storage() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let repository = Arc::new(StorageOrderRepository::new(storage.clone()));
		let handler = Arc::new(OrderHandler::new(repository, 10));
		let engine = OrderEngine::new(ConfigBuilder::new().build(), storage.clone(), handler);

		assert_eq!(Arc::strong_count(&storage), 3);
		engine.shutdown();
		assert_eq!(Arc::strong_count(&storage), 1);
	}
}
