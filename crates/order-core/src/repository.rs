//! Order repository over the key-value storage service.
//!
//! Each order is one key, `order:<id>`, holding the encoded record. There is
//! no secondary index: listing walks the key space with the backend's scan
//! cursor, so order across pages is only as stable as that scan. Under
//! concurrent writes a page may miss or repeat an order.

use async_trait::async_trait;
use order_storage::{StorageError, StorageService};
use order_types::{decode_order, encode_order, order_key, CodecError, Order, StorageKey};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by an [`OrderRepository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
	/// No order is stored under the id.
	#[error("Order {0} does not exist")]
	NotExist(u64),
	/// The store failed or could not be reached.
	#[error("Store error: {0}")]
	Store(String),
	/// A stored record could not be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
}

impl From<CodecError> for RepositoryError {
	fn from(err: CodecError) -> Self {
		match err {
			CodecError::Decode(msg) => RepositoryError::Decode(msg),
			// Encoding a well-formed order only fails on a broken serializer
			CodecError::Encode(msg) => RepositoryError::Store(msg),
		}
	}
}

/// Where a listing page starts and how many orders it asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindAllPage {
	/// Cursor returned by the previous page, 0 for the first page.
	pub offset: u64,
	/// Requested page size. Some backends treat it as a hint.
	pub size: usize,
}

/// One page of orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindResult {
	pub orders: Vec<Order>,
	/// Cursor of the next page; 0 when there are no more pages.
	pub cursor: u64,
}

/// Persistence operations on orders.
///
/// All calls are cancelled by dropping the returned future.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
	/// Writes the order under its id. An existing order with the same id is
	/// overwritten.
	async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

	async fn find_by_id(&self, order_id: u64) -> Result<Order, RepositoryError>;

	/// Overwrites an existing order; fails with `NotExist` when absent.
	async fn update(&self, order: &Order) -> Result<(), RepositoryError>;

	async fn delete_by_id(&self, order_id: u64) -> Result<(), RepositoryError>;

	/// Returns up to `page.size` orders starting at `page.offset`.
	async fn find_all(&self, page: FindAllPage) -> Result<FindResult, RepositoryError>;
}

/// [`OrderRepository`] backed by a [`StorageService`].
pub struct StorageOrderRepository {
	storage: Arc<StorageService>,
}

impl StorageOrderRepository {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}
}

/// Maps a storage failure for one order, turning a missing key into `NotExist`.
fn map_storage_error(order_id: u64, err: StorageError) -> RepositoryError {
	match err {
		StorageError::NotFound => RepositoryError::NotExist(order_id),
		other => RepositoryError::Store(other.to_string()),
	}
}

#[async_trait]
impl OrderRepository for StorageOrderRepository {
	async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
		let encoded = encode_order(order)?;
		self.storage
			.store(&order_key(order.order_id), encoded.into_bytes())
			.await
			.map_err(|e| RepositoryError::Store(e.to_string()))
	}

	async fn find_by_id(&self, order_id: u64) -> Result<Order, RepositoryError> {
		let bytes = self
			.storage
			.retrieve(&order_key(order_id))
			.await
			.map_err(|e| map_storage_error(order_id, e))?;
		Ok(decode_order(&bytes)?)
	}

	async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
		let encoded = encode_order(order)?;
		self.storage
			.update(&order_key(order.order_id), encoded.into_bytes())
			.await
			.map_err(|e| map_storage_error(order.order_id, e))
	}

	async fn delete_by_id(&self, order_id: u64) -> Result<(), RepositoryError> {
		self.storage
			.remove(&order_key(order_id))
			.await
			.map_err(|e| map_storage_error(order_id, e))
	}

	async fn find_all(&self, page: FindAllPage) -> Result<FindResult, RepositoryError> {
		let scanned = self
			.storage
			.scan(StorageKey::Orders, page.offset, page.size)
			.await
			.map_err(|e| RepositoryError::Store(e.to_string()))?;

		let orders = scanned
			.values
			.iter()
			.map(|bytes| decode_order(bytes))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(FindResult {
			orders,
			cursor: scanned.cursor,
		})
	}
}
