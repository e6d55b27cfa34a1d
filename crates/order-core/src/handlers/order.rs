//! Order lifecycle handler.
//!
//! Validates incoming requests, applies lifecycle transitions and drives the
//! repository. Store and decode failures are logged here with the operation
//! and order id; callers only see the error kind.

use crate::id::generate_order_id;
use crate::repository::{FindAllPage, FindResult, OrderRepository, RepositoryError};
use crate::state::{OrderStateError, OrderStateMachine};
use chrono::Utc;
use order_types::{APIError, LineItem, Order, StatusToken};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Errors that can occur while handling an order request.
#[derive(Debug, Error)]
pub enum HandlerError {
	/// The request is malformed; the message is safe to show to clients.
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Order {0} not found")]
	NotFound(u64),
	#[error(transparent)]
	InvalidTransition(#[from] OrderStateError),
	#[error("Store error: {0}")]
	Store(String),
	#[error("Decode error: {0}")]
	Decode(String),
}

/// Maps handler failures onto HTTP errors. Store and decode details stay
/// in the server log.
impl From<HandlerError> for APIError {
	fn from(err: HandlerError) -> Self {
		match err {
			HandlerError::Validation(message) => APIError::bad_request(message),
			HandlerError::NotFound(id) => APIError::not_found(format!("order {} not found", id)),
			HandlerError::InvalidTransition(e) => APIError::bad_request(e.to_string()),
			HandlerError::Store(_) | HandlerError::Decode(_) => APIError::internal(),
		}
	}
}

/// Converts a repository failure, logging the ones clients cannot fix.
fn repository_error(
	operation: &'static str,
	order_id: Option<u64>,
	err: RepositoryError,
) -> HandlerError {
	match err {
		RepositoryError::NotExist(id) => {
			tracing::debug!(operation, order_id = id, "Order not found");
			HandlerError::NotFound(id)
		}
		RepositoryError::Store(msg) => {
			tracing::error!(operation, order_id = ?order_id, error = %msg, "Store failure");
			HandlerError::Store(msg)
		}
		RepositoryError::Decode(msg) => {
			tracing::error!(
				operation,
				order_id = ?order_id,
				error = %msg,
				"Stored order is corrupt"
			);
			HandlerError::Decode(msg)
		}
	}
}

/// Checks the fields of a creation request.
fn validate_new_order(customer_id: &Uuid, line_items: &[LineItem]) -> Result<(), HandlerError> {
	if customer_id.is_nil() {
		return Err(HandlerError::Validation(
			"customer_id must not be the nil UUID".into(),
		));
	}
	if line_items.is_empty() {
		return Err(HandlerError::Validation(
			"line_items must contain at least one item".into(),
		));
	}
	if let Some(index) = line_items.iter().position(|item| item.quantity == 0) {
		return Err(HandlerError::Validation(format!(
			"line_items[{}].quantity must be greater than 0",
			index
		)));
	}
	Ok(())
}

/// Handler for the order lifecycle.
pub struct OrderHandler {
	repository: Arc<dyn OrderRepository>,
	state_machine: OrderStateMachine,
	/// Orders requested per listing page.
	page_size: usize,
}

impl OrderHandler {
	pub fn new(repository: Arc<dyn OrderRepository>, page_size: usize) -> Self {
		Self {
			repository,
			state_machine: OrderStateMachine::new(),
			page_size,
		}
	}

	/// Creates and stores a new order in the `created` state.
	#[instrument(skip_all, fields(customer_id = %customer_id))]
	pub async fn create(
		&self,
		customer_id: Uuid,
		line_items: Vec<LineItem>,
	) -> Result<Order, HandlerError> {
		validate_new_order(&customer_id, &line_items)?;

		let now = Utc::now();
		let order = Order::new(generate_order_id(now), customer_id, line_items, now);

		self.repository
			.insert(&order)
			.await
			.map_err(|e| repository_error("create", Some(order.order_id), e))?;

		tracing::info!(order_id = order.order_id, "Order created");
		Ok(order)
	}

	/// Returns the page of orders starting at `cursor`.
	#[instrument(skip(self))]
	pub async fn list(&self, cursor: u64) -> Result<FindResult, HandlerError> {
		self.repository
			.find_all(FindAllPage {
				offset: cursor,
				size: self.page_size,
			})
			.await
			.map_err(|e| repository_error("list", None, e))
	}

	#[instrument(skip(self))]
	pub async fn get_by_id(&self, order_id: u64) -> Result<Order, HandlerError> {
		self.repository
			.find_by_id(order_id)
			.await
			.map_err(|e| repository_error("get", Some(order_id), e))
	}

	/// Moves an order to the status named by `status`, returning the
	/// updated order.
	#[instrument(skip(self))]
	pub async fn update_status(&self, order_id: u64, status: &str) -> Result<Order, HandlerError> {
		let mut order = self
			.repository
			.find_by_id(order_id)
			.await
			.map_err(|e| repository_error("update", Some(order_id), e))?;

		let token = status
			.parse::<StatusToken>()
			.map_err(|e| HandlerError::Validation(e.to_string()))?;

		if let Err(e) = self.state_machine.apply(&mut order, token, Utc::now()) {
			tracing::debug!(order_id, error = %e, "Transition rejected");
			return Err(e.into());
		}

		self.repository
			.update(&order)
			.await
			.map_err(|e| repository_error("update", Some(order_id), e))?;

		tracing::info!(order_id, status = %order.status(), "Order status updated");
		Ok(order)
	}

	#[instrument(skip(self))]
	pub async fn delete_by_id(&self, order_id: u64) -> Result<(), HandlerError> {
		self.repository
			.delete_by_id(order_id)
			.await
			.map_err(|e| repository_error("delete", Some(order_id), e))?;

		tracing::info!(order_id, "Order deleted");
		Ok(())
	}
}
