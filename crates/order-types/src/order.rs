//! Order entity types.
//!
//! An order is identified by a 64-bit id and carries its line items and the
//! lifecycle timestamps. The lifecycle status is never stored; it is derived
//! from which timestamps are present, so the timestamps double as the audit
//! history of the order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A single line of an order.
///
/// Line items are opaque to the service: no catalog lookup is performed
/// and the price is kept in the smallest currency unit supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
	/// Identifier of the purchased item.
	pub item_id: Uuid,
	/// Number of units ordered.
	pub quantity: u32,
	/// Unit price.
	pub price: u64,
}

/// The persisted order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier, assigned at creation and never changed.
	pub order_id: u64,
	/// Identifier of the customer who placed the order.
	pub customer_id: Uuid,
	/// Ordered line items, kept in the order supplied by the client.
	pub line_items: Vec<LineItem>,
	/// Creation timestamp.
	pub created_at: DateTime<Utc>,
	/// Set once when the order ships.
	pub shipped_at: Option<DateTime<Utc>>,
	/// Set once when the order completes, only after it shipped.
	pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
	/// Creates a new order in the `Created` state.
	pub fn new(
		order_id: u64,
		customer_id: Uuid,
		line_items: Vec<LineItem>,
		created_at: DateTime<Utc>,
	) -> Self {
		Self {
			order_id,
			customer_id,
			line_items,
			created_at,
			shipped_at: None,
			completed_at: None,
		}
	}

	/// Returns the lifecycle status derived from the timestamps.
	pub fn status(&self) -> OrderStatus {
		match (self.shipped_at, self.completed_at) {
			(None, None) => OrderStatus::Created,
			(Some(_), None) => OrderStatus::Shipped,
			(_, Some(_)) => OrderStatus::Completed,
		}
	}
}

/// Lifecycle status of an order.
///
/// `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	Created,
	Shipped,
	Completed,
}

impl OrderStatus {
	/// Returns the string representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Created => "created",
			OrderStatus::Shipped => "shipped",
			OrderStatus::Completed => "completed",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a client-supplied status token is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status token: {0:?}")]
pub struct UnknownStatusToken(pub String);

/// A client-requested target status.
///
/// Only the states an order can move *into* are accepted; `created` is
/// the initial state and cannot be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusToken {
	Shipped,
	Completed,
}

impl StatusToken {
	/// The status an order ends up in once this token is applied.
	pub fn target(&self) -> OrderStatus {
		match self {
			StatusToken::Shipped => OrderStatus::Shipped,
			StatusToken::Completed => OrderStatus::Completed,
		}
	}
}

impl FromStr for StatusToken {
	type Err = UnknownStatusToken;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"shipped" => Ok(Self::Shipped),
			"completed" => Ok(Self::Completed),
			other => Err(UnknownStatusToken(other.to_string())),
		}
	}
}
