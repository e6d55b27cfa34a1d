//! Store codec for order records.
//!
//! Orders are stored as a single JSON document per key. Absent timestamps are
//! written as `null` so a decoded record carries exactly the same optional
//! fields as the one that was encoded.

use crate::{Order, StorageKey};
use thiserror::Error;

/// Errors that can occur while encoding or decoding an order record.
#[derive(Debug, Error)]
pub enum CodecError {
	/// The order could not be serialized.
	#[error("Failed to encode order: {0}")]
	Encode(String),
	/// The stored payload is not a valid order record.
	#[error("Failed to decode order: {0}")]
	Decode(String),
}

/// Returns the store key for the given order id, e.g. `order:42`.
pub fn order_key(order_id: u64) -> String {
	format!("{}:{}", StorageKey::Orders.as_str(), order_id)
}

/// Serializes an order to its stored string form.
pub fn encode_order(order: &Order) -> Result<String, CodecError> {
	serde_json::to_string(order).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Deserializes an order from its stored form.
pub fn decode_order(data: &[u8]) -> Result<Order, CodecError> {
	serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
}
