//! Order id generation.
//!
//! Ids are 64-bit and time ordered: Unix milliseconds in the high 44 bits and
//! 20 random bits below them. Two ids only collide when they are drawn in the
//! same millisecond with the same random bits; such a collision is not
//! detected and the later insert overwrites the earlier order.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Number of low bits filled with randomness.
const RANDOM_BITS: u32 = 20;
const RANDOM_MASK: u64 = (1 << RANDOM_BITS) - 1;

/// Generates a new order id for an order created at `now`.
pub fn generate_order_id(now: DateTime<Utc>) -> u64 {
	let random = Uuid::new_v4().as_u128() as u64;
	compose_order_id(now, random)
}

/// Builds an id from a creation time and a source of random bits.
fn compose_order_id(now: DateTime<Utc>, random: u64) -> u64 {
	// Pre-epoch clocks collapse to zero rather than wrapping
	let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
	(millis << RANDOM_BITS) | (random & RANDOM_MASK)
}

/// Returns the creation time encoded in an order id, in Unix milliseconds.
#[cfg(test)]
fn order_id_millis(order_id: u64) -> u64 {
	order_id >> RANDOM_BITS
}
