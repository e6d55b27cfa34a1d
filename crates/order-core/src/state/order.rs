//! Order state machine implementation.
//!
//! Orders move through `created -> shipped -> completed`. The state is never
//! stored: it is read from the lifecycle timestamps, and a transition sets
//! the timestamp of the state it enters.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use order_types::{Order, OrderStatus, StatusToken};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during order state management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderStateError {
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// Static transition table - each state maps to allowed next states
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(OrderStatus::Created, HashSet::from([OrderStatus::Shipped]));
	m.insert(OrderStatus::Shipped, HashSet::from([OrderStatus::Completed]));
	m.insert(OrderStatus::Completed, HashSet::new()); // terminal
	m
});

/// Validates and applies lifecycle transitions to orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderStateMachine;

impl OrderStateMachine {
	pub fn new() -> Self {
		Self
	}

	/// Checks if a state transition is valid
	pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
		TRANSITIONS
			.get(&from)
			.is_some_and(|allowed| allowed.contains(&to))
	}

	/// Moves `order` into the state named by `token`, stamping the
	/// matching timestamp with `now`.
	///
	/// The order is left untouched when the transition is not allowed.
	pub fn apply(
		&self,
		order: &mut Order,
		token: StatusToken,
		now: DateTime<Utc>,
	) -> Result<(), OrderStateError> {
		let from = order.status();
		let to = token.target();
		if !Self::is_valid_transition(from, to) {
			return Err(OrderStateError::InvalidTransition { from, to });
		}

		match token {
			StatusToken::Shipped => order.shipped_at = Some(now),
			StatusToken::Completed => order.completed_at = Some(now),
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_types::LineItem;
	use uuid::Uuid;

	fn new_order() -> Order {
		Order::new(
			1,
			Uuid::new_v4(),
			vec![LineItem {
				item_id: Uuid::new_v4(),
				quantity: 2,
				price: 150,
			}],
			Utc::now(),
		)
	}

	#[test]
	fn test_transition_table() {
		use OrderStatus::*;
		assert!(OrderStateMachine::is_valid_transition(Created, Shipped));
		assert!(OrderStateMachine::is_valid_transition(Shipped, Completed));
		assert!(!OrderStateMachine::is_valid_transition(Created, Completed));
		assert!(!OrderStateMachine::is_valid_transition(Shipped, Shipped));
		assert!(!OrderStateMachine::is_valid_transition(Completed, Shipped));
		assert!(!OrderStateMachine::is_valid_transition(Completed, Completed));
	}

	#[test]
	fn test_ship_then_complete() {
		let machine = OrderStateMachine::new();
		let mut order = new_order();
		let shipped = Utc::now();

		machine
			.apply(&mut order, StatusToken::Shipped, shipped)
			.unwrap();
		assert_eq!(order.shipped_at, Some(shipped));
		assert_eq!(order.status(), OrderStatus::Shipped);

		let completed = Utc::now();
		machine
			.apply(&mut order, StatusToken::Completed, completed)
			.unwrap();
		assert_eq!(order.shipped_at, Some(shipped));
		assert_eq!(order.completed_at, Some(completed));
		assert_eq!(order.status(), OrderStatus::Completed);
	}

	#[test]
	fn test_ship_only_once() {
		let machine = OrderStateMachine::new();
		let mut order = new_order();
		let first = Utc::now();
		machine.apply(&mut order, StatusToken::Shipped, first).unwrap();

		let err = machine
			.apply(&mut order, StatusToken::Shipped, Utc::now())
			.unwrap_err();
		assert_eq!(
			err,
			OrderStateError::InvalidTransition {
				from: OrderStatus::Shipped,
				to: OrderStatus::Shipped,
			}
		);
		// The original timestamp survives the rejected attempt
		assert_eq!(order.shipped_at, Some(first));
	}

	#[test]
	fn test_complete_requires_shipped() {
		let machine = OrderStateMachine::new();
		let mut order = new_order();

		let err = machine
			.apply(&mut order, StatusToken::Completed, Utc::now())
			.unwrap_err();
		assert!(matches!(
			err,
			OrderStateError::InvalidTransition {
				from: OrderStatus::Created,
				..
			}
		));
		assert!(order.completed_at.is_none());

		machine
			.apply(&mut order, StatusToken::Shipped, Utc::now())
			.unwrap();
		machine
			.apply(&mut order, StatusToken::Completed, Utc::now())
			.unwrap();
		assert!(machine
			.apply(&mut order, StatusToken::Completed, Utc::now())
			.is_err());
		assert!(machine
			.apply(&mut order, StatusToken::Shipped, Utc::now())
			.is_err());
	}
}
