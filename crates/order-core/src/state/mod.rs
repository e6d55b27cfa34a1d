//! State management for orders.
//!
//! Holds the transition table that decides which lifecycle changes an
//! order accepts.

pub mod order;

pub use order::{OrderStateError, OrderStateMachine};
