//! Request handlers for the order lifecycle.

pub mod order;

pub use order::{HandlerError, OrderHandler};
