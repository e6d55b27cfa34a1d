//! HTTP endpoints of the order API.

pub mod order;
