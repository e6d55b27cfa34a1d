//! Common types for the order service.
//!
//! This crate defines the order entity, its store codec, and the API and
//! configuration-validation types shared by every other crate.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Encoding of order records to and from the key-value store.
pub mod codec;
/// Order entity, derived status and transition tokens.
pub mod order;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Storage key namespaces.
pub mod storage;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use codec::{decode_order, encode_order, order_key, CodecError};
pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use validation::*;
