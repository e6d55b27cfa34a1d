//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every storage backend module provides a `Registry` struct implementing
/// this trait, tying the name used under `[storage.implementations.<name>]`
/// to the factory that builds the backend.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "redis" for `storage.implementations.redis`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
