//! Registry trait for self-registering implementations.
//!
//! Each pluggable module (storage backends, backend clients) provides a
//! Registry struct implementing this trait, tying its configuration name to
//! its factory function.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// Must match the key under the owning section, for example:
	/// - "memory" for `storage.implementations.memory`
	/// - "http" for `backend.implementations.http`
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
