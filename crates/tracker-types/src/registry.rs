//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every pluggable backend (record stores, order sources) ships a `Registry`
/// unit struct implementing this trait, tying the name used in TOML
/// configuration to the factory that builds it:
/// - "memory" for `[storage.implementations.memory]`
/// - "sanity" for `[orders.implementations.sanity]`
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
