//! Registry trait for self-registering implementations.
//!
//! Every pluggable backend (storage, account, delivery) registers itself
//! under its configuration name together with a factory function.

/// Base trait for implementation registries.
///
/// Each implementation module (Storage, Account, Delivery) must provide
/// a Registry struct that implements this trait. This ensures that every implementation
/// declares its configuration name and provides a factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// This should match the key used in the TOML configuration, for example:
	/// - "memory" for storage.implementations.memory
	/// - "local" for account.implementations.local
	/// - "evm_alloy" for delivery.implementations.evm_alloy
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	///
	/// Each module defines its own factory type, for example:
	/// - StorageFactory for storage implementations
	/// - DeliveryFactory for delivery implementations
	type Factory;

	/// Get the factory function for this implementation.
	///
	/// Returns the factory function that can create instances of this implementation
	/// when provided with the appropriate configuration.
	fn factory() -> Self::Factory;
}
