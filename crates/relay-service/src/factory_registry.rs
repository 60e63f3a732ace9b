//! Factory registry for the pluggable relay backends.
//!
//! Every backend crate lists its implementations through
//! `get_all_implementations()`. The registry collects them once, and the
//! relay engine is built from whichever ones the configuration names.

use relay_account::AccountFactory;
use relay_config::Config;
use relay_core::{RelayBuilder, RelayEngine, RelayFactories};
use relay_delivery::DeliveryFactory;
use relay_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// All known implementation factories, keyed by implementation name.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub account: HashMap<String, AccountFactory>,
	pub delivery: HashMap<String, DeliveryFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			account: HashMap::new(),
			delivery: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}

	pub fn register_delivery(&mut self, name: impl Into<String>, factory: DeliveryFactory) {
		self.delivery.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the process-wide registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in relay_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in relay_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}

		for (name, factory) in relay_delivery::get_all_implementations() {
			tracing::debug!("Registering delivery implementation: {}", name);
			registry.register_delivery(name, factory);
		}

		registry
	})
}

/// Picks the factories for every implementation the config names.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the relay engine from the registry and the loaded config.
pub async fn build_relay_from_config(
	config: Config,
) -> Result<RelayEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let account_factories =
		build_factories!(registry, config.account.implementations, account, "account");
	let delivery_factories = build_factories!(
		registry,
		config.delivery.implementations,
		delivery,
		"delivery"
	);

	let factories = RelayFactories {
		storage_factories,
		account_factories,
		delivery_factories,
	};

	Ok(RelayBuilder::new(config).build(factories).await?)
}
