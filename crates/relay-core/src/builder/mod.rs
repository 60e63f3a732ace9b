//! Builders for authorization payloads and for the relay engine.
//!
//! [`AuthorizationBuilder`] assembles the EIP-712 payload a holder signs.
//! [`RelayBuilder`] composes a [`RelayEngine`] from the configured storage,
//! account and delivery implementations using their factory functions.

pub mod authorization;

pub use authorization::{normalize_address, parse_address, validate_intent, AuthorizationBuilder};

use crate::engine::{event_bus::EventBus, RelayEngine};
use relay_account::{AccountError, AccountInterface, AccountService};
use relay_config::Config;
use relay_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use relay_storage::{StorageError, StorageInterface, StorageService};
use relay_types::NetworksConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during relay engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by implementation name.
pub struct RelayFactories<SF, AF, DF> {
	pub storage_factories: HashMap<String, SF>,
	pub account_factories: HashMap<String, AF>,
	pub delivery_factories: HashMap<String, DF>,
}

/// Builder for constructing a RelayEngine with pluggable implementations.
pub struct RelayBuilder {
	config: Config,
}

impl RelayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the RelayEngine using factories for each component type.
	pub async fn build<SF, AF, DF>(
		self,
		factories: RelayFactories<SF, AF, DF>,
	) -> Result<RelayEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		DF: Fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
	{
		let storage = self.build_storage(&factories.storage_factories)?;
		let account = self.build_account(&factories.account_factories).await?;
		let delivery = self.build_delivery(&factories.delivery_factories)?;

		Ok(RelayEngine::new(
			self.config,
			storage,
			account,
			delivery,
			EventBus::new(1000),
		))
	}

	fn build_storage<SF>(
		&self,
		factories: &HashMap<String, SF>,
	) -> Result<Arc<StorageService>, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let config = self.config.storage.implementations.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;
		let factory = factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", primary))
		})?;

		let backend = factory(config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %primary,
				error = %e,
				"Failed to create storage implementation"
			);
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %primary, "Loaded");

		Ok(Arc::new(StorageService::new(backend)))
	}

	async fn build_account<AF>(
		&self,
		factories: &HashMap<String, AF>,
	) -> Result<Arc<AccountService>, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
	{
		let primary = &self.config.account.primary;
		let config = self.config.account.implementations.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("account implementation '{}'", primary))
		})?;
		let factory = factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown account implementation '{}'", primary))
		})?;

		let implementation = factory(config).map_err(|e| {
			tracing::error!(
				component = "account",
				implementation = %primary,
				error = %e,
				"Failed to create account implementation"
			);
			BuilderError::Config(format!(
				"Failed to create account implementation '{}': {}",
				primary, e
			))
		})?;
		let account = Arc::new(AccountService::new(implementation));

		match account.primary_address().await {
			Ok(Some(address)) => {
				tracing::info!(component = "account", implementation = %primary, signer = %address, "Loaded");
			},
			Ok(None) => {
				tracing::warn!(
					component = "account",
					implementation = %primary,
					"Account holds no keys - authorizations cannot be signed"
				);
			},
			Err(e) => {
				return Err(BuilderError::Config(format!(
					"Failed to read account addresses: {}",
					e
				)));
			},
		}

		Ok(account)
	}

	fn build_delivery<DF>(
		&self,
		factories: &HashMap<String, DF>,
	) -> Result<Arc<DeliveryService>, BuilderError>
	where
		DF: Fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
	{
		let mut implementations: HashMap<u64, Arc<dyn DeliveryInterface>> = HashMap::new();

		for (name, config) in &self.config.delivery.implementations {
			let Some(factory) = factories.get(name) else {
				tracing::warn!(component = "delivery", implementation = %name, "Unknown implementation, skipping");
				continue;
			};

			let implementation: Arc<dyn DeliveryInterface> = factory(config, &self.config.networks)
				.map_err(|e| {
					tracing::error!(
						component = "delivery",
						implementation = %name,
						error = %e,
						"Failed to create delivery implementation"
					);
					BuilderError::Config(format!(
						"Failed to create delivery implementation '{}': {}",
						name, e
					))
				})?
				.into();

			for chain_id in implementation.supported_chains() {
				if implementations
					.insert(chain_id, implementation.clone())
					.is_some()
				{
					return Err(BuilderError::Config(format!(
						"Chain {} is served by more than one delivery implementation",
						chain_id
					)));
				}
				tracing::info!(component = "delivery", implementation = %name, chain_id, "Loaded");
			}
		}

		if implementations.is_empty() {
			tracing::warn!("No delivery implementations available - authorizations cannot be dispatched");
		}

		Ok(Arc::new(DeliveryService::new(
			implementations,
			self.config.relayer.min_confirmations,
			Duration::from_secs(self.config.relayer.confirmation_timeout_seconds),
		)))
	}
}
