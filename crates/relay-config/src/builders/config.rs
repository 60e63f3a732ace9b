//! Configuration builder for tests and local development.

use crate::{AccountConfig, ApiConfig, Config, DeliveryConfig, RelayerConfig, StorageConfig};
use relay_types::{Address, NetworkConfig};
use std::collections::HashMap;

/// Fluent builder producing a `Config` with in-memory defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	relayer_id: String,
	confirmation_timeout_seconds: u64,
	min_confirmations: u64,
	stale_after_minutes: u64,
	local_offset_minutes: i32,
	networks: HashMap<u64, NetworkConfig>,
	storage_primary: String,
	account_primary: String,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			relayer_id: "test-relayer".to_string(),
			confirmation_timeout_seconds: 5,
			min_confirmations: 1,
			stale_after_minutes: 30,
			local_offset_minutes: 0,
			networks: HashMap::new(),
			storage_primary: "memory".to_string(),
			account_primary: "local".to_string(),
			api: None,
		}
	}

	pub fn relayer_id(mut self, id: impl Into<String>) -> Self {
		self.relayer_id = id.into();
		self
	}

	pub fn confirmation_timeout_seconds(mut self, timeout: u64) -> Self {
		self.confirmation_timeout_seconds = timeout;
		self
	}

	pub fn min_confirmations(mut self, confirmations: u64) -> Self {
		self.min_confirmations = confirmations;
		self
	}

	pub fn stale_after_minutes(mut self, minutes: u64) -> Self {
		self.stale_after_minutes = minutes;
		self
	}

	pub fn local_offset_minutes(mut self, minutes: i32) -> Self {
		self.local_offset_minutes = minutes;
		self
	}

	/// Adds a network with a placeholder RPC URL.
	pub fn network(mut self, chain_id: u64, relay_address: Option<Address>) -> Self {
		self.networks.insert(
			chain_id,
			NetworkConfig {
				rpc_url: format!("http://localhost:{}", 8545 + self.networks.len()),
				token_address: None,
				token_name: None,
				token_version: None,
				relay_address,
			},
		);
		self
	}

	/// Adds a fully specified network.
	pub fn network_config(mut self, chain_id: u64, network: NetworkConfig) -> Self {
		self.networks.insert(chain_id, network);
		self
	}

	pub fn storage_primary(mut self, primary: impl Into<String>) -> Self {
		self.storage_primary = primary.into();
		self
	}

	pub fn account_primary(mut self, primary: impl Into<String>) -> Self {
		self.account_primary = primary.into();
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			relayer: RelayerConfig {
				id: self.relayer_id,
				confirmation_timeout_seconds: self.confirmation_timeout_seconds,
				min_confirmations: self.min_confirmations,
				stale_after_minutes: self.stale_after_minutes,
				local_offset_minutes: self.local_offset_minutes,
			},
			networks: self.networks,
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: HashMap::new(),
			},
			account: AccountConfig {
				primary: self.account_primary,
				implementations: HashMap::new(),
			},
			delivery: DeliveryConfig {
				implementations: HashMap::new(),
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_networks() {
		let relay = Address::repeat_byte(0x22);
		let config = ConfigBuilder::new()
			.relayer_id("r1")
			.network(1, Some(relay))
			.network(8453, None)
			.confirmation_timeout_seconds(9)
			.build();
		assert_eq!(config.relayer.id, "r1");
		assert_eq!(config.relayer.confirmation_timeout_seconds, 9);
		assert_eq!(config.networks[&1].relay_address, Some(relay));
		assert_ne!(config.networks[&1].rpc_url, config.networks[&8453].rpc_url);
	}
}
