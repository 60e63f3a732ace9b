//! Alloy-based EVM delivery.
//!
//! One HTTP provider per configured chain, each wrapping the sponsor key in
//! an `EthereumWallet` so that nonce, gas and fee fields are filled and the
//! transaction is signed by the provider stack before submission.

use crate::{DeliveryError, DeliveryFactory, DeliveryInterface, DeliveryRegistry};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, FixedBytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use relay_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, NetworksConfig, Schema, SecretString,
	Transaction, TransactionHash, TransactionReceipt, ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type HttpProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 4;

/// Sponsor delivery over JSON-RPC.
pub struct AlloyDelivery {
	providers: HashMap<u64, HttpProvider>,
	sponsor: Address,
	poll_interval: Duration,
}

impl AlloyDelivery {
	/// Builds providers for `network_ids`, all signing with `sponsor_key`.
	pub fn new(
		network_ids: Vec<u64>,
		networks: &NetworksConfig,
		sponsor_key: &SecretString,
		poll_interval: Duration,
	) -> Result<Self, DeliveryError> {
		if network_ids.is_empty() {
			return Err(DeliveryError::Configuration(
				"At least one network_id must be specified".to_string(),
			));
		}

		let signer: PrivateKeySigner = sponsor_key
			.expose_secret()
			.trim()
			.parse()
			.map_err(|_| DeliveryError::Configuration("Invalid sponsor private key".to_string()))?;
		let sponsor = signer.address();

		let mut providers = HashMap::new();
		for network_id in network_ids {
			let network = networks.get(&network_id).ok_or_else(|| {
				DeliveryError::Configuration(format!(
					"Network {} not found in configuration",
					network_id
				))
			})?;

			let url = network.rpc_url.parse().map_err(|e| {
				DeliveryError::Configuration(format!(
					"Invalid RPC URL for network {}: {}",
					network_id, e
				))
			})?;

			let wallet = EthereumWallet::from(signer.clone().with_chain_id(Some(network_id)));
			let provider = ProviderBuilder::new()
				.with_recommended_fillers()
				.wallet(wallet)
				.on_http(url);
			provider.client().set_poll_interval(poll_interval);

			providers.insert(network_id, Arc::new(provider) as HttpProvider);
		}

		Ok(Self {
			providers,
			sponsor,
			poll_interval,
		})
	}

	fn get_provider(&self, chain_id: u64) -> Result<&HttpProvider, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}
}

fn to_fixed_hash(hash: &TransactionHash) -> Result<FixedBytes<32>, DeliveryError> {
	if hash.0.len() != 32 {
		return Err(DeliveryError::Network(format!(
			"Invalid transaction hash length: {}",
			hash.0.len()
		)));
	}
	Ok(FixedBytes::<32>::from_slice(&hash.0))
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	fn supported_chains(&self) -> Vec<u64> {
		self.providers.keys().copied().collect()
	}

	fn sponsor_address(&self, chain_id: u64) -> Result<Address, DeliveryError> {
		self.get_provider(chain_id)?;
		Ok(self.sponsor)
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let chain_id = tx.chain_id;
		let provider = self.get_provider(chain_id)?;
		let request: TransactionRequest = tx.into();

		let pending_tx = provider
			.send_transaction(request)
			.await
			.map_err(|e| DeliveryError::TransactionFailed(e.to_string()))?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::debug!(tx_hash = %tx_hash, chain_id, sponsor = %self.sponsor, "Transaction sent");
		Ok(TransactionHash(tx_hash.0.to_vec()))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let tx_hash = to_fixed_hash(hash)?;
		let provider = self.get_provider(chain_id)?;

		loop {
			let receipt = match provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					tokio::time::sleep(self.poll_interval).await;
					continue;
				},
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)))
				},
			};

			let tx_block = receipt.block_number.unwrap_or(0);
			let current_block = provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;

			// The inclusion block counts as the first confirmation.
			let current_confirmations = current_block.saturating_sub(tx_block) + 1;
			if current_confirmations >= confirmations || !receipt.status() {
				return Ok(TransactionReceipt {
					hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
					block_number: tx_block,
					success: receipt.status(),
				});
			}

			tracing::debug!(
				chain_id,
				remaining = confirmations.saturating_sub(current_confirmations),
				"Waiting for confirmations"
			);
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

/// Configuration schema for the alloy delivery implementation.
pub struct AlloyDeliverySchema;

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![
				Field::new(
					"network_ids",
					FieldType::Array(Box::new(FieldType::Integer {
						min: Some(1),
						max: None,
					})),
				)
				.with_validator(|value| match value.as_array() {
					Some(arr) if !arr.is_empty() => Ok(()),
					_ => Err("network_ids cannot be empty".to_string()),
				}),
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let hex_part = relay_types::without_0x_prefix(key.trim());
					if hex_part.len() == 64 && hex::decode(hex_part).is_ok() {
						Ok(())
					} else {
						Err("private_key must be 32 bytes of hex".to_string())
					}
				}),
			],
			vec![Field::new(
				"poll_interval_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(60),
				},
			)],
		)
		.validate(config)
	}
}

/// Creates the alloy delivery implementation.
///
/// Configuration parameters:
/// - `network_ids` (required): chains served by this sponsor
/// - `private_key` (required): sponsor key paying the fees
/// - `poll_interval_seconds` (optional): receipt polling interval
pub fn create_http_delivery(
	config: &toml::Value,
	networks: &NetworksConfig,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::Configuration(format!("Invalid configuration: {}", e)))?;

	let network_ids = config
		.get("network_ids")
		.and_then(|v| v.as_array())
		.map(|arr| {
			arr.iter()
				.filter_map(|v| v.as_integer().map(|i| i as u64))
				.collect::<Vec<_>>()
		})
		.unwrap_or_default();

	let sponsor_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| DeliveryError::Configuration("private_key is required".to_string()))?;

	let poll_interval = config
		.get("poll_interval_seconds")
		.and_then(|v| v.as_integer())
		.map(|s| s as u64)
		.unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS);

	Ok(Box::new(AlloyDelivery::new(
		network_ids,
		networks,
		&sponsor_key,
		Duration::from_secs(poll_interval),
	)?))
}

/// Registry for the alloy delivery implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = DeliveryFactory;

	fn factory() -> Self::Factory {
		create_http_delivery
	}
}

impl DeliveryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::NetworkConfig;

	const SPONSOR_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	fn networks() -> NetworksConfig {
		HashMap::from([(
			31337,
			NetworkConfig {
				rpc_url: "http://localhost:8545".to_string(),
				token_address: None,
				token_name: None,
				token_version: None,
				relay_address: None,
			},
		)])
	}

	#[test]
	fn test_schema_requires_key_and_networks() {
		let missing_key: toml::Value = toml::from_str("network_ids = [31337]").unwrap();
		assert!(AlloyDeliverySchema.validate(&missing_key).is_err());

		let empty_networks: toml::Value =
			toml::from_str(&format!("network_ids = []\nprivate_key = \"{}\"", SPONSOR_KEY))
				.unwrap();
		assert!(AlloyDeliverySchema.validate(&empty_networks).is_err());
	}

	#[tokio::test]
	async fn test_factory_builds_providers() {
		let config: toml::Value = toml::from_str(&format!(
			"network_ids = [31337]\nprivate_key = \"{}\"",
			SPONSOR_KEY
		))
		.unwrap();
		let delivery = create_http_delivery(&config, &networks()).unwrap();
		assert_eq!(delivery.supported_chains(), vec![31337]);
		let expected: PrivateKeySigner = SPONSOR_KEY.parse().unwrap();
		assert_eq!(delivery.sponsor_address(31337).unwrap(), expected.address());
		assert!(matches!(
			delivery.sponsor_address(1),
			Err(DeliveryError::NoProviderAvailable(1))
		));
	}

	#[test]
	fn test_factory_rejects_unknown_network() {
		let config: toml::Value = toml::from_str(&format!(
			"network_ids = [10]\nprivate_key = \"{}\"",
			SPONSOR_KEY
		))
		.unwrap();
		assert!(matches!(
			create_http_delivery(&config, &networks()),
			Err(DeliveryError::Configuration(_))
		));
	}

	#[test]
	fn test_hash_length_checked() {
		assert!(to_fixed_hash(&TransactionHash(vec![0; 31])).is_err());
		assert!(to_fixed_hash(&TransactionHash(vec![0; 32])).is_ok());
	}
}
