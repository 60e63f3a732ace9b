//! Network configuration types for multi-chain relay operations.
//!
//! Each configured network carries its RPC endpoint and, optionally,
//! overrides for the token deployment and the cross-chain relay contract on
//! that chain.

use crate::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for a single blockchain network.
///
/// # Fields
///
/// * `rpc_url` - The HTTP(S) RPC endpoint used for submissions
/// * `token_address` - Token contract verifying authorizations on this chain
/// * `token_name` - EIP-712 domain name of the token
/// * `token_version` - EIP-712 domain version of the token
/// * `relay_address` - Cross-chain relay contract on this chain
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub rpc_url: String,
	#[serde(default)]
	pub token_address: Option<Address>,
	#[serde(default)]
	pub token_name: Option<String>,
	#[serde(default)]
	pub token_version: Option<String>,
	#[serde(default)]
	pub relay_address: Option<Address>,
}

/// Networks configuration mapping chain IDs to their configurations.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes networks keyed by chain id strings (TOML has no numeric keys).
///
/// # Errors
///
/// Returns a deserialization error if a key is not a valid u64 or a network
/// entry is malformed.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}
