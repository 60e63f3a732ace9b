//! Chain routing and token deployment lookup.
//!
//! Decides whether an authorization is executed directly on the token
//! contract or through the cross-chain relay, and resolves the contracts and
//! EIP-712 domain values for each chain. Built-in USDC deployments come from
//! [`CHAIN_REGISTRY`]; the `[networks]` configuration overrides and extends
//! them.

use crate::RelayError;
use alloy_primitives::Address;
use once_cell::sync::Lazy;
use relay_types::{NetworksConfig, TransferIntent};
use std::collections::HashMap;

/// Built-in token deployments keyed by chain id.
pub static CHAIN_REGISTRY: Lazy<ChainRegistry> = Lazy::new(ChainRegistry::default);

/// Token name/version used when neither configuration nor registry has one.
const DEFAULT_TOKEN_NAME: &str = "USD Coin";
const DEFAULT_TOKEN_VERSION: &str = "2";

/// A token deployment on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDeployment {
	pub address: Address,
	pub name: String,
	pub version: String,
}

/// Known USDC deployments.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
	tokens: HashMap<u64, TokenDeployment>,
}

impl Default for ChainRegistry {
	fn default() -> Self {
		let mut registry = Self {
			tokens: HashMap::new(),
		};

		// Mainnets sign with "USD Coin"
		registry.add_token(1, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USD Coin"); // Ethereum
		registry.add_token(10, "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85", "USD Coin"); // Optimism
		registry.add_token(137, "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "USD Coin"); // Polygon
		registry.add_token(8453, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "USD Coin"); // Base
		registry.add_token(42161, "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", "USD Coin"); // Arbitrum One

		// Testnet deployments use "USDC"
		registry.add_token(43113, "0x5425890298aed601595a70AB815c96711a31Bc65", "USDC"); // Avalanche Fuji
		registry.add_token(84532, "0x036CbD53842c5426634e7929541eC2318f3dCF7e", "USDC"); // Base Sepolia
		registry.add_token(11155111, "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238", "USDC"); // Sepolia

		registry
	}
}

impl ChainRegistry {
	/// Adds a token deployment with the default EIP-712 version.
	pub fn add_token(&mut self, chain_id: u64, token_address: &str, name: &str) {
		let address = token_address
			.parse()
			.unwrap_or_else(|_| panic!("Valid token address: {}", token_address));

		self.tokens.insert(
			chain_id,
			TokenDeployment {
				address,
				name: name.to_string(),
				version: DEFAULT_TOKEN_VERSION.to_string(),
			},
		);
	}

	pub fn get(&self, chain_id: u64) -> Option<&TokenDeployment> {
		self.tokens.get(&chain_id)
	}
}

/// How an authorization reaches the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
	/// Direct `transferWithAuthorization` on the origin token.
	SameChain,
	/// `transferUsdcCrossChain` on the origin chain's relay contract.
	CrossChain,
}

/// EIP-712 name and version of a chain's token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDomain {
	pub name: String,
	pub version: String,
}

/// Contract a sponsor transaction is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTarget {
	pub route: Route,
	pub chain_id: u64,
	pub contract: Address,
}

/// Resolves routes and contracts from configuration and the built-in registry.
#[derive(Debug, Clone)]
pub struct ChainRouter {
	networks: NetworksConfig,
}

impl ChainRouter {
	pub fn new(networks: NetworksConfig) -> Self {
		Self { networks }
	}

	/// Same chain when origin and destination are equal.
	pub fn route(origin_chain: u64, destination_chain: u64) -> Route {
		if origin_chain == destination_chain {
			Route::SameChain
		} else {
			Route::CrossChain
		}
	}

	/// Token contract that verifies authorizations on `chain_id`.
	pub fn resolve_verifying_contract(&self, chain_id: u64) -> Result<Address, RelayError> {
		self.networks
			.get(&chain_id)
			.and_then(|network| network.token_address)
			.or_else(|| CHAIN_REGISTRY.get(chain_id).map(|token| token.address))
			.ok_or(RelayError::UnsupportedChain(chain_id))
	}

	/// Relay contract deployed on `chain_id`.
	pub fn relay_address(&self, chain_id: u64) -> Result<Address, RelayError> {
		self.networks
			.get(&chain_id)
			.and_then(|network| network.relay_address)
			.ok_or(RelayError::UnsupportedChain(chain_id))
	}

	/// EIP-712 name and version of the token on `chain_id`.
	pub fn token_domain(&self, chain_id: u64) -> Result<TokenDomain, RelayError> {
		let configured = self.networks.get(&chain_id);
		let registered = CHAIN_REGISTRY.get(chain_id);
		if configured.and_then(|n| n.token_address).is_none() && registered.is_none() {
			return Err(RelayError::UnsupportedChain(chain_id));
		}

		let name = configured
			.and_then(|n| n.token_name.clone())
			.or_else(|| registered.map(|t| t.name.clone()))
			.unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string());
		let version = configured
			.and_then(|n| n.token_version.clone())
			.or_else(|| registered.map(|t| t.version.clone()))
			.unwrap_or_else(|| DEFAULT_TOKEN_VERSION.to_string());

		Ok(TokenDomain { name, version })
	}

	/// Whether the chain is configured or has a known token deployment.
	pub fn is_known(&self, chain_id: u64) -> bool {
		self.networks.contains_key(&chain_id) || CHAIN_REGISTRY.get(chain_id).is_some()
	}

	/// Checks that every contract the intent's route needs is resolvable.
	pub fn check_route(
		&self,
		origin_chain: u64,
		destination_chain: u64,
	) -> Result<Route, RelayError> {
		self.resolve_verifying_contract(origin_chain)?;
		let route = Self::route(origin_chain, destination_chain);
		if route == Route::CrossChain {
			self.relay_address(origin_chain)?;
			if !self.is_known(destination_chain) {
				return Err(RelayError::UnsupportedChain(destination_chain));
			}
		}
		Ok(route)
	}

	/// Contract the sponsor calls for a stored intent.
	pub fn dispatch_target(&self, intent: &TransferIntent) -> Result<DispatchTarget, RelayError> {
		let route = Self::route(intent.origin_chain, intent.destination_chain);
		let contract = match route {
			Route::SameChain => self.resolve_verifying_contract(intent.origin_chain)?,
			Route::CrossChain => self.relay_address(intent.origin_chain)?,
		};
		Ok(DispatchTarget {
			route,
			chain_id: intent.origin_chain,
			contract,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::{NetworkConfig, U256};

	fn network(token: Option<Address>, relay: Option<Address>) -> NetworkConfig {
		NetworkConfig {
			rpc_url: "http://localhost:8545".to_string(),
			token_address: token,
			token_name: None,
			token_version: None,
			relay_address: relay,
		}
	}

	fn router() -> ChainRouter {
		let mut networks = HashMap::new();
		networks.insert(1, network(None, Some(Address::repeat_byte(0x11))));
		networks.insert(8453, network(None, None));
		networks.insert(
			31337,
			NetworkConfig {
				token_name: Some("Local USD".to_string()),
				..network(Some(Address::repeat_byte(0x33)), None)
			},
		);
		ChainRouter::new(networks)
	}

	#[test]
	fn test_route_by_equality() {
		assert_eq!(ChainRouter::route(1, 1), Route::SameChain);
		assert_eq!(ChainRouter::route(1, 8453), Route::CrossChain);
	}

	#[test]
	fn test_registry_and_overrides() {
		let router = router();
		assert_eq!(
			router.resolve_verifying_contract(8453).unwrap(),
			CHAIN_REGISTRY.get(8453).unwrap().address
		);
		assert_eq!(
			router.resolve_verifying_contract(31337).unwrap(),
			Address::repeat_byte(0x33)
		);
		assert!(matches!(
			router.resolve_verifying_contract(999),
			Err(RelayError::UnsupportedChain(999))
		));
	}

	#[test]
	fn test_token_domain() {
		let router = router();
		let mainnet = router.token_domain(1).unwrap();
		assert_eq!((mainnet.name.as_str(), mainnet.version.as_str()), ("USD Coin", "2"));
		assert_eq!(router.token_domain(84532).unwrap().name, "USDC");
		assert_eq!(router.token_domain(31337).unwrap().name, "Local USD");
		assert!(router.token_domain(999).is_err());
	}

	#[test]
	fn test_cross_chain_requires_relay() {
		let router = router();
		assert_eq!(router.check_route(1, 8453).unwrap(), Route::CrossChain);
		assert!(matches!(
			router.check_route(8453, 1),
			Err(RelayError::UnsupportedChain(8453))
		));
		assert!(matches!(
			router.check_route(1, 999),
			Err(RelayError::UnsupportedChain(999))
		));
		assert_eq!(router.check_route(8453, 8453).unwrap(), Route::SameChain);
	}

	#[test]
	fn test_dispatch_target() {
		let router = router();
		let mut intent = TransferIntent {
			sender: Address::repeat_byte(0x01),
			receiver: Address::repeat_byte(0x02),
			amount: U256::from(1u64),
			valid_after: 0,
			valid_before: 10,
			origin_chain: 1,
			destination_chain: 1,
		};
		let direct = router.dispatch_target(&intent).unwrap();
		assert_eq!(direct.route, Route::SameChain);
		assert_eq!(direct.contract, CHAIN_REGISTRY.get(1).unwrap().address);

		intent.destination_chain = 8453;
		let relayed = router.dispatch_target(&intent).unwrap();
		assert_eq!(relayed.route, Route::CrossChain);
		assert_eq!(relayed.contract, Address::repeat_byte(0x11));
		assert_eq!(relayed.chain_id, 1);
	}
}
