//! Local private-key agent.
//!
//! Holds one or more holder keys in memory and signs authorization digests
//! with the key matching the payload's `from` address.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relay_types::{
	Address, AuthorizationPayload, ConfigSchema, Field, FieldType, ImplementationRegistry,
	Schema, SecretString, Signature, ValidationError,
};

/// Agent backed by in-process private keys.
pub struct LocalWallet {
	signers: Vec<PrivateKeySigner>,
}

impl LocalWallet {
	/// Creates a wallet from hex private keys (with or without `0x`).
	pub fn new(keys: &[SecretString]) -> Result<Self, AccountError> {
		let signers = keys
			.iter()
			.map(|key| {
				key.expose_secret()
					.trim()
					.parse::<PrivateKeySigner>()
					.map_err(|e| AccountError::InvalidKey(e.to_string()))
			})
			.collect::<Result<Vec<_>, _>>()?;
		if signers.is_empty() {
			return Err(AccountError::InvalidKey("no private key configured".into()));
		}
		Ok(Self { signers })
	}

	fn signer_for(&self, address: &Address) -> Option<&PrivateKeySigner> {
		self.signers.iter().find(|s| s.address() == *address)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn addresses(&self) -> Result<Vec<Address>, AccountError> {
		Ok(self.signers.iter().map(|s| s.address()).collect())
	}

	async fn sign_typed_data(
		&self,
		payload: &AuthorizationPayload,
	) -> Result<Signature, AccountError> {
		let from = payload.message.from;
		let signer = self
			.signer_for(&from)
			.ok_or(AccountError::UnknownSigner(from))?;
		let digest = payload.signing_hash();
		let signature = signer
			.sign_hash_sync(&digest)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		tracing::debug!(signer = %from, digest = %digest, "Signed authorization");
		Ok(Signature(signature.as_bytes().to_vec()))
	}
}

fn is_private_key(value: &toml::Value) -> Result<(), String> {
	let key = value.as_str().ok_or("private key must be a string")?;
	let hex_part = relay_types::without_0x_prefix(key.trim());
	if hex_part.len() != 64 || hex::decode(hex_part).is_err() {
		return Err("private key must be 32 bytes of hex".to_string());
	}
	Ok(())
}

/// Accepts `private_key = "0x.."` and/or `private_keys = ["0x..", ..]`.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::new("private_key", FieldType::String).with_validator(is_private_key),
				Field::new("private_keys", FieldType::Array(Box::new(FieldType::String)))
					.with_validator(|v| {
						v.as_array()
							.map(|keys| keys.iter().try_for_each(is_private_key))
							.unwrap_or(Ok(()))
					}),
			],
		)
		.validate(config)?;

		if config.get("private_key").is_none() && config.get("private_keys").is_none() {
			return Err(ValidationError::MissingField("private_key".to_string()));
		}
		Ok(())
	}
}

/// Creates a local wallet from configuration.
///
/// Configuration parameters:
/// - `private_key`: primary holder key
/// - `private_keys`: further holder keys
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let mut keys = Vec::new();
	if let Some(key) = config.get("private_key").and_then(|v| v.as_str()) {
		keys.push(SecretString::from(key));
	}
	if let Some(list) = config.get("private_keys").and_then(|v| v.as_array()) {
		keys.extend(list.iter().filter_map(|v| v.as_str()).map(SecretString::from));
	}

	Ok(Box::new(LocalWallet::new(&keys)?))
}

/// Registry for the local wallet implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}
