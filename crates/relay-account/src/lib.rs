//! Key-holding agent for transfer authorizations.
//!
//! The relay never builds a signature itself: it hands the exact
//! [`AuthorizationPayload`] to an [`AccountInterface`] implementation, which
//! holds the holder keys and returns the EIP-712 signature. One request per
//! authorization; the agent may refuse.

use async_trait::async_trait;
use relay_types::{
	Address, AuthorizationPayload, ConfigSchema, ImplementationRegistry, Signature,
};
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The agent declined or failed to produce a signature.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// No key is held for the requested identity.
	#[error("No key held for {0}")]
	UnknownSigner(Address),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Interface every key-holding agent implements.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Identities this agent can sign for, primary first.
	async fn addresses(&self) -> Result<Vec<Address>, AccountError>;

	/// Signs the EIP-712 digest of `payload` with the key of
	/// `payload.message.from`.
	async fn sign_typed_data(
		&self,
		payload: &AuthorizationPayload,
	) -> Result<Signature, AccountError>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service wrapping the configured agent.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// The primary identity, if the agent holds any key.
	pub async fn primary_address(&self) -> Result<Option<Address>, AccountError> {
		Ok(self.implementation.addresses().await?.into_iter().next())
	}

	/// Requests one signature over the payload.
	pub async fn sign_authorization(
		&self,
		payload: &AuthorizationPayload,
	) -> Result<Signature, AccountError> {
		self.implementation.sign_typed_data(payload).await
	}
}
