//! Transaction delivery for sponsors.
//!
//! A sponsor pays the fee for executing an authorization. This crate owns the
//! sponsor side of the chain boundary: submitting contract calls on a given
//! chain and waiting, within a bounded time, for them to be mined.

use async_trait::async_trait;
use relay_types::{
	Address, ConfigSchema, ImplementationRegistry, NetworksConfig, Transaction, TransactionHash,
	TransactionReceipt,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	/// The node refused the transaction.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// The transaction was mined but reverted.
	#[error("Transaction {0} reverted")]
	Reverted(String),
	/// No receipt within the configured bound.
	#[error("No confirmation for {hash} within {seconds}s")]
	Timeout { hash: String, seconds: u64 },
	#[error("No provider available for chain {0}")]
	NoProviderAvailable(u64),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Chain access for one sponsor identity across one or more chains.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Chains this implementation can submit to.
	fn supported_chains(&self) -> Vec<u64>;

	/// Address paying the fees on `chain_id`.
	fn sponsor_address(&self, chain_id: u64) -> Result<Address, DeliveryError>;

	/// Signs and submits a transaction on `tx.chain_id`.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Waits until the transaction is mined with `confirmations` blocks on top.
	///
	/// Does not time out by itself.
	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;
}

/// Type alias for delivery factory functions.
pub type DeliveryFactory =
	fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn DeliveryInterface>, DeliveryError>;

/// Registry trait for delivery implementations.
pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// Get all registered delivery implementations.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}

/// Routes sponsor transactions to the implementation serving each chain.
pub struct DeliveryService {
	implementations: HashMap<u64, Arc<dyn DeliveryInterface>>,
	min_confirmations: u64,
	confirmation_timeout: Duration,
}

impl DeliveryService {
	pub fn new(
		implementations: HashMap<u64, Arc<dyn DeliveryInterface>>,
		min_confirmations: u64,
		confirmation_timeout: Duration,
	) -> Self {
		Self {
			implementations,
			min_confirmations,
			confirmation_timeout,
		}
	}

	fn implementation(&self, chain_id: u64) -> Result<&Arc<dyn DeliveryInterface>, DeliveryError> {
		self.implementations
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}

	pub fn supports(&self, chain_id: u64) -> bool {
		self.implementations.contains_key(&chain_id)
	}

	pub fn sponsor_address(&self, chain_id: u64) -> Result<Address, DeliveryError> {
		self.implementation(chain_id)?.sponsor_address(chain_id)
	}

	/// Submits a transaction on the chain it names.
	pub async fn deliver(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let chain_id = tx.chain_id;
		let hash = self.implementation(chain_id)?.submit(tx).await?;
		tracing::info!(tx_hash = %hash.to_hex(), chain_id, "Submitted sponsor transaction");
		Ok(hash)
	}

	/// Waits for the configured confirmations, bounded by the configured timeout.
	///
	/// A reverted receipt is reported as [`DeliveryError::Reverted`].
	pub async fn confirm(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let implementation = self.implementation(chain_id)?;
		let receipt = tokio::time::timeout(
			self.confirmation_timeout,
			implementation.wait_for_confirmation(hash, chain_id, self.min_confirmations),
		)
		.await
		.map_err(|_| DeliveryError::Timeout {
			hash: hash.to_hex(),
			seconds: self.confirmation_timeout.as_secs(),
		})??;

		if !receipt.success {
			return Err(DeliveryError::Reverted(hash.to_hex()));
		}
		tracing::info!(
			tx_hash = %hash.to_hex(),
			chain_id,
			block = receipt.block_number,
			"Transaction confirmed"
		);
		Ok(receipt)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::{Schema, ValidationError, U256};
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
			Schema::new(vec![], vec![]).validate(config)
		}
	}

	/// Chain stub whose receipts are fixed at construction.
	struct StubChain {
		outcome: Option<bool>,
		submissions: AtomicUsize,
	}

	#[async_trait]
	impl DeliveryInterface for StubChain {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}

		fn supported_chains(&self) -> Vec<u64> {
			vec![1]
		}

		fn sponsor_address(&self, _chain_id: u64) -> Result<Address, DeliveryError> {
			Ok(Address::repeat_byte(0x5a))
		}

		async fn submit(&self, _tx: Transaction) -> Result<TransactionHash, DeliveryError> {
			self.submissions.fetch_add(1, Ordering::SeqCst);
			Ok(TransactionHash(vec![0xab; 32]))
		}

		async fn wait_for_confirmation(
			&self,
			hash: &TransactionHash,
			_chain_id: u64,
			_confirmations: u64,
		) -> Result<TransactionReceipt, DeliveryError> {
			match self.outcome {
				Some(success) => Ok(TransactionReceipt {
					hash: hash.clone(),
					block_number: 100,
					success,
				}),
				None => std::future::pending().await,
			}
		}
	}

	fn service(outcome: Option<bool>) -> DeliveryService {
		let chain: Arc<dyn DeliveryInterface> = Arc::new(StubChain {
			outcome,
			submissions: AtomicUsize::new(0),
		});
		DeliveryService::new(HashMap::from([(1, chain)]), 1, Duration::from_secs(30))
	}

	fn tx(chain_id: u64) -> Transaction {
		Transaction {
			to: Address::repeat_byte(0x11),
			data: vec![],
			value: U256::ZERO,
			chain_id,
		}
	}

	#[tokio::test]
	async fn test_deliver_routes_by_chain() {
		let service = service(Some(true));
		assert!(service.supports(1));
		assert!(service.deliver(tx(1)).await.is_ok());
		assert!(matches!(
			service.deliver(tx(10)).await,
			Err(DeliveryError::NoProviderAvailable(10))
		));
		assert_eq!(service.sponsor_address(1).unwrap(), Address::repeat_byte(0x5a));
	}

	#[tokio::test]
	async fn test_confirm_success() {
		let service = service(Some(true));
		let hash = TransactionHash(vec![1; 32]);
		let receipt = service.confirm(&hash, 1).await.unwrap();
		assert_eq!(receipt.block_number, 100);
	}

	#[tokio::test]
	async fn test_confirm_reverted() {
		let service = service(Some(false));
		let hash = TransactionHash(vec![1; 32]);
		assert!(matches!(
			service.confirm(&hash, 1).await,
			Err(DeliveryError::Reverted(_))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirm_times_out() {
		let service = service(None);
		let hash = TransactionHash(vec![1; 32]);
		assert!(matches!(
			service.confirm(&hash, 1).await,
			Err(DeliveryError::Timeout { seconds: 30, .. })
		));
	}
}
