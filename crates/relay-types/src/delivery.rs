//! Transaction delivery types.
//!
//! Transactions built by the dispatcher, their hashes, and the receipts the
//! chain layer reports back once they are mined.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A contract call to be submitted by a sponsor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Contract being called.
	pub to: Address,
	/// ABI-encoded calldata.
	pub data: Vec<u8>,
	/// Native value attached to the call.
	pub value: U256,
	/// Chain the call must be submitted on.
	pub chain_id: u64,
}

impl From<Transaction> for alloy_rpc_types::TransactionRequest {
	fn from(tx: Transaction) -> Self {
		let mut request = alloy_rpc_types::TransactionRequest::default()
			.to(tx.to)
			.input(tx.data.into())
			.value(tx.value);
		request.chain_id = Some(tx.chain_id);
		request
	}
}

/// Blockchain transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.0))
	}
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_hex_rendering() {
		let hash = TransactionHash(vec![0xab; 32]);
		assert_eq!(hash.to_hex(), format!("0x{}", "ab".repeat(32)));
	}

	#[test]
	fn test_transaction_converts_to_request() {
		let tx = Transaction {
			to: Address::repeat_byte(0x11),
			data: vec![1, 2, 3],
			value: U256::ZERO,
			chain_id: 8453,
		};
		let request: alloy_rpc_types::TransactionRequest = tx.into();
		assert_eq!(request.chain_id, Some(8453));
		assert_eq!(
			request.input.input().map(|b| b.to_vec()),
			Some(vec![1, 2, 3])
		);
	}
}
