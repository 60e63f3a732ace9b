//! Transfer authorization types.
//!
//! An authorization starts life as a [`TransferRequest`] (raw, human-entered
//! values), is normalized into a [`TransferIntent`], turned into a canonical
//! [`AuthorizationPayload`] for signing, and is finally persisted as an
//! [`AuthorizationRecord`] whose [`AuthorizationStatus`] tracks it until it
//! has been executed on-chain by a sponsor.

use crate::utils::eip712::{
	compute_domain_hash, compute_final_digest, Eip712AbiEncoder, TRANSFER_WITH_AUTHORIZATION_TYPE,
};
use crate::utils::with_0x_prefix;
use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holder-declared transfer parameters after normalization.
///
/// Amounts are expressed in the token's smallest unit (6 implied decimals),
/// time bounds in Unix seconds. A `valid_after` of `0` means the
/// authorization is valid immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
	pub sender: Address,
	pub receiver: Address,
	#[serde(with = "crate::api::u256_serde")]
	pub amount: U256,
	pub valid_after: u64,
	pub valid_before: u64,
	pub origin_chain: u64,
	pub destination_chain: u64,
}

impl TransferIntent {
	/// Returns true when the transfer leaves the origin chain.
	pub fn is_cross_chain(&self) -> bool {
		self.origin_chain != self.destination_chain
	}
}

/// Raw transfer form as entered by a user.
///
/// Time bounds may be epoch seconds or local date-time strings; amounts are
/// decimal strings in whole-token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
	pub sender: String,
	pub receiver: String,
	pub amount: String,
	#[serde(default)]
	pub valid_after: Option<String>,
	pub valid_before: String,
	#[serde(default)]
	pub valid_immediately: bool,
	pub origin_chain: u64,
	pub destination_chain: u64,
}

/// A 32-byte single-use authorization nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce(pub B256);

impl fmt::Display for Nonce {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<B256> for Nonce {
	fn from(value: B256) -> Self {
		Self(value)
	}
}

/// EIP-712 domain of the token contract on the origin chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDomain {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

impl AuthorizationDomain {
	/// Computes the EIP-712 domain separator.
	pub fn separator(&self) -> B256 {
		compute_domain_hash(
			&self.name,
			&self.version,
			self.chain_id,
			&self.verifying_contract,
		)
	}
}

/// The `TransferWithAuthorization` message body.
///
/// `to` is the human receiver for same-chain transfers and the relay
/// contract on the origin chain for cross-chain transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAuthorization {
	pub from: Address,
	pub to: Address,
	#[serde(with = "crate::api::u256_serde")]
	pub value: U256,
	pub valid_after: u64,
	pub valid_before: u64,
	pub nonce: Nonce,
}

impl TransferAuthorization {
	/// Hash of the canonical type string.
	pub fn type_hash() -> B256 {
		keccak256(TRANSFER_WITH_AUTHORIZATION_TYPE.as_bytes())
	}

	/// EIP-712 struct hash of this message.
	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&Self::type_hash());
		enc.push_address(&self.from);
		enc.push_address(&self.to);
		enc.push_u256(self.value);
		enc.push_u256(U256::from(self.valid_after));
		enc.push_u256(U256::from(self.valid_before));
		enc.push_b256(&self.nonce.0);
		keccak256(enc.finish())
	}
}

/// Canonical signing structure: domain plus message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPayload {
	pub domain: AuthorizationDomain,
	pub message: TransferAuthorization,
}

impl AuthorizationPayload {
	/// Final EIP-712 digest: `keccak256(0x1901 || domainSeparator || structHash)`.
	pub fn signing_hash(&self) -> B256 {
		compute_final_digest(&self.domain.separator(), &self.message.struct_hash())
	}
}

/// Opaque signature bytes (65 bytes `r || s || v` for ECDSA signers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
	pub fn to_hex(&self) -> String {
		with_0x_prefix(&hex::encode(&self.0))
	}
}

impl From<Vec<u8>> for Signature {
	fn from(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}
}

/// Lifecycle status of an authorization record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
	/// Signed and persisted, waiting for a sponsor.
	Pending,
	/// A sponsor has claimed it and the submission is in flight.
	Processing,
	/// Confirmed on-chain. Terminal.
	Executed,
	/// Submission or confirmation failed; may be retried.
	Failed,
}

impl AuthorizationStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Processing => "processing",
			Self::Executed => "executed",
			Self::Failed => "failed",
		}
	}

	/// Whether a sponsor may claim a record in this status.
	pub fn is_dispatchable(&self) -> bool {
		matches!(self, Self::Pending | Self::Failed)
	}
}

impl fmt::Display for AuthorizationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for AuthorizationStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"pending" => Ok(Self::Pending),
			"processing" => Ok(Self::Processing),
			"executed" => Ok(Self::Executed),
			"failed" => Ok(Self::Failed),
			other => Err(format!("Unknown authorization status: {}", other)),
		}
	}
}

/// Persisted authorization with its dispatch history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
	pub id: String,
	/// Identity that requested the signing.
	pub initiator: Address,
	pub intent: TransferIntent,
	pub nonce: Nonce,
	pub signature: Signature,
	pub status: AuthorizationStatus,
	pub created_at: u64,
	pub updated_at: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub executed_tx_hash: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sponsor: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
	#[serde(default)]
	pub attempts: u32,
}

impl AuthorizationRecord {
	/// Case-insensitive substring match over sender and receiver.
	pub fn matches_search(&self, needle: &str) -> bool {
		let needle = needle.trim().to_ascii_lowercase();
		if needle.is_empty() {
			return true;
		}
		let sender = format!("{:#x}", self.intent.sender);
		let receiver = format!("{:#x}", self.intent.receiver);
		sender.contains(&needle) || receiver.contains(&needle)
	}
}

/// Filter applied when listing authorization records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationFilter {
	#[serde(default)]
	pub status: Option<AuthorizationStatus>,
	#[serde(default)]
	pub origin_chain: Option<u64>,
	#[serde(default)]
	pub destination_chain: Option<u64>,
	#[serde(default)]
	pub sender: Option<Address>,
	#[serde(default)]
	pub receiver: Option<Address>,
	#[serde(default)]
	pub search: Option<String>,
}

impl AuthorizationFilter {
	/// Filter for records waiting on a sponsor.
	pub fn pending() -> Self {
		Self {
			status: Some(AuthorizationStatus::Pending),
			..Default::default()
		}
	}

	pub fn matches(&self, record: &AuthorizationRecord) -> bool {
		if let Some(status) = self.status {
			if record.status != status {
				return false;
			}
		}
		if let Some(chain) = self.origin_chain {
			if record.intent.origin_chain != chain {
				return false;
			}
		}
		if let Some(chain) = self.destination_chain {
			if record.intent.destination_chain != chain {
				return false;
			}
		}
		if let Some(sender) = self.sender {
			if record.intent.sender != sender {
				return false;
			}
		}
		if let Some(receiver) = self.receiver {
			if record.intent.receiver != receiver {
				return false;
			}
		}
		match &self.search {
			Some(needle) => record.matches_search(needle),
			None => true,
		}
	}
}
