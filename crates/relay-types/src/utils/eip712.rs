//! EIP-712 hashing helpers.
//!
//! - Domain separator computation for `EIP712Domain(name, version, chainId, verifyingContract)`
//! - Final digest computation (0x1901 || domainHash || structHash)
//! - A minimal ABI encoder for the static field types used by ERC-3009

use alloy_primitives::{keccak256, Address, B256, U256};

pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const TRANSFER_WITH_AUTHORIZATION_TYPE: &str = "TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";

/// Compute the EIP-712 domain hash.
pub fn compute_domain_hash(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	let domain_type_hash = keccak256(DOMAIN_TYPE.as_bytes());
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&domain_type_hash);
	enc.push_b256(&keccak256(name.as_bytes()));
	enc.push_b256(&keccak256(version.as_bytes()));
	enc.push_u256(U256::from(chain_id));
	enc.push_address(verifying_contract);
	keccak256(enc.finish())
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for static types used in EIP-712 struct hashing.
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn test_encoder_left_pads_addresses_and_integers() {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_address(&address!("00000000000000000000000000000000000000ff"));
		enc.push_u256(U256::from(1u64));
		let out = enc.finish();
		assert_eq!(out.len(), 64);
		assert_eq!(out[31], 0xff);
		assert!(out[..31].iter().all(|b| *b == 0));
		assert_eq!(out[63], 1);
	}

	#[test]
	fn test_domain_hash_depends_on_every_field() {
		let contract = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
		let base = compute_domain_hash("USD Coin", "2", 1, &contract);
		assert_ne!(base, compute_domain_hash("USDC", "2", 1, &contract));
		assert_ne!(base, compute_domain_hash("USD Coin", "1", 1, &contract));
		assert_ne!(base, compute_domain_hash("USD Coin", "2", 10, &contract));
		assert_ne!(base, compute_domain_hash("USD Coin", "2", 1, &Address::ZERO));
	}

	#[test]
	fn test_final_digest_prefix() {
		let a = B256::repeat_byte(1);
		let b = B256::repeat_byte(2);
		let mut raw = vec![0x19, 0x01];
		raw.extend_from_slice(a.as_slice());
		raw.extend_from_slice(b.as_slice());
		assert_eq!(compute_final_digest(&a, &b), keccak256(raw));
	}
}
