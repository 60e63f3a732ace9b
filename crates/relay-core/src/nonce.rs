//! Authorization nonce generation.
//!
//! The nonce is `keccak256(keccak256(abi.encodePacked(sender, timestamp)))`:
//! unique per signer per second and unlinkable to earlier nonces. The token
//! contract remains the final replay authority.

use crate::RelayError;
use alloy_primitives::{keccak256, Address, U256};
use relay_types::Nonce;

/// Derives the nonce for `sender` at Unix second `now`.
pub fn generate(sender: Option<Address>, now: u64) -> Result<Nonce, RelayError> {
	let sender = sender.ok_or(RelayError::MissingSigner)?;

	let mut packed = Vec::with_capacity(20 + 32);
	packed.extend_from_slice(sender.as_slice());
	packed.extend_from_slice(&U256::from(now).to_be_bytes::<32>());

	Ok(Nonce(keccak256(keccak256(&packed))))
}
