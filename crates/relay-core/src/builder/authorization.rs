//! Authorization payload construction.
//!
//! Turns a validated [`TransferIntent`] into the canonical EIP-712 payload
//! the holder signs. For cross-chain intents the message recipient is the
//! origin chain's relay contract, never the human receiver.

use crate::router::{ChainRouter, Route};
use crate::RelayError;
use alloy_primitives::Address;
use relay_types::{
	without_0x_prefix, AuthorizationDomain, AuthorizationPayload, Nonce, TransferAuthorization,
	TransferIntent,
};
use std::sync::Arc;

/// Parses an address given with or without `0x`, in any letter case.
pub fn parse_address(input: &str) -> Result<Address, RelayError> {
	let trimmed = input.trim();
	let hex_part = without_0x_prefix(trimmed);
	if hex_part.len() != 40 {
		return Err(RelayError::InvalidAddress(format!(
			"'{}' must be 20 bytes of hex",
			input
		)));
	}
	let bytes = hex::decode(hex_part)
		.map_err(|e| RelayError::InvalidAddress(format!("'{}': {}", input, e)))?;
	Ok(Address::from_slice(&bytes))
}

/// Canonical EIP-55 form of an address.
pub fn normalize_address(input: &str) -> Result<String, RelayError> {
	Ok(parse_address(input)?.to_checksum(None))
}

/// Checks amount and validity window at signing time.
pub fn validate_intent(intent: &TransferIntent, now: u64) -> Result<(), RelayError> {
	if intent.amount.is_zero() {
		return Err(RelayError::InvalidIntent(
			"amount must be greater than zero".to_string(),
		));
	}
	if intent.valid_before <= intent.valid_after {
		return Err(RelayError::InvalidIntent(format!(
			"valid_before ({}) must be after valid_after ({})",
			intent.valid_before, intent.valid_after
		)));
	}
	if intent.valid_before <= now {
		return Err(RelayError::InvalidIntent(format!(
			"valid_before ({}) is already in the past",
			intent.valid_before
		)));
	}
	Ok(())
}

/// Builds signing payloads against the configured chains.
#[derive(Clone)]
pub struct AuthorizationBuilder {
	router: Arc<ChainRouter>,
}

impl AuthorizationBuilder {
	pub fn new(router: Arc<ChainRouter>) -> Self {
		Self { router }
	}

	/// Assembles the payload bound to `verifying_contract` on the origin chain.
	pub fn build(
		&self,
		intent: &TransferIntent,
		nonce: Nonce,
		verifying_contract: Address,
	) -> Result<AuthorizationPayload, RelayError> {
		let origin = intent.origin_chain;
		let to = match ChainRouter::route(origin, intent.destination_chain) {
			Route::SameChain => intent.receiver,
			Route::CrossChain => self.router.relay_address(origin)?,
		};
		let token = self.router.token_domain(origin)?;

		Ok(AuthorizationPayload {
			domain: AuthorizationDomain {
				name: token.name,
				version: token.version,
				chain_id: origin,
				verifying_contract,
			},
			message: TransferAuthorization {
				from: intent.sender,
				to,
				value: intent.amount,
				valid_after: intent.valid_after,
				valid_before: intent.valid_before,
				nonce,
			},
		})
	}
}
