//! Signing session with the holder's key agent.
//!
//! One request per authorization, no retry. The returned signature is
//! checked by recovering the signer from the `sol!`-derived digest, which
//! also cross-checks the agent's own hashing of the payload.

use crate::contracts;
use crate::RelayError;
use alloy_primitives::PrimitiveSignature;
use relay_account::AccountService;
use relay_types::{AuthorizationPayload, Signature};
use std::sync::Arc;

pub struct SigningSession {
	account: Arc<AccountService>,
}

impl SigningSession {
	pub fn new(account: Arc<AccountService>) -> Self {
		Self { account }
	}

	/// Requests a signature over `payload` and verifies it.
	pub async fn sign(&self, payload: &AuthorizationPayload) -> Result<Signature, RelayError> {
		let signature = self
			.account
			.sign_authorization(payload)
			.await
			.map_err(|e| RelayError::SigningRejected(e.to_string()))?;
		verify(payload, &signature)?;
		Ok(signature)
	}
}

/// Checks that `signature` was produced by `payload.message.from` over `payload`.
pub fn verify(payload: &AuthorizationPayload, signature: &Signature) -> Result<(), RelayError> {
	let parsed = PrimitiveSignature::try_from(signature.0.as_slice())
		.map_err(|e| RelayError::SigningRejected(format!("malformed signature: {}", e)))?;
	let recovered = parsed
		.recover_address_from_prehash(&contracts::signing_digest(payload))
		.map_err(|e| RelayError::SigningRejected(format!("unrecoverable signature: {}", e)))?;

	if recovered != payload.message.from {
		return Err(RelayError::SigningRejected(format!(
			"signature recovers to {}, expected {}",
			recovered, payload.message.from
		)));
	}
	Ok(())
}
