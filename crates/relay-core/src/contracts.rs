//! Solidity surface of the token and relay contracts.
//!
//! The token side is ERC-3009 `transferWithAuthorization` (bytes-signature
//! variant); the relay side is the cross-chain entry point that consumes the
//! same authorization on the origin chain.

use alloy_primitives::{Bytes, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolCall, SolStruct};
use relay_types::{AuthorizationPayload, AuthorizationRecord};
use std::borrow::Cow;

sol! {
	/// ERC-3009 typed message.
	#[derive(Debug)]
	struct TransferWithAuthorization {
		address from;
		address to;
		uint256 value;
		uint256 validAfter;
		uint256 validBefore;
		bytes32 nonce;
	}

	/// Token entry point used for same-chain transfers.
	#[allow(clippy::too_many_arguments)]
	interface IFiatToken {
		function transferWithAuthorization(
			address from,
			address to,
			uint256 value,
			uint256 validAfter,
			uint256 validBefore,
			bytes32 nonce,
			bytes signature
		) external;
	}

	/// Relay entry point used for cross-chain transfers.
	#[allow(clippy::too_many_arguments)]
	interface ICrossChainRelay {
		function transferUsdcCrossChain(
			address from,
			uint256 value,
			uint256 validAfter,
			uint256 validBefore,
			bytes32 nonce,
			bytes signature,
			uint256 destinationChain,
			address receiver
		) external;
	}
}

impl From<&AuthorizationPayload> for TransferWithAuthorization {
	fn from(payload: &AuthorizationPayload) -> Self {
		let message = &payload.message;
		Self {
			from: message.from,
			to: message.to,
			value: message.value,
			validAfter: U256::from(message.valid_after),
			validBefore: U256::from(message.valid_before),
			nonce: message.nonce.0,
		}
	}
}

/// Alloy EIP-712 domain for the payload.
pub fn eip712_domain(payload: &AuthorizationPayload) -> Eip712Domain {
	let domain = &payload.domain;
	Eip712Domain::new(
		Some(Cow::Owned(domain.name.clone())),
		Some(Cow::Owned(domain.version.clone())),
		Some(U256::from(domain.chain_id)),
		Some(domain.verifying_contract),
		None,
	)
}

/// Signing digest computed through the `sol!` struct.
pub fn signing_digest(payload: &AuthorizationPayload) -> B256 {
	TransferWithAuthorization::from(payload).eip712_signing_hash(&eip712_domain(payload))
}

/// Calldata for the token's `transferWithAuthorization`.
pub fn encode_transfer_with_authorization(record: &AuthorizationRecord) -> Vec<u8> {
	let intent = &record.intent;
	IFiatToken::transferWithAuthorizationCall {
		from: intent.sender,
		to: intent.receiver,
		value: intent.amount,
		validAfter: U256::from(intent.valid_after),
		validBefore: U256::from(intent.valid_before),
		nonce: record.nonce.0,
		signature: Bytes::from(record.signature.0.clone()),
	}
	.abi_encode()
}

/// Calldata for the relay's `transferUsdcCrossChain`.
pub fn encode_cross_chain_transfer(record: &AuthorizationRecord) -> Vec<u8> {
	let intent = &record.intent;
	ICrossChainRelay::transferUsdcCrossChainCall {
		from: intent.sender,
		value: intent.amount,
		validAfter: U256::from(intent.valid_after),
		validBefore: U256::from(intent.valid_before),
		nonce: record.nonce.0,
		signature: Bytes::from(record.signature.0.clone()),
		destinationChain: U256::from(intent.destination_chain),
		receiver: intent.receiver,
	}
	.abi_encode()
}
