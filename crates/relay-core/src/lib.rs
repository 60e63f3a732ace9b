//! Core relay engine for gasless transfer authorizations.
//!
//! A token holder signs an ERC-3009 `TransferWithAuthorization` message
//! off-chain; a sponsor later submits it on-chain and pays the fee. This crate
//! owns everything between those two moments:
//!
//! - [`codec`] turns human-entered amounts and dates into on-chain integers
//! - [`nonce`] derives the replay-safe authorization nonce
//! - [`router`] decides between a direct token call and the cross-chain relay
//! - [`builder`] assembles the EIP-712 payload and composes the engine
//! - [`signing`] requests and checks the holder signature
//! - [`state`] persists records and guards lifecycle transitions
//! - [`dispatcher`] claims a record and drives it to execution
//! - [`engine`] exposes the operations used by the HTTP service

use relay_storage::StorageError;
use relay_types::AuthorizationStatus;
use thiserror::Error;

pub mod builder;
pub mod codec;
pub mod contracts;
pub mod dispatcher;
pub mod engine;
pub mod nonce;
pub mod router;
pub mod signing;
pub mod state;

pub use builder::{AuthorizationBuilder, BuilderError, RelayBuilder, RelayFactories};
pub use engine::{event_bus::EventBus, RelayEngine};
pub use router::{ChainRouter, Route};

/// Errors surfaced by relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Invalid timestamp: {0}")]
	InvalidTimestamp(String),
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// No signer identity is available to bind the nonce to.
	#[error("No signer identity available")]
	MissingSigner,
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(u64),
	/// The key agent refused, failed, or produced a signature for another key.
	#[error("Signing rejected: {0}")]
	SigningRejected(String),
	#[error("Submission failed: {0}")]
	SubmissionFailed(String),
	#[error("Confirmation timed out for {tx_hash}")]
	ConfirmationTimeout { tx_hash: String },
	/// Another sponsor already holds the record.
	#[error("Authorization {0} is already being processed")]
	ConcurrentDispatchRejected(String),
	/// The intent violates an amount or validity-window invariant.
	#[error("Invalid intent: {0}")]
	InvalidIntent(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition {
		from: AuthorizationStatus,
		to: AuthorizationStatus,
	},
	#[error("Authorization not found: {0}")]
	NotFound(String),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

impl RelayError {
	/// Stable machine-readable code for API responses.
	pub fn code(&self) -> &'static str {
		match self {
			RelayError::InvalidAmount(_) => "INVALID_AMOUNT",
			RelayError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
			RelayError::InvalidAddress(_) => "INVALID_ADDRESS",
			RelayError::MissingSigner => "MISSING_SIGNER",
			RelayError::UnsupportedChain(_) => "UNSUPPORTED_CHAIN",
			RelayError::SigningRejected(_) => "SIGNING_REJECTED",
			RelayError::SubmissionFailed(_) => "SUBMISSION_FAILED",
			RelayError::ConfirmationTimeout { .. } => "CONFIRMATION_TIMEOUT",
			RelayError::ConcurrentDispatchRejected(_) => "CONCURRENT_DISPATCH_REJECTED",
			RelayError::InvalidIntent(_) => "INVALID_INTENT",
			RelayError::InvalidTransition { .. } => "INVALID_TRANSITION",
			RelayError::NotFound(_) => "NOT_FOUND",
			RelayError::Storage(_) => "STORAGE_ERROR",
		}
	}
}
