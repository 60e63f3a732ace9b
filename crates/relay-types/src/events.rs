//! Event types for lifecycle notifications.
//!
//! The engine publishes an [`AuthorizationEvent`] on its event bus at every
//! lifecycle step so that logging and monitoring can follow authorizations
//! without polling storage.

use crate::{AuthorizationStatus, TransactionHash};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Events emitted while an authorization moves through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationEvent {
	/// A signed authorization has been persisted as pending.
	Created {
		id: String,
		origin_chain: u64,
		destination_chain: u64,
	},
	/// A sponsor claimed the record; status is now processing.
	DispatchStarted {
		id: String,
		sponsor: Address,
		previous: AuthorizationStatus,
	},
	/// The transaction has been submitted and awaits confirmation.
	Submitted {
		id: String,
		tx_hash: TransactionHash,
		chain_id: u64,
	},
	/// The transaction was confirmed on-chain.
	Executed { id: String, tx_hash: TransactionHash },
	/// Submission or confirmation failed.
	Failed { id: String, error: String },
}

impl AuthorizationEvent {
	/// Id of the record the event refers to.
	pub fn record_id(&self) -> &str {
		match self {
			Self::Created { id, .. }
			| Self::DispatchStarted { id, .. }
			| Self::Submitted { id, .. }
			| Self::Executed { id, .. }
			| Self::Failed { id, .. } => id,
		}
	}
}
