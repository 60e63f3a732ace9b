//! Authorization state machine implementation.
//!
//! Validates lifecycle transitions against a static table and applies them
//! through [`StorageService::update_with`], which retries on lost
//! compare-and-swap races and re-validates against the fresh record.

use crate::RelayError;
use alloy_primitives::Address;
use once_cell::sync::Lazy;
use relay_storage::{StorageError, StorageService};
use relay_types::{
	current_timestamp, AuthorizationFilter, AuthorizationRecord, AuthorizationStatus, Nonce,
	StorageKey,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Manages authorization records and their status transitions.
pub struct AuthorizationStateMachine {
	storage: Arc<StorageService>,
}

impl AuthorizationStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Checks if a state transition is valid.
	pub fn is_valid_transition(from: AuthorizationStatus, to: AuthorizationStatus) -> bool {
		static TRANSITIONS: Lazy<HashMap<AuthorizationStatus, HashSet<AuthorizationStatus>>> =
			Lazy::new(|| {
				use AuthorizationStatus::*;
				let mut m = HashMap::new();
				m.insert(Pending, HashSet::from([Processing]));
				m.insert(Processing, HashSet::from([Executed, Failed]));
				m.insert(Failed, HashSet::from([Processing]));
				m.insert(Executed, HashSet::new()); // terminal
				m
			});

		TRANSITIONS
			.get(&from)
			.is_some_and(|allowed| allowed.contains(&to))
	}

	/// Reserves `nonce` on `chain_id` for record `id`.
	///
	/// Returns `false` when the nonce is already taken.
	pub async fn reserve_nonce(
		&self,
		chain_id: u64,
		nonce: &Nonce,
		id: &str,
	) -> Result<bool, RelayError> {
		let key = format!("{}-{}", chain_id, nonce);
		match self
			.storage
			.insert(StorageKey::Nonces.as_str(), &key, &id)
			.await
		{
			Ok(()) => Ok(true),
			Err(StorageError::AlreadyExists(_)) => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	/// Persists a freshly signed record.
	pub async fn create(&self, record: &AuthorizationRecord) -> Result<(), RelayError> {
		self.storage
			.insert(StorageKey::Authorizations.as_str(), &record.id, record)
			.await?;
		Ok(())
	}

	pub async fn get(&self, id: &str) -> Result<AuthorizationRecord, RelayError> {
		self.storage
			.retrieve(StorageKey::Authorizations.as_str(), id)
			.await
			.map_err(|e| not_found(e, id))
	}

	/// Records matching `filter`, newest first.
	pub async fn list(
		&self,
		filter: &AuthorizationFilter,
	) -> Result<Vec<AuthorizationRecord>, RelayError> {
		let mut records: Vec<AuthorizationRecord> = self
			.storage
			.list(StorageKey::Authorizations.as_str())
			.await?
			.into_iter()
			.filter(|record| filter.matches(record))
			.collect();
		records.sort_by(|a, b| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| a.id.cmp(&b.id))
		});
		Ok(records)
	}

	/// Atomically moves a `Pending` or `Failed` record to `Processing`.
	///
	/// Returns the claimed record and the status it was claimed from.
	pub async fn claim(
		&self,
		id: &str,
		sponsor: Address,
	) -> Result<(AuthorizationRecord, AuthorizationStatus), RelayError> {
		let mut previous = AuthorizationStatus::Pending;
		let record = self
			.storage
			.update_with(
				StorageKey::Authorizations.as_str(),
				id,
				|mut record: AuthorizationRecord| {
					check_claimable(&record)?;
					previous = record.status;
					record.status = AuthorizationStatus::Processing;
					record.sponsor = Some(sponsor);
					record.last_error = None;
					record.attempts += 1;
					record.updated_at = current_timestamp();
					Ok::<_, RelayError>(record)
				},
			)
			.await
			.map_err(|e| relay_not_found(e, id))?;
		Ok((record, previous))
	}

	/// Marks a processing record as executed with its transaction hash.
	pub async fn mark_executed(
		&self,
		id: &str,
		tx_hash: String,
	) -> Result<AuthorizationRecord, RelayError> {
		self.transition(id, AuthorizationStatus::Executed, |record| {
			record.executed_tx_hash = Some(tx_hash.clone());
		})
		.await
	}

	/// Marks a processing record as failed, keeping the error for display.
	pub async fn mark_failed(
		&self,
		id: &str,
		error: String,
	) -> Result<AuthorizationRecord, RelayError> {
		self.transition(id, AuthorizationStatus::Failed, |record| {
			record.last_error = Some(error.clone());
		})
		.await
	}

	async fn transition<F>(
		&self,
		id: &str,
		to: AuthorizationStatus,
		mut apply: F,
	) -> Result<AuthorizationRecord, RelayError>
	where
		F: FnMut(&mut AuthorizationRecord),
	{
		self.storage
			.update_with(
				StorageKey::Authorizations.as_str(),
				id,
				|mut record: AuthorizationRecord| {
					if !Self::is_valid_transition(record.status, to) {
						return Err(RelayError::InvalidTransition {
							from: record.status,
							to,
						});
					}
					record.status = to;
					apply(&mut record);
					record.updated_at = current_timestamp();
					Ok(record)
				},
			)
			.await
			.map_err(|e| relay_not_found(e, id))
	}
}

/// Rejects a claim on a record another sponsor holds or that already executed.
pub fn check_claimable(record: &AuthorizationRecord) -> Result<(), RelayError> {
	if record.status.is_dispatchable() {
		return Ok(());
	}
	match record.status {
		AuthorizationStatus::Processing => {
			Err(RelayError::ConcurrentDispatchRejected(record.id.clone()))
		},
		status => Err(RelayError::InvalidTransition {
			from: status,
			to: AuthorizationStatus::Processing,
		}),
	}
}

fn not_found(error: StorageError, id: &str) -> RelayError {
	match error {
		StorageError::NotFound => RelayError::NotFound(id.to_string()),
		other => other.into(),
	}
}

fn relay_not_found(error: RelayError, id: &str) -> RelayError {
	match error {
		RelayError::Storage(e) => not_found(e, id),
		other => other,
	}
}
