//! Relay dispatcher.
//!
//! Claims an authorization for a sponsor, routes it to the token or relay
//! contract on its origin chain, submits, and awaits confirmation. There is
//! no automatic retry: a failed record stays `Failed` until a sponsor
//! dispatches it again.

use crate::contracts;
use crate::engine::event_bus::EventBus;
use crate::router::{ChainRouter, Route};
use crate::state::{authorization::check_claimable, AuthorizationStateMachine};
use crate::RelayError;
use relay_delivery::{DeliveryError, DeliveryService};
use relay_types::{
	current_timestamp, truncate_id, AuthorizationEvent, AuthorizationFilter, AuthorizationRecord,
	AuthorizationStatus, Transaction, TransactionHash, U256,
};
use std::sync::Arc;
use std::time::Duration;

/// Attempts at persisting `Executed` once the chain has confirmed.
const EXECUTED_UPDATE_ATTEMPTS: u32 = 3;
const EXECUTED_UPDATE_BACKOFF: Duration = Duration::from_millis(100);

pub struct RelayDispatcher {
	state: Arc<AuthorizationStateMachine>,
	router: Arc<ChainRouter>,
	delivery: Arc<DeliveryService>,
	event_bus: EventBus,
}

impl RelayDispatcher {
	pub fn new(
		state: Arc<AuthorizationStateMachine>,
		router: Arc<ChainRouter>,
		delivery: Arc<DeliveryService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			state,
			router,
			delivery,
			event_bus,
		}
	}

	/// Drives one record from `Pending` or `Failed` to a final outcome.
	///
	/// Returns the executed record. On submission or confirmation failure the
	/// record is left `Failed` with the message in `last_error` and the error
	/// is returned.
	pub async fn dispatch(&self, id: &str) -> Result<AuthorizationRecord, RelayError> {
		let current = self.state.get(id).await?;
		check_claimable(&current)?;

		let origin = current.intent.origin_chain;
		let sponsor = self
			.delivery
			.sponsor_address(origin)
			.map_err(|_| RelayError::UnsupportedChain(origin))?;

		let (claimed, previous) = self.state.claim(id, sponsor).await?;
		tracing::info!(
			authorization_id = %truncate_id(id),
			sponsor = %sponsor,
			previous = %previous,
			attempt = claimed.attempts,
			"Dispatch started"
		);
		self.event_bus
			.publish(AuthorizationEvent::DispatchStarted {
				id: id.to_string(),
				sponsor,
				previous,
			})
			.ok();

		match self.execute(&claimed).await {
			Ok(tx_hash) => {
				let executed = self.record_executed(id, &tx_hash).await?;
				tracing::info!(
					authorization_id = %truncate_id(id),
					tx_hash = %tx_hash.to_hex(),
					"Authorization executed"
				);
				self.event_bus
					.publish(AuthorizationEvent::Executed {
						id: id.to_string(),
						tx_hash,
					})
					.ok();
				Ok(executed)
			},
			Err(error) => {
				tracing::warn!(
					authorization_id = %truncate_id(id),
					error = %error,
					"Dispatch failed"
				);
				if let Err(e) = self.state.mark_failed(id, error.to_string()).await {
					tracing::error!(
						authorization_id = %truncate_id(id),
						error = %e,
						"Failed to record dispatch failure"
					);
				}
				self.event_bus
					.publish(AuthorizationEvent::Failed {
						id: id.to_string(),
						error: error.to_string(),
					})
					.ok();
				Err(error)
			},
		}
	}

	/// Persists `Executed` for a confirmed transaction.
	///
	/// Storage failures are retried with a short backoff. When every attempt
	/// fails the record is still `Processing`, so the confirmed hash is logged
	/// at error level for reconciliation.
	async fn record_executed(
		&self,
		id: &str,
		tx_hash: &TransactionHash,
	) -> Result<AuthorizationRecord, RelayError> {
		let mut attempt = 1;
		loop {
			match self.state.mark_executed(id, tx_hash.to_hex()).await {
				Ok(record) => return Ok(record),
				Err(RelayError::Storage(e)) if attempt < EXECUTED_UPDATE_ATTEMPTS => {
					tracing::warn!(
						authorization_id = %truncate_id(id),
						tx_hash = %tx_hash.to_hex(),
						attempt,
						error = %e,
						"Retrying executed status update"
					);
					tokio::time::sleep(EXECUTED_UPDATE_BACKOFF * attempt).await;
					attempt += 1;
				},
				Err(e) => {
					tracing::error!(
						authorization_id = %truncate_id(id),
						tx_hash = %tx_hash.to_hex(),
						error = %e,
						"Transaction confirmed but record left in processing"
					);
					return Err(e);
				},
			}
		}
	}

	async fn execute(&self, record: &AuthorizationRecord) -> Result<TransactionHash, RelayError> {
		let tx = self.build_transaction(record)?;
		let chain_id = tx.chain_id;

		let tx_hash = self
			.delivery
			.deliver(tx)
			.await
			.map_err(|e| RelayError::SubmissionFailed(e.to_string()))?;
		self.event_bus
			.publish(AuthorizationEvent::Submitted {
				id: record.id.clone(),
				tx_hash: tx_hash.clone(),
				chain_id,
			})
			.ok();

		self.delivery
			.confirm(&tx_hash, chain_id)
			.await
			.map_err(|e| match e {
				DeliveryError::Timeout { hash, .. } => {
					RelayError::ConfirmationTimeout { tx_hash: hash }
				},
				other => RelayError::SubmissionFailed(other.to_string()),
			})?;
		Ok(tx_hash)
	}

	/// Sponsor transaction for a stored record.
	///
	/// The route is re-derived from the stored chains, never from caller input.
	pub fn build_transaction(
		&self,
		record: &AuthorizationRecord,
	) -> Result<Transaction, RelayError> {
		let target = self.router.dispatch_target(&record.intent)?;
		let data = match target.route {
			Route::SameChain => contracts::encode_transfer_with_authorization(record),
			Route::CrossChain => contracts::encode_cross_chain_transfer(record),
		};
		Ok(Transaction {
			to: target.contract,
			data,
			value: U256::ZERO,
			chain_id: target.chain_id,
		})
	}

	/// Records stuck in `Processing` for longer than `max_age`.
	///
	/// Status is left untouched; an operator reconciles them against the chain.
	pub async fn recover_stale(
		&self,
		max_age: Duration,
	) -> Result<Vec<AuthorizationRecord>, RelayError> {
		let cutoff = current_timestamp().saturating_sub(max_age.as_secs());
		let filter = AuthorizationFilter {
			status: Some(AuthorizationStatus::Processing),
			..Default::default()
		};
		let stale: Vec<AuthorizationRecord> = self
			.state
			.list(&filter)
			.await?
			.into_iter()
			.filter(|record| record.updated_at < cutoff)
			.collect();

		for record in &stale {
			tracing::warn!(
				authorization_id = %truncate_id(&record.id),
				sponsor = ?record.sponsor,
				since = record.updated_at,
				"Authorization stuck in processing"
			);
		}
		Ok(stale)
	}
}
