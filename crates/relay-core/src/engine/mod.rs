//! Relay engine exposing the authorization operations.
//!
//! The engine wires the codec, router, payload builder, signing session,
//! state machine and dispatcher together. Every operation is a short-lived
//! async call; the only shared mutable state is the record store.

pub mod event_bus;

use crate::builder::authorization::validate_intent;
use crate::dispatcher::RelayDispatcher;
use crate::signing::SigningSession;
use crate::state::AuthorizationStateMachine;
use crate::{codec, nonce, AuthorizationBuilder, ChainRouter, RelayError};
use alloy_primitives::Address;
use relay_account::AccountService;
use relay_config::Config;
use relay_delivery::DeliveryService;
use relay_storage::StorageService;
use relay_types::{
	current_timestamp, truncate_id, AuthorizationEvent, AuthorizationFilter, AuthorizationRecord,
	AuthorizationStatus, TransferIntent, TransferRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// How many successive seconds are tried when a nonce is already reserved.
const MAX_NONCE_ATTEMPTS: u64 = 16;

/// Main relay engine.
#[derive(Clone)]
pub struct RelayEngine {
	config: Config,
	account: Arc<AccountService>,
	router: Arc<ChainRouter>,
	builder: AuthorizationBuilder,
	signing: Arc<SigningSession>,
	state: Arc<AuthorizationStateMachine>,
	dispatcher: Arc<RelayDispatcher>,
	event_bus: event_bus::EventBus,
}

impl RelayEngine {
	/// Creates a new relay engine with the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		account: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let router = Arc::new(ChainRouter::new(config.networks.clone()));
		let state = Arc::new(AuthorizationStateMachine::new(storage));
		let dispatcher = Arc::new(RelayDispatcher::new(
			state.clone(),
			router.clone(),
			delivery,
			event_bus.clone(),
		));

		Self {
			config,
			account: account.clone(),
			builder: AuthorizationBuilder::new(router.clone()),
			router,
			signing: Arc::new(SigningSession::new(account)),
			state,
			dispatcher,
			event_bus,
		}
	}

	/// Signs and persists a new authorization in `Pending`.
	///
	/// Validation and routing errors surface before the key agent is asked
	/// for anything; a rejected signature persists nothing.
	#[instrument(skip_all, fields(origin = intent.origin_chain, destination = intent.destination_chain))]
	pub async fn create_authorization(
		&self,
		intent: TransferIntent,
	) -> Result<AuthorizationRecord, RelayError> {
		let now = current_timestamp();
		validate_intent(&intent, now)?;
		let route = self
			.router
			.check_route(intent.origin_chain, intent.destination_chain)?;
		let verifying_contract = self.router.resolve_verifying_contract(intent.origin_chain)?;

		let initiator = self
			.account
			.primary_address()
			.await
			.map_err(|e| RelayError::SigningRejected(e.to_string()))?
			.ok_or(RelayError::MissingSigner)?;

		let id = uuid::Uuid::new_v4().to_string();
		let nonce = self.reserve_nonce(&intent, now, &id).await?;
		let payload = self.builder.build(&intent, nonce, verifying_contract)?;
		let signature = self.signing.sign(&payload).await?;

		let record = AuthorizationRecord {
			id,
			initiator,
			intent,
			nonce,
			signature,
			status: AuthorizationStatus::Pending,
			created_at: now,
			updated_at: now,
			executed_tx_hash: None,
			sponsor: None,
			last_error: None,
			attempts: 0,
		};
		self.state.create(&record).await?;

		tracing::info!(
			authorization_id = %truncate_id(&record.id),
			route = ?route,
			amount = %codec::from_base_units(record.intent.amount),
			"Authorization created"
		);
		self.event_bus
			.publish(AuthorizationEvent::Created {
				id: record.id.clone(),
				origin_chain: record.intent.origin_chain,
				destination_chain: record.intent.destination_chain,
			})
			.ok();

		Ok(record)
	}

	/// Decodes a raw form submission and creates the authorization.
	pub async fn create_authorization_from_request(
		&self,
		request: TransferRequest,
	) -> Result<AuthorizationRecord, RelayError> {
		let offset = codec::local_offset(self.config.relayer.local_offset_minutes)?;
		let intent = codec::decode_request(&request, offset)?;
		self.create_authorization(intent).await
	}

	/// Picks the first free nonce for the sender, starting at `now`.
	async fn reserve_nonce(
		&self,
		intent: &TransferIntent,
		now: u64,
		id: &str,
	) -> Result<relay_types::Nonce, RelayError> {
		for offset in 0..MAX_NONCE_ATTEMPTS {
			let candidate = nonce::generate(Some(intent.sender), now + offset)?;
			if self
				.state
				.reserve_nonce(intent.origin_chain, &candidate, id)
				.await?
			{
				return Ok(candidate);
			}
			tracing::debug!(sender = %intent.sender, offset, "Nonce taken, trying next second");
		}
		Err(RelayError::InvalidIntent(
			"too many authorizations for this sender; retry shortly".to_string(),
		))
	}

	/// Records matching `filter`, newest first; status defaults to `Pending`.
	pub async fn list_pending(
		&self,
		mut filter: AuthorizationFilter,
	) -> Result<Vec<AuthorizationRecord>, RelayError> {
		if filter.status.is_none() {
			filter.status = Some(AuthorizationStatus::Pending);
		}
		self.state.list(&filter).await
	}

	/// All records paying `receiver`, newest first.
	pub async fn list_by_receiver(
		&self,
		receiver: Address,
	) -> Result<Vec<AuthorizationRecord>, RelayError> {
		self.state
			.list(&AuthorizationFilter {
				receiver: Some(receiver),
				..Default::default()
			})
			.await
	}

	/// All records signed by `sender`, newest first.
	pub async fn list_by_sender(
		&self,
		sender: Address,
	) -> Result<Vec<AuthorizationRecord>, RelayError> {
		self.state
			.list(&AuthorizationFilter {
				sender: Some(sender),
				..Default::default()
			})
			.await
	}

	pub async fn get_authorization(&self, id: &str) -> Result<AuthorizationRecord, RelayError> {
		self.state.get(id).await
	}

	/// Submits the authorization on-chain as the configured sponsor.
	#[instrument(skip_all, fields(id = %truncate_id(id)))]
	pub async fn dispatch(&self, id: &str) -> Result<AuthorizationRecord, RelayError> {
		self.dispatcher.dispatch(id).await
	}

	/// Records in `Processing` longer than the configured threshold.
	pub async fn stale_processing(&self) -> Result<Vec<AuthorizationRecord>, RelayError> {
		self.recover_stale(Duration::from_secs(
			self.config.relayer.stale_after_minutes * 60,
		))
		.await
	}

	pub async fn recover_stale(
		&self,
		max_age: Duration,
	) -> Result<Vec<AuthorizationRecord>, RelayError> {
		self.dispatcher.recover_stale(max_age).await
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn router(&self) -> &ChainRouter {
		&self.router
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}
}
