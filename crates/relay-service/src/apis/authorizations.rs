//! Authorization endpoints.
//!
//! Holders create signed authorizations; sponsors list what is waiting and
//! dispatch it. Each function returns the engine's [`RelayError`] so the
//! server decides the HTTP status in one place, see [`to_api_error`].

use relay_core::{codec, RelayEngine, RelayError};
use relay_types::{
	truncate_id, APIError, AuthorizationFilter, AuthorizationRecord, AuthorizationResponse,
	DispatchResponse, ListAuthorizationsQuery, ListAuthorizationsResponse, TransferRequest,
};
use tracing::{info, warn};

/// Handles POST /api/authorizations.
pub async fn create_authorization(
	engine: &RelayEngine,
	request: TransferRequest,
) -> Result<AuthorizationResponse, RelayError> {
	info!(
		origin = request.origin_chain,
		destination = request.destination_chain,
		"Creating authorization"
	);
	let record = engine.create_authorization_from_request(request).await?;
	Ok(to_response(record))
}

/// Handles GET /api/authorizations.
///
/// Without a `status` parameter only pending records are returned, which is
/// what a sponsor browsing for work wants.
pub async fn list_authorizations(
	engine: &RelayEngine,
	query: ListAuthorizationsQuery,
) -> Result<ListAuthorizationsResponse, RelayError> {
	let filter = AuthorizationFilter {
		status: query.status,
		origin_chain: query.origin_chain,
		destination_chain: query.destination_chain,
		sender: query.sender,
		receiver: query.receiver,
		search: query.search.filter(|s| !s.trim().is_empty()),
	};
	let authorizations: Vec<AuthorizationResponse> = engine
		.list_pending(filter)
		.await?
		.into_iter()
		.map(to_response)
		.collect();

	Ok(ListAuthorizationsResponse {
		count: authorizations.len(),
		authorizations,
	})
}

/// Handles GET /api/authorizations/{id}.
pub async fn get_authorization(
	engine: &RelayEngine,
	id: &str,
) -> Result<AuthorizationResponse, RelayError> {
	engine.get_authorization(id).await.map(to_response)
}

/// Handles POST /api/authorizations/{id}/dispatch.
pub async fn dispatch_authorization(
	engine: &RelayEngine,
	id: &str,
) -> Result<DispatchResponse, RelayError> {
	let record = engine.dispatch(id).await?;
	info!(authorization_id = %truncate_id(id), "Dispatch confirmed");
	Ok(DispatchResponse {
		id: record.id,
		status: record.status,
		tx_hash: record.executed_tx_hash,
	})
}

fn to_response(record: AuthorizationRecord) -> AuthorizationResponse {
	AuthorizationResponse {
		display_amount: codec::format_display_amount(record.intent.amount),
		cross_chain: record.intent.is_cross_chain(),
		record,
	}
}

/// Maps a relay failure onto its HTTP error.
pub fn to_api_error(error: RelayError) -> APIError {
	let error_type = error.code().to_string();
	let message = error.to_string();

	match error {
		RelayError::InvalidAmount(_)
		| RelayError::InvalidTimestamp(_)
		| RelayError::InvalidAddress(_)
		| RelayError::InvalidIntent(_)
		| RelayError::UnsupportedChain(_) => APIError::BadRequest {
			error_type,
			message,
			details: None,
		},
		RelayError::NotFound(_) => APIError::NotFound {
			error_type,
			message,
		},
		RelayError::ConcurrentDispatchRejected(_) | RelayError::InvalidTransition { .. } => {
			APIError::Conflict {
				error_type,
				message,
			}
		},
		RelayError::MissingSigner | RelayError::SigningRejected(_) => {
			APIError::UnprocessableEntity {
				error_type,
				message,
				details: None,
			}
		},
		RelayError::SubmissionFailed(_) => APIError::BadGateway {
			error_type,
			message,
		},
		RelayError::ConfirmationTimeout { tx_hash } => {
			warn!(tx_hash = %tx_hash, "Confirmation still outstanding");
			APIError::GatewayTimeout {
				error_type,
				message,
			}
		},
		RelayError::Storage(_) => APIError::InternalServerError {
			error_type,
			message,
		},
	}
}
