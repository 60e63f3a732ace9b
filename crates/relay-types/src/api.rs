//! API types for the relay HTTP service.
//!
//! Request/response bodies for the authorization endpoints, the JSON error
//! body, and [`APIError`] which maps relay failures onto HTTP status codes.

use crate::{AuthorizationRecord, AuthorizationStatus};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Query parameters for `GET /api/authorizations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAuthorizationsQuery {
	/// Status filter; defaults to pending.
	pub status: Option<AuthorizationStatus>,
	/// Case-insensitive address search over sender and receiver.
	pub search: Option<String>,
	pub origin_chain: Option<u64>,
	pub destination_chain: Option<u64>,
	pub sender: Option<Address>,
	pub receiver: Option<Address>,
}

/// Authorization record with display helpers attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
	#[serde(flatten)]
	pub record: AuthorizationRecord,
	/// Amount in whole tokens, two decimals.
	pub display_amount: String,
	pub cross_chain: bool,
}

/// Response to `GET /api/authorizations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAuthorizationsResponse {
	pub authorizations: Vec<AuthorizationResponse>,
	pub count: usize,
}

/// Response to `POST /api/authorizations/{id}/dispatch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResponse {
	pub id: String,
	pub status: AuthorizationStatus,
	#[serde(rename = "txHash")]
	pub tx_hash: Option<String>,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable error code.
	pub error: String,
	/// Human-readable description
	pub message: String,
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Validation failures (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Unknown record (404)
	NotFound { error_type: String, message: String },
	/// Record is in a state that forbids the request (409)
	Conflict { error_type: String, message: String },
	/// Business rule failures such as a rejected signature (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// The chain rejected or failed the submission (502)
	BadGateway { error_type: String, message: String },
	/// Confirmation did not arrive in time (504)
	GatewayTimeout { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::BadGateway { .. } => 502,
			APIError::GatewayTimeout { .. } => 504,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => (error_type, message, details.clone()),
			APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::BadGateway {
				error_type,
				message,
			}
			| APIError::GatewayTimeout {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message, None),
		};
		ErrorResponse {
			error: error.clone(),
			message: message.clone(),
			details,
		}
	}

	fn message(&self) -> &str {
		match self {
			APIError::BadRequest { message, .. }
			| APIError::NotFound { message, .. }
			| APIError::Conflict { message, .. }
			| APIError::UnprocessableEntity { message, .. }
			| APIError::BadGateway { message, .. }
			| APIError::GatewayTimeout { message, .. }
			| APIError::InternalServerError { message, .. } => message,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "HTTP {}: {}", self.status_code(), self.message())
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

/// Serde module for U256 as a decimal string.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(D::Error::custom)
	}
}
