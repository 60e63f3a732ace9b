//! HTTP server for the relay API.
//!
//! Holders create authorizations, sponsors list and dispatch them. All
//! routes live under `/api` except the `/health` probe.

use crate::apis::authorizations;
use axum::{
	extract::{DefaultBodyLimit, Path, Query, State},
	http::{HeaderName, HeaderValue, Method, StatusCode},
	response::Json,
	routing::{get, post},
	Router,
};
use relay_config::{ApiConfig, CorsConfig};
use relay_core::RelayEngine;
use relay_types::{
	APIError, AuthorizationResponse, DispatchResponse, ListAuthorizationsQuery,
	ListAuthorizationsResponse, TransferRequest,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<RelayEngine>,
}

/// Builds the API router.
///
/// The request timeout covers every route except dispatch, which is bounded
/// by the relayer's confirmation timeout instead.
pub fn router(api_config: &ApiConfig, engine: Arc<RelayEngine>) -> Router {
	let timeout = TimeoutLayer::with_status_code(
		StatusCode::REQUEST_TIMEOUT,
		Duration::from_secs(api_config.timeout_seconds),
	);

	let api = Router::new()
		.route(
			"/authorizations",
			post(handle_create_authorization).get(handle_list_authorizations),
		)
		.route("/authorizations/{id}", get(handle_get_authorization))
		.layer(timeout)
		.route(
			"/authorizations/{id}/dispatch",
			post(handle_dispatch_authorization),
		);

	Router::new()
		.nest("/api", api)
		.route("/health", get(handle_health))
		.layer(DefaultBodyLimit::max(api_config.max_request_size))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config.cors.as_ref())),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<RelayEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Relay API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// CORS from config, or permissive when the section is absent.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let methods: Vec<Method> = cors
		.allowed_methods
		.iter()
		.filter_map(|m| m.parse().ok())
		.collect();
	let headers: Vec<HeaderName> = cors
		.allowed_headers
		.iter()
		.filter_map(|h| h.parse().ok())
		.collect();
	let origin = if cors.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::from(Any)
	} else {
		AllowOrigin::list(
			cors.allowed_origins
				.iter()
				.filter_map(|o| HeaderValue::from_str(o).ok()),
		)
	};

	CorsLayer::new()
		.allow_origin(origin)
		.allow_methods(methods)
		.allow_headers(headers)
}

/// Handles POST /api/authorizations requests.
async fn handle_create_authorization(
	State(state): State<AppState>,
	Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<AuthorizationResponse>), APIError> {
	match authorizations::create_authorization(&state.engine, request).await {
		Ok(response) => Ok((StatusCode::CREATED, Json(response))),
		Err(e) => {
			tracing::warn!("Authorization request failed: {}", e);
			Err(authorizations::to_api_error(e))
		},
	}
}

/// Handles GET /api/authorizations requests.
async fn handle_list_authorizations(
	State(state): State<AppState>,
	Query(query): Query<ListAuthorizationsQuery>,
) -> Result<Json<ListAuthorizationsResponse>, APIError> {
	authorizations::list_authorizations(&state.engine, query)
		.await
		.map(Json)
		.map_err(authorizations::to_api_error)
}

/// Handles GET /api/authorizations/{id} requests.
async fn handle_get_authorization(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<AuthorizationResponse>, APIError> {
	authorizations::get_authorization(&state.engine, &id)
		.await
		.map(Json)
		.map_err(authorizations::to_api_error)
}

/// Handles POST /api/authorizations/{id}/dispatch requests.
///
/// Blocks until the sponsor transaction is confirmed or the confirmation
/// timeout elapses. The dispatch runs on its own task, so a client that
/// disconnects does not interrupt the lifecycle update.
async fn handle_dispatch_authorization(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<DispatchResponse>, APIError> {
	let engine = Arc::clone(&state.engine);
	let task =
		tokio::spawn(async move { authorizations::dispatch_authorization(&engine, &id).await });

	match task.await {
		Ok(Ok(response)) => Ok(Json(response)),
		Ok(Err(e)) => {
			tracing::warn!("Dispatch failed: {}", e);
			Err(authorizations::to_api_error(e))
		},
		Err(e) => {
			tracing::error!("Dispatch task aborted: {}", e);
			Err(APIError::InternalServerError {
				error_type: "DISPATCH_ABORTED".to_string(),
				message: e.to_string(),
			})
		},
	}
}

async fn handle_health(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"relayer": state.engine.config().relayer.id,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use relay_account::{implementations::local::LocalWallet, AccountService};
	use relay_config::ConfigBuilder;
	use relay_core::EventBus;
	use relay_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
	use relay_storage::{implementations::memory::MemoryStorage, StorageService};
	use relay_types::{
		Address, ConfigSchema, Schema, SecretString, Transaction, TransactionHash,
		TransactionReceipt, ValidationError,
	};
	use std::collections::HashMap;
	use tower::ServiceExt;

	const HOLDER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const HOLDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
	const RECEIVER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
			Schema::new(vec![], vec![]).validate(config)
		}
	}

	/// Chain that confirms every submission after `delay`.
	struct ConfirmingChain {
		delay: Duration,
	}

	#[async_trait]
	impl DeliveryInterface for ConfirmingChain {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}

		fn supported_chains(&self) -> Vec<u64> {
			vec![1]
		}

		fn sponsor_address(&self, _chain_id: u64) -> Result<Address, DeliveryError> {
			Ok(Address::repeat_byte(0x5a))
		}

		async fn submit(&self, _tx: Transaction) -> Result<TransactionHash, DeliveryError> {
			Ok(TransactionHash(vec![0xab; 32]))
		}

		async fn wait_for_confirmation(
			&self,
			hash: &TransactionHash,
			_chain_id: u64,
			_confirmations: u64,
		) -> Result<TransactionReceipt, DeliveryError> {
			tokio::time::sleep(self.delay).await;
			Ok(TransactionReceipt {
				hash: hash.clone(),
				block_number: 7,
				success: true,
			})
		}
	}

	fn app() -> Router {
		app_with(Duration::ZERO, "enabled = true")
	}

	fn app_with(confirmation_delay: Duration, api_toml: &str) -> Router {
		let config = ConfigBuilder::new()
			.network(1, Some(Address::repeat_byte(0x11)))
			.network(8453, None)
			.build();
		let wallet = LocalWallet::new(&[SecretString::from(HOLDER_KEY)]).unwrap();
		let mut chains: HashMap<u64, Arc<dyn DeliveryInterface>> = HashMap::new();
		chains.insert(
			1,
			Arc::new(ConfirmingChain {
				delay: confirmation_delay,
			}),
		);

		let engine = RelayEngine::new(
			config,
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(AccountService::new(Box::new(wallet))),
			Arc::new(DeliveryService::new(chains, 1, Duration::from_secs(10))),
			EventBus::new(16),
		);
		let api_config: ApiConfig = toml::from_str(api_toml).unwrap();
		router(&api_config, Arc::new(engine))
	}

	fn transfer(amount: &str, origin: u64, destination: u64) -> Value {
		json!({
			"sender": HOLDER,
			"receiver": RECEIVER,
			"amount": amount,
			"valid_before": "4102444800",
			"valid_immediately": true,
			"origin_chain": origin,
			"destination_chain": destination,
		})
	}

	async fn send(
		app: &Router,
		method: &str,
		uri: &str,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let request = Request::builder()
			.method(method)
			.uri(uri)
			.header("content-type", "application/json")
			.body(match body {
				Some(body) => Body::from(body.to_string()),
				None => Body::empty(),
			})
			.unwrap();
		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap_or(Value::Null)
		};
		(status, value)
	}

	#[tokio::test]
	async fn test_health() {
		let (status, body) = send(&app(), "GET", "/health", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["relayer"], "test-relayer");
	}

	#[tokio::test]
	async fn test_create_list_and_dispatch() {
		let app = app();

		let (status, created) = send(
			&app,
			"POST",
			"/api/authorizations",
			Some(transfer("10.50", 1, 1)),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(created["display_amount"], "10.50");
		assert_eq!(created["cross_chain"], false);
		assert_eq!(created["status"], "pending");
		let id = created["id"].as_str().unwrap().to_string();

		let (status, listed) = send(&app, "GET", "/api/authorizations", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(listed["count"], 1);

		let (status, fetched) =
			send(&app, "GET", &format!("/api/authorizations/{}", id), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(fetched["id"], id.as_str());

		let (status, dispatched) = send(
			&app,
			"POST",
			&format!("/api/authorizations/{}/dispatch", id),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(dispatched["status"], "executed");
		assert!(dispatched["txHash"].as_str().unwrap().starts_with("0xabab"));

		let (_, pending) = send(&app, "GET", "/api/authorizations", None).await;
		assert_eq!(pending["count"], 0);
		let (_, executed) =
			send(&app, "GET", "/api/authorizations?status=executed", None).await;
		assert_eq!(executed["count"], 1);

		let (status, again) = send(
			&app,
			"POST",
			&format!("/api/authorizations/{}/dispatch", id),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(again["error"], "INVALID_TRANSITION");
	}

	async fn create(app: &Router) -> String {
		let (status, created) = send(
			app,
			"POST",
			"/api/authorizations",
			Some(transfer("1", 1, 1)),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);
		created["id"].as_str().unwrap().to_string()
	}

	#[tokio::test]
	async fn test_dispatch_outlives_request_timeout() {
		let app = app_with(
			Duration::from_millis(1500),
			"enabled = true\ntimeout_seconds = 1",
		);
		let id = create(&app).await;

		let (status, dispatched) = send(
			&app,
			"POST",
			&format!("/api/authorizations/{}/dispatch", id),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(dispatched["status"], "executed");
	}

	#[tokio::test]
	async fn test_abandoned_dispatch_still_completes() {
		let app = app_with(Duration::from_millis(300), "enabled = true");
		let id = create(&app).await;
		let dispatch_uri = format!("/api/authorizations/{}/dispatch", id);

		let abandoned = tokio::time::timeout(
			Duration::from_millis(50),
			send(&app, "POST", &dispatch_uri, None),
		)
		.await;
		assert!(abandoned.is_err());

		tokio::time::sleep(Duration::from_millis(800)).await;
		let (_, fetched) =
			send(&app, "GET", &format!("/api/authorizations/{}", id), None).await;
		assert_eq!(fetched["status"], "executed");
		assert!(fetched["executed_tx_hash"]
			.as_str()
			.unwrap()
			.starts_with("0xabab"));

		let (status, again) = send(&app, "POST", &dispatch_uri, None).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(again["error"], "INVALID_TRANSITION");
	}

	#[tokio::test]
	async fn test_list_filters_by_destination_and_search() {
		let app = app();
		send(&app, "POST", "/api/authorizations", Some(transfer("1", 1, 1))).await;
		let (status, _) = send(
			&app,
			"POST",
			"/api/authorizations",
			Some(transfer("2", 1, 8453)),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);

		let (_, cross) = send(
			&app,
			"GET",
			"/api/authorizations?destination_chain=8453",
			None,
		)
		.await;
		assert_eq!(cross["count"], 1);
		assert_eq!(cross["authorizations"][0]["cross_chain"], true);

		let (_, searched) =
			send(&app, "GET", "/api/authorizations?search=70997970c5", None).await;
		assert_eq!(searched["count"], 2);

		let (_, none) =
			send(&app, "GET", "/api/authorizations?search=deadbeef", None).await;
		assert_eq!(none["count"], 0);
	}

	#[tokio::test]
	async fn test_validation_errors_are_bad_request() {
		let app = app();
		let (status, body) = send(
			&app,
			"POST",
			"/api/authorizations",
			Some(transfer("ten", 1, 1)),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_AMOUNT");

		let (status, body) = send(
			&app,
			"POST",
			"/api/authorizations",
			Some(transfer("1", 999, 999)),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "UNSUPPORTED_CHAIN");
	}

	#[tokio::test]
	async fn test_unknown_authorization() {
		let (status, body) = send(&app(), "GET", "/api/authorizations/missing", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "NOT_FOUND");

		let (status, _) =
			send(&app(), "POST", "/api/authorizations/missing/dispatch", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[test]
	fn test_cors_from_config() {
		let cors = CorsConfig {
			allowed_origins: vec!["https://wallet.example".to_string()],
			allowed_headers: vec!["content-type".to_string()],
			allowed_methods: vec!["GET".to_string(), "POST".to_string()],
		};
		let _ = cors_layer(Some(&cors));
		let _ = cors_layer(None);
	}
}
