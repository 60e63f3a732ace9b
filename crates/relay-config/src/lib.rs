//! Configuration module for the gasless relay.
//!
//! Loads the relay configuration from TOML, resolving `${VAR}` and
//! `${VAR:-default}` environment references, and validates it before any
//! service is built.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use regex::Regex;
use relay_types::{networks::deserialize_networks, NetworksConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
pub use builders::config::ConfigBuilder;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Relayer identity and dispatch timing.
	pub relayer: RelayerConfig,
	/// Per-chain RPC endpoints and contract overrides.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Record store backend.
	pub storage: StorageConfig,
	/// Key-holding agent that signs authorizations for holders.
	pub account: AccountConfig,
	/// Sponsor submission backends.
	pub delivery: DeliveryConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Relayer identity and dispatch timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayerConfig {
	pub id: String,
	/// Upper bound on waiting for a submitted transaction to be mined.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
	/// Blocks required on top of the inclusion block.
	#[serde(default = "default_min_confirmations")]
	pub min_confirmations: u64,
	/// Age after which a processing record is reported as stale.
	#[serde(default = "default_stale_after_minutes")]
	pub stale_after_minutes: u64,
	/// Offset applied to naive date-time inputs, in minutes east of UTC.
	#[serde(default)]
	pub local_offset_minutes: i32,
}

fn default_confirmation_timeout_seconds() -> u64 {
	120
}

fn default_min_confirmations() -> u64 {
	1
}

fn default_stale_after_minutes() -> u64 {
	30
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the signing agent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for sponsor transaction delivery.
///
/// Each implementation table names the `network_ids` it serves.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
	pub allowed_headers: Vec<String>,
	pub allowed_methods: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with the default
/// in `${VAR_NAME:-default_value}` when the variable is unset.
///
/// Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-section consistency.
	///
	/// - relayer id is set and timing values are in range
	/// - at least one network, each with an http(s) RPC URL
	/// - primary storage/account implementations exist
	/// - every delivery `network_ids` entry refers to a configured network
	fn validate(&self) -> Result<(), ConfigError> {
		if self.relayer.id.trim().is_empty() {
			return Err(ConfigError::Validation("Relayer ID cannot be empty".into()));
		}
		if self.relayer.confirmation_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"confirmation_timeout_seconds must be greater than 0".into(),
			));
		}
		if self.relayer.min_confirmations == 0 || self.relayer.min_confirmations > 100 {
			return Err(ConfigError::Validation(
				"min_confirmations must be between 1 and 100".into(),
			));
		}
		if self.relayer.local_offset_minutes.abs() >= 24 * 60 {
			return Err(ConfigError::Validation(
				"local_offset_minutes must be within one day".into(),
			));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if !(network.rpc_url.starts_with("http://") || network.rpc_url.starts_with("https://"))
			{
				return Err(ConfigError::Validation(format!(
					"Network {} rpc_url must be an http(s) URL",
					chain_id
				)));
			}
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_primary("account", &self.account.primary, &self.account.implementations)?;

		if self.delivery.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one delivery implementation required".into(),
			));
		}
		for (impl_name, impl_config) in &self.delivery.implementations {
			let Some(network_ids) = impl_config.get("network_ids").and_then(|v| v.as_array())
			else {
				continue;
			};
			for value in network_ids {
				let network_id = value.as_integer().ok_or_else(|| {
					ConfigError::Validation(format!(
						"Invalid network_id in delivery '{}'",
						impl_name
					))
				})? as u64;
				if !self.networks.contains_key(&network_id) {
					return Err(ConfigError::Validation(format!(
						"Delivery '{}' references network {} which doesn't exist in networks config",
						impl_name, network_id
					)));
				}
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses, resolves environment references, and validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
