//! Main entry point for the gasless relay service.
//!
//! Loads the configuration, builds the relay engine from the configured
//! storage, key agent and sponsor backends, and serves the HTTP API. A
//! background sweep reports authorizations stuck in processing.

use clap::Parser;
use relay_config::Config;
use relay_core::RelayEngine;
use relay_types::truncate_id;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the relay service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "RELAYER_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started relayer");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Invalid config path: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.relayer.id);

	let engine = Arc::new(factory_registry::build_relay_from_config(config.clone()).await?);
	tokio::spawn(log_events(Arc::clone(&engine)));

	let Some(api_config) = config.api.clone().filter(|api| api.enabled) else {
		tracing::error!("API server is disabled; nothing to serve");
		return Err("the [api] section must be present and enabled".into());
	};

	tokio::select! {
		result = server::start_server(api_config, Arc::clone(&engine)) => {
			tracing::info!("API server finished");
			result?;
		}
		_ = monitor_stale(Arc::clone(&engine)) => {}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Shutdown requested");
		}
	}

	tracing::info!("Stopped relayer");
	Ok(())
}

/// Follows the lifecycle event bus at debug level.
async fn log_events(engine: Arc<RelayEngine>) {
	use tokio::sync::broadcast::error::RecvError;

	let mut events = engine.event_bus().subscribe();
	loop {
		match events.recv().await {
			Ok(event) => tracing::debug!(
				authorization_id = %truncate_id(event.record_id()),
				event = ?event,
				"Lifecycle event"
			),
			Err(RecvError::Lagged(missed)) => {
				tracing::warn!(missed, "Event log lagging behind");
			},
			Err(RecvError::Closed) => break,
		}
	}
}

/// Periodically logs records that have been `Processing` for too long.
///
/// Their status is never changed here; an operator checks the chain.
async fn monitor_stale(engine: Arc<RelayEngine>) {
	let minutes = engine.config().relayer.stale_after_minutes.max(1);
	let mut interval = tokio::time::interval(Duration::from_secs(minutes * 60));

	loop {
		interval.tick().await;
		match engine.stale_processing().await {
			Ok(stale) if !stale.is_empty() => {
				tracing::warn!(count = stale.len(), "Authorizations stuck in processing");
			},
			Ok(_) => {},
			Err(e) => tracing::error!(error = %e, "Stale sweep failed"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_args_default_values() {
		let args = Args::parse_from(["relayer"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::parse_from(["relayer", "-c", "custom.toml", "--log-level", "debug"]);
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_engine_from_config_file() {
		let mut file = NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[relayer]
id = "file-relayer"

[networks.1]
rpc_url = "http://localhost:8545"
relay_address = "0x1111111111111111111111111111111111111111"

[storage]
primary = "memory"
[storage.implementations.memory]

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[delivery.implementations.evm_alloy]
network_ids = [1]
private_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"

[api]
enabled = true
port = 3100
"#
		)
		.unwrap();

		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();
		let engine = factory_registry::build_relay_from_config(config)
			.await
			.unwrap();
		assert_eq!(engine.config().relayer.id, "file-relayer");
		assert!(engine.stale_processing().await.unwrap().is_empty());
	}
}
