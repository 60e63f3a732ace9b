//! Storage module for the gasless relay.
//!
//! Provides the key/value contract the relay requires from persistence:
//! create, read, atomic compare-and-swap, and listing by namespace. Records
//! are never deleted, so the interface has no delete operation.
//! Backends are in-memory (tests, development) and file-based.

use async_trait::async_trait;
use relay_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Upper bound on read-modify-write retries when a concurrent writer wins.
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Already exists: {0}")]
	AlreadyExists(String),
	/// The stored value kept changing under a read-modify-write.
	#[error("Write conflict on {0}")]
	Conflict(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface every storage backend implements.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes only if the key is absent.
	///
	/// Fails with `AlreadyExists` otherwise.
	async fn insert_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Atomically replaces the value if it still equals `expected`.
	///
	/// Returns `Ok(false)` when the stored bytes differ, `NotFound` when the
	/// key is absent.
	async fn compare_and_swap(
		&self,
		key: &str,
		expected: &[u8],
		new: Vec<u8>,
	) -> Result<bool, StorageError>;

	/// Lists the ids stored under `namespace`.
	async fn list_ids(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
	serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Typed storage on top of a backend, JSON-encoded under `namespace:id`.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a value that must not exist yet.
	pub async fn insert<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.backend
			.insert_bytes(&storage_key(namespace, id), encode(data)?)
			.await
	}

	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(namespace, id)).await?;
		decode(&bytes)
	}

	/// Atomic read-modify-write of an existing value.
	///
	/// `apply` receives the current value and returns the replacement or an
	/// error that aborts the update. The write is a compare-and-swap against
	/// the bytes that were read; if another writer got there first the value
	/// is re-read and `apply` runs again on the fresh state.
	pub async fn update_with<T, E, F>(
		&self,
		namespace: &str,
		id: &str,
		mut apply: F,
	) -> Result<T, E>
	where
		T: Serialize + DeserializeOwned,
		E: From<StorageError>,
		F: FnMut(T) -> Result<T, E>,
	{
		let key = storage_key(namespace, id);
		for attempt in 0..MAX_UPDATE_ATTEMPTS {
			let current = self.backend.get_bytes(&key).await?;
			let updated = apply(decode(&current)?)?;
			let new_bytes = encode(&updated)?;
			if self
				.backend
				.compare_and_swap(&key, &current, new_bytes)
				.await?
			{
				return Ok(updated);
			}
			tracing::debug!(key = %key, attempt, "Compare-and-swap lost, retrying");
		}
		Err(StorageError::Conflict(key).into())
	}

	/// Lists and decodes every value in a namespace.
	///
	/// Entries that vanish or fail to decode are skipped with a warning.
	pub async fn list<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		let ids = self.backend.list_ids(namespace).await?;
		let mut values = Vec::with_capacity(ids.len());
		for id in ids {
			match self.retrieve::<T>(namespace, &id).await {
				Ok(value) => values.push(value),
				Err(StorageError::NotFound) => continue,
				Err(e) => {
					tracing::warn!(namespace, id = %id, error = %e, "Skipping unreadable entry");
				},
			}
		}
		Ok(values)
	}
}
