//! In-memory storage backend.
//!
//! Values live in a `HashMap` behind one `RwLock`; compare-and-swap and
//! insert-if-absent run under a single write guard. Nothing survives a
//! restart.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use relay_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn insert_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		if store.contains_key(key) {
			return Err(StorageError::AlreadyExists(key.to_string()));
		}
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: &[u8],
		new: Vec<u8>,
	) -> Result<bool, StorageError> {
		let mut store = self.store.write().await;
		let current = store.get_mut(key).ok_or(StorageError::NotFound)?;
		if current.as_slice() != expected {
			return Ok(false);
		}
		*current = new;
		Ok(true)
	}

	async fn list_ids(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}:", namespace);
		let store = self.store.read().await;
		Ok(store
			.keys()
			.filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
			.collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Memory storage accepts an empty table.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();
		let key = "authorizations:abc";

		storage.insert_bytes(key, b"one".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"one");
		assert!(matches!(
			storage.insert_bytes(key, b"two".to_vec()).await,
			Err(StorageError::AlreadyExists(_))
		));
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"one");
		assert!(matches!(
			storage.get_bytes("authorizations:missing").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_compare_and_swap() {
		let storage = MemoryStorage::new();
		let key = "authorizations:abc";
		storage.insert_bytes(key, b"v1".to_vec()).await.unwrap();

		assert!(!storage
			.compare_and_swap(key, b"stale", b"v2".to_vec())
			.await
			.unwrap());
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"v1");

		assert!(storage
			.compare_and_swap(key, b"v1", b"v2".to_vec())
			.await
			.unwrap());
		assert_eq!(storage.get_bytes(key).await.unwrap(), b"v2");

		assert!(matches!(
			storage.compare_and_swap("x:y", b"v1", vec![]).await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_list_ids_by_namespace() {
		let storage = MemoryStorage::new();
		storage.insert_bytes("authorizations:a", vec![]).await.unwrap();
		storage.insert_bytes("nonces:1:0xab", vec![]).await.unwrap();

		assert_eq!(
			storage.list_ids("authorizations").await.unwrap(),
			vec!["a".to_string()]
		);
		assert_eq!(
			storage.list_ids("nonces").await.unwrap(),
			vec!["1:0xab".to_string()]
		);
	}

	#[test]
	fn test_schema_accepts_empty_table() {
		let config = toml::Value::Table(toml::map::Map::new());
		assert!(MemoryStorageSchema.validate(&config).is_ok());
	}
}
