//! File-based storage backend.
//!
//! Each entry is one file `<storage_path>/<namespace>/<id>.bin` made of a
//! fixed 64-byte header followed by the value. Writes go to a temporary file
//! that is renamed into place. Every mutation runs while holding an exclusive
//! `fs2` lock on `<storage_path>/.lock`, which makes insert-if-absent and
//! compare-and-swap atomic across tasks and processes sharing the directory.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use relay_types::{
	current_timestamp, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	ValidationError,
};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[allow(clippy::doc_nested_refdefs)]
/// Fixed-size file header.
///
/// Binary layout (64 bytes total):
/// - [0-3]: Magic bytes "GRLY"
/// - [4-5]: Version (u16, little-endian)
/// - [6-13]: Write timestamp (u64, little-endian, Unix seconds)
/// - [14-63]: Reserved
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileHeader {
	version: u16,
	written_at: u64,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"GRLY";
	const VERSION: u16 = 1;
	const SIZE: usize = 64;

	fn now() -> Self {
		Self {
			version: Self::VERSION,
			written_at: current_timestamp(),
		}
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.written_at.to_le_bytes());
		bytes
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}
		if &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized file format".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		let mut written = [0u8; 8];
		written.copy_from_slice(&bytes[6..14]);

		Ok(Self {
			version,
			written_at: u64::from_le_bytes(written),
		})
	}
}

fn backend_err(e: impl std::fmt::Display) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// Replaces path separators so an id maps to a single file name.
fn sanitize(segment: &str) -> String {
	segment.replace(['/', '\\', ':'], "_")
}

/// Storage rooted at a directory on the local filesystem.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn file_path(base: &Path, key: &str) -> PathBuf {
		match key.split_once(':') {
			Some((namespace, id)) => base
				.join(sanitize(namespace))
				.join(format!("{}.bin", sanitize(id))),
			None => base.join(format!("{}.bin", sanitize(key))),
		}
	}

	/// Runs a blocking closure with the directory lock held.
	async fn with_lock<T, F>(&self, op: F) -> Result<T, StorageError>
	where
		T: Send + 'static,
		F: FnOnce(&Path) -> Result<T, StorageError> + Send + 'static,
	{
		let base = self.base_path.clone();
		tokio::task::spawn_blocking(move || {
			fs::create_dir_all(&base).map_err(backend_err)?;
			let lock = OpenOptions::new()
				.create(true)
				.truncate(false)
				.write(true)
				.open(base.join(".lock"))
				.map_err(backend_err)?;
			lock.lock_exclusive().map_err(backend_err)?;
			let result = op(&base);
			let _ = FileExt::unlock(&lock);
			result
		})
		.await
		.map_err(backend_err)?
	}

	fn read_value(path: &Path) -> Result<Vec<u8>, StorageError> {
		let data = match fs::read(path) {
			Ok(data) => data,
			Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
			Err(e) => return Err(backend_err(e)),
		};
		FileHeader::deserialize(&data)?;
		Ok(data[FileHeader::SIZE..].to_vec())
	}

	fn write_value(path: &Path, value: &[u8]) -> Result<(), StorageError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).map_err(backend_err)?;
		}

		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&FileHeader::now().serialize());
		file_data.extend_from_slice(value);

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data).map_err(backend_err)?;
		File::open(&temp_path)
			.and_then(|f| f.sync_all())
			.map_err(backend_err)?;
		fs::rename(&temp_path, path).map_err(backend_err)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = Self::file_path(&self.base_path, key);
		tokio::task::spawn_blocking(move || Self::read_value(&path))
			.await
			.map_err(backend_err)?
	}

	async fn insert_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let key = key.to_string();
		self.with_lock(move |base| {
			let path = Self::file_path(base, &key);
			if path.exists() {
				return Err(StorageError::AlreadyExists(key));
			}
			Self::write_value(&path, &value)
		})
		.await
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: &[u8],
		new: Vec<u8>,
	) -> Result<bool, StorageError> {
		let key = key.to_string();
		let expected = expected.to_vec();
		self.with_lock(move |base| {
			let path = Self::file_path(base, &key);
			if Self::read_value(&path)? != expected {
				return Ok(false);
			}
			Self::write_value(&path, &new)?;
			Ok(true)
		})
		.await
	}

	async fn list_ids(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let dir = self.base_path.join(sanitize(namespace));
		tokio::task::spawn_blocking(move || {
			let entries = match fs::read_dir(&dir) {
				Ok(entries) => entries,
				Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
				Err(e) => return Err(backend_err(e)),
			};
			let mut ids = Vec::new();
			for entry in entries {
				let path = entry.map_err(backend_err)?.path();
				if path.extension() != Some(std::ffi::OsStr::new("bin")) {
					continue;
				}
				if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
					ids.push(stem.to_string());
				}
			}
			Ok(ids)
		})
		.await
		.map_err(backend_err)?
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if !s.trim().is_empty() => Ok(()),
					_ => Err("storage_path cannot be empty".to_string()),
				}
			})],
		)
		.validate(config)
	}
}

/// Creates a file storage backend.
///
/// Configuration parameters:
/// - `storage_path`: Base directory (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage");

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
