//! Local cache layer for the comanda service.
//!
//! This module provides abstractions for caching board data between backend
//! round-trips: the order list per branch, the per-branch order index, and
//! the persisted session context. Backends are pluggable; an in-memory
//! implementation serves tests and ephemeral deployments, a file-based one
//! survives restarts.

use async_trait::async_trait;
use comanda_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for cache backends.
///
/// Provides basic key-value operations with optional TTL support. Backends
/// that do not support expiration can ignore the TTL and report zero removed
/// entries from cleanup.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes with optional time-to-live.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries from storage (optional operation).
	/// Returns the number of entries removed.
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0) // Backends without TTL support have nothing to clean
	}
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples used by the service builder to
/// wire up whichever backend the configuration selects.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level cache service that provides typed operations.
///
/// Wraps a low-level backend and provides methods for storing and retrieving
/// typed data with automatic JSON serialization. Keys are namespaced
/// (`orders:42`, `branch_orders:7`, `session:current`).
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value with optional time-to-live.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let key = format!("{}:{}", namespace, id);
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes, ttl).await
	}

	/// Stores a serializable value without time-to-live.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let key = format!("{}:{}", namespace, id);
		let bytes = self.backend.get_bytes(&key).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		let key = format!("{}:{}", namespace, id);
		self.backend.delete(&key).await
	}

	/// Updates an existing value in storage.
	///
	/// Returns an error if the key doesn't exist, making it semantically
	/// different from store() which will create or overwrite.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = format!("{}:{}", namespace, id);

		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes, None).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		let key = format!("{}:{}", namespace, id);
		self.backend.exists(&key).await
	}

	/// Removes expired entries from storage.
	///
	/// Returns the number of entries that were removed. No-op for backends
	/// without TTL support.
	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryStorage;
	use super::*;
	use comanda_types::StorageKey;

	#[tokio::test]
	async fn typed_round_trip() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));

		let ids: Vec<u64> = vec![3, 5, 8];
		service
			.store(StorageKey::BranchOrders.as_str(), "7", &ids)
			.await
			.unwrap();

		let back: Vec<u64> = service
			.retrieve(StorageKey::BranchOrders.as_str(), "7")
			.await
			.unwrap();
		assert_eq!(back, ids);
	}

	#[tokio::test]
	async fn update_requires_existing_key() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));

		let result = service
			.update(StorageKey::Orders.as_str(), "42", &"anything")
			.await;
		assert!(matches!(result, Err(StorageError::NotFound)));

		service
			.store(StorageKey::Orders.as_str(), "42", &"first")
			.await
			.unwrap();
		service
			.update(StorageKey::Orders.as_str(), "42", &"second")
			.await
			.unwrap();
		let back: String = service
			.retrieve(StorageKey::Orders.as_str(), "42")
			.await
			.unwrap();
		assert_eq!(back, "second");
	}

	#[tokio::test]
	async fn namespaces_do_not_collide() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));

		service
			.store(StorageKey::Orders.as_str(), "1", &"order")
			.await
			.unwrap();
		assert!(!service
			.exists(StorageKey::BranchOrders.as_str(), "1")
			.await
			.unwrap());
	}
}
