//! Storage trait definitions for serialized client registrations.
//!
//! Backends are plain namespaced key-value stores: every value lives under a
//! `(collection, key)` pair and is stored verbatim as a string. Callers own
//! serialization of whatever they put in.

use crate::errors::StorageError;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Trait for namespaced key-value backends
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve the value stored under `collection`/`key`, if any
    async fn get(&self, collection: &str, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any existing one
    async fn put(&self, collection: &str, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key succeeds.
    async fn del(&self, collection: &str, key: &str) -> Result<()>;
}
