//! In-memory key-value storage implementation
//!
//! Each instance owns its own map, so independent stores can coexist in one
//! process. Suitable for development and testing.

use crate::errors::StorageError;
use crate::storage::traits::{KeyValueStore, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory implementation of a key-value backend
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all collections
    pub fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        Ok(entries
            .get(&(collection.to_string(), key.to_string()))
            .cloned())
    }

    async fn put(&self, collection: &str, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        entries.insert((collection.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn del(&self, collection: &str, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        entries.remove(&(collection.to_string(), key.to_string()));
        Ok(())
    }
}
