//! Filesystem key-value storage implementation
//!
//! Values are written to `<base>/<collection>/<key>.json`. This is the default
//! backend when a client store is built from a base path alone.
//!
//! Keys longer than [`MAX_KEY_LEN`] bytes would exceed the usual 255-byte file
//! name limit and are rejected with `StorageError::InvalidData`. Use a SQL
//! backend for issuers with very long URLs.

use crate::errors::StorageError;
use crate::storage::traits::{KeyValueStore, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Longest key that fits a 255-byte file name once `.json` is appended
pub const MAX_KEY_LEN: usize = 250;

/// Filesystem implementation of a key-value backend
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    /// Create a new file store rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Collection and key must each map to exactly one path segment
    fn validate_segment(kind: &str, segment: &str) -> Result<()> {
        if segment.is_empty()
            || segment == "."
            || segment == ".."
            || segment.contains('/')
            || segment.contains('\\')
        {
            return Err(StorageError::InvalidData(format!(
                "Invalid {} for file storage: {:?}",
                kind, segment
            )));
        }
        Ok(())
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        Self::validate_segment("collection", collection)?;
        Ok(self.base_path.join(collection))
    }

    fn entry_path(&self, collection: &str, key: &str) -> Result<PathBuf> {
        Self::validate_segment("key", key)?;
        if key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidData(format!(
                "Key of {} bytes exceeds the file storage limit of {} bytes",
                key.len(),
                MAX_KEY_LEN
            )));
        }
        Ok(self
            .collection_path(collection)?
            .join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(collection, key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn put(&self, collection: &str, key: &str, value: &str) -> Result<()> {
        let directory = self.collection_path(collection)?;
        let path = self.entry_path(collection, key)?;

        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            StorageError::Io(format!(
                "Failed to create {}: {}",
                directory.display(),
                e
            ))
        })?;

        tracing::debug!(path = %path.display(), "writing entry");
        tokio::fs::write(&path, value).await.map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    async fn del(&self, collection: &str, key: &str) -> Result<()> {
        let path = self.entry_path(collection, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
