//! Issuer-keyed persistence for registered OIDC clients.
//!
//! Every record lives in one collection (`clients` unless configured otherwise)
//! under the percent-encoded issuer URL, so the key is safe to use as a file
//! name or database key. At most one record exists per issuer; writes replace.

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::{MultiRpError, Result};
use crate::oidc::types::RegisteredClient;
use crate::storage::{FileKeyValueStore, KeyValueStore};

/// Default collection holding client registrations
pub const COLLECTION_NAME: &str = "clients";

/// Store key for an issuer
pub fn encode_key(issuer: &str) -> String {
    urlencoding::encode(issuer).into_owned()
}

/// Client registration store backed by a pluggable key-value backend
#[derive(Clone)]
pub struct ClientStore {
    backend: Arc<dyn KeyValueStore>,
    collection_name: String,
}

impl ClientStore {
    /// Create a store over an injected backend
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            collection_name: COLLECTION_NAME.to_string(),
        }
    }

    /// Create a store using the file backend rooted at `path`
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileKeyValueStore::new(path)))
    }

    /// Use a collection other than [`COLLECTION_NAME`]
    pub fn with_collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Load the client registered with `issuer`, if any
    pub async fn get(&self, issuer: &str) -> Result<Option<RegisteredClient>> {
        if issuer.is_empty() {
            return Err(MultiRpError::InvalidArgument(
                "cannot look up a client without an issuer".to_string(),
            ));
        }

        let key = encode_key(issuer);
        let data = self.backend.get(&self.collection_name, &key).await?;

        match data {
            Some(data) => Ok(Some(RegisteredClient::from_serialized(&data)?)),
            None => Ok(None),
        }
    }

    /// Store `client` under its issuer, replacing any previous record
    pub async fn put<'a>(&self, client: &'a RegisteredClient) -> Result<&'a RegisteredClient> {
        if client.issuer.is_empty() {
            return Err(MultiRpError::InvalidArgument(
                "cannot store a client without an issuer".to_string(),
            ));
        }

        let key = encode_key(&client.issuer);
        let data = client.serialize()?;
        self.backend.put(&self.collection_name, &key, &data).await?;

        tracing::debug!(
            issuer = %client.issuer,
            collection = %self.collection_name,
            %key,
            "client stored"
        );
        Ok(client)
    }

    /// Whether a record is stored for `issuer`. The record is not parsed.
    pub async fn contains(&self, issuer: &str) -> Result<bool> {
        if issuer.is_empty() {
            return Err(MultiRpError::InvalidArgument(
                "cannot look up a client without an issuer".to_string(),
            ));
        }

        let key = encode_key(issuer);
        Ok(self.backend.get(&self.collection_name, &key).await?.is_some())
    }

    /// Remove the record for `client`'s issuer. Removing a missing record succeeds.
    pub async fn del(&self, client: &RegisteredClient) -> Result<()> {
        self.del_issuer(&client.issuer).await
    }

    /// Remove the record stored for `issuer` without reading it, so records
    /// that no longer parse can be cleared too
    pub async fn del_issuer(&self, issuer: &str) -> Result<()> {
        if issuer.is_empty() {
            return Err(MultiRpError::InvalidArgument(
                "cannot delete a client without an issuer".to_string(),
            ));
        }

        let key = encode_key(issuer);
        self.backend.del(&self.collection_name, &key).await?;
        tracing::debug!(%issuer, collection = %self.collection_name, %key, "client removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use crate::oidc::types::tests::sample_client;
    use crate::storage::MemoryKeyValueStore;

    #[test]
    fn test_encode_key() {
        assert_eq!(
            encode_key("https://issuer.example"),
            "https%3A%2F%2Fissuer.example"
        );
        assert_ne!(
            encode_key("https://issuer.example/a/b"),
            encode_key("https://issuer.example/a%2Fb")
        );
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = ClientStore::new(Arc::new(MemoryKeyValueStore::new()));
        let client = sample_client("https://issuer.example");

        let stored = store.put(&client).await.unwrap();
        assert_eq!(stored, &client);

        let retrieved = store.get("https://issuer.example").await.unwrap();
        assert_eq!(retrieved, Some(client));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = ClientStore::new(Arc::new(MemoryKeyValueStore::new()));
        assert!(store.get("https://never.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_del_then_get() {
        let store = ClientStore::new(Arc::new(MemoryKeyValueStore::new()));
        let client = sample_client("https://issuer.example");

        store.put(&client).await.unwrap();
        store.del(&client).await.unwrap();
        assert!(store.get("https://issuer.example").await.unwrap().is_none());

        // Deleting an absent record is not an error
        store.del(&client).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = ClientStore::new(Arc::new(MemoryKeyValueStore::new()));
        let first = sample_client("https://issuer.example");
        let mut second = sample_client("https://issuer.example");
        second.registration.client_id = "client-456".to_string();

        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        let retrieved = store.get("https://issuer.example").await.unwrap().unwrap();
        assert_eq!(retrieved.client_id(), "client-456");
    }

    #[tokio::test]
    async fn test_uses_encoded_issuer_key() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = ClientStore::new(backend.clone()).with_collection_name("rp-clients");
        let client = sample_client("https://issuer.example");

        store.put(&client).await.unwrap();

        let raw = backend
            .get("rp-clients", "https%3A%2F%2Fissuer.example")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(RegisteredClient::from_serialized(&raw).unwrap(), client);
        assert!(
            backend
                .get(COLLECTION_NAME, "https%3A%2F%2Fissuer.example")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_missing_issuer_is_invalid_argument() {
        let store = ClientStore::new(Arc::new(MemoryKeyValueStore::new()));
        let client = sample_client("");

        assert!(matches!(
            store.put(&client).await,
            Err(MultiRpError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.del(&client).await,
            Err(MultiRpError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.get("").await,
            Err(MultiRpError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.del_issuer("").await,
            Err(MultiRpError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.contains("").await,
            Err(MultiRpError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_storage_error() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend
            .put(COLLECTION_NAME, "https%3A%2F%2Fissuer.example", "{broken")
            .await
            .unwrap();
        let store = ClientStore::new(backend);

        let result = store.get("https://issuer.example").await;
        assert!(matches!(
            result,
            Err(MultiRpError::Storage(StorageError::SerializationFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_del_issuer_clears_unreadable_record() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend
            .put(COLLECTION_NAME, &encode_key("https://issuer.example"), "{\"old\":1}")
            .await
            .unwrap();
        let store = ClientStore::new(backend.clone());

        assert!(store.get("https://issuer.example").await.is_err());
        assert!(store.contains("https://issuer.example").await.unwrap());

        store.del_issuer("https://issuer.example").await.unwrap();

        assert!(backend.is_empty().unwrap());
        assert!(!store.contains("https://issuer.example").await.unwrap());
        assert!(store.get("https://issuer.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_path_uses_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::from_path(dir.path());
        let client = sample_client("https://issuer.example");

        store.put(&client).await.unwrap();
        assert!(
            dir.path()
                .join(COLLECTION_NAME)
                .join("https%3A%2F%2Fissuer.example.json")
                .exists()
        );

        // A second store over the same path sees the record
        let reopened = ClientStore::from_path(dir.path());
        assert_eq!(
            reopened.get("https://issuer.example").await.unwrap(),
            Some(client)
        );
    }
}
