//! Trait-based key-value storage with in-memory, file, SQLite, and PostgreSQL backends.

pub mod file;
pub mod inmemory;
pub mod traits;

// Feature-gated storage implementations
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-export commonly used types and traits
pub use file::FileKeyValueStore;
pub use inmemory::MemoryKeyValueStore;
pub use traits::*;

use crate::errors::StorageError;
use std::path::PathBuf;
use std::sync::Arc;

/// Storage backend configuration and factory
#[derive(Clone, Debug, PartialEq)]
pub enum StorageBackend {
    Memory,
    File(PathBuf), // Base directory
    #[cfg(feature = "sqlite")]
    Sqlite(String), // Connection string/path
    #[cfg(feature = "postgres")]
    Postgres(String), // Connection string
}

/// Create a storage backend based on configuration
pub async fn create_storage_backend(
    backend: StorageBackend,
) -> std::result::Result<Arc<dyn KeyValueStore>, StorageError> {
    match backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryKeyValueStore::new())),
        StorageBackend::File(path) => Ok(Arc::new(FileKeyValueStore::new(path))),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite(database_url) => {
            let pool = sqlx::SqlitePool::connect(&database_url)
                .await
                .map_err(|e| {
                    StorageError::ConnectionFailed(format!("SQLite connection failed: {}", e))
                })?;

            let storage = sqlite::SqliteKeyValueStore::new(pool);

            // Run migrations
            storage.migrate().await?;

            Ok(Arc::new(storage))
        }
        #[cfg(feature = "postgres")]
        StorageBackend::Postgres(database_url) => {
            let pool = sqlx::postgres::PgPool::connect(&database_url)
                .await
                .map_err(|e| {
                    StorageError::ConnectionFailed(format!("PostgreSQL connection failed: {}", e))
                })?;

            let storage = postgres::PostgresKeyValueStore::new(pool);

            // Run migrations
            storage.migrate().await?;

            Ok(Arc::new(storage))
        }
    }
}

/// Parse storage backend from configuration strings
///
/// `storage_path` is the base directory for the file backend; `database_url`
/// is the connection string for the SQL backends.
#[cfg_attr(
    not(any(feature = "sqlite", feature = "postgres")),
    allow(unused_variables)
)]
pub fn parse_storage_backend(
    backend_name: &str,
    storage_path: Option<&str>,
    database_url: Option<&str>,
) -> std::result::Result<StorageBackend, StorageError> {
    match backend_name {
        "memory" => Ok(StorageBackend::Memory),
        "file" => {
            let path = storage_path.unwrap_or("./data");
            Ok(StorageBackend::File(PathBuf::from(path)))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let url = database_url.unwrap_or("sqlite:multi-rp.db?mode=rwc");
            Ok(StorageBackend::Sqlite(url.to_string()))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = database_url.ok_or_else(|| {
                StorageError::InvalidData("DATABASE_URL required for postgres backend".to_string())
            })?;
            Ok(StorageBackend::Postgres(url.to_string()))
        }
        _ => Err(StorageError::InvalidData(format!(
            "Unknown storage backend: {}",
            backend_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_backend() {
        assert_eq!(
            parse_storage_backend("memory", None, None).unwrap(),
            StorageBackend::Memory
        );
        assert_eq!(
            parse_storage_backend("file", Some("/var/lib/multi-rp"), None).unwrap(),
            StorageBackend::File(PathBuf::from("/var/lib/multi-rp"))
        );
        assert_eq!(
            parse_storage_backend("file", None, None).unwrap(),
            StorageBackend::File(PathBuf::from("./data"))
        );
        assert!(matches!(
            parse_storage_backend("redis", None, None),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_create_memory_backend() {
        let backend = create_storage_backend(StorageBackend::Memory).await.unwrap();
        backend.put("clients", "k", "v").await.unwrap();
        assert_eq!(backend.get("clients", "k").await.unwrap().as_deref(), Some("v"));
    }
}
