//! Object storage for session media.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

pub mod cleanup;
mod local;
mod s3;
pub mod upload;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    Backend(String),
}

/// Bucket-like blob store addressed by `/`-separated keys
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any existing object, and return its public URL
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, StorageError>;

    /// Like `put`, but the body is read from the file at `path` instead of memory
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<String, StorageError>;

    /// Remove `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Every key that starts with `prefix`
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    fn public_url(&self, key: &str) -> String;
}

pub async fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::Local => {
            tracing::info!("Using local object store at {}", config.root);
            Arc::new(LocalObjectStore::new(&config.root, &config.public_base_url))
        }
        StorageBackend::S3 => {
            tracing::info!("Using S3 object store, bucket {}", config.bucket);
            Arc::new(S3ObjectStore::from_config(config).await)
        }
    };
    Ok(store)
}

/// Keys are relative, `/`-separated and never climb out of their root
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part == ".." || part == ".");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("morning-flow-1/thumbnail.jpg").is_ok());
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key("/abs/key").is_err());
        assert!(check_key("a/./b").is_err());
        assert!(check_key("").is_err());
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/media/", "a/b.jpg"), "http://h/media/a/b.jpg");
        assert_eq!(join_url("http://h/media", "a/b.jpg"), "http://h/media/a/b.jpg");
    }
}
