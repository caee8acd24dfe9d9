//! Storage abstraction layer
//!
//! Uploads are addressed by generated keys; client-supplied names never
//! reach the backend.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

pub mod local;

/// Storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read object from storage
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write object to storage, replacing any previous content
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Delete object from storage
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if object exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// List objects with prefix
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Where the backend keeps its objects, reported by the readiness check
    fn location(&self) -> String;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root_path: PathBuf,
}

/// Create storage backend from config
pub fn create_storage(config: StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend = local::LocalStorage::new(config.root_path)?;
    Ok(Arc::new(backend))
}
