//! Durable warm-start persistence contract and implementations.
//!
//! The store is read once at process start and written after each successful
//! aggregation - never read synchronously on the hot path. Failures are
//! logged by the cache and never fatal.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::cache_model::PersistedEntry;
use crate::assets::CacheKey;
use crate::errors::StoreError;

/// Durable key-value persistence for cache entries.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<PersistedEntry>, StoreError>;

    async fn save(&self, entry: &PersistedEntry) -> Result<(), StoreError>;

    async fn remove(&self, key: &CacheKey) -> Result<(), StoreError>;
}

/// Store that persists nothing; used when warm start is disabled.
#[derive(Clone, Default)]
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn load_all(&self) -> Result<Vec<PersistedEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn save(&self, _entry: &PersistedEntry) -> Result<(), StoreError> {
        Ok(())
    }

    async fn remove(&self, _key: &CacheKey) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Single-document JSON store, keyed by the cache key's storage form.
///
/// Matches the extension-storage persistence contract: one small document,
/// replaced atomically (write to a temp file, then rename).
pub struct FileCacheStore {
    path: PathBuf,
    // Serializes the read-modify-write cycle between concurrent saves.
    write_lock: Mutex<()>,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_document(&self) -> Result<HashMap<String, PersistedEntry>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Read(e.to_string())),
        }
    }

    async fn write_document(
        &self,
        document: &HashMap<String, PersistedEntry>,
    ) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(document).map_err(|e| StoreError::Decode(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load_all(&self) -> Result<Vec<PersistedEntry>, StoreError> {
        let document = self.read_document().await?;
        Ok(document.into_values().collect())
    }

    async fn save(&self, entry: &PersistedEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(entry.key.storage_key(), entry.clone());
        self.write_document(&document).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        if document.remove(&key.storage_key()).is_some() {
            self.write_document(&document).await?;
        }
        Ok(())
    }
}
