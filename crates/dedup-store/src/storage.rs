use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::StoreError;

/// Persisted shape: conversation → call key → processed timestamp (unix ms).
pub type DedupMap = HashMap<String, HashMap<String, i64>>;

/// Durable key-value area the store writes through. Implementations must
/// complete the write before returning; the dedup contract depends on a
/// mark being visible to the other acquisition path immediately.
#[async_trait]
pub trait StoragePort: Send + Sync {
    async fn load(&self) -> Result<DedupMap, StoreError>;
    async fn persist(&self, map: &DedupMap) -> Result<(), StoreError>;
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<DedupMap>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn load(&self) -> Result<DedupMap, StoreError> {
        Ok(self.inner.lock().await.clone())
    }

    async fn persist(&self, map: &DedupMap) -> Result<(), StoreError> {
        *self.inner.lock().await = map.clone();
        Ok(())
    }
}

/// JSON file storage. Writes are synced to disk before returning so the map
/// survives navigation and reloads within the same origin.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StoragePort for JsonFileStorage {
    async fn load(&self) -> Result<DedupMap, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(DedupMap::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, map: &DedupMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(map)?;
        let mut file = tokio::fs::File::create(&self.path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        Ok(())
    }
}
