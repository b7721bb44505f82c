//! Persistent, TTL-bounded mapping from call identity to processed time.
//!
//! Both acquisition paths gate through one store instance, so the
//! check-then-mark must be a single critical section: once either path marks
//! a key, the other must see it before its own copy of the call could be
//! queued. Entries older than the retention window are evicted lazily on
//! the next write.

pub mod config;
pub mod storage;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use toolbridge_core_types::{CallKey, ConversationId};

pub use crate::config::StoreConfig;
pub use crate::storage::{DedupMap, JsonFileStorage, MemoryStorage, StoragePort};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub struct DedupStore {
    storage: Arc<dyn StoragePort>,
    conversation: ConversationId,
    config: StoreConfig,
    // Serializes check-then-mark across the two acquisition paths.
    write_lock: Mutex<()>,
}

impl DedupStore {
    pub fn new(
        storage: Arc<dyn StoragePort>,
        conversation: ConversationId,
        config: StoreConfig,
    ) -> Self {
        Self {
            storage,
            conversation,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    pub async fn is_processed(&self, key: &CallKey) -> Result<bool, StoreError> {
        let map = self.storage.load().await?;
        Ok(map
            .get(&self.conversation.0)
            .is_some_and(|keys| keys.contains_key(&key.0)))
    }

    pub async fn mark_processed(&self, key: &CallKey) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.mark_locked(key).await
    }

    /// Atomic gate used by the detection pipeline: returns `true` exactly
    /// once per key per retention window, marking it in the same critical
    /// section.
    pub async fn check_and_mark(&self, key: &CallKey) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let map = self.storage.load().await?;
        if map
            .get(&self.conversation.0)
            .is_some_and(|keys| keys.contains_key(&key.0))
        {
            return Ok(false);
        }
        self.mark_locked(key).await?;
        Ok(true)
    }

    async fn mark_locked(&self, key: &CallKey) -> Result<(), StoreError> {
        let mut map = self.storage.load().await?;
        let now = Utc::now().timestamp_millis();
        let evicted = evict_stale(&mut map, now, self.config.retention.as_millis() as i64);
        if evicted > 0 {
            debug!(evicted, "evicted stale dedup entries");
        }
        map.entry(self.conversation.0.clone())
            .or_default()
            .insert(key.0.clone(), now);
        self.storage.persist(&map).await
    }
}

fn evict_stale(map: &mut DedupMap, now: i64, retention_ms: i64) -> usize {
    let mut evicted = 0;
    map.retain(|_, keys| {
        keys.retain(|_, ts| {
            let keep = now - *ts <= retention_ms;
            if !keep {
                evicted += 1;
            }
            keep
        });
        !keys.is_empty()
    });
    evicted
}
