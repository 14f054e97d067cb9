//! Result cache collaborator
//!
//! The service only writes finished results; it never reads them back.

use async_trait::async_trait;
use mazepath_types::{Dimensions, Path, SessionId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// One finished job as handed to the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub session_id: SessionId,

    /// Components exactly as the caller sent them
    pub components: Vec<Value>,

    pub dimensions: Dimensions,

    /// One path per component, in input order
    pub paths: Vec<Path>,
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn store(&self, entry: CacheEntry) -> anyhow::Result<()>;
}

/// Discards every entry
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl ResultCache for NoopCache {
    async fn store(&self, _entry: CacheEntry) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Keeps the most recent entries in memory
#[derive(Debug)]
pub struct MemoryCache {
    capacity: usize,
    entries: Mutex<VecDeque<CacheEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn get(&self, session_id: &str) -> Option<CacheEntry> {
        self.entries
            .lock()
            .iter()
            .rev()
            .find(|e| e.session_id == session_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn store(&self, entry: CacheEntry) -> anyhow::Result<()> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }
}
