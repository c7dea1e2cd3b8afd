//! In-memory implementation of the CacheStore trait.
//!
//! Same semantics as the external cache service but process-local:
//! lazy TTL expiry, FIFO lists. Primarily for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::CacheStore;

/// In-memory cache. Thread-safe via RwLock; all data lost on drop.
pub struct MemoryCache {
    inner: RwLock<MemoryCacheInner>,
}

struct MemoryCacheInner {
    entries: HashMap<String, Entry>,
    lists: HashMap<String, VecDeque<Vec<u8>>>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

impl MemoryCache {
    /// Create a new empty in-memory cache.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryCacheInner {
                entries: HashMap::new(),
                lists: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        // Expired entries are removed on access rather than by a sweeper.
        let mut inner = self.inner.write().expect("cache lock poisoned");
        match inner.entries.get(key) {
            Some(entry) if entry.expired() => {
                inner.entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.entries.remove(key);
        Ok(())
    }

    async fn list_push(&self, list: &str, value: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner
            .lists
            .entry(list.to_string())
            .or_default()
            .push_back(value.to_vec());
        Ok(())
    }

    async fn list_pop(&self, list: &str) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        Ok(inner.lists.get_mut(list).and_then(VecDeque::pop_front))
    }

    async fn list_peek(&self, list: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().expect("cache lock poisoned");
        Ok(inner
            .lists
            .get(list)
            .and_then(|l| l.front())
            .cloned())
    }

    async fn list_contains(&self, list: &str, value: &[u8]) -> Result<bool> {
        let inner = self.inner.read().expect("cache lock poisoned");
        Ok(inner
            .lists
            .get(list)
            .is_some_and(|l| l.iter().any(|v| v == value)))
    }

    async fn list_remove(&self, list: &str, value: &[u8]) -> Result<bool> {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        if let Some(l) = inner.lists.get_mut(list) {
            if let Some(pos) = l.iter().position(|v| v == value) {
                l.remove(pos);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list_len(&self, list: &str) -> Result<usize> {
        let inner = self.inner.read().expect("cache lock poisoned");
        Ok(inner.lists.get(list).map_or(0, VecDeque::len))
    }
}
