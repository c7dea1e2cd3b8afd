//! CacheStore trait: the shared cache/queue service interface.
//!
//! Models the external network cache (key-value entries plus named
//! lists) the buffer runs against. List names are always passed in by
//! the caller; the buffer injects its own at construction, so several
//! engines can share one service without colliding.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Async interface to a shared key-value / list cache.
///
/// # Design Notes
///
/// - **TTL**: `set` accepts an optional time-to-live; `None` means the
///   entry lives until deleted.
/// - **Lists** are FIFO: `list_push` appends, `list_pop` removes the
///   front. `list_remove` deletes a value wherever it sits.
/// - Every method is a single bounded operation; no method blocks on
///   another caller's work.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get an entry's value.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set an entry, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Delete an entry. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Append a value to the back of a list.
    async fn list_push(&self, list: &str, value: &[u8]) -> Result<()>;

    /// Remove and return the front of a list.
    async fn list_pop(&self, list: &str) -> Result<Option<Vec<u8>>>;

    /// Return the front of a list without removing it.
    async fn list_peek(&self, list: &str) -> Result<Option<Vec<u8>>>;

    /// Whether the list contains the value.
    async fn list_contains(&self, list: &str, value: &[u8]) -> Result<bool>;

    /// Remove the first occurrence of the value; returns whether one was removed.
    async fn list_remove(&self, list: &str, value: &[u8]) -> Result<bool>;

    /// Number of values in the list.
    async fn list_len(&self, list: &str) -> Result<usize>;
}
