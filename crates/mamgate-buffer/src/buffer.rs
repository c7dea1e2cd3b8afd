//! The reliable publish buffer.
//!
//! Four cache structures back the buffer, per request kind:
//!
//! 1. a pending list of UUIDs awaiting broadcast,
//! 2. UUID → serialized request entries,
//! 3. a done list of UUIDs whose request completed,
//! 4. UUID → result entries (the request entry rewritten on completion).
//!
//! `buffer` feeds 1 and 2; the retry daemon moves entries from 1/2 to
//! 3/4; `status` answers from list membership and consumes done
//! entries exactly once. Queue movement happens under a coordination
//! lock acquired non-blockingly, so status queries fail fast with
//! [`BufferError::LockBusy`] instead of stalling a front-end worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{BufferError, Result};
use crate::traits::CacheStore;

/// Names of the four queue lists, injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueNames {
    /// Pending plain-bundle requests.
    pub pending_txn: String,
    /// Completed plain-bundle requests.
    pub done_txn: String,
    /// Pending MAM requests.
    pub pending_mam: String,
    /// Completed MAM requests.
    pub done_mam: String,
}

impl QueueNames {
    /// Queue names under a common prefix, for running several buffers
    /// against one cache service.
    pub fn scoped(prefix: &str) -> Self {
        Self {
            pending_txn: format!("{prefix}:txn:pending"),
            done_txn: format!("{prefix}:txn:done"),
            pending_mam: format!("{prefix}:mam:pending"),
            done_mam: format!("{prefix}:mam:done"),
        }
    }
}

impl Default for QueueNames {
    fn default() -> Self {
        Self::scoped("mamgate")
    }
}

/// Which pipeline a buffered request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A plain bundle whose broadcast failed.
    Txn,
    /// A MAM send request awaiting protocol execution.
    Mam,
}

/// The derived status of a buffered request. Never stored; computed
/// from queue membership at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    /// No queue knows this UUID.
    NotExist,
    /// Still waiting in a pending queue.
    Unsent,
    /// Completed; the stored result, returned exactly once.
    Sent {
        /// Which pipeline completed it.
        kind: RequestKind,
        /// Serialized result (bundle for Txn, MAM response for Mam).
        content: Vec<u8>,
    },
}

/// The UUID-indexed buffer deferring publish requests.
///
/// Exclusively owns the pending/done queues: no other component may
/// mutate them.
pub struct PublishBuffer<C> {
    cache: Arc<C>,
    names: QueueNames,
    ttl: Option<Duration>,
    lock: RwLock<()>,
}

impl<C: CacheStore> PublishBuffer<C> {
    /// Create a buffer over the given cache service.
    pub fn new(cache: Arc<C>, names: QueueNames, ttl: Option<Duration>) -> Self {
        Self {
            cache,
            names,
            ttl,
            lock: RwLock::new(()),
        }
    }

    fn pending_list(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Txn => &self.names.pending_txn,
            RequestKind::Mam => &self.names.pending_mam,
        }
    }

    fn done_list(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Txn => &self.names.done_txn,
            RequestKind::Mam => &self.names.done_mam,
        }
    }

    /// Store a request under a fresh UUID and enqueue it as pending.
    pub async fn buffer(&self, kind: RequestKind, payload: &[u8]) -> Result<Uuid> {
        let uuid = Uuid::new_v4();
        let key = uuid.to_string();

        let _guard = self.lock.write().await;
        self.cache.set(&key, payload, self.ttl).await?;
        self.cache
            .list_push(self.pending_list(kind), key.as_bytes())
            .await?;

        tracing::debug!(%uuid, ?kind, "buffered publish request");
        Ok(uuid)
    }

    /// Answer "what happened to request `uuid`".
    ///
    /// `Sent` is a consuming read: the done entry is removed and a
    /// second query for the same UUID returns `NotExist`.
    pub async fn status(&self, uuid: &Uuid) -> Result<RequestStatus> {
        let key = uuid.to_string();

        let kind = {
            let _guard = self.lock.try_read().map_err(|_| BufferError::LockBusy)?;

            if self
                .cache
                .list_contains(&self.names.pending_txn, key.as_bytes())
                .await?
                || self
                    .cache
                    .list_contains(&self.names.pending_mam, key.as_bytes())
                    .await?
            {
                return Ok(RequestStatus::Unsent);
            }

            if self
                .cache
                .list_contains(&self.names.done_txn, key.as_bytes())
                .await?
            {
                RequestKind::Txn
            } else if self
                .cache
                .list_contains(&self.names.done_mam, key.as_bytes())
                .await?
            {
                RequestKind::Mam
            } else {
                return Ok(RequestStatus::NotExist);
            }
        };

        // Upgrade to exclusive access for the consuming read. The read
        // guard is released first; membership is re-checked in case a
        // concurrent query consumed the entry in between.
        let _guard = self.lock.try_write().map_err(|_| BufferError::LockBusy)?;
        if !self
            .cache
            .list_contains(self.done_list(kind), key.as_bytes())
            .await?
        {
            return Ok(RequestStatus::NotExist);
        }

        let content = self
            .cache
            .get(&key)
            .await?
            .ok_or_else(|| BufferError::MissingEntry(key.clone()))?;
        self.cache
            .list_remove(self.done_list(kind), key.as_bytes())
            .await?;
        self.cache.delete(&key).await?;

        Ok(RequestStatus::Sent { kind, content })
    }

    /// Number of pending requests of the given kind.
    pub async fn pending_len(&self, kind: RequestKind) -> Result<usize> {
        self.cache.list_len(self.pending_list(kind)).await
    }

    /// The UUID at the front of a pending queue, if any.
    pub async fn peek_pending(&self, kind: RequestKind) -> Result<Option<Uuid>> {
        match self.cache.list_peek(self.pending_list(kind)).await? {
            Some(bytes) => parse_uuid(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// The stored payload for a buffered request.
    pub async fn payload(&self, uuid: &Uuid) -> Result<Option<Vec<u8>>> {
        self.cache.get(&uuid.to_string()).await
    }

    /// Move a completed request to its done queue, storing `result`
    /// in place of the original payload.
    ///
    /// Fails fast with [`BufferError::LockBusy`] under contention; the
    /// daemon retries on its next tick.
    pub async fn complete(&self, kind: RequestKind, uuid: &Uuid, result: &[u8]) -> Result<()> {
        let key = uuid.to_string();

        let _guard = self.lock.try_write().map_err(|_| BufferError::LockBusy)?;
        self.cache.delete(&key).await?;
        self.cache.set(&key, result, self.ttl).await?;
        self.cache
            .list_remove(self.pending_list(kind), key.as_bytes())
            .await?;
        self.cache
            .list_push(self.done_list(kind), key.as_bytes())
            .await?;

        tracing::debug!(%uuid, ?kind, "moved request to done queue");
        Ok(())
    }

    /// Evict the oldest done entries beyond `capacity`; returns how
    /// many were evicted.
    pub async fn trim_done(&self, kind: RequestKind, capacity: usize) -> Result<usize> {
        let _guard = self.lock.try_write().map_err(|_| BufferError::LockBusy)?;

        let mut evicted = 0;
        while self.cache.list_len(self.done_list(kind)).await? > capacity {
            let Some(bytes) = self.cache.list_pop(self.done_list(kind)).await? else {
                break;
            };
            let uuid = parse_uuid(&bytes)?;
            self.cache.delete(&uuid.to_string()).await?;
            evicted += 1;
        }

        if evicted > 0 {
            tracing::debug!(?kind, evicted, "trimmed done queue");
        }
        Ok(evicted)
    }
}

fn parse_uuid(bytes: &[u8]) -> Result<Uuid> {
    let s = std::str::from_utf8(bytes)
        .map_err(|_| BufferError::CorruptEntry(format!("{} bytes", bytes.len())))?;
    Uuid::parse_str(s).map_err(|_| BufferError::CorruptEntry(s.to_string()))
}
