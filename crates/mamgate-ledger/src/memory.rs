//! In-memory implementation of the LedgerClient trait.
//!
//! Primarily for testing. Behaves like an always-synced node with an
//! instantly consistent view, plus scripted broadcast failures to
//! exercise the buffering path.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use mamgate_core::{Address, Bundle, BundleHash, Transaction};

use crate::error::{LedgerError, Result};
use crate::traits::LedgerClient;

/// In-memory ledger. Thread-safe via RwLock; all data is lost on drop.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

struct MemoryLedgerInner {
    /// Transactions indexed by address.
    by_address: HashMap<Address, Vec<Transaction>>,

    /// Complete bundles indexed by hash.
    bundles: HashMap<BundleHash, Bundle>,

    /// Number of upcoming broadcasts that fail.
    failing_broadcasts: u32,
}

impl MemoryLedger {
    /// Create a new empty in-memory ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                by_address: HashMap::new(),
                bundles: HashMap::new(),
                failing_broadcasts: 0,
            }),
        }
    }

    /// Make the next `count` broadcasts fail.
    pub fn fail_broadcasts(&self, count: u32) {
        self.inner
            .write()
            .expect("ledger lock poisoned")
            .failing_broadcasts = count;
    }

    /// Number of bundles stored.
    pub fn bundle_count(&self) -> usize {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .bundles
            .len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn find_transactions(&self, address: &Address) -> Result<Vec<Transaction>> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        Ok(inner.by_address.get(address).cloned().unwrap_or_default())
    }

    async fn broadcast(&self, bundle: &Bundle) -> Result<()> {
        let mut inner = self.inner.write().expect("ledger lock poisoned");

        if inner.failing_broadcasts > 0 {
            inner.failing_broadcasts -= 1;
            return Err(LedgerError::Broadcast("node unavailable".into()));
        }

        let hash = bundle.hash();
        for tx in bundle.transactions() {
            inner
                .by_address
                .entry(tx.address)
                .or_default()
                .push(tx.clone());
        }
        inner.bundles.insert(hash, bundle.clone());
        tracing::debug!(bundle = %hash.to_hex(), "broadcast bundle");

        Ok(())
    }

    async fn get_bundle(&self, hash: &BundleHash) -> Result<Bundle> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        inner
            .bundles
            .get(hash)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(hash.to_hex()))
    }
}
