//! LedgerClient trait: the capability surface the engine consumes.
//!
//! Transaction construction, proof of work, tip selection and broadcast
//! live behind this trait; the engine only sees finished transactions
//! and bundles. Implementations must be thread-safe.

use async_trait::async_trait;

use mamgate_core::{Address, Bundle, BundleHash, Transaction};

use crate::error::Result;

/// Async interface to a ledger node.
///
/// # Design Notes
///
/// - **Single-shot calls**: every method is one bounded attempt; retry
///   policy belongs to the caller (the retry daemon for publishes).
/// - **Reads are idempotent**: `find_transactions` and `get_bundle` may
///   be repeated freely and never mutate node state.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// All transactions addressed to `address`, in ledger order.
    async fn find_transactions(&self, address: &Address) -> Result<Vec<Transaction>>;

    /// Broadcast a finalized bundle.
    async fn broadcast(&self, bundle: &Bundle) -> Result<()>;

    /// Fetch a bundle by its hash.
    async fn get_bundle(&self, hash: &BundleHash) -> Result<Bundle>;
}
