//! The channel engine: publish and receive against one ledger client.
//!
//! Holds the only in-process mutable state the protocol needs: the
//! per-channel leaf cursors and the trusted channel set. Everything
//! else is reconstructed from the seed and the ledger on every call.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use mamgate_core::{Bundle, BundleHash, ChannelId};
use mamgate_ledger::LedgerClient;
use mamgate_mask::EncryptionKeySet;

use crate::error::{EngineError, Result};
use crate::packer::read_bundle;
use crate::publish::{PublishOutcome, PublishRequest, PublishSession};
use crate::resolver::DEFAULT_SEARCH_BOUND;

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on channel-id search and exhausted-channel restarts.
    pub chid_search_bound: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chid_search_bound: DEFAULT_SEARCH_BOUND,
        }
    }
}

/// One receive request: by channel id, by bundle hash, or both.
#[derive(Debug, Clone, Default)]
pub struct ReceiveRequest {
    /// Channel whose bundles to fetch (added to the trusted set).
    pub channel_id: Option<ChannelId>,
    /// A specific bundle to fetch instead of scanning an address.
    pub bundle_hash: Option<BundleHash>,
}

/// The result of a receive call.
#[derive(Debug, Clone)]
pub struct ReceiveOutcome {
    /// Decrypted payloads, in ledger order.
    pub payloads: Vec<Vec<u8>>,
    /// A successor channel discovered through an announcement during
    /// this call, if any.
    pub discovered_channel: Option<ChannelId>,
}

/// The MAM channel engine.
pub struct Engine<L> {
    ledger: Arc<L>,
    config: EngineConfig,
    cursors: Mutex<HashMap<ChannelId, u32>>,
    trusted: Mutex<BTreeSet<ChannelId>>,
}

impl<L: LedgerClient> Engine<L> {
    /// Create an engine over the given ledger client.
    pub fn new(ledger: Arc<L>, config: EngineConfig) -> Self {
        Self {
            ledger,
            config,
            cursors: Mutex::new(HashMap::new()),
            trusted: Mutex::new(BTreeSet::new()),
        }
    }

    /// The ledger client this engine runs against.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Snapshot of the trusted channel set.
    pub async fn trusted_channels(&self) -> BTreeSet<ChannelId> {
        self.trusted.lock().await.clone()
    }

    /// Replace the trusted channel set (snapshot restore).
    pub async fn restore_trusted(&self, channels: BTreeSet<ChannelId>) {
        *self.trusted.lock().await = channels;
    }

    /// Add a trusted channel.
    pub async fn trust_channel(&self, channel: ChannelId) {
        self.trusted.lock().await.insert(channel);
    }

    /// Execute the publish protocol for one request.
    pub async fn publish(&self, req: &PublishRequest) -> Result<PublishOutcome> {
        PublishSession::new(
            self.ledger.as_ref(),
            self.config.chid_search_bound,
            &self.cursors,
        )
        .run(req)
        .await
    }

    /// Fetch and decode messages for a receive request.
    ///
    /// Reads are idempotent and never buffered. A requested channel id
    /// is added to the trusted set; successors discovered through
    /// announcements are reported and retained.
    pub async fn receive(
        &self,
        req: &ReceiveRequest,
        keys: &EncryptionKeySet,
    ) -> Result<ReceiveOutcome> {
        // Work on a local copy so no lock is held across ledger calls.
        let mut working = self.trusted.lock().await.clone();
        if let Some(channel) = req.channel_id {
            working.insert(channel);
        }
        let before = working.clone();

        let bundles = match (req.bundle_hash, req.channel_id) {
            (Some(hash), _) => vec![self.ledger.get_bundle(&hash).await?],
            (None, Some(channel)) => self.bundles_by_address(&channel).await?,
            (None, None) => return Err(EngineError::EmptyReceiveRequest),
        };

        let mut payloads = Vec::new();
        for bundle in &bundles {
            // Announcement- and header-only bundles read as None; that
            // is not an error.
            if let Some(payload) = read_bundle(bundle, keys, &mut working)? {
                payloads.push(payload);
            }
        }

        let discovered = working.difference(&before).next().copied();

        let mut trusted = self.trusted.lock().await;
        trusted.extend(working);

        Ok(ReceiveOutcome {
            payloads,
            discovered_channel: discovered,
        })
    }

    /// All distinct bundles addressed to a channel, in first-seen order.
    async fn bundles_by_address(&self, channel: &ChannelId) -> Result<Vec<Bundle>> {
        let transactions = self.ledger.find_transactions(&channel.address()).await?;

        let mut hashes: Vec<BundleHash> = Vec::new();
        for tx in &transactions {
            if !hashes.contains(&tx.bundle) {
                hashes.push(tx.bundle);
            }
        }

        let mut bundles = Vec::with_capacity(hashes.len());
        for hash in &hashes {
            bundles.push(self.ledger.get_bundle(hash).await?);
        }
        Ok(bundles)
    }
}
