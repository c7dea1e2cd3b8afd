//! The publish protocol.
//!
//! Orchestrates resolver and packer into the full send algorithm:
//! resolve the channel, scan its used leaves, select a free leaf,
//! pack and broadcast, announcing a successor channel when the last
//! leaf goes out, and restarting on the next channel when a scan finds
//! the current one raced to exhaustion.

use std::collections::{BTreeSet, HashMap, HashSet};

use tokio::sync::Mutex;

use mamgate_core::{Bundle, BundleHash, Channel, ChannelId, MessageId, Seed};
use mamgate_ledger::LedgerClient;
use mamgate_mask::EncryptionKeySet;

use crate::error::{EngineError, Result};
use crate::packer::BundleWriter;
use crate::resolver::ChannelResolver;

/// Protocol phase, for tracing and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    /// Resolving the starting channel.
    ResolvingChid,
    /// Scanning the ledger for consumed leaves.
    ScanningUsedLeaves,
    /// Searching for a non-colliding message id.
    SelectingLeaf,
    /// Emitting the successor announcement.
    Announcing,
    /// Writing the payload packet.
    Packing,
    /// Bundle(s) broadcast.
    Sent,
}

/// One publish request.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Seed the channel chain derives from.
    pub seed: Seed,
    /// Merkle depth of the channels walked.
    pub depth: u8,
    /// Desired starting channel, if the caller pins one.
    pub channel_id: Option<ChannelId>,
    /// The payload to send.
    pub payload: Vec<u8>,
    /// Keys restricting who can decrypt.
    pub keys: EncryptionKeySet,
}

/// The announcement emitted alongside an exhausting publish.
#[derive(Debug, Clone)]
pub struct AnnouncementOutcome {
    /// The successor channel's id.
    pub next_channel: ChannelId,
    /// The broadcast announcement bundle.
    pub bundle: Bundle,
    /// Its hash.
    pub bundle_hash: BundleHash,
}

/// The result of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// The channel the packet went out on.
    pub channel_id: ChannelId,
    /// The leaf consumed by the packet.
    pub leaf: u32,
    /// The packet's message id (ledger tag).
    pub message_id: MessageId,
    /// The broadcast packet bundle.
    pub bundle: Bundle,
    /// Its hash.
    pub bundle_hash: BundleHash,
    /// Present when this publish consumed the channel's last leaf.
    pub announcement: Option<AnnouncementOutcome>,
}

/// One run of the publish state machine.
pub struct PublishSession<'a, L: ?Sized> {
    ledger: &'a L,
    search_bound: u64,
    cursors: &'a Mutex<HashMap<ChannelId, u32>>,
    state: PublishState,
}

impl<'a, L: LedgerClient + ?Sized> PublishSession<'a, L> {
    /// Create a session sharing the engine's per-channel leaf cursors.
    pub fn new(
        ledger: &'a L,
        search_bound: u64,
        cursors: &'a Mutex<HashMap<ChannelId, u32>>,
    ) -> Self {
        Self {
            ledger,
            search_bound,
            cursors,
            state: PublishState::ResolvingChid,
        }
    }

    /// Execute the protocol for one request.
    ///
    /// Cancel-safe up to the broadcast await: dropping the future before
    /// then leaves no trace on the ledger.
    pub async fn run(mut self, req: &PublishRequest) -> Result<PublishOutcome> {
        let resolver = ChannelResolver::new(self.ledger, self.search_bound);

        self.transition(PublishState::ResolvingChid);
        let mut channel = resolver
            .resolve_start(&req.seed, req.depth, req.channel_id.as_ref())
            .await?;

        // A raced-out channel restarts the walk on its successor; the
        // search bound also caps these restarts.
        for _ in 0..self.search_bound {
            self.transition(PublishState::ScanningUsedLeaves);
            let used = resolver.used_leaves(&channel).await?;
            let remaining = channel.capacity() - used.len() as u64;

            if remaining == 0 {
                tracing::debug!(channel = %channel.id, "channel exhausted, advancing to successor");
                channel = resolver.successor(&req.seed, &channel)?;
                continue;
            }

            self.transition(PublishState::SelectingLeaf);
            let mut writer = BundleWriter::derive(&req.seed, &channel)?;
            let (leaf, bundle, message_id) =
                self.select_leaf(&mut writer, &channel, &used, &req.keys).await?;

            self.transition(PublishState::Packing);
            let bundle = writer.write_packet(bundle, message_id, &req.payload)?;
            let bundle_hash = bundle.hash();
            self.ledger.broadcast(&bundle).await?;

            let mut outcome = PublishOutcome {
                channel_id: channel.id,
                leaf,
                message_id,
                bundle,
                bundle_hash,
                announcement: None,
            };

            // The exhausting publish also hands trust to the successor.
            if remaining == 1 {
                self.transition(PublishState::Announcing);
                let next = resolver.successor(&req.seed, &channel)?;
                tracing::debug!(channel = %channel.id, next = %next.id, "publishing successor announcement");

                let ann_bundle = writer.write_announcement(leaf, &req.keys, &next)?;
                let ann_hash = ann_bundle.hash();
                self.ledger.broadcast(&ann_bundle).await?;

                outcome.announcement = Some(AnnouncementOutcome {
                    next_channel: next.id,
                    bundle: ann_bundle,
                    bundle_hash: ann_hash,
                });
            }

            self.transition(PublishState::Sent);
            return Ok(outcome);
        }

        Err(EngineError::ExceededSearchBound {
            bound: self.search_bound,
        })
    }

    /// Find a leaf whose message id does not collide with an observed tag.
    ///
    /// Starts at the engine's cursor for this channel; a found leaf is
    /// consumed (the cursor advances past it).
    async fn select_leaf(
        &self,
        writer: &mut BundleWriter,
        channel: &Channel,
        used: &BTreeSet<u32>,
        keys: &EncryptionKeySet,
    ) -> Result<(u32, Bundle, MessageId)> {
        let capacity = channel.capacity();
        let used_ids: HashSet<MessageId> = used
            .iter()
            .map(|leaf| channel.message_id(*leaf))
            .collect();

        let cursor = {
            let cursors = self.cursors.lock().await;
            cursors.get(&channel.id).copied().unwrap_or(0)
        };

        for attempt in 0..capacity {
            let leaf = ((cursor as u64 + attempt) % capacity) as u32;
            let (bundle, message_id) = writer.write_header(leaf, keys)?;

            if used_ids.contains(&message_id) {
                continue;
            }

            tracing::debug!(channel = %channel.id, leaf, "found available message id");
            let mut cursors = self.cursors.lock().await;
            cursors.insert(channel.id, leaf + 1);
            return Ok((leaf, bundle, message_id));
        }

        Err(EngineError::AllKeysUsed)
    }

    fn transition(&mut self, next: PublishState) {
        tracing::trace!(from = ?self.state, to = ?next, "publish state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mamgate_ledger::MemoryLedger;

    const SEED: Seed = Seed::from_bytes([0x42; 32]);

    fn request(depth: u8, payload: &[u8]) -> PublishRequest {
        PublishRequest {
            seed: SEED,
            depth,
            channel_id: None,
            payload: payload.to_vec(),
            keys: EncryptionKeySet::new(),
        }
    }

    struct Fixture {
        ledger: MemoryLedger,
        cursors: Mutex<HashMap<ChannelId, u32>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ledger: MemoryLedger::new(),
                cursors: Mutex::new(HashMap::new()),
            }
        }

        async fn publish(&self, req: &PublishRequest) -> Result<PublishOutcome> {
            PublishSession::new(&self.ledger, 100, &self.cursors)
                .run(req)
                .await
        }
    }

    #[tokio::test]
    async fn test_first_publish_uses_leaf_zero() {
        let fx = Fixture::new();
        let outcome = fx.publish(&request(2, b"hello")).await.unwrap();

        assert_eq!(outcome.leaf, 0);
        assert!(outcome.announcement.is_none());
    }

    #[tokio::test]
    async fn test_sequential_publishes_advance_leaves() {
        let fx = Fixture::new();
        let req = request(2, b"msg");

        let first = fx.publish(&req).await.unwrap();
        let second = fx.publish(&req).await.unwrap();
        let third = fx.publish(&req).await.unwrap();

        assert_eq!(first.channel_id, second.channel_id);
        let leaves = [first.leaf, second.leaf, third.leaf];
        assert_eq!(leaves, [0, 1, 2]);
    }

    #[tokio::test]
    async fn test_depth_one_exhaustion_handoff() {
        let fx = Fixture::new();
        let req = request(1, b"hello");

        // Capacity 2: the first publish keeps the channel open.
        let first = fx.publish(&req).await.unwrap();
        assert!(first.announcement.is_none());

        // The second consumes the last leaf and must announce.
        let second = fx.publish(&req).await.unwrap();
        assert_eq!(second.channel_id, first.channel_id);
        let announcement = second.announcement.expect("second publish must announce");
        assert_ne!(announcement.next_channel, second.channel_id);

        // The third resolves a brand-new channel before succeeding.
        let third = fx.publish(&req).await.unwrap();
        assert_eq!(third.channel_id, announcement.next_channel);
        assert_eq!(third.leaf, 0);
    }

    #[tokio::test]
    async fn test_exhaustion_after_capacity_minus_one_packets() {
        let fx = Fixture::new();
        let req = request(2, b"x");

        // Depth 2: exactly 2^2 - 1 publishes without an announcement...
        for _ in 0..3 {
            let outcome = fx.publish(&req).await.unwrap();
            assert!(outcome.announcement.is_none());
        }
        // ...and the 2^2-th also emits one.
        let last = fx.publish(&req).await.unwrap();
        assert!(last.announcement.is_some());
    }

    #[tokio::test]
    async fn test_stateless_engine_skips_used_leaves() {
        // A second engine instance with empty cursors must discover
        // consumed leaves from the ledger alone.
        let fx = Fixture::new();
        let req = request(2, b"one");
        let first = fx.publish(&req).await.unwrap();

        let restarted = Fixture {
            ledger: fx.ledger,
            cursors: Mutex::new(HashMap::new()),
        };
        let second = restarted.publish(&req).await.unwrap();

        assert_eq!(second.channel_id, first.channel_id);
        assert_ne!(second.leaf, first.leaf);
    }

    #[tokio::test]
    async fn test_no_message_id_reuse_across_publishes() {
        let fx = Fixture::new();
        let req = request(2, b"p");

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let outcome = fx.publish(&req).await.unwrap();
            assert!(
                seen.insert((outcome.channel_id, outcome.leaf)),
                "leaf reused"
            );
        }
    }

    #[tokio::test]
    async fn test_broadcast_failure_propagates() {
        let fx = Fixture::new();
        fx.ledger.fail_broadcasts(1);

        let result = fx.publish(&request(1, b"z")).await;
        assert!(matches!(result, Err(EngineError::Ledger(_))));
    }

    #[tokio::test]
    async fn test_pinned_channel_id_is_used() {
        let fx = Fixture::new();
        let first = fx.publish(&request(2, b"a")).await.unwrap();

        let pinned = PublishRequest {
            channel_id: Some(first.channel_id),
            ..request(2, b"b")
        };
        let second = fx.publish(&pinned).await.unwrap();
        assert_eq!(second.channel_id, first.channel_id);
    }
}
