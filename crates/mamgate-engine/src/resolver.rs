//! Channel resolver.
//!
//! Walks the deterministic channel chain derived from a seed and asks
//! the ledger which leaf keys are already consumed, so a stateless or
//! restarted engine never reuses a key.

use std::collections::BTreeSet;
use std::collections::HashSet;

use mamgate_core::{derive_message_id, Channel, ChannelId, KeyTree, MessageId, Seed};
use mamgate_ledger::LedgerClient;

use crate::error::{EngineError, Result};

/// Default bound on the channel-id search walk, inherited behavior.
pub const DEFAULT_SEARCH_BOUND: u64 = 100;

/// Resolves channels against a seed and the ledger's view of used keys.
pub struct ChannelResolver<'a, L: ?Sized> {
    ledger: &'a L,
    search_bound: u64,
}

impl<'a, L: LedgerClient + ?Sized> ChannelResolver<'a, L> {
    /// Create a resolver with the given search bound.
    pub fn new(ledger: &'a L, search_bound: u64) -> Self {
        Self {
            ledger,
            search_bound,
        }
    }

    /// Resolve the starting channel for a publish.
    ///
    /// Without `desired`, the first channel of the chain is returned.
    /// With it, channels are regenerated one at a time until the
    /// generated id matches; [`EngineError::ExceededSearchBound`] after
    /// `search_bound` iterations.
    pub async fn resolve_start(
        &self,
        seed: &Seed,
        depth: u8,
        desired: Option<&ChannelId>,
    ) -> Result<Channel> {
        let mut parent = None;
        for ordinal in 0..self.search_bound {
            let tree = KeyTree::derive(seed, ordinal, depth, parent)?;
            let channel = tree.channel().clone();

            match desired {
                None => return Ok(channel),
                Some(want) if *want == channel.id => {
                    tracing::debug!(ordinal, channel = %channel.id, "resolved desired channel");
                    return Ok(channel);
                }
                Some(_) => parent = Some(channel.id),
            }
        }

        Err(EngineError::ExceededSearchBound {
            bound: self.search_bound,
        })
    }

    /// Derive the successor of `current` in the chain.
    pub fn successor(&self, seed: &Seed, current: &Channel) -> Result<Channel> {
        let tree = KeyTree::derive(
            seed,
            current.ordinal + 1,
            current.depth,
            Some(current.id),
        )?;
        Ok(tree.channel().clone())
    }

    /// The set of leaf ordinals already consumed on the ledger.
    ///
    /// Read-only and repeatable; the result may be stale the moment it
    /// returns (a concurrent writer may consume a leaf between this
    /// scan and a header write), which the publish protocol resolves by
    /// re-scanning on collision.
    pub async fn used_leaves(&self, channel: &Channel) -> Result<BTreeSet<u32>> {
        let transactions = self
            .ledger
            .find_transactions(&channel.id.address())
            .await?;
        let observed: HashSet<MessageId> = transactions.iter().map(|tx| tx.tag).collect();

        let used = (0..channel.capacity() as u32)
            .filter(|leaf| observed.contains(&derive_message_id(&channel.id, *leaf)))
            .collect();
        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mamgate_core::{Address, Bundle};
    use mamgate_ledger::MemoryLedger;

    const SEED: Seed = Seed::from_bytes([0x42; 32]);

    #[tokio::test]
    async fn test_resolve_first_channel() {
        let ledger = MemoryLedger::new();
        let resolver = ChannelResolver::new(&ledger, DEFAULT_SEARCH_BOUND);

        let channel = resolver.resolve_start(&SEED, 2, None).await.unwrap();
        assert_eq!(channel.ordinal, 0);
        assert_eq!(channel.parent, None);
        assert_eq!(channel.capacity(), 4);
    }

    #[tokio::test]
    async fn test_resolve_desired_deeper_in_chain() {
        let ledger = MemoryLedger::new();
        let resolver = ChannelResolver::new(&ledger, DEFAULT_SEARCH_BOUND);

        let third = KeyTree::derive(&SEED, 2, 2, None).unwrap().channel().clone();
        let resolved = resolver
            .resolve_start(&SEED, 2, Some(&third.id))
            .await
            .unwrap();

        assert_eq!(resolved.ordinal, 2);
        assert_eq!(resolved.id, third.id);
        // The walk records the predecessor as parent.
        let second = KeyTree::derive(&SEED, 1, 2, None).unwrap().channel().clone();
        assert_eq!(resolved.parent, Some(second.id));
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_exceeds_bound() {
        let ledger = MemoryLedger::new();
        let resolver = ChannelResolver::new(&ledger, 10);

        let foreign = ChannelId::from_bytes([0x99; 32]);
        let result = resolver.resolve_start(&SEED, 2, Some(&foreign)).await;
        assert!(matches!(
            result,
            Err(EngineError::ExceededSearchBound { bound: 10 })
        ));
    }

    #[tokio::test]
    async fn test_successor_links_to_parent() {
        let ledger = MemoryLedger::new();
        let resolver = ChannelResolver::new(&ledger, DEFAULT_SEARCH_BOUND);

        let first = resolver.resolve_start(&SEED, 1, None).await.unwrap();
        let second = resolver.successor(&SEED, &first).unwrap();

        assert_eq!(second.ordinal, 1);
        assert_eq!(second.parent, Some(first.id));
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_used_leaves_matches_tags() {
        let ledger = MemoryLedger::new();
        let resolver = ChannelResolver::new(&ledger, DEFAULT_SEARCH_BOUND);
        let channel = resolver.resolve_start(&SEED, 2, None).await.unwrap();

        // Post transactions tagged for leaves 1 and 3, plus an unrelated tag.
        let mut bundle = Bundle::new();
        bundle.push_message(channel.id.address(), derive_message_id(&channel.id, 1), b"a");
        bundle.push_message(channel.id.address(), derive_message_id(&channel.id, 3), b"b");
        bundle.push_message(
            Address::from_bytes([0xee; 32]),
            MessageId::from_bytes([0xee; 16]),
            b"noise",
        );
        bundle.finalize();
        ledger.broadcast(&bundle).await.unwrap();

        let used = resolver.used_leaves(&channel).await.unwrap();
        assert_eq!(used, BTreeSet::from([1, 3]));
    }

    #[tokio::test]
    async fn test_used_leaves_empty_channel() {
        let ledger = MemoryLedger::new();
        let resolver = ChannelResolver::new(&ledger, DEFAULT_SEARCH_BOUND);
        let channel = resolver.resolve_start(&SEED, 1, None).await.unwrap();

        assert!(resolver.used_leaves(&channel).await.unwrap().is_empty());
    }
}
