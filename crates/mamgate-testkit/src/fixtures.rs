//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a gateway wired to the
//! in-memory ledger and cache, with handles kept for fault injection
//! and queue inspection.

use std::sync::Arc;

use mamgate::{Gateway, GatewayConfig};
use mamgate_buffer::MemoryCache;
use mamgate_core::{Channel, ChannelId, KeyTree, Seed};
use mamgate_ledger::MemoryLedger;

/// A gateway over in-memory collaborators.
pub struct TestGateway {
    /// The ledger double, for scripting failures.
    pub ledger: Arc<MemoryLedger>,
    /// The cache double, for queue inspection.
    pub cache: Arc<MemoryCache>,
    /// The gateway under test.
    pub gateway: Gateway<MemoryLedger, MemoryCache>,
}

impl TestGateway {
    /// Build a gateway with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(GatewayConfig::default()).await
    }

    /// Build a gateway with a custom configuration.
    pub async fn with_config(config: GatewayConfig) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let cache = Arc::new(MemoryCache::new());
        let gateway = Gateway::new(Arc::clone(&ledger), Arc::clone(&cache), config)
            .await
            .expect("gateway construction");
        Self {
            ledger,
            cache,
            gateway,
        }
    }
}

/// A deterministic seed for test scenarios (`n` distinguishes parties).
pub fn test_seed(n: u8) -> Seed {
    let mut bytes = [0x42u8; 32];
    bytes[0] = n;
    Seed::from_bytes(bytes)
}

/// The channel at `ordinal` of a seed's chain, as a receiver would
/// derive it.
pub fn chain_channel(seed: &Seed, ordinal: u64, depth: u8) -> Channel {
    KeyTree::derive(seed, ordinal, depth, None)
        .expect("valid depth")
        .channel()
        .clone()
}

/// The channel id at `ordinal` of a seed's chain.
pub fn chain_channel_id(seed: &Seed, ordinal: u64, depth: u8) -> ChannelId {
    chain_channel(seed, ordinal, depth).id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds_are_distinct() {
        assert_ne!(test_seed(0), test_seed(1));
        assert_eq!(test_seed(3), test_seed(3));
    }

    #[test]
    fn test_chain_channels_are_deterministic() {
        let seed = test_seed(0);
        assert_eq!(
            chain_channel_id(&seed, 0, 2),
            chain_channel_id(&seed, 0, 2)
        );
        assert_ne!(
            chain_channel_id(&seed, 0, 2),
            chain_channel_id(&seed, 1, 2)
        );
    }

    #[tokio::test]
    async fn test_gateway_fixture_builds() {
        let t = TestGateway::new().await;
        assert_eq!(t.ledger.bundle_count(), 0);
    }
}
