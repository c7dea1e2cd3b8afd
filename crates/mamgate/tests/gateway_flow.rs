//! End-to-end gateway scenarios over the in-memory ledger and cache.

use std::sync::Arc;

use mamgate::{
    Gateway, GatewayConfig, ReceiveMessageRequest, SendMessageRequest, StatusResponse,
};
use mamgate_buffer::MemoryCache;
use mamgate_core::{Bundle, Seed};
use mamgate_engine::PublishRequest;
use mamgate_ledger::MemoryLedger;
use mamgate_mask::{EncryptionKeySet, PreSharedKey, PskId};

const SEED: Seed = Seed::from_bytes([0x42; 32]);

struct World {
    ledger: Arc<MemoryLedger>,
    cache: Arc<MemoryCache>,
    gateway: Gateway<MemoryLedger, MemoryCache>,
}

async fn world_with(config: GatewayConfig) -> World {
    let ledger = Arc::new(MemoryLedger::new());
    let cache = Arc::new(MemoryCache::new());
    let gateway = Gateway::new(Arc::clone(&ledger), Arc::clone(&cache), config)
        .await
        .expect("gateway construction");
    World {
        ledger,
        cache,
        gateway,
    }
}

async fn world() -> World {
    world_with(GatewayConfig::default()).await
}

fn send_request(depth: u8, payload: &[u8]) -> SendMessageRequest {
    SendMessageRequest {
        seed: Some(SEED),
        channel_id: None,
        depth: Some(depth),
        payload: payload.to_vec(),
        keys: EncryptionKeySet::new(),
    }
}

#[tokio::test]
async fn mam_request_is_buffered_then_completed_by_daemon() {
    let w = world().await;

    let queued = w.gateway.send_message(&send_request(2, b"hello")).await.unwrap();
    let uuid = queued.uuid.expect("buffered request returns a uuid");
    assert!(queued.channel_id.is_none());

    // Before the daemon runs the request is unsent.
    assert_eq!(
        w.gateway.fetch_status(&uuid).await.unwrap(),
        StatusResponse::Unsent
    );

    let report = w.gateway.tick().await.unwrap();
    assert_eq!(report.mam_published, 1);

    match w.gateway.fetch_status(&uuid).await.unwrap() {
        StatusResponse::SentMam(response) => {
            assert!(response.channel_id.is_some());
            assert!(response.message_id.is_some());
            assert!(response.bundle_hash.is_some());
            assert!(response.next_channel_id.is_none());
        }
        other => panic!("expected SentMam, got {other:?}"),
    }

    // The consuming read removed the entry.
    assert_eq!(
        w.gateway.fetch_status(&uuid).await.unwrap(),
        StatusResponse::NotExist
    );
}

#[tokio::test]
async fn failed_bundle_broadcast_is_buffered_and_replayed() {
    let w = world().await;

    // Publish directly to obtain a realistic finalized bundle.
    let outcome = w
        .gateway
        .engine()
        .publish(&PublishRequest {
            seed: SEED,
            depth: 2,
            channel_id: None,
            payload: b"transfer".to_vec(),
            keys: EncryptionKeySet::new(),
        })
        .await
        .unwrap();
    let bundle: Bundle = outcome.bundle.clone();

    w.ledger.fail_broadcasts(1);
    let response = w.gateway.send_bundle(&bundle).await.unwrap();
    let uuid = response.uuid.expect("failed broadcast yields a uuid");

    assert_eq!(
        w.gateway.fetch_status(&uuid).await.unwrap(),
        StatusResponse::Unsent
    );

    // The daemon replays the broadcast.
    let report = w.gateway.tick().await.unwrap();
    assert_eq!(report.bundles_broadcast, 1);

    match w.gateway.fetch_status(&uuid).await.unwrap() {
        StatusResponse::SentBundle(sent) => assert_eq!(sent, bundle),
        other => panic!("expected SentBundle, got {other:?}"),
    }
    assert_eq!(
        w.gateway.fetch_status(&uuid).await.unwrap(),
        StatusResponse::NotExist
    );
}

#[tokio::test]
async fn successful_bundle_broadcast_needs_no_buffering() {
    let w = world().await;

    let outcome = w
        .gateway
        .engine()
        .publish(&PublishRequest {
            seed: SEED,
            depth: 1,
            channel_id: None,
            payload: b"ok".to_vec(),
            keys: EncryptionKeySet::new(),
        })
        .await
        .unwrap();

    let response = w.gateway.send_bundle(&outcome.bundle).await.unwrap();
    assert!(response.uuid.is_none());
    assert_eq!(response.bundle_hash, outcome.bundle_hash);
}

#[tokio::test]
async fn depth_one_channel_hands_off_through_the_daemon() {
    let w = world().await;

    // Three sends on a depth-1 chain (capacity 2 per channel).
    let mut uuids = Vec::new();
    for _ in 0..3 {
        let queued = w.gateway.send_message(&send_request(1, b"hello")).await.unwrap();
        uuids.push(queued.uuid.unwrap());
    }
    let report = w.gateway.tick().await.unwrap();
    assert_eq!(report.mam_published, 3);

    let mut responses = Vec::new();
    for uuid in &uuids {
        match w.gateway.fetch_status(uuid).await.unwrap() {
            StatusResponse::SentMam(response) => responses.push(response),
            other => panic!("expected SentMam, got {other:?}"),
        }
    }

    // First fills the channel, second exhausts it and announces.
    assert!(responses[0].next_channel_id.is_none());
    let announced = responses[1]
        .next_channel_id
        .expect("exhausting publish announces a successor");
    assert!(responses[1].announcement_bundle_hash.is_some());
    assert_eq!(responses[0].channel_id, responses[1].channel_id);

    // Third lands on the announced successor.
    assert_eq!(responses[2].channel_id, Some(announced));
}

#[tokio::test]
async fn receive_returns_payloads_and_discovered_successor() {
    let w = world().await;

    let psk_id = PskId::from_bytes([1; 16]);
    let psk = PreSharedKey::generate();
    let keys = EncryptionKeySet::new().with_psk(psk_id, psk);

    for payload in [b"one".as_slice(), b"two".as_slice()] {
        let req = SendMessageRequest {
            keys: keys.clone(),
            ..send_request(1, payload)
        };
        w.gateway.send_message(&req).await.unwrap();
    }
    w.gateway.tick().await.unwrap();

    // A receiver derives the first depth-1 channel of the shared seed.
    let channel = mamgate_core::KeyTree::derive(&SEED, 0, 1, None)
        .unwrap()
        .channel()
        .clone();

    let response = w
        .gateway
        .receive_message(&ReceiveMessageRequest {
            channel_id: Some(channel.id),
            bundle_hash: None,
            keys: keys.clone(),
        })
        .await
        .unwrap();

    assert_eq!(response.payloads, vec![b"one".to_vec(), b"two".to_vec()]);
    // The second publish exhausted the channel, so its announcement is
    // discovered here.
    assert!(response.next_channel_id.is_some());

    // Identical parameters, unchanged ledger: same payloads.
    let again = w
        .gateway
        .receive_message(&ReceiveMessageRequest {
            channel_id: Some(channel.id),
            bundle_hash: None,
            keys,
        })
        .await
        .unwrap();
    assert_eq!(again.payloads, response.payloads);
}

#[tokio::test]
async fn snapshot_restores_seed_across_gateways() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.snapshot");

    let ledger = Arc::new(MemoryLedger::new());
    let cache = Arc::new(MemoryCache::new());
    let config = GatewayConfig {
        snapshot_path: Some(path.clone()),
        ..GatewayConfig::default()
    };

    // First gateway: send on the snapshot seed (none supplied).
    let first_channel = {
        let gateway = Gateway::new(Arc::clone(&ledger), Arc::clone(&cache), config.clone())
            .await
            .unwrap();
        let queued = gateway
            .send_message(&SendMessageRequest {
                seed: None,
                channel_id: None,
                depth: Some(2),
                payload: b"persisted".to_vec(),
                keys: EncryptionKeySet::new(),
            })
            .await
            .unwrap();
        gateway.tick().await.unwrap();
        match gateway.fetch_status(&queued.uuid.unwrap()).await.unwrap() {
            StatusResponse::SentMam(response) => response.channel_id.unwrap(),
            other => panic!("expected SentMam, got {other:?}"),
        }
    };

    // Second gateway restores the same seed, so the next publish lands
    // on the same channel's next leaf.
    let gateway = Gateway::new(Arc::clone(&ledger), Arc::clone(&cache), config)
        .await
        .unwrap();
    let queued = gateway
        .send_message(&SendMessageRequest {
            seed: None,
            channel_id: None,
            depth: Some(2),
            payload: b"again".to_vec(),
            keys: EncryptionKeySet::new(),
        })
        .await
        .unwrap();
    gateway.tick().await.unwrap();

    match gateway.fetch_status(&queued.uuid.unwrap()).await.unwrap() {
        StatusResponse::SentMam(response) => {
            assert_eq!(response.channel_id, Some(first_channel));
        }
        other => panic!("expected SentMam, got {other:?}"),
    }
}

#[tokio::test]
async fn done_queue_trimming_evicts_oldest() {
    let w = world_with(GatewayConfig {
        done_capacity: 1,
        ..GatewayConfig::default()
    })
    .await;

    let first = w.gateway.send_message(&send_request(2, b"a")).await.unwrap();
    let second = w.gateway.send_message(&send_request(2, b"b")).await.unwrap();

    let report = w.gateway.tick().await.unwrap();
    assert_eq!(report.mam_published, 2);
    assert_eq!(report.done_trimmed, 1);

    // The older entry was evicted; the newer one still answers.
    assert_eq!(
        w.gateway
            .fetch_status(&first.uuid.unwrap())
            .await
            .unwrap(),
        StatusResponse::NotExist
    );
    assert!(matches!(
        w.gateway
            .fetch_status(&second.uuid.unwrap())
            .await
            .unwrap(),
        StatusResponse::SentMam(_)
    ));
}

#[tokio::test]
async fn daemon_keeps_failing_requests_pending() {
    let w = world().await;

    let queued = w.gateway.send_message(&send_request(1, b"stuck")).await.unwrap();
    let uuid = queued.uuid.unwrap();

    // Every broadcast fails during this tick.
    w.ledger.fail_broadcasts(10);
    let report = w.gateway.tick().await.unwrap();
    assert_eq!(report.mam_published, 0);
    assert_eq!(
        w.gateway.fetch_status(&uuid).await.unwrap(),
        StatusResponse::Unsent
    );

    // Once the node recovers, the next tick completes it.
    w.ledger.fail_broadcasts(0);
    let report = w.gateway.tick().await.unwrap();
    assert_eq!(report.mam_published, 1);
    assert!(matches!(
        w.gateway.fetch_status(&uuid).await.unwrap(),
        StatusResponse::SentMam(_)
    ));
}

#[tokio::test]
async fn receive_bypasses_the_buffer() {
    use mamgate_buffer::{CacheStore, QueueNames};

    let w = world().await;
    w.gateway.send_message(&send_request(1, b"x")).await.unwrap();
    w.gateway.tick().await.unwrap();

    let tree = mamgate_core::KeyTree::derive(&SEED, 0, 1, None).unwrap();
    w.gateway
        .receive_message(&ReceiveMessageRequest {
            channel_id: Some(tree.channel().id),
            bundle_hash: None,
            keys: EncryptionKeySet::new(),
        })
        .await
        .unwrap();

    // The receive queued nothing: one done entry from the send, no
    // pending entries anywhere.
    let names = QueueNames::default();
    assert_eq!(w.cache.list_len(&names.pending_mam).await.unwrap(), 0);
    assert_eq!(w.cache.list_len(&names.pending_txn).await.unwrap(), 0);
    assert_eq!(w.cache.list_len(&names.done_mam).await.unwrap(), 1);
}
