//! The Gateway: unified API over the engine and the publish buffer.
//!
//! MAM send requests are buffered unconditionally and executed later by
//! the retry daemon; plain bundle sends go straight to the ledger and
//! fall back to the buffer on broadcast failure. Receives hit the
//! engine directly, since reads are idempotent and need no buffering.

use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use mamgate_buffer::{CacheStore, PublishBuffer, RequestKind, RequestStatus};
use mamgate_core::{canonical, Bundle, Seed};
use mamgate_engine::{Engine, EngineConfig, EngineSnapshot, ReceiveRequest};
use mamgate_ledger::LedgerClient;

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::requests::{
    ReceiveMessageRequest, ReceiveMessageResponse, SendBundleResponse, SendMessageRequest,
    SendMessageResponse, StatusResponse,
};

/// The gateway core shared by the front ends and the retry daemon.
pub struct Gateway<L, C> {
    pub(crate) engine: Engine<L>,
    pub(crate) buffer: PublishBuffer<C>,
    pub(crate) ledger: Arc<L>,
    pub(crate) config: GatewayConfig,
    pub(crate) seed: Seed,
}

impl<L: LedgerClient, C: CacheStore> Gateway<L, C> {
    /// Construct a gateway, restoring the engine snapshot if one exists.
    ///
    /// Without a snapshot on disk a fresh seed is generated (and
    /// persisted when a snapshot path is configured).
    pub async fn new(ledger: Arc<L>, cache: Arc<C>, config: GatewayConfig) -> Result<Self> {
        let snapshot = match &config.snapshot_path {
            Some(path) => EngineSnapshot::load(path)?,
            None => None,
        };
        let fresh = snapshot.is_none();
        let (seed, trusted) = match snapshot {
            Some(s) => (s.seed, s.trusted),
            None => (Seed::generate(), BTreeSet::new()),
        };

        let engine = Engine::new(
            Arc::clone(&ledger),
            EngineConfig {
                chid_search_bound: config.chid_search_bound,
            },
        );
        engine.restore_trusted(trusted).await;

        let buffer = PublishBuffer::new(Arc::clone(&cache), config.queues.clone(), config.cache_ttl);

        let gateway = Self {
            engine,
            buffer,
            ledger,
            config,
            seed,
        };
        if fresh {
            gateway.save_snapshot().await?;
        }
        Ok(gateway)
    }

    /// The engine, for direct protocol access (tests, diagnostics).
    pub fn engine(&self) -> &Engine<L> {
        &self.engine
    }

    /// Queue a MAM publish request.
    ///
    /// The request is buffered under a generated UUID and executed by
    /// the retry daemon; `fetch_status` reports the final identifiers.
    pub async fn send_message(&self, req: &SendMessageRequest) -> Result<SendMessageResponse> {
        let payload = canonical::to_bytes(req)?;
        let uuid = self.buffer.buffer(RequestKind::Mam, &payload).await?;
        tracing::debug!(%uuid, "queued MAM send request");

        Ok(SendMessageResponse {
            uuid: Some(uuid),
            ..SendMessageResponse::default()
        })
    }

    /// Broadcast a finalized bundle directly.
    ///
    /// On ledger failure the serialized bundle is buffered and the
    /// returned UUID tracks the deferred broadcast.
    pub async fn send_bundle(&self, bundle: &Bundle) -> Result<SendBundleResponse> {
        let bundle_hash = bundle.hash();
        match self.ledger.broadcast(bundle).await {
            Ok(()) => Ok(SendBundleResponse {
                bundle_hash,
                uuid: None,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "broadcast failed, buffering bundle");
                let payload = canonical::to_bytes(bundle)?;
                let uuid = self.buffer.buffer(RequestKind::Txn, &payload).await?;
                Ok(SendBundleResponse {
                    bundle_hash,
                    uuid: Some(uuid),
                })
            }
        }
    }

    /// Fetch and decode channel messages.
    pub async fn receive_message(
        &self,
        req: &ReceiveMessageRequest,
    ) -> Result<ReceiveMessageResponse> {
        let outcome = self
            .engine
            .receive(
                &ReceiveRequest {
                    channel_id: req.channel_id,
                    bundle_hash: req.bundle_hash,
                },
                &req.keys,
            )
            .await?;

        // The trusted set may have grown; keep the snapshot current.
        self.save_snapshot().await?;

        Ok(ReceiveMessageResponse {
            payloads: outcome.payloads,
            next_channel_id: outcome.discovered_channel,
        })
    }

    /// Answer "what happened to request `uuid`".
    ///
    /// A `Sent*` answer consumes the stored result; asking again
    /// returns `NotExist`.
    pub async fn fetch_status(&self, uuid: &Uuid) -> Result<StatusResponse> {
        match self.buffer.status(uuid).await? {
            RequestStatus::NotExist => Ok(StatusResponse::NotExist),
            RequestStatus::Unsent => Ok(StatusResponse::Unsent),
            RequestStatus::Sent {
                kind: RequestKind::Txn,
                content,
            } => {
                let bundle: Bundle = canonical::from_bytes(&content)?;
                Ok(StatusResponse::SentBundle(bundle))
            }
            RequestStatus::Sent {
                kind: RequestKind::Mam,
                content,
            } => {
                let response: SendMessageResponse = canonical::from_bytes(&content)?;
                Ok(StatusResponse::SentMam(response))
            }
        }
    }

    /// Rewrite the engine snapshot, when one is configured.
    pub(crate) async fn save_snapshot(&self) -> Result<()> {
        if let Some(path) = &self.config.snapshot_path {
            let snapshot = EngineSnapshot {
                seed: self.seed,
                trusted: self.engine.trusted_channels().await,
            };
            snapshot.save(path)?;
        }
        Ok(())
    }
}
