//! Request and response structures exposed to the front ends.
//!
//! The HTTP/MQTT layers (out of scope here) map these to and from
//! JSON; everything is serde-serializable so MAM requests can also be
//! buffered verbatim and replayed by the retry daemon.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mamgate_core::{Bundle, BundleHash, ChannelId, MessageId, Seed};
use mamgate_mask::EncryptionKeySet;

/// A request to publish one payload on a MAM channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Per-call seed; when absent the gateway's snapshot seed is used
    /// (and the snapshot is rewritten after completion).
    pub seed: Option<Seed>,

    /// Desired starting channel; resolved from the seed when absent.
    pub channel_id: Option<ChannelId>,

    /// Channel Merkle depth; the configured default when absent.
    pub depth: Option<u8>,

    /// The payload to publish.
    pub payload: Vec<u8>,

    /// Keys restricting who can decrypt.
    pub keys: EncryptionKeySet,
}

/// The response to a send-message request.
///
/// A freshly buffered request carries only the UUID; once the retry
/// daemon completes it, the stored result carries the identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// UUID of the buffered request, for status queries.
    pub uuid: Option<Uuid>,

    /// The channel the packet went out on.
    pub channel_id: Option<ChannelId>,

    /// The packet's message id.
    pub message_id: Option<MessageId>,

    /// Hash of the packet bundle.
    pub bundle_hash: Option<BundleHash>,

    /// Successor channel announced by this publish, if any.
    pub next_channel_id: Option<ChannelId>,

    /// Hash of the announcement bundle, if one was published.
    pub announcement_bundle_hash: Option<BundleHash>,
}

/// The response to a direct bundle send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendBundleResponse {
    /// Hash of the bundle.
    pub bundle_hash: BundleHash,

    /// Set when the broadcast failed and the bundle was buffered.
    pub uuid: Option<Uuid>,
}

/// A request to fetch and decode channel messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiveMessageRequest {
    /// Channel whose bundles to fetch.
    pub channel_id: Option<ChannelId>,

    /// A specific bundle to fetch instead.
    pub bundle_hash: Option<BundleHash>,

    /// Keys used to decrypt.
    pub keys: EncryptionKeySet,
}

/// The response to a receive request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveMessageResponse {
    /// Decrypted payloads, in ledger order.
    pub payloads: Vec<Vec<u8>>,

    /// Successor channel discovered during this call, if any.
    pub next_channel_id: Option<ChannelId>,
}

/// The answer to a status query for a buffered request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatusResponse {
    /// No queue knows this UUID.
    NotExist,

    /// Still pending; the daemon has not completed it.
    Unsent,

    /// A buffered bundle was broadcast; returned exactly once.
    SentBundle(Bundle),

    /// A buffered MAM request completed; returned exactly once.
    SentMam(SendMessageResponse),
}
