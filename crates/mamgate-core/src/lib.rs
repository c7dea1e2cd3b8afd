//! # mamgate core
//!
//! Pure primitives for the mamgate channel engine: identifiers, one-time
//! leaf keys, Merkle key trees, channels, and ledger bundles.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`ChannelId`] - Merkle-commitment identity of a channel (and its address)
//! - [`KeyTree`] - A channel's full key material, derived from the seed
//! - [`MessageId`] - Per-leaf ledger tag naming one message instance
//! - [`Bundle`] / [`Transaction`] - Ledger-facing message containers

pub mod bundle;
pub mod canonical;
pub mod channel;
pub mod crypto;
pub mod error;
pub mod merkle;
pub mod types;

pub use bundle::{Bundle, Transaction, FRAGMENT_CAPACITY};
pub use channel::{
    channel_id, derive_announce_message_id, derive_message_id, Channel, KeyTree, MAX_DEPTH,
};
pub use crypto::{
    derive_announce_keypair, derive_leaf_keypair, Digest, Keypair, OneTimeSignature, PublicKey,
};
pub use error::CoreError;
pub use merkle::{AuthPath, MerkleTree};
pub use types::{Address, BundleHash, ChannelId, MessageId, Seed};
