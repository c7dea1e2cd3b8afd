//! Encryption key sets restricting who can decrypt a channel's payloads.
//!
//! A writer attaches session-key wraps for every pre-shared key and
//! every recipient public key in the set. An empty set means public
//! mode: the session key is derived from channel metadata alone and any
//! reader that knows the channel can decrypt.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{PublicKey as DalekPublic, StaticSecret};

/// A 16-byte pre-shared key identifier, carried in the clear so readers
/// can pick the matching wrap without trial decryption.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PskId(pub [u8; 16]);

impl PskId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PskId({})", self.to_hex())
    }
}

/// A 32-byte pre-shared symmetric key.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreSharedKey(pub [u8; 32]);

impl PreSharedKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Debug for PreSharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreSharedKey(..)")
    }
}

/// An X25519 public key identifying one asymmetric recipient.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientPublicKey(pub [u8; 32]);

impl RecipientPublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to x25519-dalek form.
    pub fn to_dalek(&self) -> DalekPublic {
        DalekPublic::from(self.0)
    }
}

impl fmt::Debug for RecipientPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientPublicKey({})", &hex::encode(self.0)[..16])
    }
}

impl From<DalekPublic> for RecipientPublicKey {
    fn from(pk: DalekPublic) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static secret key held by an asymmetric recipient.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSecret(pub [u8; 32]);

impl RecipientSecret {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(*StaticSecret::from(bytes).as_bytes())
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> RecipientPublicKey {
        let secret = StaticSecret::from(self.0);
        RecipientPublicKey::from(DalekPublic::from(&secret))
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer: &RecipientPublicKey) -> [u8; 32] {
        let secret = StaticSecret::from(self.0);
        *secret.diffie_hellman(&peer.to_dalek()).as_bytes()
    }
}

impl fmt::Debug for RecipientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientSecret(..)")
    }
}

/// One pre-shared key with its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PskEntry {
    /// Identifier carried in the clear.
    pub id: PskId,
    /// The key itself.
    pub key: PreSharedKey,
}

/// The per-request set of keys restricting (or unlocking) a message.
///
/// Owned for the duration of one call; never persisted beyond it.
/// Writers use `psks` and `recipients`; readers additionally supply
/// `secrets` to unwrap asymmetric wraps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKeySet {
    /// Pre-shared keys to wrap the session key for.
    pub psks: Vec<PskEntry>,
    /// Asymmetric recipients to wrap the session key for.
    pub recipients: Vec<RecipientPublicKey>,
    /// Secret keys held by this reader.
    pub secrets: Vec<RecipientSecret>,
}

impl EncryptionKeySet {
    /// An empty set (public mode for writers).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pre-shared key.
    pub fn with_psk(mut self, id: PskId, key: PreSharedKey) -> Self {
        self.psks.push(PskEntry { id, key });
        self
    }

    /// Add an asymmetric recipient.
    pub fn with_recipient(mut self, pk: RecipientPublicKey) -> Self {
        self.recipients.push(pk);
        self
    }

    /// Add a reader-side secret key.
    pub fn with_secret(mut self, sk: RecipientSecret) -> Self {
        self.secrets.push(sk);
        self
    }

    /// Whether a writer using this set produces a public-mode message.
    pub fn is_public(&self) -> bool {
        self.psks.is_empty() && self.recipients.is_empty()
    }
}
