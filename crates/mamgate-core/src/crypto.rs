//! Cryptographic primitives for mamgate.
//!
//! One-time leaf keys and announcement keys are Ed25519 keypairs derived
//! by keyed Blake3 from the engine seed, so the whole channel structure
//! is reconstructible from the seed alone.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::types::Seed;

/// Derivation context for leaf signing keys.
const LEAF_KEY_CONTEXT: &str = "mamgate v0 leaf signing key";

/// Derivation context for per-channel announcement keys.
const ANNOUNCE_KEY_CONTEXT: &str = "mamgate v0 announce signing key";

/// A 32-byte Blake3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Compute the Blake3 digest of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The zero digest (sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &OneTimeSignature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeSignature(#[serde(with = "serde_bytes64")] pub [u8; 64]);

impl OneTimeSignature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for OneTimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OneTimeSignature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for OneTimeSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Serde support for 64-byte arrays (serde only derives up to 32).
mod serde_bytes64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_seq(bytes.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 64], D::Error> {
        let v: Vec<u8> = Deserialize::deserialize(de)?;
        v.try_into()
            .map_err(|_| D::Error::custom("expected 64 bytes"))
    }
}

/// A signing keypair.
///
/// Wraps ed25519-dalek's SigningKey. Leaf and announcement keypairs are
/// derived, never stored; `derive_leaf_keypair` / `derive_announce_keypair`
/// are the only production constructors.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Create from a 32-byte secret.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        Self { signing_key }
    }

    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> OneTimeSignature {
        let sig = self.signing_key.sign(message);
        OneTimeSignature(sig.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Derive the one-time signing keypair for a leaf.
///
/// Keyed by seed, channel ordinal and leaf index so no two positions in
/// the channel chain can ever yield the same key.
pub fn derive_leaf_keypair(seed: &Seed, channel_ordinal: u64, leaf: u32) -> Keypair {
    let mut hasher = blake3::Hasher::new_derive_key(LEAF_KEY_CONTEXT);
    hasher.update(seed.as_bytes());
    hasher.update(&channel_ordinal.to_le_bytes());
    hasher.update(&leaf.to_le_bytes());
    Keypair::from_secret(hasher.finalize().as_bytes())
}

/// Derive the announcement keypair for a channel.
///
/// Distinct context from leaf keys; committed into the channel id.
pub fn derive_announce_keypair(seed: &Seed, channel_ordinal: u64) -> Keypair {
    let mut hasher = blake3::Hasher::new_derive_key(ANNOUNCE_KEY_CONTEXT);
    hasher.update(seed.as_bytes());
    hasher.update(&channel_ordinal.to_le_bytes());
    Keypair::from_secret(hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message);

        keypair
            .public_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        let tampered = b"hello worlD";
        assert!(keypair.public_key().verify(tampered, &signature).is_err());
    }

    #[test]
    fn test_leaf_derivation_deterministic() {
        let seed = Seed::from_bytes([0x42; 32]);
        let kp1 = derive_leaf_keypair(&seed, 0, 0);
        let kp2 = derive_leaf_keypair(&seed, 0, 0);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_leaf_derivation_distinct_positions() {
        let seed = Seed::from_bytes([0x42; 32]);
        let base = derive_leaf_keypair(&seed, 0, 0).public_key();

        assert_ne!(base, derive_leaf_keypair(&seed, 0, 1).public_key());
        assert_ne!(base, derive_leaf_keypair(&seed, 1, 0).public_key());
        assert_ne!(base, derive_announce_keypair(&seed, 0).public_key());
    }

    #[test]
    fn test_distinct_seeds_distinct_keys() {
        let a = derive_leaf_keypair(&Seed::from_bytes([1; 32]), 0, 0);
        let b = derive_leaf_keypair(&Seed::from_bytes([2; 32]), 0, 0);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_digest_hash() {
        let h1 = Digest::hash(b"test data");
        let h2 = Digest::hash(b"test data");
        assert_eq!(h1, h2);
        assert_ne!(h1, Digest::hash(b"different data"));
    }
}
