//! Session keys and their wrapped transport forms.
//!
//! Each message is encrypted under a fresh session key. The header
//! carries one wrap per key in the writer's set; a reader recovers the
//! session key through whichever wrap its own keys can open. The wrap
//! derivation is bound to a caller-supplied context (channel id plus
//! message id) so a wrap lifted from one message is useless on another.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey as DalekPublic};

use crate::error::{MaskError, Result};
use crate::keyset::{EncryptionKeySet, PreSharedKey, PskId, RecipientPublicKey};

const PSK_WRAP_CONTEXT: &str = "mamgate v0 psk wrap key";
const RECIPIENT_WRAP_CONTEXT: &str = "mamgate v0 recipient wrap key";
const PUBLIC_SESSION_CONTEXT: &str = "mamgate v0 public session key";

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskNonce(pub [u8; 12]);

impl MaskNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }
}

/// A 256-bit symmetric session key for one message.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    /// Generate a fresh random session key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The public-mode session key for the given message context.
    ///
    /// Used when the writer's key set is empty: any reader that knows
    /// the channel can re-derive this key.
    pub fn public_mode(context: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(PUBLIC_SESSION_CONTEXT);
        hasher.update(context);
        Self(*hasher.finalize().as_bytes())
    }

    /// Encrypt with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &MaskNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| MaskError::Encryption(e.to_string()))?;
        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| MaskError::Encryption(e.to_string()))
    }

    /// Decrypt with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &MaskNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| MaskError::Decryption(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| MaskError::Decryption(e.to_string()))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey(..)")
    }
}

/// One wrapped copy of a session key, carried in a message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKeyWrap {
    /// Wrapped with a pre-shared key.
    Psk {
        /// Which pre-shared key this wrap is for.
        psk_id: PskId,
        /// Wrap nonce.
        nonce: MaskNonce,
        /// Encrypted session key.
        wrapped: Vec<u8>,
    },
    /// Wrapped for an asymmetric recipient via ephemeral ECDH.
    Recipient {
        /// Sender's ephemeral public key.
        ephemeral: RecipientPublicKey,
        /// Wrap nonce.
        nonce: MaskNonce,
        /// Encrypted session key.
        wrapped: Vec<u8>,
    },
}

fn psk_wrap_key(psk: &PreSharedKey, context: &[u8]) -> SessionKey {
    let mut hasher = blake3::Hasher::new_derive_key(PSK_WRAP_CONTEXT);
    hasher.update(psk.as_bytes());
    hasher.update(context);
    SessionKey(*hasher.finalize().as_bytes())
}

fn recipient_wrap_key(shared: &[u8; 32], context: &[u8]) -> SessionKey {
    let mut hasher = blake3::Hasher::new_derive_key(RECIPIENT_WRAP_CONTEXT);
    hasher.update(shared);
    hasher.update(context);
    SessionKey(*hasher.finalize().as_bytes())
}

impl SessionKeyWrap {
    /// Wrap a session key with a pre-shared key.
    pub fn for_psk(
        session: &SessionKey,
        psk_id: PskId,
        psk: &PreSharedKey,
        context: &[u8],
    ) -> Result<Self> {
        let nonce = MaskNonce::generate();
        let wrapped = psk_wrap_key(psk, context).encrypt(session.as_bytes(), &nonce)?;
        Ok(Self::Psk {
            psk_id,
            nonce,
            wrapped,
        })
    }

    /// Wrap a session key for an asymmetric recipient.
    pub fn for_recipient(
        session: &SessionKey,
        recipient: &RecipientPublicKey,
        context: &[u8],
    ) -> Result<Self> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral = RecipientPublicKey::from(DalekPublic::from(&ephemeral_secret));
        let shared = ephemeral_secret.diffie_hellman(&recipient.to_dalek());

        let nonce = MaskNonce::generate();
        let wrapped =
            recipient_wrap_key(shared.as_bytes(), context).encrypt(session.as_bytes(), &nonce)?;
        Ok(Self::Recipient {
            ephemeral,
            nonce,
            wrapped,
        })
    }

    /// Try to unwrap with the keys in `set`.
    ///
    /// Returns `None` when this wrap is not addressed to any key in the
    /// set (or the wrap fails to authenticate).
    pub fn try_unwrap(&self, set: &EncryptionKeySet, context: &[u8]) -> Option<SessionKey> {
        match self {
            Self::Psk {
                psk_id,
                nonce,
                wrapped,
            } => {
                let entry = set.psks.iter().find(|e| &e.id == psk_id)?;
                let bytes = psk_wrap_key(&entry.key, context)
                    .decrypt(wrapped, nonce)
                    .ok()?;
                session_from_vec(bytes)
            }
            Self::Recipient {
                ephemeral,
                nonce,
                wrapped,
            } => set.secrets.iter().find_map(|secret| {
                let shared = secret.diffie_hellman(ephemeral);
                let bytes = recipient_wrap_key(&shared, context)
                    .decrypt(wrapped, nonce)
                    .ok()?;
                session_from_vec(bytes)
            }),
        }
    }
}

fn session_from_vec(bytes: Vec<u8>) -> Option<SessionKey> {
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some(SessionKey::from_bytes(arr))
}

impl EncryptionKeySet {
    /// Produce the wraps a writer attaches to a message header.
    ///
    /// Empty for a public-mode set; the reader then derives the
    /// public-mode key from the context instead.
    pub fn wrap_session(&self, session: &SessionKey, context: &[u8]) -> Result<Vec<SessionKeyWrap>> {
        let mut wraps = Vec::with_capacity(self.psks.len() + self.recipients.len());
        for entry in &self.psks {
            wraps.push(SessionKeyWrap::for_psk(session, entry.id, &entry.key, context)?);
        }
        for recipient in &self.recipients {
            wraps.push(SessionKeyWrap::for_recipient(session, recipient, context)?);
        }
        Ok(wraps)
    }

    /// Recover the session key from a header's wraps.
    ///
    /// An empty wrap list means public mode. Fails with
    /// [`MaskError::NoMatchingKey`] when none of this set's keys opens
    /// any wrap.
    pub fn unwrap_session(&self, wraps: &[SessionKeyWrap], context: &[u8]) -> Result<SessionKey> {
        if wraps.is_empty() {
            return Ok(SessionKey::public_mode(context));
        }
        wraps
            .iter()
            .find_map(|wrap| wrap.try_unwrap(self, context))
            .ok_or(MaskError::NoMatchingKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::RecipientSecret;

    const CONTEXT: &[u8] = b"channel|message";

    #[test]
    fn test_psk_wrap_roundtrip() {
        let session = SessionKey::generate();
        let psk = PreSharedKey::generate();
        let psk_id = PskId::from_bytes([7; 16]);

        let writer = EncryptionKeySet::new().with_psk(psk_id, psk);
        let wraps = writer.wrap_session(&session, CONTEXT).unwrap();
        assert_eq!(wraps.len(), 1);

        let reader = EncryptionKeySet::new().with_psk(psk_id, psk);
        let recovered = reader.unwrap_session(&wraps, CONTEXT).unwrap();
        assert_eq!(recovered.as_bytes(), session.as_bytes());
    }

    #[test]
    fn test_recipient_wrap_roundtrip() {
        let session = SessionKey::generate();
        let secret = RecipientSecret::generate();

        let writer = EncryptionKeySet::new().with_recipient(secret.public_key());
        let wraps = writer.wrap_session(&session, CONTEXT).unwrap();

        let reader = EncryptionKeySet::new().with_secret(secret);
        let recovered = reader.unwrap_session(&wraps, CONTEXT).unwrap();
        assert_eq!(recovered.as_bytes(), session.as_bytes());
    }

    #[test]
    fn test_unrelated_keys_fail() {
        let session = SessionKey::generate();
        let writer = EncryptionKeySet::new()
            .with_psk(PskId::from_bytes([1; 16]), PreSharedKey::generate())
            .with_recipient(RecipientSecret::generate().public_key());
        let wraps = writer.wrap_session(&session, CONTEXT).unwrap();

        let stranger = EncryptionKeySet::new()
            .with_psk(PskId::from_bytes([2; 16]), PreSharedKey::generate())
            .with_secret(RecipientSecret::generate());

        assert!(matches!(
            stranger.unwrap_session(&wraps, CONTEXT),
            Err(MaskError::NoMatchingKey)
        ));
    }

    #[test]
    fn test_same_psk_id_wrong_key_fails() {
        let session = SessionKey::generate();
        let psk_id = PskId::from_bytes([9; 16]);

        let writer = EncryptionKeySet::new().with_psk(psk_id, PreSharedKey::generate());
        let wraps = writer.wrap_session(&session, CONTEXT).unwrap();

        let reader = EncryptionKeySet::new().with_psk(psk_id, PreSharedKey::generate());
        assert!(reader.unwrap_session(&wraps, CONTEXT).is_err());
    }

    #[test]
    fn test_wrap_bound_to_context() {
        let session = SessionKey::generate();
        let psk = PreSharedKey::generate();
        let psk_id = PskId::from_bytes([3; 16]);

        let set = EncryptionKeySet::new().with_psk(psk_id, psk);
        let wraps = set.wrap_session(&session, CONTEXT).unwrap();

        assert!(set.unwrap_session(&wraps, b"other|context").is_err());
    }

    #[test]
    fn test_public_mode_derivation() {
        let set = EncryptionKeySet::new();
        let wraps = set.wrap_session(&SessionKey::generate(), CONTEXT).unwrap();
        assert!(wraps.is_empty());

        let a = set.unwrap_session(&[], CONTEXT).unwrap();
        let b = EncryptionKeySet::new().unwrap_session(&[], CONTEXT).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let c = set.unwrap_session(&[], b"other").unwrap();
        assert_ne!(a.as_bytes(), c.as_bytes());
    }
}
