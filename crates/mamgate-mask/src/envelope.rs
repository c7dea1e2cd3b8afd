//! Masked payload envelope.
//!
//! The encrypted form of one message payload: ciphertext plus the nonce
//! needed to open it with the recovered session key.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::{MaskNonce, SessionKey};

/// An encrypted payload with its nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedPayload {
    /// Nonce used for encryption (unique per message).
    pub nonce: MaskNonce,
    /// The encrypted payload (includes the authentication tag).
    pub ciphertext: Vec<u8>,
}

impl MaskedPayload {
    /// Encrypt a plaintext under the session key.
    pub fn seal(plaintext: &[u8], session: &SessionKey) -> Result<Self> {
        let nonce = MaskNonce::generate();
        let ciphertext = session.encrypt(plaintext, &nonce)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt with the session key.
    pub fn open(&self, session: &SessionKey) -> Result<Vec<u8>> {
        session.decrypt(&self.ciphertext, &self.nonce)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| crate::error::MaskError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes)
            .map_err(|e| crate::error::MaskError::Serialization(e.to_string()))
    }

    /// Size of the ciphertext.
    pub fn len(&self) -> usize {
        self.ciphertext.len()
    }

    /// Whether the ciphertext is empty.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let session = SessionKey::generate();
        let masked = MaskedPayload::seal(b"hello, masked world", &session).unwrap();
        assert_ne!(masked.ciphertext.as_slice(), b"hello, masked world");

        let opened = masked.open(&session).unwrap();
        assert_eq!(opened, b"hello, masked world");
    }

    #[test]
    fn test_open_wrong_key_fails() {
        let masked = MaskedPayload::seal(b"secret", &SessionKey::generate()).unwrap();
        assert!(masked.open(&SessionKey::generate()).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let session = SessionKey::generate();
        let mut masked = MaskedPayload::seal(b"secret", &session).unwrap();
        masked.ciphertext[0] ^= 1;
        assert!(masked.open(&session).is_err());
    }

    #[test]
    fn test_envelope_serialization() {
        let masked = MaskedPayload::seal(b"bytes", &SessionKey::generate()).unwrap();
        let bytes = masked.to_bytes().unwrap();
        let recovered = MaskedPayload::from_bytes(&bytes).unwrap();
        assert_eq!(masked, recovered);
    }
}
