//! # mamgate mask
//!
//! Payload masking for mamgate channels: per-request encryption key
//! sets (pre-shared and X25519 asymmetric), session keys, and the
//! wrapped forms carried in message headers.
//!
//! A writer encrypts each message under a fresh session key and attaches
//! one wrap per key in its [`EncryptionKeySet`]; with an empty set the
//! session key is derived from the message context so the channel reads
//! as public.

pub mod envelope;
pub mod error;
pub mod keyset;
pub mod session;

pub use envelope::MaskedPayload;
pub use error::MaskError;
pub use keyset::{
    EncryptionKeySet, PreSharedKey, PskEntry, PskId, RecipientPublicKey, RecipientSecret,
};
pub use session::{MaskNonce, SessionKey, SessionKeyWrap};
