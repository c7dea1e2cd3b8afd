//! CBOR encoding helpers.
//!
//! All wire and cache structures are encoded with `ciborium`. Struct
//! field order is fixed, so encoding the same value always yields the
//! same bytes, which is what signing and bundle hashing rely on.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

/// Encode a value to CBOR bytes.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Decode a value from CBOR bytes.
///
/// Trailing bytes after the first CBOR value are ignored; callers that
/// concatenate values use [`to_bytes`] on the decoded head to find the
/// boundary.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CoreError> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
}
