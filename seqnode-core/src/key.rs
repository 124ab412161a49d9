//! Sequence node key derivation.
//!
//! A key is the first 128 bits of the SHA-256 digest of the identifier's
//! canonical JSON, rendered as 32 lowercase hex characters. The whole
//! identifier is hashed (header, content, url and method), so two requests
//! for the same node with different routing headers get different keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::canonical::to_canonical_json;
use crate::error::{SeqnError, SeqnResult};
use crate::identifier::SequenceNodeIdentifier;

/// Number of digest bytes kept in a key.
const KEY_BYTES: usize = 16;

/// Length of a rendered key.
pub const KEY_HEX_LEN: usize = KEY_BYTES * 2;

/// Fixed-length fingerprint of a [`SequenceNodeIdentifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceNodeKey(String);

impl SequenceNodeKey {
    /// Derive the key for an identifier.
    pub fn derive(identifier: &SequenceNodeIdentifier) -> SeqnResult<Self> {
        let value = serde_json::to_value(identifier)?;
        let canonical = to_canonical_json(&value);
        Ok(Self::from_canonical_bytes(canonical.as_bytes()))
    }

    fn from_canonical_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(&digest[..KEY_BYTES]))
    }

    /// Parse a key received from outside, e.g. a URL path segment.
    pub fn parse(value: &str) -> SeqnResult<Self> {
        if value.len() != KEY_HEX_LEN {
            return Err(SeqnError::InvalidKey {
                value: value.to_string(),
                reason: format!("expected {} hex characters, got {}", KEY_HEX_LEN, value.len()),
            });
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(SeqnError::InvalidKey {
                value: value.to_string(),
                reason: "expected lowercase hex".to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SequenceNodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SequenceNodeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key for an identifier.
pub fn derive_key(identifier: &SequenceNodeIdentifier) -> SeqnResult<SequenceNodeKey> {
    SequenceNodeKey::derive(identifier)
}
