//! Namespaced cache keys.
//!
//! Every sequence node lives under a fixed prefix (`SEQN:` by default) in
//! the shared store. `NamespacedKey` is the only way the adapter builds a
//! store key, so an unprefixed fingerprint never reaches a backend.

use std::fmt;

use seqnode_core::SequenceNodeKey;

/// Default namespace for sequence node entries.
pub const DEFAULT_KEY_PREFIX: &str = "SEQN:";

/// A store key made of a namespace prefix and a sequence node key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedKey {
    inner: NamespacedKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NamespacedKeyInner {
    prefix: String,
    key: SequenceNodeKey,
}

impl NamespacedKey {
    pub fn new(prefix: impl Into<String>, key: SequenceNodeKey) -> Self {
        Self {
            inner: NamespacedKeyInner {
                prefix: prefix.into(),
                key,
            },
        }
    }

    /// Encode to the string handed to the backend: `prefix + key`.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.inner.prefix.len() + self.inner.key.as_str().len());
        out.push_str(&self.inner.prefix);
        out.push_str(self.inner.key.as_str());
        out
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.inner.prefix, self.inner.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> SequenceNodeKey {
        SequenceNodeKey::parse("0123456789abcdef0123456789abcdef").expect("valid key")
    }

    #[test]
    fn test_encode_prepends_prefix() {
        let key = NamespacedKey::new(DEFAULT_KEY_PREFIX, sample_key());
        assert_eq!(key.encode(), "SEQN:0123456789abcdef0123456789abcdef");
        assert_eq!(key.to_string(), key.encode());
    }

    #[test]
    fn test_custom_prefix() {
        let key = NamespacedKey::new("TEST:", sample_key());
        assert_eq!(key.encode(), "TEST:0123456789abcdef0123456789abcdef");
    }
}
