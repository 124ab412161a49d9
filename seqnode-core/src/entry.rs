//! Cached sequence node entries and retrieval results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CacheError;
use crate::key::SequenceNodeKey;

/// Value stored in the cache for one sequence node key.
///
/// Wire format: `{"hubSession": <string|null>, "sequenceNodeContent": <object>}`.
/// Content is never null; both construction and decoding enforce that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CacheEntryWire")]
pub struct CacheEntry {
    hub_session: Option<String>,
    sequence_node_content: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntryWire {
    #[serde(default)]
    hub_session: Option<String>,
    #[serde(default)]
    sequence_node_content: Value,
}

impl TryFrom<CacheEntryWire> for CacheEntry {
    type Error = CacheError;

    fn try_from(wire: CacheEntryWire) -> Result<Self, Self::Error> {
        CacheEntry::new(wire.hub_session, wire.sequence_node_content)
    }
}

impl CacheEntry {
    pub fn new(hub_session: Option<String>, sequence_node_content: Value) -> Result<Self, CacheError> {
        if sequence_node_content.is_null() {
            return Err(CacheError::MissingContent);
        }
        Ok(Self {
            hub_session,
            sequence_node_content,
        })
    }

    pub fn hub_session(&self) -> Option<&str> {
        self.hub_session.as_deref()
    }

    pub fn sequence_node_content(&self) -> &Value {
        &self.sequence_node_content
    }

    pub fn into_content(self) -> Value {
        self.sequence_node_content
    }

    /// Same session, different content. Null content is rejected.
    pub fn with_content(&self, sequence_node_content: Value) -> Result<Self, CacheError> {
        Self::new(self.hub_session.clone(), sequence_node_content)
    }
}

/// Outcome of a successful retrieval.
///
/// `from_cache` is a debugging signal and never affects correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub sequence_node_key: SequenceNodeKey,
    pub sequence_node_content: Value,
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_rejects_null_content() {
        assert_eq!(
            CacheEntry::new(None, Value::Null),
            Err(CacheError::MissingContent)
        );
    }

    #[test]
    fn test_entry_wire_format() {
        let entry = CacheEntry::new(Some("hub".into()), json!({"foo": "bar"}))
            .expect("content present");
        let wire = serde_json::to_value(&entry).expect("entry serializes");
        assert_eq!(
            wire,
            json!({"hubSession": "hub", "sequenceNodeContent": {"foo": "bar"}})
        );
    }

    #[test]
    fn test_entry_null_session_serializes_as_null() {
        let entry = CacheEntry::new(None, json!({"foo": "bar"})).expect("content present");
        let wire = serde_json::to_value(&entry).expect("entry serializes");
        assert_eq!(wire["hubSession"], Value::Null);
    }

    #[test]
    fn test_decode_rejects_missing_content() {
        let decoded = serde_json::from_str::<CacheEntry>(r#"{"hubSession":"x"}"#);
        assert!(decoded.is_err());
    }

    #[test]
    fn test_retrieval_result_camel_case() {
        let key = SequenceNodeKey::parse(&"0".repeat(32)).expect("valid key");
        let result = RetrievalResult {
            sequence_node_key: key,
            sequence_node_content: json!({"foo": "bar"}),
            from_cache: false,
        };
        let wire = serde_json::to_value(&result).expect("result serializes");
        assert_eq!(wire["fromCache"], json!(false));
        assert_eq!(wire["sequenceNodeKey"], json!("0".repeat(32)));
    }
}
