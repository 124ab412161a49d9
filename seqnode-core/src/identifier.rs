//! Sequence node identifier envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Literal that `content["@type"]` must carry.
pub const SEQUENCE_NODE_TYPE: &str = "SequenceNode";

/// Header that carries the opaque hub session token.
pub const HUB_SESSION_HEADER: &str = "Hub-Session";

/// Caller-supplied description of which remote sequence node to retrieve.
///
/// Every field is optional at the type level so that a malformed envelope
/// still deserializes and the validator can report all problems at once.
/// Absent fields are omitted when serialized, which keeps key derivation
/// independent of how the caller spelled "missing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceNodeIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl SequenceNodeIdentifier {
    pub fn new(
        header: BTreeMap<String, String>,
        content: Value,
        url: impl Into<String>,
        method: HttpMethod,
    ) -> Self {
        Self {
            header: Some(header),
            content: Some(content),
            url: Some(url.into()),
            method: Some(method.as_str().to_string()),
        }
    }

    /// Hub session token from the header map, matched case-insensitively.
    pub fn hub_session(&self) -> Option<&str> {
        self.header.as_ref().and_then(|header| {
            header
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(HUB_SESSION_HEADER))
                .map(|(_, value)| value.as_str())
        })
    }

    /// Parsed request method, if present and supported.
    pub fn http_method(&self) -> Option<HttpMethod> {
        self.method.as_deref().and_then(|m| m.parse().ok())
    }
}

/// Methods the upstream accepts for sequence node retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!("unsupported method '{}'", other)),
        }
    }
}
