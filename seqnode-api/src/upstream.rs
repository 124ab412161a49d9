//! Upstream client for the authoritative sequence node service.
//!
//! One request per cache miss. Method, URL, headers and JSON body are all
//! supplied by the caller; the client adds nothing but a timeout.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use seqnode_core::{HttpMethod, UpstreamError};
use serde_json::Value;

use crate::config::StatusPolicy;
use crate::error::{ApiError, ApiResult};

/// Longest slice of an error body carried into an `UpstreamError` cause.
const MAX_CAUSE_LEN: usize = 512;

/// A fully resolved upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// The authoritative source a cache miss falls back to.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Perform exactly one request and return the parsed response body.
    async fn fetch(&self, request: UpstreamRequest) -> Result<Value, UpstreamError>;
}

/// `reqwest`-backed upstream client.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    timeout: Duration,
    status_policy: StatusPolicy,
}

impl HttpUpstreamClient {
    pub fn new(timeout: Duration, status_policy: StatusPolicy) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            status_policy,
        })
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.status_policy
    }

    fn transport_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::transport(format!(
                "upstream request timed out after {}ms",
                self.timeout.as_millis()
            ))
        } else {
            UpstreamError::transport(err)
        }
    }
}

fn truncate_cause(body: &str) -> String {
    if body.len() <= MAX_CAUSE_LEN {
        return body.to_string();
    }
    let mut end = MAX_CAUSE_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn fetch(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!(method = %request.method, url = %request.url, "Sending upstream request");

        let response = builder
            .json(&request.body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            match self.status_policy {
                StatusPolicy::Strict => {
                    tracing::warn!(
                        url = %request.url,
                        status = status.as_u16(),
                        "Upstream returned non-success status"
                    );
                    let cause = if text.trim().is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("upstream error")
                            .to_string()
                    } else {
                        truncate_cause(&text)
                    };
                    return Err(UpstreamError::status(status.as_u16(), cause));
                }
                StatusPolicy::PassThrough => {
                    tracing::debug!(
                        url = %request.url,
                        status = status.as_u16(),
                        "Passing through non-success upstream body"
                    );
                }
            }
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| UpstreamError::transport(format!("invalid JSON from upstream: {}", e)))
    }
}
