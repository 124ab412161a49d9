//! Seqnode Test Utilities
//!
//! Centralized test infrastructure for the seqnode workspace:
//! - Call-counting mock upstream
//! - Fault-injecting cache store
//! - Proptest generators for identifiers
//! - Test fixtures for common scenarios
//! - Custom assertions for sequence node results

pub use seqnode_api::{ProviderConfig, SequenceNodeProvider, UpstreamClient, UpstreamRequest};
pub use seqnode_core::{
    CacheEntry, CacheError, HttpMethod, RetrievalResult, SeqnError, SeqnResult,
    SequenceNodeIdentifier, SequenceNodeKey, UpstreamError,
};
pub use seqnode_storage::{CacheStats, InMemoryStore, KeyValueStore};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// MOCK UPSTREAM
// ============================================================================

/// Upstream double that counts calls and replays a configured outcome.
pub struct MockUpstream {
    outcome: Mutex<Result<Value, UpstreamError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl MockUpstream {
    /// Answer every request with `body`.
    pub fn returning(body: Value) -> Self {
        Self {
            outcome: Mutex::new(Ok(body)),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request with `error`.
    pub fn failing(error: UpstreamError) -> Self {
        Self {
            outcome: Mutex::new(Err(error)),
            ..Self::returning(Value::Null)
        }
    }

    /// Sleep before answering, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn fetch(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.outcome).clone()
    }
}

// ============================================================================
// FAULT-INJECTING STORE
// ============================================================================

/// Store wrapper that can be told to fail reads or writes and counts calls.
pub struct FaultInjectingStore {
    inner: Arc<dyn KeyValueStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl FaultInjectingStore {
    pub fn new() -> Self {
        Self::wrapping(Arc::new(InMemoryStore::new()))
    }

    pub fn wrapping(inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// A store that is unreachable for reads and writes.
    pub fn unreachable() -> Self {
        let store = Self::new();
        store.set_fail_reads(true);
        store.set_fail_writes(true);
        store
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set` calls, including failed ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for FaultInjectingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for FaultInjectingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::transport("injected read failure"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::transport("injected write failure"));
        }
        self.inner.set(key, value).await
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::transport("injected delete failure"));
        }
        self.inner.del(key).await
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::transport("injected stats failure"));
        }
        self.inner.stats().await
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.inner.close().await
    }

    fn backend_name(&self) -> &'static str {
        "fault-injecting"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for identifiers.

    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    pub fn arb_method() -> impl Strategy<Value = HttpMethod> {
        prop_oneof![Just(HttpMethod::Get), Just(HttpMethod::Post)]
    }

    pub fn arb_header() -> impl Strategy<Value = BTreeMap<String, String>> {
        (
            prop::option::of("[a-z0-9]{8,16}"),
            prop::collection::btree_map("X-[A-Za-z]{1,8}", "[ -~]{0,16}", 0..3),
        )
            .prop_map(|(session, mut extra)| {
                if let Some(session) = session {
                    extra.insert(super::fixtures::HUB_SESSION.to_string(), session);
                }
                extra
            })
    }

    pub fn arb_content() -> impl Strategy<Value = Value> {
        (
            "[a-z]{3,8}://[a-z]{3,10}\\.example/ctx",
            "[a-z0-9-]{1,24}",
            prop::option::of(0u32..1000),
        )
            .prop_map(|(context, binding, node_index)| {
                let mut content = json!({
                    "@context": context,
                    "@type": "SequenceNode",
                    "targetBinding": binding,
                });
                if let Some(index) = node_index {
                    content["nodeIndex"] = json!(index);
                }
                content
            })
    }

    pub fn arb_url() -> impl Strategy<Value = String> {
        "https://[a-z]{3,10}\\.example/[a-z]{1,12}"
    }

    /// Identifiers that pass validation.
    pub fn arb_identifier() -> impl Strategy<Value = SequenceNodeIdentifier> {
        (arb_header(), arb_content(), arb_url(), arb_method()).prop_map(
            |(header, content, url, method)| {
                SequenceNodeIdentifier::new(header, content, url, method)
            },
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    pub const HUB_SESSION: &str = "Hub-Session";
    pub const FIXTURE_SESSION: &str = "hub-session-1234";
    pub const FIXTURE_URL: &str = "https://hub.example/sequence-nodes";

    pub fn well_formed_content() -> Value {
        json!({
            "@context": "https://schema.example/sequence",
            "@type": "SequenceNode",
            "targetBinding": "activity-42",
            "nodeIndex": 0
        })
    }

    /// A valid identifier carrying a hub session header.
    pub fn well_formed_identifier() -> SequenceNodeIdentifier {
        let mut header = BTreeMap::new();
        header.insert(HUB_SESSION.to_string(), FIXTURE_SESSION.to_string());
        SequenceNodeIdentifier::new(header, well_formed_content(), FIXTURE_URL, HttpMethod::Post)
    }

    /// A valid identifier with no hub session header.
    pub fn sessionless_identifier() -> SequenceNodeIdentifier {
        SequenceNodeIdentifier::new(
            BTreeMap::new(),
            well_formed_content(),
            FIXTURE_URL,
            HttpMethod::Get,
        )
    }

    /// A well-formed identifier whose `@type` is wrong.
    pub fn identifier_with_type(node_type: &str) -> SequenceNodeIdentifier {
        let mut identifier = well_formed_identifier();
        if let Some(content) = identifier.content.as_mut() {
            content["@type"] = json!(node_type);
        }
        identifier
    }

    /// The upstream body used throughout the provider tests.
    pub fn upstream_body() -> Value {
        json!({"foo": "bar"})
    }

    /// Provider over `store` and `upstream` with default configuration.
    pub fn provider_with(
        config: &ProviderConfig,
        store: Arc<dyn KeyValueStore>,
        upstream: Arc<MockUpstream>,
    ) -> SequenceNodeProvider {
        match SequenceNodeProvider::new(config, store, upstream) {
            Ok(provider) => provider,
            Err(e) => panic!("fixture provider failed to build: {}", e),
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for sequence node results.

    use super::*;

    /// Assert a validation error naming exactly `fields`, in order.
    #[track_caller]
    pub fn assert_validation_fields<T: std::fmt::Debug>(result: &SeqnResult<T>, fields: &[&str]) {
        match result {
            Err(SeqnError::Validation(e)) => assert_eq!(e.fields(), fields),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert an upstream error with the given status.
    #[track_caller]
    pub fn assert_upstream_status<T: std::fmt::Debug>(result: &SeqnResult<T>, status: u16) {
        match result {
            Err(SeqnError::Upstream(e)) => assert_eq!(e.status_code, status),
            other => panic!("Expected Upstream error, got: {:?}", other),
        }
    }

    /// Assert a NotFound error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &SeqnResult<T>) {
        match result {
            Err(SeqnError::NotFound { .. }) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert a retrieval came from the given source with the given content.
    #[track_caller]
    pub fn assert_retrieved(result: &RetrievalResult, content: &Value, from_cache: bool) {
        assert_eq!(&result.sequence_node_content, content);
        assert_eq!(result.from_cache, from_cache, "unexpected fromCache flag");
    }
}
