//! Property-Based Tests for Sequence Node Key Derivation
//!
//! **Property 1: Determinism**
//! Structurally identical identifiers derive identical keys, whatever the
//! order their fields were written in.
//!
//! **Property 2: Sensitivity**
//! Identifiers that differ in header, content, url or method derive
//! different keys.

use proptest::prelude::*;
use seqnode_core::{derive_key, SequenceNodeIdentifier, SequenceNodeKey, KEY_HEX_LEN};
use serde_json::{json, Value};

// ============================================================================
// PROPERTY TEST STRATEGIES
// ============================================================================

/// Strategy for header maps, as ordered (name, value) pairs.
fn header_pairs_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[A-Za-z][A-Za-z-]{0,12}", "[ -~]{0,24}", 0..6)
        .prop_map(|m| m.into_iter().collect())
}

/// Strategy for content documents, as ordered (name, value) pairs.
fn content_pairs_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    (
        "[a-z]{1,10}:[a-z/.]{1,20}",
        "[a-z0-9-]{1,20}",
        prop::option::of(0u32..500),
    )
        .prop_map(|(context, binding, node_index)| {
            let mut pairs = vec![
                ("@context".to_string(), json!(context)),
                ("@type".to_string(), json!("SequenceNode")),
                ("targetBinding".to_string(), json!(binding)),
            ];
            if let Some(index) = node_index {
                pairs.push(("nodeIndex".to_string(), json!(index)));
            }
            pairs
        })
}

fn url_strategy() -> impl Strategy<Value = String> {
    "https://[a-z]{3,10}\\.example/[a-z]{1,10}"
}

fn method_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("GET"), Just("POST")]
}

/// Render an object by hand so the field order in the text is controlled.
fn render_object<V: serde::Serialize>(pairs: &[(String, V)], reversed: bool) -> String {
    let mut rendered: Vec<String> = pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}:{}",
                serde_json::to_string(k).expect("key renders"),
                serde_json::to_string(v).expect("value renders")
            )
        })
        .collect();
    if reversed {
        rendered.reverse();
    }
    format!("{{{}}}", rendered.join(","))
}

fn render_identifier(
    header: &[(String, String)],
    content: &[(String, Value)],
    url: &str,
    method: &str,
    reversed: bool,
) -> String {
    let mut fields = vec![
        format!("\"header\":{}", render_object(header, reversed)),
        format!("\"content\":{}", render_object(content, reversed)),
        format!("\"url\":{}", serde_json::to_string(url).expect("url renders")),
        format!("\"method\":\"{}\"", method),
    ];
    if reversed {
        fields.reverse();
    }
    format!("{{{}}}", fields.join(","))
}

fn parse(text: &str) -> SequenceNodeIdentifier {
    serde_json::from_str(text).expect("rendered identifier parses")
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_key_independent_of_field_order(
        header in header_pairs_strategy(),
        content in content_pairs_strategy(),
        url in url_strategy(),
        method in method_strategy(),
    ) {
        let forward = parse(&render_identifier(&header, &content, &url, method, false));
        let backward = parse(&render_identifier(&header, &content, &url, method, true));

        let a = derive_key(&forward).expect("key derives");
        let b = derive_key(&backward).expect("key derives");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_key_is_fixed_length_hex(
        header in header_pairs_strategy(),
        content in content_pairs_strategy(),
        url in url_strategy(),
        method in method_strategy(),
    ) {
        let id = parse(&render_identifier(&header, &content, &url, method, false));
        let key = derive_key(&id).expect("key derives");
        prop_assert_eq!(key.as_str().len(), KEY_HEX_LEN);
        prop_assert!(SequenceNodeKey::parse(key.as_str()).is_ok());
    }

    #[test]
    fn prop_key_changes_with_url(
        header in header_pairs_strategy(),
        content in content_pairs_strategy(),
        url_a in url_strategy(),
        url_b in url_strategy(),
        method in method_strategy(),
    ) {
        prop_assume!(url_a != url_b);
        let a = parse(&render_identifier(&header, &content, &url_a, method, false));
        let b = parse(&render_identifier(&header, &content, &url_b, method, false));
        prop_assert_ne!(derive_key(&a).expect("key derives"), derive_key(&b).expect("key derives"));
    }

    #[test]
    fn prop_key_changes_with_content(
        header in header_pairs_strategy(),
        content_a in content_pairs_strategy(),
        content_b in content_pairs_strategy(),
        url in url_strategy(),
        method in method_strategy(),
    ) {
        prop_assume!(content_a != content_b);
        let a = parse(&render_identifier(&header, &content_a, &url, method, false));
        let b = parse(&render_identifier(&header, &content_b, &url, method, false));
        prop_assert_ne!(derive_key(&a).expect("key derives"), derive_key(&b).expect("key derives"));
    }

    #[test]
    fn prop_key_changes_with_header(
        header_a in header_pairs_strategy(),
        header_b in header_pairs_strategy(),
        content in content_pairs_strategy(),
        url in url_strategy(),
        method in method_strategy(),
    ) {
        prop_assume!(header_a != header_b);
        let a = parse(&render_identifier(&header_a, &content, &url, method, false));
        let b = parse(&render_identifier(&header_b, &content, &url, method, false));
        prop_assert_ne!(derive_key(&a).expect("key derives"), derive_key(&b).expect("key derives"));
    }
}

#[test]
fn test_method_changes_key() {
    let content = vec![
        ("@context".to_string(), json!("ctx")),
        ("@type".to_string(), json!("SequenceNode")),
        ("targetBinding".to_string(), json!("tb")),
    ];
    let get = parse(&render_identifier(&[], &content, "https://hub.example/seq", "GET", false));
    let post = parse(&render_identifier(&[], &content, "https://hub.example/seq", "POST", false));
    assert_ne!(derive_key(&get).ok(), derive_key(&post).ok());
}
