//! Canonical JSON serialization.
//!
//! Objects are emitted with keys in byte order and no insignificant
//! whitespace, so two structurally equal values always produce the same
//! bytes no matter how their maps were built.

use serde_json::Value;

/// Serialize a JSON value to its canonical string form.
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            // Display on scalars is compact JSON with proper string escaping.
            out.push_str(&value.to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::to_canonical_json;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(to_canonical_json(&json!(null)), "null");
        assert_eq!(to_canonical_json(&json!(true)), "true");
        assert_eq!(to_canonical_json(&json!(123)), "123");
        assert_eq!(to_canonical_json(&json!("node")), "\"node\"");
    }

    #[test]
    fn test_array_order_is_preserved() {
        let val = json!([3, "a", false]);
        assert_eq!(to_canonical_json(&val), "[3,\"a\",false]");
    }

    #[test]
    fn test_object_keys_sorted() {
        let val = json!({"targetBinding": "x", "@type": "SequenceNode", "@context": "c"});
        assert_eq!(
            to_canonical_json(&val),
            "{\"@context\":\"c\",\"@type\":\"SequenceNode\",\"targetBinding\":\"x\"}"
        );
    }

    #[test]
    fn test_nested_and_escaped() {
        let val = json!({"z": [{"y": "quote\"d"}, null], "a": {"x": 10}});
        assert_eq!(
            to_canonical_json(&val),
            "{\"a\":{\"x\":10},\"z\":[{\"y\":\"quote\\\"d\"},null]}"
        );
    }
}
