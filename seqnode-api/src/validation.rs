//! Identifier envelope validation.
//!
//! The envelope contract is a JSON Schema (draft 2020-12). A single compiled
//! schema answers "is this valid?" cheaply; when it says no, each field rule
//! is checked on its own so the error lists every violated field rather
//! than the first one the schema engine trips over.

use jsonschema::Validator;
use seqnode_core::{
    FieldViolation, SequenceNodeIdentifier, ValidationError, SEQUENCE_NODE_TYPE,
};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};

/// One field of the envelope and the sub-schema it must satisfy.
struct FieldRule {
    pointer: &'static str,
    required: bool,
    /// Only checked when this pointer resolves to an object.
    within: Option<&'static str>,
    schema: Value,
    reason: &'static str,
}

struct CompiledRule {
    rule: FieldRule,
    validator: Validator,
}

fn non_empty_string() -> Value {
    json!({ "type": "string", "minLength": 1 })
}

fn field_rules(require_url: bool) -> Vec<FieldRule> {
    vec![
        FieldRule {
            pointer: "/header",
            required: true,
            within: None,
            schema: json!({ "type": "object", "additionalProperties": { "type": "string" } }),
            reason: "must be an object of string values",
        },
        FieldRule {
            pointer: "/content",
            required: true,
            within: None,
            schema: json!({ "type": "object" }),
            reason: "must be an object",
        },
        FieldRule {
            pointer: "/content/@context",
            required: true,
            within: Some("/content"),
            schema: non_empty_string(),
            reason: "must be a non-empty string",
        },
        FieldRule {
            pointer: "/content/@type",
            required: true,
            within: Some("/content"),
            schema: json!({ "const": SEQUENCE_NODE_TYPE }),
            reason: "must equal \"SequenceNode\"",
        },
        FieldRule {
            pointer: "/content/targetBinding",
            required: true,
            within: Some("/content"),
            schema: non_empty_string(),
            reason: "must be a non-empty string",
        },
        FieldRule {
            pointer: "/url",
            required: require_url,
            within: None,
            schema: non_empty_string(),
            reason: "must be a non-empty string",
        },
        FieldRule {
            pointer: "/method",
            required: true,
            within: None,
            schema: json!({ "enum": ["GET", "POST"] }),
            reason: "must be \"GET\" or \"POST\"",
        },
    ]
}

/// Assemble the full envelope schema from the field rules.
fn envelope_schema(rules: &[FieldRule]) -> Value {
    let mut top_props = serde_json::Map::new();
    let mut top_required = Vec::new();
    let mut content_props = serde_json::Map::new();
    let mut content_required = Vec::new();

    for rule in rules {
        match rule.pointer.strip_prefix("/content/") {
            Some(name) => {
                content_props.insert(name.to_string(), rule.schema.clone());
                if rule.required {
                    content_required.push(name.to_string());
                }
            }
            None => {
                let name = rule.pointer.trim_start_matches('/');
                top_props.insert(name.to_string(), rule.schema.clone());
                if rule.required {
                    top_required.push(name.to_string());
                }
            }
        }
    }

    if let Some(content) = top_props.get_mut("content") {
        *content = json!({
            "type": "object",
            "properties": content_props,
            "required": content_required,
        });
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": top_props,
        "required": top_required,
    })
}

fn compile(schema: &Value) -> ApiResult<Validator> {
    jsonschema::draft202012::new(schema)
        .map_err(|e| ApiError::internal_error(format!("Invalid schema: {}", e)))
}

/// Validates identifier envelopes before any upstream work.
pub struct IdentifierValidator {
    envelope: Validator,
    rules: Vec<CompiledRule>,
}

impl IdentifierValidator {
    /// Build a validator. `url` is required only when no default upstream
    /// URL is available to fall back on.
    pub fn new(require_url: bool) -> ApiResult<Self> {
        let rules = field_rules(require_url);
        let schema = envelope_schema(&rules);
        let envelope = compile(&schema)?;
        let rules = rules
            .into_iter()
            .map(|rule| {
                let validator = compile(&rule.schema)?;
                Ok(CompiledRule { rule, validator })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(Self { envelope, rules })
    }

    pub fn validate(&self, identifier: &SequenceNodeIdentifier) -> Result<(), ValidationError> {
        let value = serde_json::to_value(identifier).map_err(|e| {
            ValidationError::new(vec![FieldViolation::new("", e.to_string())])
        })?;
        self.validate_value(&value)
    }

    /// Validate a raw envelope, reporting every violated field.
    pub fn validate_value(&self, envelope: &Value) -> Result<(), ValidationError> {
        if self.envelope.is_valid(envelope) {
            return Ok(());
        }

        if !envelope.is_object() {
            return Err(ValidationError::new(vec![FieldViolation::new(
                "",
                "must be an object",
            )]));
        }

        let mut violations = Vec::new();
        for compiled in &self.rules {
            let rule = &compiled.rule;
            if let Some(parent) = rule.within {
                if !envelope.pointer(parent).is_some_and(Value::is_object) {
                    continue;
                }
            }
            match envelope.pointer(rule.pointer) {
                None if rule.required => {
                    violations.push(FieldViolation::new(rule.pointer, "is required"));
                }
                None => {}
                Some(value) if !compiled.validator.is_valid(value) => {
                    violations.push(FieldViolation::new(rule.pointer, rule.reason));
                }
                Some(_) => {}
            }
        }

        // Anything the field rules did not explain is reported as-is
        if violations.is_empty() {
            violations = self
                .envelope
                .iter_errors(envelope)
                .map(|e| FieldViolation::new("", e.to_string()))
                .collect();
        }

        Err(ValidationError::new(violations))
    }
}

impl std::fmt::Debug for IdentifierValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierValidator")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed() -> Value {
        json!({
            "header": { "Hub-Session": "hub-123" },
            "content": {
                "@context": "https://schema.example/sequence",
                "@type": "SequenceNode",
                "targetBinding": "activity-1"
            },
            "url": "https://hub.example/sequence-nodes",
            "method": "POST"
        })
    }

    fn validator() -> IdentifierValidator {
        IdentifierValidator::new(true).expect("static schemas compile")
    }

    fn fields_of(err: &ValidationError) -> Vec<&str> {
        err.fields()
    }

    #[test]
    fn test_accepts_well_formed() {
        assert!(validator().validate_value(&well_formed()).is_ok());
    }

    #[test]
    fn test_accepts_typed_identifier() {
        let id: SequenceNodeIdentifier = serde_json::from_value(well_formed()).expect("parses");
        assert!(validator().validate(&id).is_ok());
    }

    #[test]
    fn test_rejects_wrong_type() {
        let mut envelope = well_formed();
        envelope["content"]["@type"] = json!("WrongType");
        let err = validator().validate_value(&envelope).expect_err("wrong type");
        assert_eq!(fields_of(&err), vec!["/content/@type"]);
    }

    #[test]
    fn test_reports_every_violated_field() {
        let envelope = json!({
            "content": { "@type": "WrongType", "@context": "" },
            "method": "DELETE"
        });
        let err = validator().validate_value(&envelope).expect_err("invalid");
        assert_eq!(
            fields_of(&err),
            vec![
                "/header",
                "/content/@context",
                "/content/@type",
                "/content/targetBinding",
                "/url",
                "/method",
            ]
        );
    }

    #[test]
    fn test_missing_content_does_not_report_children() {
        let mut envelope = well_formed();
        envelope.as_object_mut().expect("object").remove("content");
        let err = validator().validate_value(&envelope).expect_err("invalid");
        assert_eq!(fields_of(&err), vec!["/content"]);
    }

    #[test]
    fn test_url_optional_with_default() {
        let mut envelope = well_formed();
        envelope.as_object_mut().expect("object").remove("url");

        assert!(validator().validate_value(&envelope).is_err());
        let lenient = IdentifierValidator::new(false).expect("static schemas compile");
        assert!(lenient.validate_value(&envelope).is_ok());
    }

    #[test]
    fn test_node_index_is_unconstrained() {
        let mut envelope = well_formed();
        for index in [json!(3), json!("2"), json!(-1), json!(null), json!({"page": 1})] {
            envelope["content"]["nodeIndex"] = index;
            assert!(validator().validate_value(&envelope).is_ok());
        }
    }

    #[test]
    fn test_header_values_must_be_strings() {
        let mut envelope = well_formed();
        envelope["header"] = json!({ "Hub-Session": 42 });
        let err = validator().validate_value(&envelope).expect_err("numeric header");
        assert_eq!(fields_of(&err), vec!["/header"]);
    }

    #[test]
    fn test_non_object_envelope() {
        let err = validator().validate_value(&json!([1, 2])).expect_err("array");
        assert_eq!(err.violations.len(), 1);
    }
}
