//! # Schema Engines and Router
//!
//! Validates one values tree against one schema document.
//!
//! ## Flow
//!
//! 1. The values are canonicalized ([`CanonicalJson`]); failure is fatal.
//! 2. The schema's declared dialect selects an [`Engine`] through the
//!    router's [`DialectPolicy`].
//! 3. The selected engine compiles the schema and collects every
//!    violation, in the engine's reporting order.
//!
//! ## Engines
//!
//! Both engines are backed by the `jsonschema` crate and never fetch
//! remote resources; every `$ref` outside the document is an error.
//!
//! - [`LegacyEngine`] pins the draft (see [`legacy_draft`]) and renders
//!   violations as `- <field>: <message>` lines.
//! - [`ModernEngine`] registers the schema under its own `$id`, or
//!   [`MODERN_SCHEMA_RESOURCE`] when it has none, lets the declared
//!   `$schema` pick the draft, and renders violations under a single
//!   `jsonschema validation failed with '<resource>#'` header.
//!
//! Each engine call runs inside a fault boundary: a panic inside the
//! engine becomes [`EngineOutcome::Fault`] instead of unwinding further.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use chartval_core::{CanonicalJson, ConversionError, SchemaDocument, Values};
use jsonschema::{Retrieve, Uri, Validator};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::dialect::{legacy_draft, DialectPolicy, Engine};

/// Synthetic resource identifier the modern engine compiles schemas under.
pub const MODERN_SCHEMA_RESOURCE: &str = "file:///values.schema.json";

/// Refuses every external `$ref`. Schemas are self-contained here.
struct OfflineRetriever;

impl Retrieve for OfflineRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("external schema reference '{}' cannot be resolved", uri.as_str()).into())
    }
}

/// Failure to validate one values tree against one schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The values do not conform to the schema.
    #[error("{0}")]
    Violations(Violations),

    /// The values could not be converted to canonical JSON.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The schema could not be parsed or compiled by the selected engine.
    #[error("malformed schema ({engine} engine): {reason}")]
    Malformed {
        /// The engine that rejected the schema.
        engine: Engine,
        /// Parser or compiler message.
        reason: String,
    },

    /// The engine failed unexpectedly while validating.
    #[error("unable to validate schema: {0}")]
    EngineFault(String),
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer path to the violating value in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl Violation {
    /// The instance path in dotted form (`image.tag`), or `(root)`.
    ///
    /// Pointer escapes are decoded, so a key `a/b` shows as `a/b`.
    pub fn field(&self) -> String {
        let trimmed = self.instance_path.trim_start_matches('/');
        if trimmed.is_empty() {
            return "(root)".to_string();
        }
        trimmed
            .split('/')
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// All violations reported by one engine for one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violations {
    engine: Engine,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    violations: Vec<Violation>,
}

impl Violations {
    pub fn new(engine: Engine, violations: Vec<Violation>) -> Self {
        Self {
            engine,
            resource: None,
            violations,
        }
    }

    /// Record the resource URI the schema was compiled under.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// The resource URI the modern engine reports violations against.
    pub fn resource(&self) -> &str {
        self.resource.as_deref().unwrap_or(MODERN_SCHEMA_RESOURCE)
    }

    /// The engine that produced these violations.
    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.engine {
            Engine::Legacy => {
                for v in &self.violations {
                    writeln!(f, "- {}: {}", v.field(), v.message)?;
                }
            }
            Engine::Modern => {
                writeln!(f, "jsonschema validation failed with '{}#'", self.resource())?;
                for v in &self.violations {
                    writeln!(f, "- at '{}': {}", v.instance_path, v.message)?;
                }
            }
        }
        Ok(())
    }
}

/// Result of one engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// The values conform to the schema.
    Valid,
    /// The values violate the schema.
    Invalid(Violations),
    /// The engine failed unexpectedly; carries the fault description.
    Fault(String),
}

/// Draft-04/06/07 engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyEngine;

impl LegacyEngine {
    /// Validate canonical values against a schema with legacy semantics.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Malformed` if the schema is not JSON or does
    /// not compile.
    pub fn run(values: &CanonicalJson, schema: &SchemaDocument) -> Result<EngineOutcome, SchemaError> {
        let mut schema_value = parse_schema(Engine::Legacy, schema)?;
        let draft = legacy_draft(&schema_value);
        // The draft is pinned; a declared dialect outside the built-in
        // drafts would otherwise be fetched as a meta-schema.
        if let Value::Object(map) = &mut schema_value {
            map.remove("$schema");
        }
        contain(|| {
            let validator = jsonschema::options()
                .with_draft(draft)
                .with_retriever(OfflineRetriever)
                .build(&schema_value)
                .map_err(|e| SchemaError::Malformed {
                    engine: Engine::Legacy,
                    reason: e.to_string(),
                })?;
            Ok(collect(Engine::Legacy, &validator, values.as_value()))
        })
    }
}

/// Engine for every dialect outside the legacy carve-out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModernEngine;

impl ModernEngine {
    /// Validate canonical values against a schema, letting `$schema` pick
    /// the draft.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Malformed` if the schema is not JSON, declares
    /// a dialect the engine cannot load, or does not compile.
    pub fn run(values: &CanonicalJson, schema: &SchemaDocument) -> Result<EngineOutcome, SchemaError> {
        let mut schema_value = parse_schema(Engine::Modern, schema)?;
        let mut resource = MODERN_SCHEMA_RESOURCE.to_string();
        if let Value::Object(map) = &mut schema_value {
            match map.get("$id").and_then(Value::as_str) {
                Some(id) => resource = id.trim_end_matches('#').to_string(),
                None => {
                    map.insert("$id".to_string(), Value::String(resource.clone()));
                }
            }
        }
        let outcome = contain(|| {
            let validator = jsonschema::options()
                .with_retriever(OfflineRetriever)
                .build(&schema_value)
                .map_err(|e| SchemaError::Malformed {
                    engine: Engine::Modern,
                    reason: e.to_string(),
                })?;
            Ok(collect(Engine::Modern, &validator, values.as_value()))
        })?;
        Ok(match outcome {
            EngineOutcome::Invalid(violations) => {
                EngineOutcome::Invalid(violations.with_resource(resource))
            }
            other => other,
        })
    }
}

fn parse_schema(engine: Engine, schema: &SchemaDocument) -> Result<Value, SchemaError> {
    schema.parse().map_err(|e| SchemaError::Malformed {
        engine,
        reason: format!("invalid JSON: {e}"),
    })
}

fn collect(engine: Engine, validator: &Validator, instance: &Value) -> EngineOutcome {
    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|e| Violation {
            instance_path: e.instance_path.to_string(),
            schema_path: e.schema_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        EngineOutcome::Valid
    } else {
        EngineOutcome::Invalid(Violations::new(engine, violations))
    }
}

/// Run an engine call, turning a panic into `EngineOutcome::Fault`.
fn contain<F>(call: F) -> Result<EngineOutcome, SchemaError>
where
    F: FnOnce() -> Result<EngineOutcome, SchemaError>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Ok(EngineOutcome::Fault(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown engine fault".to_string()
    }
}

/// Routes each schema to its engine.
#[derive(Debug, Clone, Default)]
pub struct SchemaRouter {
    policy: DialectPolicy,
}

impl SchemaRouter {
    pub fn new(policy: DialectPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DialectPolicy {
        &self.policy
    }

    /// The engine this router would use for `schema`.
    pub fn select(&self, schema: &SchemaDocument) -> Engine {
        self.policy.select(schema)
    }

    /// Validate a values tree against one schema document.
    ///
    /// # Errors
    ///
    /// - `SchemaError::Violations` if the values do not conform.
    /// - `SchemaError::Conversion` if the values have no JSON form.
    /// - `SchemaError::Malformed` if the schema cannot be parsed or compiled.
    /// - `SchemaError::EngineFault` if the engine failed unexpectedly.
    pub fn validate(&self, values: &Values, schema: &SchemaDocument) -> Result<(), SchemaError> {
        let canonical = CanonicalJson::from_values(values)?;
        let engine = self.select(schema);
        tracing::trace!(%engine, "selected schema engine");

        let outcome = match engine {
            Engine::Legacy => LegacyEngine::run(&canonical, schema)?,
            Engine::Modern => ModernEngine::run(&canonical, schema)?,
        };

        match outcome {
            EngineOutcome::Valid => Ok(()),
            EngineOutcome::Invalid(violations) => Err(SchemaError::Violations(violations)),
            EngineOutcome::Fault(reason) => Err(SchemaError::EngineFault(reason)),
        }
    }
}

/// Validate values against one schema with the default dialect policy.
pub fn validate_against_single_schema(
    values: &Values,
    schema: &SchemaDocument,
) -> Result<(), SchemaError> {
    SchemaRouter::default().validate(values, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";
    const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

    fn values(v: Value) -> Values {
        Values::try_from(v).expect("object values")
    }

    fn schema(v: Value) -> SchemaDocument {
        SchemaDocument::from_json(&v)
    }

    #[test]
    fn test_required_property_missing() {
        let s = schema(json!({"type": "object", "required": ["a"]}));
        let err = validate_against_single_schema(&values(json!({})), &s).unwrap_err();
        match &err {
            SchemaError::Violations(v) => {
                assert_eq!(v.engine(), Engine::Legacy);
                assert_eq!(v.len(), 1);
                assert!(v.violations()[0].message.contains("\"a\""));
            }
            other => panic!("Expected Violations, got: {other}"),
        }
        let text = err.to_string();
        assert!(text.starts_with("- (root): "), "got: {text}");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_required_property_present() {
        let s = schema(json!({"type": "object", "required": ["a"]}));
        validate_against_single_schema(&values(json!({"a": 1})), &s).unwrap();
    }

    #[test]
    fn test_null_values_checked_as_empty_object() {
        let s = schema(json!({"type": "object"}));
        validate_against_single_schema(&Values::null(), &s).unwrap();
        validate_against_single_schema(&Values::new(), &s).unwrap();
    }

    #[test]
    fn test_legacy_reports_every_violation() {
        let s = schema(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "replicas": {"type": "integer"},
                "image": {
                    "type": "object",
                    "properties": {"tag": {"type": "string"}}
                }
            }
        }));
        let v = values(json!({"replicas": "three", "image": {"tag": 5}}));
        let err = validate_against_single_schema(&v, &s).unwrap_err();
        let SchemaError::Violations(violations) = err else {
            panic!("Expected Violations");
        };
        assert_eq!(violations.len(), 3);
        let text = violations.to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().all(|l| l.starts_with("- ")));
        assert!(text.contains("- replicas: "), "got: {text}");
        assert!(text.contains("- image.tag: "), "got: {text}");
    }

    #[test]
    fn test_draft_07_uses_legacy_tuple_items() {
        // Array-form `items` is tuple validation in draft-07.
        let s = schema(json!({
            "$schema": DRAFT_07,
            "type": "object",
            "properties": {
                "list": {"type": "array", "items": [{"type": "string"}]}
            }
        }));
        assert_eq!(SchemaRouter::default().select(&s), Engine::Legacy);
        validate_against_single_schema(&values(json!({"list": ["a", 2]})), &s).unwrap();
        let err = validate_against_single_schema(&values(json!({"list": [1]})), &s).unwrap_err();
        assert!(matches!(err, SchemaError::Violations(ref v) if v.engine() == Engine::Legacy));
    }

    #[test]
    fn test_undeclared_dialect_ignores_prefix_items() {
        // `prefixItems` is not a draft-07 keyword, so the legacy engine ignores it.
        let s = schema(json!({
            "type": "object",
            "properties": {
                "list": {"type": "array", "prefixItems": [{"type": "string"}]}
            }
        }));
        validate_against_single_schema(&values(json!({"list": [1]})), &s).unwrap();
    }

    #[test]
    fn test_2020_12_enforces_prefix_items() {
        let s = schema(json!({
            "$schema": DRAFT_2020_12,
            "type": "object",
            "properties": {
                "list": {"type": "array", "prefixItems": [{"type": "string"}]}
            }
        }));
        assert_eq!(SchemaRouter::default().select(&s), Engine::Modern);
        validate_against_single_schema(&values(json!({"list": ["a"]})), &s).unwrap();
        let err = validate_against_single_schema(&values(json!({"list": [1]})), &s).unwrap_err();
        let SchemaError::Violations(violations) = err else {
            panic!("Expected Violations");
        };
        assert_eq!(violations.engine(), Engine::Modern);
        let text = violations.to_string();
        assert!(text.starts_with(
            "jsonschema validation failed with 'file:///values.schema.json#'\n"
        ));
        assert!(text.contains("- at '/list/0': "), "got: {text}");
    }

    #[test]
    fn test_modern_malformed_schema() {
        let s = schema(json!({"$schema": DRAFT_2020_12, "type": 12}));
        let err = validate_against_single_schema(&values(json!({})), &s).unwrap_err();
        assert!(
            matches!(err, SchemaError::Malformed { engine: Engine::Modern, .. }),
            "Expected Malformed, got: {err}"
        );
    }

    #[test]
    fn test_unparsable_schema_is_malformed() {
        let s = SchemaDocument::from(r#"{"$schema": "https://json-schema.org/draft/2020-12/schema", "#);
        // Unparsable JSON declares nothing and falls to the legacy engine.
        let err = validate_against_single_schema(&values(json!({})), &s).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { engine: Engine::Legacy, .. }));
    }

    #[test]
    fn test_legacy_malformed_schema() {
        let s = schema(json!({"type": 12}));
        let err = validate_against_single_schema(&values(json!({})), &s).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { engine: Engine::Legacy, .. }));
    }

    #[test]
    fn test_external_ref_not_fetched() {
        let s = schema(json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://example.com/remote.schema.json"
        }));
        let err = validate_against_single_schema(&values(json!({})), &s).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }), "got: {err}");
    }

    #[test]
    fn test_schema_keeps_own_id() {
        let s = schema(json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/app.schema.json",
            "type": "object",
            "properties": {"port": {"$ref": "#/$defs/port"}},
            "$defs": {"port": {"type": "integer", "maximum": 65535}}
        }));
        validate_against_single_schema(&values(json!({"port": 8080})), &s).unwrap();
        let err = validate_against_single_schema(&values(json!({"port": 70000})), &s).unwrap_err();
        let SchemaError::Violations(violations) = err else {
            panic!("Expected Violations");
        };
        assert_eq!(violations.resource(), "https://example.com/app.schema.json");
        assert!(violations.to_string().starts_with(
            "jsonschema validation failed with 'https://example.com/app.schema.json#'\n"
        ));
    }

    #[test]
    fn test_extended_legacy_path_validates() {
        let policy = DialectPolicy::default().with_legacy_path("/draft-03/schema");
        let router = SchemaRouter::new(policy);
        let s = schema(json!({
            "$schema": "http://json-schema.org/draft-03/schema#",
            "type": "object",
            "required": ["a"]
        }));
        assert_eq!(router.select(&s), Engine::Legacy);
        router.validate(&values(json!({"a": 1})), &s).unwrap();
        let err = router.validate(&values(json!({})), &s).unwrap_err();
        match err {
            SchemaError::Violations(v) => {
                assert_eq!(v.engine(), Engine::Legacy);
                assert_eq!(v.to_string().lines().count(), 1);
            }
            other => panic!("Expected Violations, got: {other}"),
        }
    }

    #[test]
    fn test_undeclared_draft_04_exclusive_minimum() {
        let s = schema(json!({
            "properties": {
                "port": {"type": "integer", "minimum": 0, "exclusiveMinimum": true}
            }
        }));
        validate_against_single_schema(&values(json!({"port": 8080})), &s).unwrap();
        let err = validate_against_single_schema(&values(json!({"port": 0})), &s).unwrap_err();
        match err {
            SchemaError::Violations(v) => {
                assert_eq!(v.engine(), Engine::Legacy);
                assert!(v.to_string().starts_with("- port: "), "got: {v}");
            }
            other => panic!("Expected Violations, got: {other}"),
        }
    }

    #[test]
    fn test_conversion_error_is_fatal() {
        let v = Values::from_yaml_str("threshold: .nan\n").unwrap();
        let err = validate_against_single_schema(&v, &schema(json!({}))).unwrap_err();
        assert!(matches!(err, SchemaError::Conversion(_)), "got: {err}");
    }

    #[test]
    fn test_fault_boundary_catches_panic() {
        let outcome = contain(|| panic!("engine exploded")).unwrap();
        assert_eq!(outcome, EngineOutcome::Fault("engine exploded".to_string()));
    }

    #[test]
    fn test_fault_boundary_formatted_panic() {
        let code = 7;
        let outcome = contain(|| panic!("bad state {code}")).unwrap();
        assert_eq!(outcome, EngineOutcome::Fault("bad state 7".to_string()));
    }

    #[test]
    fn test_engine_fault_display() {
        let err = SchemaError::EngineFault("boom".to_string());
        assert_eq!(err.to_string(), "unable to validate schema: boom");
    }

    #[test]
    fn test_violation_field() {
        let v = Violation {
            instance_path: "/image/tag".to_string(),
            schema_path: "/properties/image/properties/tag/type".to_string(),
            message: "5 is not of type \"string\"".to_string(),
        };
        assert_eq!(v.field(), "image.tag");
        let root = Violation {
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: "\"a\" is a required property".to_string(),
        };
        assert_eq!(root.field(), "(root)");
        let escaped = Violation {
            instance_path: "/annotations/app.io~1name/a~0b".to_string(),
            schema_path: "/properties/annotations/additionalProperties/type".to_string(),
            message: "1 is not of type \"string\"".to_string(),
        };
        assert_eq!(escaped.field(), "annotations.app.io/name.a~b");
    }

    #[test]
    fn test_slash_key_reported_unescaped() {
        let s = schema(json!({
            "type": "object",
            "properties": {"a/b": {"type": "string"}}
        }));
        let err = validate_against_single_schema(&values(json!({"a/b": 1})), &s).unwrap_err();
        assert!(err.to_string().starts_with("- a/b: "), "got: {err}");
    }

    #[test]
    fn test_legacy_rendering() {
        let v = Violations::new(
            Engine::Legacy,
            vec![
                Violation {
                    instance_path: String::new(),
                    schema_path: "/required".to_string(),
                    message: "\"a\" is a required property".to_string(),
                },
                Violation {
                    instance_path: "/b".to_string(),
                    schema_path: "/properties/b/type".to_string(),
                    message: "\"x\" is not of type \"integer\"".to_string(),
                },
            ],
        );
        assert_eq!(
            v.to_string(),
            "- (root): \"a\" is a required property\n- b: \"x\" is not of type \"integer\"\n"
        );
    }
}
