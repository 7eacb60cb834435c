//! # Schema Dialect Routing
//!
//! Decides which engine validates a schema, from the dialect URI the
//! schema declares in `$schema`.
//!
//! ## Rule
//!
//! - No `$schema` (or not a non-empty string): legacy engine.
//! - `$schema` that fails to parse as a URI: legacy engine.
//! - Host `json-schema.org` with path `/draft-04/schema`,
//!   `/draft-06/schema` or `/draft-07/schema`: legacy engine.
//! - Anything else, including newer drafts and vendor dialects: modern
//!   engine.
//!
//! A bare reference with no scheme (`my-dialect`) is a valid URI
//! reference with an empty host, so it routes to the modern engine. A
//! scheme-relative reference (`//json-schema.org/draft-07/schema`) has a
//! host and is matched like an absolute URI. Host and path are matched as
//! written, so `JSON-SCHEMA.ORG`, `json-schema.org:80` or a path with dot
//! segments is not the carve-out.
//!
//! The carve-out host and paths are [`DialectPolicy`] data so the list can
//! be extended from configuration without touching the routing code.

use std::fmt;

use chartval_core::SchemaDocument;
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Host whose draft URIs keep the legacy engine.
pub const LEGACY_DIALECT_HOST: &str = "json-schema.org";

/// Dialect URI paths that keep the legacy engine.
pub const LEGACY_DIALECT_PATHS: [&str; 3] =
    ["/draft-04/schema", "/draft-06/schema", "/draft-07/schema"];

/// The two validation engines a schema can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Draft-04/06/07 semantics; also used when no dialect is declared.
    Legacy,
    /// Dialect taken from `$schema`, draft 2020-12 semantics by default.
    Modern,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Legacy => "legacy",
            Engine::Modern => "modern",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which declared dialects stay on the legacy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectPolicy {
    /// Host the legacy dialect URIs live on.
    pub legacy_host: String,
    /// Exact URI paths on `legacy_host` routed to the legacy engine.
    pub legacy_paths: Vec<String>,
}

impl Default for DialectPolicy {
    fn default() -> Self {
        Self {
            legacy_host: LEGACY_DIALECT_HOST.to_string(),
            legacy_paths: LEGACY_DIALECT_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl DialectPolicy {
    /// Add a path to the legacy carve-out list.
    pub fn with_legacy_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.legacy_paths.contains(&path) {
            self.legacy_paths.push(path);
        }
        self
    }

    /// Select the engine for a schema document.
    pub fn select(&self, schema: &SchemaDocument) -> Engine {
        match declared_dialect(schema) {
            Some(uri) => self.select_for_uri(&uri),
            None => Engine::Legacy,
        }
    }

    /// Select the engine for a declared dialect URI.
    ///
    /// Host and path are compared exactly as written: no case folding, no
    /// default-port removal, no dot-segment collapsing.
    pub fn select_for_uri(&self, uri: &str) -> Engine {
        // Scheme-relative references only need a scheme to parse.
        let parsed = match uri.strip_prefix("//") {
            Some(_) => Url::parse(&format!("http:{uri}")),
            None => Url::parse(uri),
        };
        match parsed {
            Ok(_) => {
                let (host, path) = raw_host_and_path(uri);
                if self.is_legacy(host, path) {
                    Engine::Legacy
                } else {
                    Engine::Modern
                }
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => Engine::Modern,
            Err(_) => Engine::Legacy,
        }
    }

    fn is_legacy(&self, host: &str, path: &str) -> bool {
        host == self.legacy_host && self.legacy_paths.iter().any(|p| p == path)
    }
}

/// Authority host (port included) and path of a URI reference, as written.
fn raw_host_and_path(uri: &str) -> (&str, &str) {
    let end = uri.find(|c: char| c == '?' || c == '#').unwrap_or(uri.len());
    let mut rest = &uri[..end];
    if let Some((scheme, tail)) = rest.split_once(':') {
        if is_scheme(scheme) {
            rest = tail;
        }
    }
    match rest.strip_prefix("//") {
        Some(after) => {
            let split = after.find('/').unwrap_or(after.len());
            let authority = &after[..split];
            let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
            (host, &after[split..])
        }
        None => ("", rest),
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// The non-empty `$schema` string a schema document declares, if any.
///
/// Bytes that are not a JSON object, or a `$schema` that is not a string,
/// count as undeclared.
pub fn declared_dialect(schema: &SchemaDocument) -> Option<String> {
    let parsed: Value = schema.parse().ok()?;
    parsed
        .get("$schema")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The draft the legacy engine applies to a parsed schema.
///
/// A declared draft-04, draft-06 or draft-07 path pins that draft. Other
/// schemas get draft-07, unless they use the draft-04 boolean form of
/// `exclusiveMinimum` / `exclusiveMaximum`, which only draft-04 accepts.
pub fn legacy_draft(schema: &Value) -> Draft {
    let declared = schema
        .get("$schema")
        .and_then(Value::as_str)
        .map(|uri| raw_host_and_path(uri).1);
    match declared {
        Some("/draft-04/schema") => Draft::Draft4,
        Some("/draft-06/schema") => Draft::Draft6,
        Some("/draft-07/schema") => Draft::Draft7,
        _ if uses_boolean_exclusive_bounds(schema) => Draft::Draft4,
        _ => Draft::Draft7,
    }
}

fn uses_boolean_exclusive_bounds(schema: &Value) -> bool {
    let Value::Object(map) = schema else {
        return false;
    };
    if ["exclusiveMinimum", "exclusiveMaximum"]
        .iter()
        .any(|k| map.get(*k).is_some_and(Value::is_boolean))
    {
        return true;
    }
    map.iter().any(|(key, value)| match key.as_str() {
        // Instance data, not subschemas.
        "enum" | "const" | "default" | "examples" => false,
        // Maps from names to subschemas.
        "properties" | "patternProperties" | "definitions" | "$defs" | "dependencies" => value
            .as_object()
            .is_some_and(|m| m.values().any(uses_boolean_exclusive_bounds)),
        _ => match value {
            Value::Array(items) => items.iter().any(uses_boolean_exclusive_bounds),
            other => uses_boolean_exclusive_bounds(other),
        },
    })
}
