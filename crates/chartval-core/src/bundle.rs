//! # Bundle Trees
//!
//! A [`Bundle`] is one node of a hierarchical configuration bundle: a
//! name, an optional JSON Schema for its own values, and an ordered list
//! of child bundles. Bundles are built by an external loader and are
//! read-only to the validator.
//!
//! A child's name must be a key in its parent's values whose value is a
//! map. That coupling is checked when the tree is validated, not here.

use serde_json::Value;

/// Raw bytes of one JSON Schema document.
///
/// The bytes are kept exactly as loaded; only the schema engines
/// interpret them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDocument(Vec<u8>);

impl SchemaDocument {
    /// Wrap raw schema bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Serialize a JSON value into a schema document.
    pub fn from_json(schema: &Value) -> Self {
        Self(schema.to_string().into_bytes())
    }

    /// The raw schema bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parse the schema bytes as JSON.
    pub fn parse(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.0)
    }
}

impl From<&str> for SchemaDocument {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for SchemaDocument {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<Vec<u8>> for SchemaDocument {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A named configuration bundle and its sub-bundles.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    name: String,
    schema: Option<SchemaDocument>,
    dependencies: Vec<Bundle>,
}

impl Bundle {
    /// A bundle with no schema and no dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            dependencies: Vec::new(),
        }
    }

    /// Attach the schema for this bundle's own values.
    pub fn with_schema(mut self, schema: impl Into<SchemaDocument>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Append a child bundle. Children are validated in insertion order.
    pub fn with_dependency(mut self, child: Bundle) -> Self {
        self.dependencies.push(child);
        self
    }

    /// Append a child bundle in place.
    pub fn add_dependency(&mut self, child: Bundle) {
        self.dependencies.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&SchemaDocument> {
        self.schema.as_ref()
    }

    pub fn dependencies(&self) -> &[Bundle] {
        &self.dependencies
    }

    /// Every bundle in the tree, parent first, depth first.
    pub fn walk(&self) -> Vec<&Bundle> {
        let mut out = vec![self];
        for child in &self.dependencies {
            out.extend(child.walk());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let bundle = Bundle::new("app")
            .with_schema(r#"{"type":"object"}"#)
            .with_dependency(Bundle::new("db"));
        assert_eq!(bundle.name(), "app");
        assert!(bundle.schema().is_some());
        assert_eq!(bundle.dependencies().len(), 1);
        assert_eq!(bundle.dependencies()[0].name(), "db");
        assert!(bundle.dependencies()[0].schema().is_none());
    }

    #[test]
    fn test_walk_is_parent_first_depth_first() {
        let tree = Bundle::new("root")
            .with_dependency(
                Bundle::new("a")
                    .with_dependency(Bundle::new("a1"))
                    .with_dependency(Bundle::new("a2")),
            )
            .with_dependency(Bundle::new("b"));
        let names: Vec<&str> = tree.walk().iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "a2", "b"]);
    }

    #[test]
    fn test_schema_document_round_trip() {
        let schema = json!({"type": "object", "required": ["a"]});
        let doc = SchemaDocument::from_json(&schema);
        assert_eq!(doc.parse().unwrap(), schema);
    }

    #[test]
    fn test_schema_document_keeps_raw_bytes() {
        let doc = SchemaDocument::from_bytes(b"not json".to_vec());
        assert_eq!(doc.as_bytes(), b"not json");
        assert!(doc.parse().is_err());
    }
}
