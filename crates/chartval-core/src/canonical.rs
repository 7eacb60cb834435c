//! # Canonical JSON — the interchange form handed to schema engines
//!
//! This module defines `CanonicalJson`, the sole construction path for the
//! bytes a schema engine validates.
//!
//! ## Pipeline
//!
//! 1. Serialize the native [`Values`] tree to YAML text.
//! 2. Re-read that text as a YAML document, so the engine sees exactly
//!    what a YAML round trip of the values would produce.
//! 3. Convert the YAML tree to a JSON tree. Scalar map keys are
//!    stringified, tags are dropped, sequence/mapping keys and non-finite
//!    floats are rejected.
//! 4. A `null` document becomes `{}`. A bundle without values must be
//!    checked as an empty object, not as `null`.
//! 5. Serialize to compact JSON bytes.
//!
//! Every failure is a [`ConversionError`], which is fatal to a validation
//! call rather than a schema violation.

use serde_json::Value;
use serde_yaml::Value as YamlValue;

use crate::error::ConversionError;
use crate::values::Values;

/// Values converted to their canonical JSON form.
///
/// # Invariants
///
/// - The document is never `null`; an empty tree is `{}`.
/// - `bytes` is the compact serialization of `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalJson {
    value: Value,
    bytes: Vec<u8>,
}

impl CanonicalJson {
    /// Canonicalize a values tree.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::Yaml` if the YAML round trip fails,
    /// `ConversionError::UnsupportedKey` / `NonFiniteFloat` if the tree has
    /// no JSON equivalent, and `ConversionError::Json` if byte serialization
    /// fails.
    pub fn from_values(values: &Values) -> Result<Self, ConversionError> {
        let text = serde_yaml::to_string(values.as_yaml())?;
        let reread: YamlValue = serde_yaml::from_str(&text)?;
        let mut value = yaml_to_json_value(&reread)?;
        if value.is_null() {
            value = Value::Object(serde_json::Map::new());
        }
        let bytes = serde_json::to_vec(&value)?;
        Ok(Self { value, bytes })
    }

    /// The canonical JSON bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The canonical JSON tree.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Consume and return the canonical JSON tree.
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl AsRef<[u8]> for CanonicalJson {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
fn yaml_to_json_value(yaml: &YamlValue) -> Result<Value, ConversionError> {
    match yaml {
        YamlValue::Null => Ok(Value::Null),
        YamlValue::Bool(b) => Ok(Value::Bool(*b)),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or(ConversionError::NonFiniteFloat(f))
            }
        }
        YamlValue::String(s) => Ok(Value::String(s.clone())),
        YamlValue::Sequence(seq) => {
            let items: Result<Vec<Value>, ConversionError> =
                seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        YamlValue::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    YamlValue::String(s) => s.clone(),
                    YamlValue::Number(n) => n.to_string(),
                    YamlValue::Bool(b) => b.to_string(),
                    YamlValue::Null => "null".to_string(),
                    other => return Err(ConversionError::UnsupportedKey(format!("{other:?}"))),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        YamlValue::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
