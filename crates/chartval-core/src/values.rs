//! # Values — the native configuration tree
//!
//! `Values` holds the already-coalesced configuration of one bundle as a
//! YAML tree. The root is either a mapping or null; null stands for "no
//! values at all" and canonicalizes to `{}`.
//!
//! Child bundles read their own subtree with [`Values::table`], which is
//! the by-name coupling between a bundle tree and its values tree.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::ValuesError;

const ROOT_KEY: &str = "<root>";

/// A bundle's configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(YamlValue);

impl Values {
    /// An empty mapping.
    pub fn new() -> Self {
        Self(YamlValue::Mapping(Mapping::new()))
    }

    /// A tree with no values at all.
    pub fn null() -> Self {
        Self(YamlValue::Null)
    }

    /// Parse a YAML document. An empty document yields a null tree.
    ///
    /// # Errors
    ///
    /// Returns `ValuesError::Yaml` for unparsable text and
    /// `ValuesError::NotAMap` when the document root is a scalar or sequence.
    pub fn from_yaml_str(text: &str) -> Result<Self, ValuesError> {
        let value: YamlValue = serde_yaml::from_str(text)?;
        Self::from_root(value)
    }

    fn from_root(value: YamlValue) -> Result<Self, ValuesError> {
        match value {
            YamlValue::Null | YamlValue::Mapping(_) => Ok(Self(value)),
            other => Err(ValuesError::NotAMap {
                key: ROOT_KEY.to_string(),
                found: kind_of(&other),
            }),
        }
    }

    /// Returns true if the tree holds no values at all.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Borrow the underlying YAML tree.
    pub fn as_yaml(&self) -> &YamlValue {
        &self.0
    }

    /// Render the tree as YAML text.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }

    /// Look up a top-level value by key.
    pub fn get(&self, key: &str) -> Option<&YamlValue> {
        self.0.as_mapping().and_then(|m| m.get(key))
    }

    /// The subtree stored under `name`, which must itself be a mapping.
    ///
    /// # Errors
    ///
    /// Returns `ValuesError::MissingKey` if `name` is absent (or the tree is
    /// null) and `ValuesError::NotAMap` if the value under `name` is not a
    /// mapping.
    pub fn table(&self, name: &str) -> Result<Values, ValuesError> {
        match self.get(name) {
            None => Err(ValuesError::MissingKey {
                key: name.to_string(),
            }),
            Some(YamlValue::Mapping(m)) => Ok(Values(YamlValue::Mapping(m.clone()))),
            Some(other) => Err(ValuesError::NotAMap {
                key: name.to_string(),
                found: kind_of(other),
            }),
        }
    }
}

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Mapping> for Values {
    fn from(mapping: Mapping) -> Self {
        Self(YamlValue::Mapping(mapping))
    }
}

impl TryFrom<serde_json::Value> for Values {
    type Error = ValuesError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let yaml = serde_yaml::to_value(value)?;
        Self::from_root(yaml)
    }
}

/// Name of the YAML kind, for error messages.
pub(crate) fn kind_of(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "bool",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "sequence",
        YamlValue::Mapping(_) => "map",
        YamlValue::Tagged(_) => "tagged value",
    }
}
