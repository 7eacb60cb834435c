//! # Error Types
//!
//! Errors raised while handling the engine's inputs. Both are fatal to a
//! validation call: they describe malformed input, never a schema
//! violation.

use thiserror::Error;

/// The values tree could not be converted to its canonical JSON form.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The tree could not be written to, or re-read from, YAML text.
    #[error("values could not be serialized to YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A mapping key has no JSON string form (sequence or mapping keys).
    #[error("unsupported map key in values: {0}")]
    UnsupportedKey(String),

    /// NaN and infinities have no JSON representation.
    #[error("cannot represent float {0} in JSON")]
    NonFiniteFloat(f64),

    /// The JSON tree could not be written out as bytes.
    #[error("values could not be serialized to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lookup or construction failure on a [`crate::Values`] tree.
#[derive(Error, Debug)]
pub enum ValuesError {
    /// The requested key does not exist.
    #[error("no value found for key '{key}'")]
    MissingKey {
        /// The key that was looked up.
        key: String,
    },

    /// The value is present but is not a mapping.
    #[error("value for key '{key}' is a {found}, not a map")]
    NotAMap {
        /// The key that was looked up (`<root>` for the document root).
        key: String,
        /// The YAML kind that was found instead.
        found: &'static str,
    },

    /// The YAML text could not be parsed.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
