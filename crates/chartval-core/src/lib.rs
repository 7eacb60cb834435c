//! # chartval-core — Foundational Types for chartval
//!
//! This crate defines the inputs of the values-validation engine. Every
//! other crate in the workspace depends on `chartval-core`; it depends on
//! nothing internal.
//!
//! ## Key Types
//!
//! 1. **`Values`** — the native, already-coalesced configuration tree of a
//!    bundle. A YAML tree whose root is a mapping (or null for "no values").
//!
//! 2. **`CanonicalJson`** — the canonical interchange form of `Values`.
//!    The only path from a values tree to the bytes handed to a schema
//!    engine. A null tree canonicalizes to `{}`.
//!
//! 3. **`SchemaDocument`** — raw bytes of one JSON Schema, untouched.
//!
//! 4. **`Bundle`** — a named node carrying an optional schema and an
//!    ordered list of child bundles.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `chartval-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod bundle;
pub mod canonical;
pub mod error;
pub mod values;

// Re-export primary types for ergonomic imports.
pub use bundle::{Bundle, SchemaDocument};
pub use canonical::CanonicalJson;
pub use error::{ConversionError, ValuesError};
pub use values::Values;
