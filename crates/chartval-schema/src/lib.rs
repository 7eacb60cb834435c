//! # chartval-schema — Values Validation for Bundle Trees
//!
//! Validates the values of a hierarchical configuration bundle against the
//! JSON Schema carried by each bundle in the tree.
//!
//! ## Dialect Routing (`dialect`)
//!
//! Each schema is checked by one of two engines. Schemas that declare no
//! `$schema`, an unparsable one, or one of the draft-04/06/07 URIs on
//! `json-schema.org` go to the legacy engine; every other declared dialect
//! goes to the modern engine. The carve-out list lives in
//! [`DialectPolicy`] as data.
//!
//! ## Engines (`engine`)
//!
//! - [`SchemaRouter::validate`] — canonicalizes values, selects an engine,
//!   and validates one values tree against one schema.
//!
//! ## Tree Validation (`tree`)
//!
//! - [`TreeValidator::validate_tree`] — walks the bundle tree parent
//!   first, depth first, and collects every bundle's violations into one
//!   [`ValidationReport`].
//!
//! ## Crate Policy
//!
//! - Depends only on `chartval-core` internally.
//! - Schema violations are aggregated; malformed input, malformed schemas,
//!   structural mismatches and engine faults are fatal and never mixed
//!   into the report.
//! - Engine panics are contained at the engine boundary.

pub mod dialect;
pub mod engine;
pub mod tree;

pub use dialect::{declared_dialect, DialectPolicy, Engine};
pub use engine::{
    validate_against_single_schema, EngineOutcome, LegacyEngine, ModernEngine, SchemaError,
    SchemaRouter, Violation, Violations,
};
pub use tree::{validate_against_schema, ReportSection, TreeError, TreeValidator, ValidationReport};
