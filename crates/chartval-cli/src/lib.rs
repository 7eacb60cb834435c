//! # chartval-cli — Values Validation Command-Line Interface
//!
//! Provides the `chartval` binary. It loads a chart directory and its
//! nested dependencies into a bundle tree, reads the already-coalesced
//! values, and runs the tree validator from `chartval-schema`.
//!
//! ## Subcommands
//!
//! - `validate` — validate values against every bundle's `values.schema.json`
//!
//! ## Exit Codes
//!
//! - `0` — values are valid
//! - `1` — one or more bundles violate their schema
//! - `2` — operational error (unreadable chart, malformed schema, values
//!   that do not match the bundle tree)
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to the library crates; no validation logic here.

pub mod config;
pub mod loader;
pub mod validate;
