//! # Tree Validation
//!
//! Validates a whole bundle tree in one pass. Each bundle's values are
//! checked against its own schema, then every child bundle is checked
//! against the subtree stored under the child's name.
//!
//! ## Ordering
//!
//! Parent first, then children in the order they appear in the tree,
//! depth first. The report's sections follow that order exactly, so
//! output is deterministic.
//!
//! ## Failure Semantics
//!
//! Schema violations never stop the walk: every failing bundle gets one
//! section in the [`ValidationReport`]. Everything else (conversion
//! failures, malformed schemas, a child with no values map, engine faults)
//! aborts the walk immediately with the offending bundle's name attached.

use std::fmt;

use chartval_core::{Bundle, ConversionError, Values, ValuesError};
use serde::Serialize;
use thiserror::Error;

use crate::dialect::{DialectPolicy, Engine};
use crate::engine::{SchemaError, SchemaRouter, Violations};

/// The violations of one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    bundle: String,
    violations: Violations,
}

impl ReportSection {
    pub fn new(bundle: impl Into<String>, violations: Violations) -> Self {
        Self {
            bundle: bundle.into(),
            violations,
        }
    }

    /// Name of the bundle whose values failed.
    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    pub fn violations(&self) -> &Violations {
        &self.violations
    }
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.bundle)?;
        write!(f, "{}", self.violations)
    }
}

/// Every schema violation found in a bundle tree, in traversal order.
///
/// Renders as one `<bundle-name>:` block per failing bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    sections: Vec<ReportSection>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Names of the failing bundles, in report order.
    pub fn bundle_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.bundle()).collect()
    }

    /// The section for `bundle`, if it failed.
    pub fn section(&self, bundle: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.bundle == bundle)
    }

    pub fn into_sections(self) -> Vec<ReportSection> {
        self.sections
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "{section}")?;
        }
        Ok(())
    }
}

/// Outcome of a failed tree validation.
#[derive(Error, Debug)]
pub enum TreeError {
    /// One or more bundles violate their schemas.
    #[error("{0}")]
    Invalid(ValidationReport),

    /// A bundle's values could not be converted to JSON.
    #[error("{bundle}: values cannot be converted to JSON: {source}")]
    Conversion {
        bundle: String,
        source: ConversionError,
    },

    /// A bundle's schema could not be parsed or compiled.
    #[error("{bundle}: malformed values schema ({engine} engine): {reason}")]
    SchemaMalformed {
        bundle: String,
        engine: Engine,
        reason: String,
    },

    /// A child bundle has no values map under its name in the parent's values.
    #[error("{parent}: values for dependency '{child}' are not a map: {source}")]
    StructuralMismatch {
        parent: String,
        child: String,
        source: ValuesError,
    },

    /// A schema engine failed unexpectedly.
    #[error("{bundle}: unable to validate schema: {reason}")]
    EngineFault { bundle: String, reason: String },
}

impl TreeError {
    /// The violation report, if this error is a schema violation.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            TreeError::Invalid(report) => Some(report),
            _ => None,
        }
    }

    /// Returns true for schema violations, false for fatal errors.
    pub fn is_violation(&self) -> bool {
        matches!(self, TreeError::Invalid(_))
    }

    fn from_schema_error(bundle: &str, err: SchemaError) -> Self {
        let bundle = bundle.to_string();
        match err {
            SchemaError::Violations(violations) => {
                TreeError::Invalid(ValidationReport {
                    sections: vec![ReportSection::new(bundle, violations)],
                })
            }
            SchemaError::Conversion(source) => TreeError::Conversion { bundle, source },
            SchemaError::Malformed { engine, reason } => TreeError::SchemaMalformed {
                bundle,
                engine,
                reason,
            },
            SchemaError::EngineFault(reason) => TreeError::EngineFault { bundle, reason },
        }
    }
}

/// Validates bundle trees.
#[derive(Debug, Clone, Default)]
pub struct TreeValidator {
    router: SchemaRouter,
}

impl TreeValidator {
    pub fn new(router: SchemaRouter) -> Self {
        Self { router }
    }

    pub fn with_policy(policy: DialectPolicy) -> Self {
        Self::new(SchemaRouter::new(policy))
    }

    pub fn router(&self) -> &SchemaRouter {
        &self.router
    }

    /// Validate `bundle` and all its dependencies against `values`.
    ///
    /// `values` is the coalesced values tree of `bundle`; each child reads
    /// the map stored under its own name.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::Invalid` with every violation in the tree, or
    /// the first fatal error encountered.
    pub fn validate_tree(&self, bundle: &Bundle, values: &Values) -> Result<(), TreeError> {
        let mut report = ValidationReport::new();
        if let Err(err) = self.walk(bundle, values, &mut report) {
            tracing::warn!(bundle = bundle.name(), error = %err, "values validation aborted");
            return Err(err);
        }

        if report.is_empty() {
            tracing::debug!(bundle = bundle.name(), "values valid");
            Ok(())
        } else {
            tracing::debug!(
                bundle = bundle.name(),
                failing = report.len(),
                "values violate schema"
            );
            Err(TreeError::Invalid(report))
        }
    }

    fn walk(&self, bundle: &Bundle, values: &Values, report: &mut ValidationReport) -> Result<(), TreeError> {
        if let Some(schema) = bundle.schema() {
            tracing::debug!(bundle = bundle.name(), "checking values against schema");
            match self.router.validate(values, schema) {
                Ok(()) => {}
                Err(SchemaError::Violations(violations)) => {
                    report.push(ReportSection::new(bundle.name(), violations));
                }
                Err(other) => return Err(TreeError::from_schema_error(bundle.name(), other)),
            }
        }

        for child in bundle.dependencies() {
            let child_values =
                values
                    .table(child.name())
                    .map_err(|source| TreeError::StructuralMismatch {
                        parent: bundle.name().to_string(),
                        child: child.name().to_string(),
                        source,
                    })?;
            self.walk(child, &child_values, report)?;
        }

        Ok(())
    }
}

/// Validate a bundle tree with the default dialect policy.
pub fn validate_against_schema(bundle: &Bundle, values: &Values) -> Result<(), TreeError> {
    TreeValidator::default().validate_tree(bundle, values)
}
