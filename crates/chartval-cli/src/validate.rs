//! # Validate Subcommand
//!
//! Validates a chart's coalesced values against the values schema of the
//! chart and of every nested dependency, and prints one report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::json;

use chartval_core::{Bundle, Values};
use chartval_schema::{TreeError, TreeValidator, ValidationReport};

use crate::config::CliConfig;
use crate::loader::{load_bundle, load_values, VALUES_FILE};

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `<bundle>:` blocks followed by one line per violation.
    Text,
    /// Structured JSON report.
    Json,
}

/// Arguments for the `chartval validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Chart directory to validate.
    #[arg(value_name = "CHART_DIR")]
    pub chart_dir: PathBuf,

    /// Coalesced values file. Defaults to the chart's values.yaml.
    #[arg(long, value_name = "FILE")]
    pub values: Option<PathBuf>,

    /// Extra dialect URI path to keep on the legacy engine (repeatable).
    #[arg(long = "legacy-dialect", value_name = "PATH")]
    pub legacy_dialects: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 on success, 1 on schema violations. Fatal errors
/// are returned as `Err`.
pub fn run_validate(args: &ValidateArgs, config: &CliConfig) -> Result<u8> {
    let bundle = load_bundle(&args.chart_dir)
        .with_context(|| format!("failed to load chart {}", args.chart_dir.display()))?;
    let values = resolve_values(args.values.as_deref(), &args.chart_dir)?;

    let validator = TreeValidator::with_policy(config.dialect_policy(&args.legacy_dialects));
    tracing::info!(
        chart = bundle.name(),
        bundles = bundle.walk().len(),
        "validating values"
    );

    let report = check(&validator, &bundle, &values)?;
    println!("{}", render(bundle.name(), &report, args.output));

    Ok(if report.is_empty() { 0 } else { 1 })
}

/// Run the tree validator, turning schema violations into a report and
/// everything else into an error.
pub fn check(validator: &TreeValidator, bundle: &Bundle, values: &Values) -> Result<ValidationReport> {
    match validator.validate_tree(bundle, values) {
        Ok(()) => Ok(ValidationReport::new()),
        Err(TreeError::Invalid(report)) => Ok(report),
        Err(e) => Err(e).context("values validation failed"),
    }
}

/// Render a report for the terminal.
pub fn render(chart: &str, report: &ValidationReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text if report.is_empty() => format!("{chart}: values are valid"),
        OutputFormat::Text => format!(
            "values don't meet the specifications of the schema(s) in the following chart(s):\n{}",
            report.to_string().trim_end()
        ),
        OutputFormat::Json => json!({
            "chart": chart,
            "valid": report.is_empty(),
            "sections": report.sections(),
        })
        .to_string(),
    }
}

fn resolve_values(explicit: Option<&Path>, chart_dir: &Path) -> Result<Values> {
    match explicit {
        Some(path) => load_values(path),
        None => {
            let default = chart_dir.join(VALUES_FILE);
            if default.is_file() {
                load_values(&default)
            } else {
                tracing::debug!("no values file; validating an empty values tree");
                Ok(Values::null())
            }
        }
    }
}
