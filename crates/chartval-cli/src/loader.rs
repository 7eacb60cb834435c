//! # Chart Directory Loader
//!
//! Builds a [`Bundle`] tree from a chart directory on disk:
//!
//! ```text
//! mychart/
//!   Chart.yaml            # `name:` field, falls back to the directory name
//!   values.yaml           # optional, used when --values is not given
//!   values.schema.json    # optional
//!   charts/
//!     db/                 # one sub-bundle per directory, same layout
//! ```
//!
//! Sub-bundles are loaded in directory-name order. Values are read as-is;
//! they must already contain each dependency's subtree under its name.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use chartval_core::{Bundle, SchemaDocument, Values};

pub const CHART_FILE: &str = "Chart.yaml";
pub const VALUES_FILE: &str = "values.yaml";
pub const SCHEMA_FILE: &str = "values.schema.json";
pub const DEPENDENCY_DIR: &str = "charts";

#[derive(Debug, Default, Deserialize)]
struct ChartMetadata {
    #[serde(default)]
    name: Option<String>,
}

/// Load the bundle tree rooted at `dir`.
pub fn load_bundle(dir: &Path) -> Result<Bundle> {
    if !dir.is_dir() {
        bail!("chart directory not found: {}", dir.display());
    }

    let mut bundle = Bundle::new(bundle_name(dir)?);

    let schema_path = dir.join(SCHEMA_FILE);
    if schema_path.is_file() {
        let bytes = std::fs::read(&schema_path)
            .with_context(|| format!("cannot read {}", schema_path.display()))?;
        bundle = bundle.with_schema(SchemaDocument::from_bytes(bytes));
    }

    let deps_dir = dir.join(DEPENDENCY_DIR);
    if deps_dir.is_dir() {
        let mut children = Vec::new();
        for entry in std::fs::read_dir(&deps_dir)
            .with_context(|| format!("cannot read {}", deps_dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                children.push(path);
            }
        }
        children.sort();
        for child in children {
            bundle.add_dependency(load_bundle(&child)?);
        }
    }

    tracing::debug!(
        bundle = bundle.name(),
        has_schema = bundle.schema().is_some(),
        dependencies = bundle.dependencies().len(),
        "loaded bundle"
    );
    Ok(bundle)
}

fn bundle_name(dir: &Path) -> Result<String> {
    let chart_path = dir.join(CHART_FILE);
    if chart_path.is_file() {
        let content = std::fs::read_to_string(&chart_path)
            .with_context(|| format!("cannot read {}", chart_path.display()))?;
        let metadata: Option<ChartMetadata> = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", chart_path.display()))?;
        if let Some(name) = metadata.and_then(|m| m.name).filter(|n| !n.is_empty()) {
            return Ok(name);
        }
    }

    dir.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(dir)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot determine bundle name for {}", dir.display()))
}

/// Read a values file. An empty file yields a null tree.
pub fn load_values(path: &Path) -> Result<Values> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read values file {}", path.display()))?;
    Values::from_yaml_str(&content).with_context(|| format!("invalid values file {}", path.display()))
}
