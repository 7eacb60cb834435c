//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`:
//!
//! ```yaml
//! legacy_dialect_host: json-schema.org
//! legacy_dialect_paths:
//!   - /draft-03/schema
//! ```
//!
//! Paths listed here, and any given with `--legacy-dialect`, are added to
//! the default legacy carve-out list.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use chartval_schema::DialectPolicy;

/// Settings read from the `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Overrides the host the legacy dialect URIs live on.
    pub legacy_dialect_host: Option<String>,
    /// Extra dialect paths routed to the legacy engine.
    pub legacy_dialect_paths: Vec<String>,
}

impl CliConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// The dialect policy for this configuration plus command-line paths.
    pub fn dialect_policy(&self, extra_paths: &[String]) -> DialectPolicy {
        let mut policy = DialectPolicy::default();
        if let Some(host) = &self.legacy_dialect_host {
            policy.legacy_host = host.clone();
        }
        for path in self.legacy_dialect_paths.iter().chain(extra_paths) {
            policy = policy.with_legacy_path(path.clone());
        }
        policy
    }
}
