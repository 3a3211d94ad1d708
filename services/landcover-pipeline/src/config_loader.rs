//! Configuration loader for the land-cover pipeline.
//!
//! One YAML file holds a section per step:
//!
//! ```yaml
//! pipeline:
//!   input_dir: ${LC_DATA:-/data}/raw
//!   output_dir: ${LC_DATA:-/data}/reprojected
//!   target_crs: EPSG:3035
//!   target_resolution: 300
//! import:
//!   catalog_path: /data/catalog.json
//! stats:
//!   output_dir: /data/landcover_stats
//! ```
//!
//! Supports environment variable substitution using ${VAR} syntax. `LC_*`
//! variables override the `pipeline` section after loading.

use anyhow::{Context, Result};
use reprojection::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub import: ImportConfig,
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Directory scanned for yearly files; defaults to the pipeline output.
    pub input_dir: Option<PathBuf>,
    pub catalog_path: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            catalog_path: PathBuf::from("data/catalog.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub output_dir: PathBuf,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/landcover_stats"),
        }
    }
}

impl AppConfig {
    /// Directory the import step reads.
    pub fn import_dir(&self) -> &Path {
        self.import
            .input_dir
            .as_deref()
            .unwrap_or(&self.pipeline.output_dir)
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid pipeline config: {}", e))?;
        anyhow::ensure!(
            !self.import.catalog_path.as_os_str().is_empty(),
            "import.catalog_path cannot be empty"
        );
        anyhow::ensure!(
            !self.stats.output_dir.as_os_str().is_empty(),
            "stats.output_dir cannot be empty"
        );
        Ok(())
    }
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load the YAML configuration with environment variable substitution.
///
/// Without a path, defaults are used. `LC_*` overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let expanded = expand_env_vars(&content)?;
            serde_yaml::from_str(&expanded)
                .with_context(|| format!("Failed to parse config YAML from {:?}", path))?
        }
        None => AppConfig::default(),
    };

    config.pipeline.apply_env();
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Tests
// ============================================================================
