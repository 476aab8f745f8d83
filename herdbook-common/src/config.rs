//! Bootstrap configuration loading and config-file resolution
//!
//! The configuration file is located with the following priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`HERDBOOK_CONFIG`)
//! 3. Platform config directory (`<config_dir>/herdbook/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file is not an error: the compiled defaults are used and a
//! warning is logged. A file that exists but cannot be parsed is an error.
//!
//! Trait names inside the `[scoring]` and `[segmentation]` sections are kept
//! as plain strings here; the engine resolves them to canonical fields.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HERDBOOK_CONFIG";

/// Complete bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HerdbookConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub pedigree: PedigreeConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Cell values (case-insensitive, trimmed) that coerce to null for every field class
    #[serde(default = "default_null_tokens")]
    pub null_tokens: Vec<String>,

    /// Extra header aliases: normalized header → canonical field id
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            null_tokens: default_null_tokens(),
            aliases: BTreeMap::new(),
        }
    }
}

/// Scoring mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModeConfig {
    /// Rank by one raw trait
    Direct,
    /// Rank by a weighted z-score composite
    Custom,
}

/// Composite index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_scoring_mode")]
    pub mode: ScoringModeConfig,

    /// Trait used in direct mode
    #[serde(default = "default_direct_trait")]
    pub direct_trait: String,

    /// Trait used when no animal has a valid score
    #[serde(default = "default_direct_trait")]
    pub fallback_trait: String,

    /// "Lower is better" trait subtracted in custom mode
    #[serde(default = "default_penalty_trait")]
    pub penalty_trait: String,

    /// Custom-mode weights by trait id; empty means the built-in defaults
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: default_scoring_mode(),
            direct_trait: default_direct_trait(),
            fallback_trait: default_direct_trait(),
            penalty_trait: default_penalty_trait(),
            weights: BTreeMap::new(),
        }
    }
}

/// Breeding-tier segmentation settings
///
/// Cutoffs are expressed as "top percent of the herd": a donor cutoff of 20
/// selects the best 20% of ranked animals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_donor_cutoff")]
    pub donor_cutoff: f64,

    #[serde(default = "default_intermediate_cutoff")]
    pub intermediate_cutoff: f64,

    /// Trait gated by a maximum (e.g. somatic cell score)
    #[serde(default = "default_penalty_trait")]
    pub gate_max_trait: String,

    /// Trait gated by a minimum (e.g. productive life)
    #[serde(default = "default_gate_min_trait")]
    pub gate_min_trait: String,

    /// Donor candidates must have `gate_max_trait <= donor_max`
    #[serde(default = "default_donor_max")]
    pub donor_max: f64,

    /// Donor candidates must have `gate_min_trait >= donor_min`
    #[serde(default = "default_donor_min")]
    pub donor_min: f64,

    /// Any animal with `gate_max_trait > critical_max` is a recipient
    #[serde(default = "default_critical_max")]
    pub critical_max: f64,

    /// Any animal with `gate_min_trait < critical_min` is a recipient
    #[serde(default = "default_critical_min")]
    pub critical_min: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            donor_cutoff: default_donor_cutoff(),
            intermediate_cutoff: default_intermediate_cutoff(),
            gate_max_trait: default_penalty_trait(),
            gate_min_trait: default_gate_min_trait(),
            donor_max: default_donor_max(),
            donor_min: default_donor_min(),
            critical_max: default_critical_max(),
            critical_min: default_critical_min(),
        }
    }
}

/// Pedigree prediction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedigreeConfig {
    /// Maximum number of batch rows predicted concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PedigreeConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_null_tokens() -> Vec<String> {
    ["", "null", "n/a", "na", "nan", "none", "-", "--", "#n/a", "nil"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_scoring_mode() -> ScoringModeConfig {
    ScoringModeConfig::Direct
}

fn default_direct_trait() -> String {
    "tpi".to_string()
}

fn default_penalty_trait() -> String {
    "scs".to_string()
}

fn default_gate_min_trait() -> String {
    "pl".to_string()
}

fn default_donor_cutoff() -> f64 {
    20.0
}

fn default_intermediate_cutoff() -> f64 {
    70.0
}

fn default_donor_max() -> f64 {
    2.9
}

fn default_donor_min() -> f64 {
    1.0
}

fn default_critical_max() -> f64 {
    3.2
}

fn default_critical_min() -> f64 {
    -2.0
}

fn default_concurrency() -> usize {
    8
}

/// Config-file resolver
///
/// Locates the config file following CLI → ENV → platform directory priority.
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Determine which config file to read, if any
    ///
    /// CLI and ENV paths are returned even when the file does not exist so
    /// that the caller can warn about it; the platform path is only returned
    /// when present.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        dirs::config_dir()
            .map(|d| d.join("herdbook").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Load configuration, falling back to compiled defaults
    pub fn load(&self) -> Result<HerdbookConfig> {
        match self.resolve_path() {
            Some(path) if path.exists() => {
                let config = load_toml_config(&path)?;
                info!("Configuration loaded from {}", path.display());
                Ok(config)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(HerdbookConfig::default())
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok(HerdbookConfig::default())
            }
        }
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<HerdbookConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write configuration to a TOML file atomically (temp file + rename)
pub fn write_toml_config(config: &HerdbookConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
