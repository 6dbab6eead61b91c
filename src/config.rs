//! Configuration management
//!
//! This module handles loading and managing configuration from:
//! - Command-line arguments
//! - Environment variables
//! - Configuration files (TOML)
//! - Defaults

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub daikon: DaikonConfig,

    #[serde(default)]
    pub mining: MiningConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Column-name conventions of the input datasets.
///
/// Derived columns carry one of these prefixes and are excluded from
/// actuator/sensor classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Prefix of previous-value columns
    #[serde(default = "default_prev_prefix")]
    pub prev_prefix: String,

    /// Prefix of slope columns
    #[serde(default = "default_slope_prefix")]
    pub slope_prefix: String,

    /// Prefix of trend columns
    #[serde(default = "default_trend_prefix")]
    pub trend_prefix: String,

    /// Prefix of lower-bound (setpoint) columns
    #[serde(default = "default_min_prefix")]
    pub min_prefix: String,

    /// Prefix of upper-bound (setpoint) columns
    #[serde(default = "default_max_prefix")]
    pub max_prefix: String,

    /// Name of the timestamp column
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    /// Row window used when synthesizing `slope_` columns
    #[serde(default = "default_slope_granularity")]
    pub slope_granularity: usize,
}

/// External invariant-mining tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaikonConfig {
    /// Daikon installation directory (falls back to $DAIKONDIR)
    pub daikon_dir: Option<PathBuf>,

    /// Working directory for the generated .decls/.dtrace files
    pub invariants_dir: Option<PathBuf>,

    /// Header lines to strip from the raw report
    #[serde(default = "default_header_lines")]
    pub header_lines: usize,

    /// Footer lines to strip from the raw report
    #[serde(default = "default_footer_lines")]
    pub footer_lines: usize,
}

/// Process mining parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Slope tolerance below which a sensor trend is considered stable
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Upper safety margin (percent) applied to max setpoints
    #[serde(default = "default_pct_margin")]
    pub upper_pct_margin: u32,

    /// Lower safety margin (percent) applied to min setpoints
    #[serde(default = "default_pct_margin")]
    pub lower_pct_margin: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path
    pub file: Option<PathBuf>,
}

// Default value functions

fn default_prev_prefix() -> String {
    "prev_".to_string()
}

fn default_slope_prefix() -> String {
    "slope_".to_string()
}

fn default_trend_prefix() -> String {
    "trend_".to_string()
}

fn default_min_prefix() -> String {
    "min_".to_string()
}

fn default_max_prefix() -> String {
    "max_".to_string()
}

fn default_timestamp_column() -> String {
    "Timestamp".to_string()
}

fn default_slope_granularity() -> usize {
    10
}

fn default_header_lines() -> usize {
    6
}

fn default_footer_lines() -> usize {
    2
}

fn default_tolerance() -> f64 {
    0.05
}

fn default_pct_margin() -> u32 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            prev_prefix: default_prev_prefix(),
            slope_prefix: default_slope_prefix(),
            trend_prefix: default_trend_prefix(),
            min_prefix: default_min_prefix(),
            max_prefix: default_max_prefix(),
            timestamp_column: default_timestamp_column(),
            slope_granularity: default_slope_granularity(),
        }
    }
}

impl Default for DaikonConfig {
    fn default() -> Self {
        Self {
            daikon_dir: None,
            invariants_dir: None,
            header_lines: default_header_lines(),
            footer_lines: default_footer_lines(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            upper_pct_margin: default_pct_margin(),
            lower_pct_margin: default_pct_margin(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl DatasetConfig {
    /// All derived-column prefixes, in classification-exclusion order
    pub fn derived_prefixes(&self) -> Vec<&str> {
        vec![
            self.max_prefix.as_str(),
            self.min_prefix.as_str(),
            self.prev_prefix.as_str(),
            self.trend_prefix.as_str(),
            self.slope_prefix.as_str(),
        ]
    }

    /// Min/max bound prefixes, excluded from chain roots and leaves
    pub fn bound_prefixes(&self) -> Vec<&str> {
        vec![self.min_prefix.as_str(), self.max_prefix.as_str()]
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&contents).map_err(|e| Error::ConfigParse {
            file: path,
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./config.toml
    /// 2. ~/.plc-state-miner/config.toml
    /// 3. /etc/plc-state-miner/config.toml
    pub fn load() -> Result<Self> {
        let paths = vec![
            PathBuf::from("config.toml"),
            dirs::home_dir()
                .map(|h| h.join(".plc-state-miner").join("config.toml"))
                .unwrap_or_else(|| PathBuf::from("/dev/null")),
            PathBuf::from("/etc/plc-state-miner/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                tracing::info!("Loading config from {:?}", path);
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Get the Daikon installation directory from config or environment
    pub fn daikon_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.daikon.daikon_dir {
            return Ok(dir.clone());
        }

        std::env::var("DAIKONDIR").map(PathBuf::from).map_err(|_| {
            Error::MissingConfig(
                "Daikon directory not found. Set DAIKONDIR environment variable or configure in config file"
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dataset.prev_prefix, "prev_");
        assert_eq!(config.dataset.timestamp_column, "Timestamp");
        assert_eq!(config.daikon.header_lines, 6);
        assert_eq!(config.mining.tolerance, 0.05);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
[dataset]
prev_prefix = "old_"
timestamp_column = "ts"

[mining]
tolerance = 0.1
upper_pct_margin = 10

[logging]
level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.dataset.prev_prefix, "old_");
        assert_eq!(config.dataset.timestamp_column, "ts");
        assert_eq!(config.mining.tolerance, 0.1);
        assert_eq!(config.mining.upper_pct_margin, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_derived_prefixes() {
        let config = DatasetConfig::default();
        let prefixes = config.derived_prefixes();
        assert!(prefixes.contains(&"prev_"));
        assert!(prefixes.contains(&"min_"));
        assert!(prefixes.contains(&"max_"));
        assert_eq!(prefixes.len(), 5);
    }
}
