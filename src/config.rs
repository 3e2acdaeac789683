// Configuration - TOML file with per-section defaults
// Lookup order: explicit path, TRADEFLOW_CONFIG, config/tradeflow.toml, built-in defaults

use crate::error::{DashboardError, Result};
use crate::filter::{Metric, DEFAULT_TOP_N};
use crate::view_model::DEFAULT_DISTINGUISHED_ENTITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "TRADEFLOW_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/tradeflow.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub flows_path: PathBuf,
    pub entities_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            flows_path: PathBuf::from("data/flows_agg.csv"),
            entities_path: PathBuf::from("data/Country_Centroid.ISO.with_xy.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Reporter whose rank gets its own summary card
    pub distinguished_entity: String,
    pub default_top_n: usize,
    pub default_metric: Metric,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            distinguished_entity: DEFAULT_DISTINGUISHED_ENTITY.to_string(),
            default_top_n: DEFAULT_TOP_N,
            default_metric: Metric::ValueUsd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty", "json" or "off"
    pub output: String,
    /// Empty means stderr
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            output: "pretty".to_string(),
            file_path: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| DashboardError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| DashboardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config source. An explicit or env path must exist; the
    /// default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Self::from_file(path);
            }
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        Ok(Config::default())
    }

    fn validate(&self) -> Result<()> {
        if self.dashboard.distinguished_entity.trim().is_empty() {
            return Err(DashboardError::Config(
                "dashboard.distinguished_entity must not be empty".to_string(),
            ));
        }
        match self.logging.output.as_str() {
            "pretty" | "json" | "off" => Ok(()),
            other => Err(DashboardError::Config(format!(
                "logging.output must be pretty, json or off (got '{}')",
                other
            ))),
        }
    }
}
