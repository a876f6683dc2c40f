//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::services::deduper::{DEFAULT_WINDOW_SECS, MAX_WINDOW_SECS};
use crate::services::proximity::DEFAULT_RADIUS_M;
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Visit radius around a store, in meters
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    /// Repeat pings at the same store within this many seconds are ignored
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: i64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { radius_m: default_radius_m(), dedup_window_secs: default_dedup_window_secs() }
    }
}

fn default_radius_m() -> f64 {
    DEFAULT_RADIUS_M
}

fn default_dedup_window_secs() -> i64 {
    DEFAULT_WINDOW_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoresConfig {
    /// JSON seed file for the store catalog
    #[serde(default = "default_seed_file")]
    pub seed_file: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self { seed_file: default_seed_file() }
    }
}

fn default_seed_file() -> String {
    "config/stores.json".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    /// JSONL visit journal; empty keeps visits in memory only
    #[serde(default)]
    pub visit_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    radius_m: f64,
    dedup_window_secs: i64,
    stores_seed_file: String,
    visit_log: Option<String>,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let visit_log = Some(toml_config.storage.visit_log).filter(|p| !p.trim().is_empty());
        Self {
            radius_m: toml_config.matching.radius_m,
            dedup_window_secs: toml_config.matching.dedup_window_secs,
            stores_seed_file: toml_config.stores.seed_file,
            visit_log,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file,
        }
    }

    /// Determine config file path from an explicit argument or the environment
    pub fn resolve_config_path(explicit: Option<&str>) -> String {
        if let Some(path) = explicit {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            if !path.is_empty() {
                return path;
            }
        }

        DEFAULT_CONFIG_PATH.to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let matching = &toml_config.matching;
        ensure!(
            matching.radius_m.is_finite() && matching.radius_m >= 0.0,
            "matching.radius_m must be a non-negative number, got {}",
            matching.radius_m
        );
        ensure!(
            (0..=MAX_WINDOW_SECS).contains(&matching.dedup_window_secs),
            "matching.dedup_window_secs must be between 0 and {}, got {}",
            MAX_WINDOW_SECS,
            matching.dedup_window_secs
        );
        ensure!(toml_config.metrics.interval_secs > 0, "metrics.interval_secs must be positive");

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(explicit: Option<&str>) -> Self {
        Self::load_from_path(&Self::resolve_config_path(explicit))
    }

    /// Load a specific file, falling back to defaults with a warning
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(config_file = %path, error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn dedup_window_secs(&self) -> i64 {
        self.dedup_window_secs
    }

    pub fn stores_seed_file(&self) -> &str {
        &self.stores_seed_file
    }

    /// Visit journal path, if visits should survive restarts
    pub fn visit_log(&self) -> Option<&str> {
        self.visit_log.as_deref()
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the visit radius
    #[cfg(test)]
    pub fn with_radius_m(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// Builder method for tests to set the dedup window
    #[cfg(test)]
    pub fn with_dedup_window_secs(mut self, secs: i64) -> Self {
        self.dedup_window_secs = secs;
        self
    }
}
