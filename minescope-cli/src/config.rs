//! Configuration handling for the MineScope CLI
//!
//! Supports loading configuration from minescope.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "minescope.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the local compute service
    #[serde(default = "default_local_url")]
    pub local_url: String,

    /// Base URL of the proxy service, tried after the local one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,

    /// Timeout for baseline requests, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for the quantitative computation, in seconds
    #[serde(default = "default_compute_timeout_secs")]
    pub compute_timeout_secs: u64,

    /// Start a computation automatically when no usable snapshot is stored
    #[serde(default = "default_true")]
    pub auto_compute: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding persisted snapshots and baseline history
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    /// Record every fetched baseline in the history store
    #[serde(default = "default_true")]
    pub save_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Default output format ("table" or "json")
    #[serde(default = "default_format")]
    pub format: String,

    /// Maximum rows printed in table output (0 = all)
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

// Default value functions
fn default_local_url() -> String { "http://127.0.0.1:8000".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_compute_timeout_secs() -> u64 { 900 }
fn default_true() -> bool { true }
fn default_format() -> String { "table".to_string() }
fn default_max_rows() -> usize { 50 }

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("minescope")
        .join("snapshots")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            local_url: default_local_url(),
            proxy_url: None,
            timeout_secs: default_timeout_secs(),
            compute_timeout_secs: default_compute_timeout_secs(),
            auto_compute: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            save_history: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            max_rows: default_max_rows(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => match Self::discover() {
                Some(path) => {
                    log::info!("Loading configuration from: {}", path.display());
                    Self::load_from_file(&path)?
                }
                None => {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            },
        };

        Ok(config)
    }

    /// `./minescope.toml`, then the user configuration directory.
    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("minescope").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        let mut config = Self::default();
        config.service.proxy_url = Some("https://minescope.example.org/api".to_string());
        config.to_toml()
    }
}
