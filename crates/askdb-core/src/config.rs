use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_records: Option<usize>,
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> Option<u64> {
    Some(DEFAULT_TIMEOUT_SECS)
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_timeout(),
            max_records: None,
            log_filter: None,
        }
    }

    /// Load the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Like [`Config::load`], but writes the defaults on first run so the
    /// user has a file to edit.
    pub fn load_or_init() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            Self::new().save_to(&config_path)?;
        }

        Self::load()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.endpoint = normalize_endpoint(&config.endpoint);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// `ASKDB_ENDPOINT` and `ASKDB_LOG` win over the file.
    fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("ASKDB_ENDPOINT").ok(),
            std::env::var("ASKDB_LOG").ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, log_filter: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = normalize_endpoint(&endpoint);
        }
        if let Some(filter) = log_filter.filter(|f| !f.trim().is_empty()) {
            self.log_filter = Some(filter);
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("askdb").join("config.json"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}
