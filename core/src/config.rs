//! Plugin configuration: store location, polling cadence, logging

use crate::networksetup::DEFAULT_NETWORKSETUP_PATH;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current config version for migration support
pub const CONFIG_VERSION: u32 = 1;

/// Debounce window as a multiple of the poll interval (2.4x)
const DEBOUNCE_NUMERATOR: u64 = 12;
const DEBOUNCE_DENOMINATOR: u64 = 5;

/// Configuration for the plugin process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub version: u32,
    /// Path to the `networksetup` binary
    pub networksetup_path: String,
    /// Delay between reconciliation ticks
    pub poll_interval_ms: u64,
    /// Minimum time between accepted presses; derived from the poll
    /// interval when unset
    pub debounce_ms: Option<u64>,
    /// Network service filled into buttons that have none yet
    pub default_network_service: Option<String>,
    /// Default `env_logger` filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            networksetup_path: DEFAULT_NETWORKSETUP_PATH.to_string(),
            poll_interval_ms: 2000,
            debounce_ms: None,
            default_network_service: Some("Wi-Fi".to_string()),
            log_level: "info".to_string(),
        }
    }
}

impl PluginConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("proxy-toggle")
            .join("config.toml")
    }

    /// Load config from file, or create default if not exists
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load config from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.networksetup_path.trim().is_empty() {
            return Err(Error::config("networksetup path cannot be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::config("Poll interval must be greater than 0"));
        }
        if self.debounce_ms == Some(0) {
            return Err(Error::config("Debounce window must be greater than 0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        match self.debounce_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_millis(
                self.poll_interval_ms.saturating_mul(DEBOUNCE_NUMERATOR) / DEBOUNCE_DENOMINATOR,
            ),
        }
    }

    pub fn default_network_service(&self) -> Option<&str> {
        self.default_network_service
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
