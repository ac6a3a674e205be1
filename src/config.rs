//! Service configuration.
//!
//! [`AppConfig`] is read from a TOML file and then overlaid with feed
//! credentials from the environment. Every section falls back to defaults,
//! so an empty or missing file yields a runnable local server.

use std::path::{Path, PathBuf};

use atelier_feeds::FeedsConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ATELIER_CONFIG";

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Serve the built-in sample catalog when every feed fails, instead of
    /// answering 502.
    pub fallback_to_samples: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            fallback_to_samples: true,
        }
    }
}

/// Preference store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefsBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefsConfig {
    pub backend: PrefsBackend,
    /// Directory for the file backend. Defaults to the platform data dir.
    pub dir: Option<PathBuf>,
}

impl PrefsConfig {
    /// Directory the file backend writes to.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("atelier")
                .join("prefs")
        })
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub prefs: PrefsConfig,
    pub feeds: FeedsConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// Credentials are never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from [`AppConfig::config_path`], overlay the environment, and
    /// validate. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable or invalid file, or a feed
    /// configuration that fails validation.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            tracing::info!(path = %path.display(), "loading config");
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %path.display(), "no config file; using defaults");
            Self::default()
        };
        config.feeds.apply_env();
        config.feeds.validate()?;
        Ok(config)
    }

    /// `$ATELIER_CONFIG` if set, else [`AppConfig::default_config_path`].
    pub fn config_path() -> PathBuf {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::default_config_path(),
        }
    }

    /// Returns the default config file path: `~/.config/atelier/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("atelier").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("atelier")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/atelier-config/config.toml")
        }
    }

    /// `Cache-Control` value for successful search responses.
    pub fn cache_control(&self) -> String {
        format!(
            "s-maxage={}, stale-while-revalidate={}",
            self.feeds.cache_fresh_seconds, self.feeds.cache_stale_seconds
        )
    }
}
