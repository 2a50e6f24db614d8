//! # Session Configuration
//!
//! Where the Auth API lives, where tokens are kept on disk and which
//! currency a fresh install starts with.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_API_URL=https://api.tally.app/api/v1                         │
//! │     TALLY_API_TIMEOUT_SECS=30                                          │
//! │     TALLY_STORAGE_PATH=/var/lib/tally/storage.json                     │
//! │     TALLY_CURRENCY=NGN                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/app.tally.tally/tally.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://localhost:5680/api/v1, no timeout, <data dir>/storage.json  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tally.toml
//! [api]
//! base_url = "http://localhost:5680/api/v1"
//! timeout_secs = 30   # omit for no timeout
//!
//! [storage]
//! path = "/home/ada/.local/share/tally/storage.json"
//!
//! [currency]
//! default_code = "NGN"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// File name of the config file inside the config directory.
const CONFIG_FILE: &str = "tally.toml";

/// File name of the key-value store inside the data directory.
const STORAGE_FILE: &str = "storage.json";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("app", "tally", "tally")
}

// =============================================================================
// API Settings
// =============================================================================

/// How to reach the Auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout. `None` leaves timing to the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5680/api/v1".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the durable key-value store is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Explicit store file. Falls back to `<data dir>/storage.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageSettings {
    /// Resolved store path, if one can be determined on this platform.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(STORAGE_FILE)))
    }
}

// =============================================================================
// Currency Settings
// =============================================================================

/// Currency used until the user picks one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySettings {
    /// Registry code. `None` means the registry's first entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_code: Option<String>,
}

// =============================================================================
// Main Session Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub currency: CurrencySettings,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tally.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading session config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load session config, using defaults");
            Self::default()
        })
    }

    /// Saves configuration to file as pretty TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Session config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if let Some(code) = &self.currency.default_code {
            if code.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "default currency code cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TALLY_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Ok(timeout) = std::env::var("TALLY_API_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = Some(secs),
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric TALLY_API_TIMEOUT_SECS"),
            }
        }

        if let Ok(path) = std::env::var("TALLY_STORAGE_PATH") {
            debug!(path = %path, "Overriding storage path from environment");
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(code) = std::env::var("TALLY_CURRENCY") {
            self.currency.default_code = Some(code.trim().to_uppercase());
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }

    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage.resolved_path()
    }

    pub fn default_currency_code(&self) -> Option<&str> {
        self.currency.default_code.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tally-config-{}-{}", std::process::id(), name))
            .join(CONFIG_FILE)
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.base_url(), "http://localhost:5680/api/v1");
        assert_eq!(config.api.timeout(), None);
        assert_eq!(config.default_currency_code(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = SessionConfig::default();

        config.api.base_url = "ws://localhost:5680".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "https://api.example.com/v1".into();
        config.api.timeout_secs = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));

        config.api.timeout_secs = Some(15);
        assert!(config.validate().is_ok());
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_parse_partial_file() {
        let config: SessionConfig = toml::from_str(
            r#"
            [currency]
            default_code = "GHS"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_currency_code(), Some("GHS"));
        assert_eq!(config.api, ApiSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let mut config = SessionConfig::default();
        config.api.timeout_secs = Some(20);
        config.storage.path = Some(PathBuf::from("/tmp/tally-storage.json"));
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: SessionConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = SessionConfig::load_or_default(Some(temp_path("missing")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_storage_path_wins() {
        let settings = StorageSettings {
            path: Some(PathBuf::from("/data/tally.json")),
        };
        assert_eq!(settings.resolved_path(), Some(PathBuf::from("/data/tally.json")));
    }
}
