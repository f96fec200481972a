//! Configuration module for gametrack-rs
//!
//! Settings are read from `config.toml` in the platform config directory:
//! - **Linux**: `~/.config/dev.gametrack.gametrack-rs/`
//! - **macOS**: `~/Library/Application Support/dev.gametrack.gametrack-rs/`
//! - **Windows**: `%APPDATA%\dev.gametrack.gametrack-rs\`
//!
//! Persisted sessions and log files go to the platform data directory under
//! the same application id unless `storage.data_dir` says otherwise.
//!
//! # Example
//!
//! ```ignore
//! use gametrack_rs::config::AppConfig;
//!
//! let config = AppConfig::load_or_default();
//! println!("Uploading to {}", config.api.base_url);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};
use crate::sensors::DEFAULT_HEADING_THRESHOLD_DEG;

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.gametrack.gametrack-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "GAMETRACK_API_URL";

/// Default backend base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Default upload timeout in seconds
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;

// ==================== Directories ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Sections ====================

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; sessions are posted to `<base_url>/track`
    pub base_url: String,
    /// Upload request timeout
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
        }
    }
}

/// Sensor settings used by the recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Request GPS-grade position fixes
    pub high_accuracy: bool,
    /// Minimum heading change, in degrees, counted as rotation
    pub heading_threshold_deg: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            heading_threshold_deg: DEFAULT_HEADING_THRESHOLD_DEG,
        }
    }
}

/// Local storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root under which `tracks/` is created; platform data dir if unset
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Storage root, falling back to the platform data directory
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => app_data_dir().ok_or_else(|| {
                TrackerError::Config("Could not determine app data directory".to_string())
            }),
        }
    }
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub tracking: TrackingConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load config from the default location
    ///
    /// A missing file yields defaults. The API URL environment override is
    /// applied either way.
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            TrackerError::Config("Could not determine config path".to_string())
        })?;

        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            let mut config = Self::default();
            config.apply_env_override(std::env::var(API_URL_ENV).ok());
            config
        })
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TrackerError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let dir = app_config_dir().ok_or_else(|| {
            TrackerError::Config("Could not determine config directory".to_string())
        })?;
        self.save_to(&dir.join(CONFIG_FILE))
    }

    /// Save config to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TrackerError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| TrackerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TrackerError::Config(format!("Failed to write config: {}", e)))
    }

    /// Replace the API base URL if an override is set and non-empty
    pub fn apply_env_override(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!(url = %url, "API base URL overridden from environment");
            self.api.base_url = url;
        }
    }

    /// Reject values the recorder cannot work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.tracking.heading_threshold_deg;
        if !threshold.is_finite() || !(0.0..180.0).contains(&threshold) {
            return Err(TrackerError::Config(format!(
                "heading_threshold_deg must be in [0, 180), got {}",
                threshold
            )));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(TrackerError::Config("api.base_url is empty".to_string()));
        }
        Ok(())
    }
}
