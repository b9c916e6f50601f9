//! Console settings

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;

/// Environment variable naming the config file
pub const CONFIG_PATH_VAR: &str = "WEATHER_ACCESS_CONFIG";

/// Prefix of per-key environment overrides
pub const ENV_PREFIX: &str = "WEATHER_ACCESS";

const DEFAULT_CONFIG_FILE: &str = "weather-access.toml";

/// Walkthrough configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// User the session is opened as
    pub username: String,

    /// User looked up through the directory
    pub username_to_search: String,

    /// Device read and probed for data
    pub device_to_search: String,

    /// Device the walkthrough tries to register
    pub device_to_create: String,

    /// Timestamp of the reading probe
    pub reading_probe: DateTime<Utc>,

    /// Report query range (inclusive)
    pub report_start: NaiveDate,
    pub report_end: NaiveDate,

    /// JSON fixture to seed from; the bundled fixture when unset
    pub seed_path: Option<PathBuf>,

    /// Stop replaying reports at the first failed insert
    pub halt_on_failure: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit JSON log lines
    pub log_json: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            username_to_search: "user_1".to_string(),
            device_to_search: "DT001".to_string(),
            device_to_create: "DT201".to_string(),
            reading_probe: Utc.with_ymd_and_hms(2020, 12, 2, 13, 30, 0).single().unwrap_or_default(),
            report_start: NaiveDate::from_ymd_opt(2020, 12, 1).unwrap_or_default(),
            report_end: NaiveDate::from_ymd_opt(2020, 12, 5).unwrap_or_default(),
            seed_path: None,
            halt_on_failure: false,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl ConsoleConfig {
    /// Load from the optional config file, then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Parse TOML text, falling back to defaults for missing keys
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}
