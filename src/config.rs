//! Configuration management for Elysia
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ElysiaError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Elysia
///
/// This structure holds all configuration needed by the weather panel,
/// the location source, the local stores and the widget refresher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote weather service settings and cache policy
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Location source settings
    #[serde(default)]
    pub location: LocationConfig,
    /// Local store locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Background widget refresh settings
    #[serde(default)]
    pub widget: WidgetConfig,
}

/// Weather service and cache policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the weather API (the `weather` endpoint is joined onto it)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key sent as `appid`
    #[serde(default)]
    pub api_key: String,

    /// Measurement unit selector; only `metric` is accepted, temperatures
    /// are cached in Celsius
    #[serde(default = "default_units")]
    pub units: String,

    /// Language selector for condition descriptions
    #[serde(default = "default_language")]
    pub language: String,

    /// Age after which a cached snapshot is refreshed (minutes)
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: u64,

    /// Upper bound on acquiring one location fix (seconds)
    #[serde(default = "default_location_timeout")]
    pub location_timeout_seconds: u64,

    /// HTTP connect timeout (seconds)
    #[serde(default = "default_http_timeout")]
    pub connect_timeout_seconds: u64,

    /// HTTP read timeout for the whole request (seconds)
    #[serde(default = "default_http_timeout")]
    pub read_timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.openweathermap.org/data/2.5/".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_language() -> String {
    "id".to_string()
}

fn default_stale_after_minutes() -> u64 {
    30
}

fn default_location_timeout() -> u64 {
    15
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            units: default_units(),
            language: default_language(),
            stale_after_minutes: default_stale_after_minutes(),
            location_timeout_seconds: default_location_timeout(),
            connect_timeout_seconds: default_http_timeout(),
            read_timeout_seconds: default_http_timeout(),
        }
    }
}

impl WeatherConfig {
    /// Staleness threshold in milliseconds
    ///
    /// Saturates at `i64::MAX` for thresholds too large to represent.
    pub fn stale_threshold_ms(&self) -> i64 {
        i64::try_from(self.stale_after_minutes)
            .ok()
            .and_then(|minutes| minutes.checked_mul(60_000))
            .unwrap_or(i64::MAX)
    }

    /// Location fix timeout
    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_seconds)
    }
}

/// Which location source to consult
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationSourceKind {
    /// Use the configured latitude/longitude
    #[default]
    Fixed,
    /// Resolve an approximate position from the public IP address
    IpLookup,
}

/// Location source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Location source to use
    #[serde(default)]
    pub source: LocationSourceKind,

    /// Latitude for the fixed source
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Longitude for the fixed source
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Whether the user consented to location use
    #[serde(default)]
    pub permission_granted: bool,

    /// Endpoint for the IP lookup source
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,
}

fn default_ip_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSourceKind::default(),
            latitude: None,
            longitude: None,
            permission_granted: false,
            ip_lookup_url: default_ip_lookup_url(),
        }
    }
}

/// Local store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding both stores; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// SQLite file name for chat messages
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// SQLite file name for the preference store
    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,
}

fn default_database_file() -> String {
    "chat.db".to_string()
}

fn default_preferences_file() -> String {
    "preferences.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: default_database_file(),
            preferences_file: default_preferences_file(),
        }
    }
}

impl StorageConfig {
    /// Resolve the data directory, falling back to the platform data dir
    ///
    /// # Errors
    ///
    /// Returns error if no data directory is configured and the platform
    /// directory cannot be determined
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let proj_dirs = ProjectDirs::from("com", "elysia", "elysia").ok_or_else(|| {
            ElysiaError::Config("Could not determine data directory".to_string())
        })?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Full path of the chat message database
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(&self.database_file))
    }

    /// Full path of the preference store database
    pub fn preferences_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(&self.preferences_file))
    }
}

/// Background widget refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Interval between background refreshes (minutes)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u64,
}

fn default_refresh_interval() -> u64 {
    30
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: default_refresh_interval(),
        }
    }
}

impl WidgetConfig {
    /// Refresh interval as a duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.saturating_mul(60))
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ElysiaError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ElysiaError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("ELYSIA_WEATHER_API_KEY") {
            self.weather.api_key = api_key;
        }

        if let Ok(api_base) = std::env::var("ELYSIA_WEATHER_API_BASE") {
            self.weather.api_base = api_base;
        }

        if let Ok(minutes) = std::env::var("ELYSIA_STALE_AFTER_MINUTES") {
            if let Ok(value) = minutes.parse() {
                self.weather.stale_after_minutes = value;
            } else {
                tracing::warn!("Invalid ELYSIA_STALE_AFTER_MINUTES: {}", minutes);
            }
        }

        if let Ok(lat) = std::env::var("ELYSIA_LATITUDE") {
            match lat.parse::<f64>() {
                Ok(v) => self.location.latitude = Some(v),
                Err(_) => tracing::warn!("Invalid ELYSIA_LATITUDE: {}", lat),
            }
        }

        if let Ok(lon) = std::env::var("ELYSIA_LONGITUDE") {
            match lon.parse::<f64>() {
                Ok(v) => self.location.longitude = Some(v),
                Err(_) => tracing::warn!("Invalid ELYSIA_LONGITUDE: {}", lon),
            }
        }

        if let Ok(granted) = std::env::var("ELYSIA_LOCATION_PERMISSION") {
            match granted.parse::<bool>() {
                Ok(v) => {
                    self.location.permission_granted = v;
                    tracing::debug!(granted = v, "Env override: ELYSIA_LOCATION_PERMISSION");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for ELYSIA_LOCATION_PERMISSION: {}", granted);
                }
            }
        }

        if let Ok(dir) = std::env::var("ELYSIA_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let Some(dir) = &cli.data_dir {
            tracing::info!("Using data directory override from CLI: {}", dir.display());
            self.storage.data_dir = Some(dir.clone());
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges.
    /// The API key is only required when a refresh is requested; see
    /// [`Config::validate_for_refresh`].
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.weather.stale_after_minutes == 0 {
            return Err(ElysiaError::Config(
                "weather.stale_after_minutes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.weather.location_timeout_seconds == 0 {
            return Err(ElysiaError::Config(
                "weather.location_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.weather.connect_timeout_seconds == 0 || self.weather.read_timeout_seconds == 0 {
            return Err(ElysiaError::Config(
                "weather HTTP timeouts must be greater than 0".to_string(),
            )
            .into());
        }

        if self.weather.units != "metric" {
            return Err(ElysiaError::Config(format!(
                "weather.units must be metric, got {}",
                self.weather.units
            ))
            .into());
        }

        url::Url::parse(&self.weather.api_base).map_err(|e| {
            ElysiaError::Config(format!(
                "weather.api_base is not a valid URL ({}): {}",
                self.weather.api_base, e
            ))
        })?;

        if let Some(lat) = self.location.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ElysiaError::Config(format!(
                    "location.latitude out of range: {}",
                    lat
                ))
                .into());
            }
        }

        if let Some(lon) = self.location.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ElysiaError::Config(format!(
                    "location.longitude out of range: {}",
                    lon
                ))
                .into());
            }
        }

        if self.widget.refresh_interval_minutes == 0 {
            return Err(ElysiaError::Config(
                "widget.refresh_interval_minutes must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Validate the settings a weather refresh depends on
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn validate_for_refresh(&self) -> Result<()> {
        if self.weather.api_key.trim().is_empty() {
            return Err(ElysiaError::Config(
                "weather.api_key is required (set ELYSIA_WEATHER_API_KEY)".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
