use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use pilotbar_weather::client::{AVIATION_WEATHER_URL, POINTS_URL};
use pilotbar_weather::retry::{DEFAULT_BACKOFF_SECS, DEFAULT_MAX_ATTEMPTS};
use pilotbar_weather::update::DEFAULT_REFRESH_INTERVAL_SECS;
use pilotbar_weather::{ClientSettings, RetryPolicy, StationId, UpdateSettings};

use crate::error::ConfigError;

const CONFIG_DIR_NAME: &str = "pilot-bar";
const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_FORMAT: &str = "{temps} {vis} {cloud-icon} {clouds} {wx}";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_WAYBAR_SIGNAL: u8 = 8;
/// Linux leaves 30 usable offsets above SIGRTMIN.
const MAX_WAYBAR_SIGNAL: u8 = 30;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default station when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airport: Option<String>,

    /// Status-bar text with `{placeholder}` substitutions
    pub format: String,

    pub modules: ModulesConfig,
    pub update: UpdateConfig,
    pub endpoints: EndpointsConfig,
    pub waybar: WaybarConfig,
}

/// Which products the update cycle fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    pub metar: bool,
    pub taf: bool,
    pub discussion: bool,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            metar: true,
            taf: false,
            discussion: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Seconds after the last update before the snapshot is refreshed
    pub refresh_interval_secs: u64,
    /// Request budget for METAR and TAF fetches
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff_secs: u64,
    /// Per-request transport timeout
    pub request_timeout_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_secs: DEFAULT_BACKOFF_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub aviation_weather_url: String,
    pub points_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            aviation_weather_url: AVIATION_WEATHER_URL.to_string(),
            points_url: POINTS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaybarConfig {
    /// Real-time signal offset sent as `SIGRTMIN+n` after a station switch
    pub signal: u8,
}

impl Default for WaybarConfig {
    fn default() -> Self {
        Self {
            signal: DEFAULT_WAYBAR_SIGNAL,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            airport: None,
            format: DEFAULT_FORMAT.to_string(),
            modules: ModulesConfig::default(),
            update: UpdateConfig::default(),
            endpoints: EndpointsConfig::default(),
            waybar: WaybarConfig::default(),
        }
    }
}

impl Config {
    /// Path of the user's config file (`$XDG_CONFIG_HOME/pilot-bar/config.toml`)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(CONFIG_DIR_NAME);
        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load the user's config, falling back to defaults if there is none.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_file(&path)
    }

    /// Load the user's config, writing the defaults first if there is none.
    pub fn load_or_create() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
            tracing::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        Self::load_file(&path)
    }

    /// Load a specific file. A missing file is an error.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load and validate: `path` if given, else the user's config (created
    /// with defaults when missing).
    ///
    /// Warnings are logged; any error fails the load.
    pub fn load_validated(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::load_or_create()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Some(airport) = &self.airport {
            if let Err(e) = StationId::parse(airport) {
                result.add_error("airport", e.to_string());
            }
        }

        if self.format.trim().is_empty() {
            result.add_warning("format", "Format is empty; the status bar will show nothing");
        }

        if !self.modules.metar {
            result.add_warning("modules.metar", "METAR is always fetched; setting ignored");
        }

        if self.update.max_attempts == 0 {
            result.add_error("update.max_attempts", "At least one attempt is required");
        }

        if self.update.request_timeout_secs == 0 {
            result.add_error("update.request_timeout_secs", "Timeout must be greater than 0");
        }

        if self.update.refresh_interval_secs == 0 {
            result.add_warning(
                "update.refresh_interval_secs",
                "Refresh interval is 0; every run will fetch",
            );
        } else if self.update.refresh_interval_secs > 86_400 {
            result.add_warning(
                "update.refresh_interval_secs",
                "Refresh interval is more than 24 hours",
            );
        }

        Self::validate_url(
            &self.endpoints.aviation_weather_url,
            "endpoints.aviation_weather_url",
            &mut result,
        );
        Self::validate_url(&self.endpoints.points_url, "endpoints.points_url", &mut result);

        if self.waybar.signal > MAX_WAYBAR_SIGNAL {
            result.add_error(
                "waybar.signal",
                format!("Signal offset must be at most {}", MAX_WAYBAR_SIGNAL),
            );
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configured default station, if set and well formed.
    pub fn default_airport(&self) -> Option<StationId> {
        self.airport
            .as_deref()
            .and_then(|a| StationId::parse(a).ok())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.endpoints.aviation_weather_url.clone(),
            points_url: self.endpoints.points_url.clone(),
            timeout: Duration::from_secs(self.update.request_timeout_secs),
            retry: RetryPolicy::new(
                self.update.max_attempts,
                Duration::from_secs(self.update.backoff_secs),
            ),
        }
    }

    pub fn update_settings(&self) -> UpdateSettings {
        UpdateSettings {
            refresh_interval: Duration::from_secs(self.update.refresh_interval_secs),
            fetch_taf: self.modules.taf,
            fetch_discussion: self.modules.discussion,
        }
    }
}
