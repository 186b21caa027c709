//! Configuration loading and typed config structures for weatherlog.
//!
//! The configuration lives in `weatherlog-config.yaml`. Every section and
//! field has a default, so an empty file (or no file) yields a working
//! configuration apart from the provider API key.
//!
//! Environment variables override file values after parsing:
//! - `WEATHERLOG_API_KEY` overrides `provider.api_key`
//! - `WEATHERLOG_DB_PATH` overrides `storage.path`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level weatherlog configuration.
///
/// Mirrors the structure of `weatherlog-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeatherlogConfig {
    /// Polling cadence.
    #[serde(default)]
    pub poll: PollConfig,

    /// Remote provider endpoint and credentials.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Database location and pool sizing.
    #[serde(default)]
    pub storage: StorageConfig,

    /// The monitored site.
    #[serde(default)]
    pub location: LocationConfig,

    /// Error reporting policy.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WeatherlogConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("WEATHERLOG_API_KEY") {
            self.provider.api_key = key;
        }
        if let Ok(path) = std::env::var("WEATHERLOG_DB_PATH") {
            self.storage.path = PathBuf::from(path);
        }
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.period_minutes == 0 {
            return Err(ConfigError::Invalid(
                "poll.period_minutes must be a positive integer".to_owned(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider.timeout_secs must be a positive integer".to_owned(),
            ));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.base_url is empty".to_owned()));
        }
        if self.location.name.trim().is_empty() {
            return Err(ConfigError::Invalid("location.name is empty".to_owned()));
        }
        if self.storage.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "storage.max_connections must be at least 1".to_owned(),
            ));
        }
        if self
            .logging
            .file
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ConfigError::Invalid("logging.file is empty".to_owned()));
        }
        Ok(())
    }
}

/// Polling cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    /// Minutes between the end of one cycle and the start of the next.
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u64,
}

impl PollConfig {
    /// The poll period as a [`Duration`].
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_minutes.saturating_mul(60))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            period_minutes: default_period_minutes(),
        }
    }
}

/// Remote provider endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the forecast API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key, embedded in the request path.
    #[serde(default)]
    pub api_key: String,

    /// Latitude of the monitored site.
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Longitude of the monitored site.
    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Language code for the condition summary.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// The request timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            lang: default_lang(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Database location and pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Path of the `SQLite` database file.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// The monitored site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationConfig {
    /// Label stored with every reading.
    #[serde(default = "default_location_name")]
    pub name: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: default_location_name(),
        }
    }
}

/// Error reporting policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlertsConfig {
    /// Consecutive failures of one kind before an escalation is logged.
    #[serde(default = "default_escalate_after")]
    pub escalate_after: u32,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            escalate_after: default_escalate_after(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Append log lines to this file instead of writing them to stdout.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
            file: None,
        }
    }
}

const fn default_period_minutes() -> u64 {
    5
}

fn default_base_url() -> String {
    "https://api.darksky.net".to_owned()
}

const fn default_latitude() -> f64 {
    49.8209
}

const fn default_longitude() -> f64 {
    18.2625
}

fn default_lang() -> String {
    "cs".to_owned()
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("weather.sqlite3")
}

const fn default_max_connections() -> u32 {
    5
}

fn default_location_name() -> String {
    "Ostrava".to_owned()
}

const fn default_escalate_after() -> u32 {
    3
}

fn default_log_filter() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: WeatherlogConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config.poll.period_minutes, 5);
        assert_eq!(config.poll.period(), Duration::from_secs(300));
        assert_eq!(config.provider.base_url, "https://api.darksky.net");
        assert_eq!(config.provider.lang, "cs");
        assert_eq!(config.provider.timeout(), Duration::from_secs(10));
        assert_eq!(config.storage.path, PathBuf::from("weather.sqlite3"));
        assert_eq!(config.location.name, "Ostrava");
        assert_eq!(config.alerts.escalate_after, 3);
        assert_eq!(config.logging.filter, "info");
        assert!(!config.logging.json);
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn logging_file_is_parsed() {
        let yaml = "logging:\n  filter: debug\n  file: weather.log\n";
        let config: WeatherlogConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.logging.file, Some(PathBuf::from("weather.log")));
        assert_eq!(config.logging.filter, "debug");
        assert!(!config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_logging_file() {
        let mut config = WeatherlogConfig::default();
        config.logging.file = Some(PathBuf::new());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.file"));
    }

    #[test]
    fn partial_yaml_overrides_only_given_fields() {
        let yaml = r"
poll:
  period_minutes: 15
provider:
  api_key: abc123
  latitude: 50.0755
  longitude: 14.4378
location:
  name: Praha
";
        let config: WeatherlogConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.poll.period_minutes, 15);
        assert_eq!(config.provider.api_key, "abc123");
        assert!((config.provider.latitude - 50.0755).abs() < f64::EPSILON);
        assert_eq!(config.provider.lang, "cs");
        assert_eq!(config.location.name, "Praha");
        assert_eq!(config.storage.max_connections, 5);
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let err = serde_yml::from_str::<WeatherlogConfig>("poll: [not, a, map]").unwrap_err();
        let err = ConfigError::from(err);
        assert!(err.to_string().contains("failed to parse config YAML"));
    }

    #[test]
    fn validate_rejects_zero_period() {
        let mut config = WeatherlogConfig::default();
        config.poll.period_minutes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("period_minutes"));
    }

    #[test]
    fn validate_rejects_blank_location() {
        let mut config = WeatherlogConfig::default();
        config.location.name = "  ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = WeatherlogConfig::default();
        config.provider.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(WeatherlogConfig::default().validate().is_ok());
    }

    #[test]
    fn from_file_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weatherlog-config.yaml");
        std::fs::write(&path, "poll:\n  period_minutes: 1\n").unwrap();
        let config = WeatherlogConfig::from_file(&path).unwrap();
        assert_eq!(config.poll.period_minutes, 1);
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WeatherlogConfig::from_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
