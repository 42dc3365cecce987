use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "NIMBUS_CONFIG";
/// Environment variable overriding `server.port` (set by most hosting platforms).
pub const PORT_ENV: &str = "PORT";

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

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind, e.g. `0.0.0.0`
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for paths no page route claims
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the National Weather Service API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Client identity sent as `User-Agent`. api.weather.gov asks for an
    /// application name and a contact address.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Budget in seconds for the whole points + forecast resolution
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Location used when a request carries no usable coordinates
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
}

fn default_api_base_url() -> String {
    "https://api.weather.gov".to_string()
}

fn default_user_agent() -> String {
    format!(
        "nimbus/{} (https://github.com/nimbus-weather/nimbus)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_timeout_secs() -> u64 {
    10
}

// New York City
fn default_latitude() -> f64 {
    40.7128
}

fn default_longitude() -> f64 {
    -74.0060
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
        }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from `$NIMBUS_CONFIG` or the platform config
    /// directory, falling back to defaults when no file exists. `$PORT`
    /// overrides the configured port.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(explicit) => Some(PathBuf::from(explicit)),
            None => Self::config_path().filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        if let Ok(port) = std::env::var(PORT_ENV) {
            config.apply_port_override(&port)?;
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Parse a TOML config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str::<Self>(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn apply_port_override(&mut self, raw: &str) -> Result<()> {
        self.server.port = raw
            .trim()
            .parse()
            .with_context(|| format!("{} is not a valid port: {:?}", PORT_ENV, raw))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);

        if self.server.host.trim().is_empty() {
            result.add_error("server.host", "Host must not be empty");
        }

        if self.server.port == 0 {
            result.add_warning("server.port", "Port 0 binds a random free port");
        }

        if !self.server.static_dir.is_dir() {
            result.add_warning(
                "server.static_dir",
                format!(
                    "Not a directory, static assets will 404: {}",
                    self.server.static_dir.display()
                ),
            );
        }

        if self.weather.user_agent.trim().is_empty() {
            result.add_error(
                "weather.user_agent",
                "A client identity is required by the weather API",
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 60 {
            result.add_warning(
                "weather.timeout_secs",
                "Timeout over 60 seconds will hold page requests for a long time",
            );
        }

        let lat = self.weather.default_latitude;
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            result.add_error("weather.default_latitude", "Latitude must be within -90..90");
        }

        let lon = self.weather.default_longitude;
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            result.add_error(
                "weather.default_longitude",
                "Longitude must be within -180..180",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
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

                if url.scheme() == "http" {
                    result.add_warning(field_name, "Weather API is reached over plain http");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Platform config file location, e.g. `~/.config/nimbus/config.toml`
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nimbus").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn config_without_static_warning() -> Config {
        let mut config = Config::default();
        config.server.static_dir = std::env::temp_dir();
        config
    }

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.weather.api_base_url, "https://api.weather.gov");
        assert_eq!(config.weather.timeout_secs, 10);
        assert_eq!(config.weather.default_latitude, 40.7128);
        assert_eq!(config.weather.default_longitude, -74.0060);
        assert!(config.weather.user_agent.starts_with("nimbus/"));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = config_without_static_warning();
        config.weather.api_base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = config_without_static_warning();
        config.weather.api_base_url = "ftp://api.weather.gov".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_http_base_url_is_warning() {
        let mut config = config_without_static_warning();
        config.weather.api_base_url = "http://127.0.0.1:8080".to_string();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.api_base_url"));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = config_without_static_warning();
        config.weather.timeout_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.timeout_secs"));
    }

    #[test]
    fn test_empty_user_agent_is_error() {
        let mut config = config_without_static_warning();
        config.weather.user_agent = "  ".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "weather.user_agent"));
    }

    #[test]
    fn test_out_of_range_default_location() {
        let mut config = config_without_static_warning();
        config.weather.default_latitude = 91.0;
        config.weather.default_longitude = f64::NAN;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "weather.default_latitude"));
        assert!(result.errors.iter().any(|e| e.field == "weather.default_longitude"));
    }

    #[test]
    fn test_missing_static_dir_is_warning() {
        let mut config = Config::default();
        config.server.static_dir = PathBuf::from("/definitely/not/here");
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "server.static_dir"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8080

[weather]
user_agent = "example.com (ops@example.com)"
timeout_secs = 4
"#,
        )
        .unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.weather.user_agent, "example.com (ops@example.com)");
        assert_eq!(config.weather.timeout(), std::time::Duration::from_secs(4));
        assert_eq!(config.weather.api_base_url, "https://api.weather.gov");
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_port_override() {
        let mut config = Config::default();
        config.apply_port_override(" 8081 ").unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8081");

        assert!(config.apply_port_override("eighty").is_err());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
