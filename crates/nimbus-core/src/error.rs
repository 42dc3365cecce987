//! Application-level error types for Nimbus.
//!
//! Forecast failures are not here: they are recoverable values owned by
//! `nimbus-weather` and never escape a page handler. These types cover the
//! things that can stop the process from serving at all.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` for text that is safe to print to an operator
/// without a backtrace.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "An I/O operation failed. Check the bind address and file permissions.",
            AppError::Server(_) => "The web server stopped unexpectedly.",
            AppError::Other(_) => "An unexpected error occurred.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let config_err = ConfigError::Invalid("weather.timeout_secs".into());
        let app_err: AppError = config_err.into();
        assert!(matches!(app_err, AppError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Config(ConfigError::ParseError("line 1".into()));
        assert_eq!(
            app_err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("address in use"));
    }

    #[test]
    fn test_other_is_transparent() {
        let app_err: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(app_err.to_string(), "boom");
    }
}
