pub mod config;
pub mod error;

pub use config::{Config, ServerConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError};

use anyhow::Result;

/// Initialize logging. Call once, before anything else logs.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Nimbus core initialized");
    Ok(())
}
