pub mod config;
pub mod error;

pub use config::{
    Config, Deployment, MunicipalityConfig, UiConfig, ValidationResult, WeatherConfig,
    CLIENT_API_KEY_ENV, SERVER_API_KEY_ENV,
};
pub use error::{AppError, ConfigError, NetworkError, WeatherError};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("NCR Weather core initialized");
    Ok(())
}
