//! Application services container.
//!
//! `AppServices` owns the tokio runtime and the weather service built from
//! configuration. The deployment setting picks the cache backend and where
//! the provider credential comes from.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::RwLock;

use ncr_core::{Config, Deployment};
use ncr_weather::{
    ApiKey, LocationRegistry, Municipality, SessionCache, SqliteWeatherCache, WeatherCache,
    WeatherGateway, WeatherService,
};

use crate::models::WeatherModel;

/// Message types for the weather service channel
pub use crate::services::WeatherServiceMessage;

pub struct AppServices {
    /// Tokio runtime for async operations
    runtime: tokio::runtime::Runtime,

    config: Config,

    /// Cleared on shutdown
    weather_service: RwLock<Option<Arc<WeatherService>>>,
}

impl AppServices {
    /// Build the runtime and weather services for `config`.
    pub fn init(config: Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("ncr-weather-tokio")
            .build()
            .context("Failed to create tokio runtime")?;

        let service = build_weather_service(&config)?;

        Ok(Self {
            runtime,
            config,
            weather_service: RwLock::new(Some(Arc::new(service))),
        })
    }

    /// Get the tokio runtime handle.
    pub fn runtime(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the weather service if not shut down.
    pub fn weather_service(&self) -> Option<Arc<WeatherService>> {
        self.weather_service.read().clone()
    }

    /// A dashboard model bound to this container's service and runtime.
    pub fn weather_model(&self) -> Result<WeatherModel> {
        let service = self
            .weather_service()
            .context("Weather service has been shut down")?;
        Ok(WeatherModel::new(
            service,
            self.runtime(),
            Some(self.config.weather.forecast_days),
        ))
    }

    /// Drop the services and stop the runtime. In-flight fetches are abandoned.
    pub fn shutdown(self) {
        tracing::info!("AppServices shutdown initiated");
        *self.weather_service.write() = None;
        self.runtime.shutdown_timeout(Duration::from_secs(1));
        tracing::info!("AppServices shutdown complete");
    }
}

fn build_registry(config: &Config) -> Result<LocationRegistry> {
    if config.weather.municipalities.is_empty() {
        return Ok(LocationRegistry::ncr());
    }

    let municipalities = config
        .weather
        .municipalities
        .iter()
        .map(|m| Municipality::new(m.name.clone(), m.coordinates.clone()))
        .collect();
    LocationRegistry::new(municipalities).context("Invalid municipality table in config")
}

fn build_cache(config: &Config) -> Result<Arc<dyn WeatherCache>> {
    match config.weather.deployment {
        Deployment::Server => {
            let path = config.cache_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory {}", parent.display())
                })?;
            }
            let cache = SqliteWeatherCache::open(&path)
                .with_context(|| format!("Failed to open weather cache {}", path.display()))?;
            if let Err(e) = cache.prune_superseded() {
                tracing::warn!("Failed to prune weather cache: {}", e);
            }
            tracing::info!("Weather cache opened at {}", path.display());
            Ok(Arc::new(cache))
        }
        Deployment::Client => {
            tracing::info!("Using session weather cache");
            Ok(Arc::new(SessionCache::new()))
        }
    }
}

fn build_weather_service(config: &Config) -> Result<WeatherService> {
    let registry = Arc::new(build_registry(config)?);
    let cache = build_cache(config)?;

    let api_key = config.weather.api_key().and_then(ApiKey::new);
    if api_key.is_none() {
        tracing::warn!(
            "{} is not set; weather requests will fail until it is configured",
            config.weather.api_key_env()
        );
    }

    let gateway = WeatherGateway::new(&config.weather.api_base_url, api_key, registry.clone())
        .context("Failed to create weather gateway")?;

    tracing::info!(
        "Weather services initialized ({} deployment, {} municipalities)",
        config.weather.deployment.as_str(),
        registry.len()
    );
    Ok(WeatherService::new(registry, gateway, cache))
}
