//! Query/action surface the dashboard binds to.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::WeatherCache;
use crate::gateway::{WeatherGateway, DEFAULT_FORECAST_DAYS};
use crate::location::LocationRegistry;
use crate::types::{ForecastBundle, WeatherError, WeatherReading};

/// Municipality list, cached lookup, and the two fetch actions.
pub struct WeatherService {
    registry: Arc<LocationRegistry>,
    gateway: WeatherGateway,
    cache: Arc<dyn WeatherCache>,
}

impl WeatherService {
    pub fn new(
        registry: Arc<LocationRegistry>,
        gateway: WeatherGateway,
        cache: Arc<dyn WeatherCache>,
    ) -> Self {
        Self {
            registry,
            gateway,
            cache,
        }
    }

    /// Names of the supported municipalities, in display order.
    pub fn municipalities(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    /// The cached reading for `city` if it is still fresh.
    pub fn cached_weather(&self, city: &str) -> Result<Option<WeatherReading>, WeatherError> {
        self.cached_weather_at(city, Utc::now())
    }

    pub fn cached_weather_at(
        &self,
        city: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<WeatherReading>, WeatherError> {
        let entry = self.cache.get_fresh(city, now)?;
        if let Some(entry) = &entry {
            tracing::debug!(
                "Cache hit for {} ({}s old, {})",
                city,
                entry.age(now).num_seconds(),
                self.cache.backend()
            );
        }
        Ok(entry.map(|e| e.reading))
    }

    /// Fetch current conditions live and store them.
    ///
    /// A failed store is logged and does not fail the request.
    pub async fn current_weather(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let reading = self.gateway.fetch_current(city).await?;

        if let Err(e) = self.cache.put(&reading.location, &reading, reading.observed_at) {
            tracing::warn!("Failed to store weather reading for {}: {}", city, e);
        }

        Ok(reading)
    }

    /// Fetch a forecast live. `None` requests the default length.
    pub async fn forecast(
        &self,
        city: &str,
        days: Option<u32>,
    ) -> Result<ForecastBundle, WeatherError> {
        self.gateway
            .fetch_forecast(city, days.unwrap_or(DEFAULT_FORECAST_DAYS))
            .await
    }
}
