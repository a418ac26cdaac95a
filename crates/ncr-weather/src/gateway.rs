//! Outbound calls to the weather provider.

use std::sync::Arc;

use chrono::Utc;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::credential::ApiKey;
use crate::location::LocationRegistry;
use crate::types::{CurrentConditions, ForecastBundle, WeatherError, WeatherReading};

pub const DEFAULT_API_BASE: &str = "https://api.weatherapi.com/v1";

/// Forecast length used when the caller does not ask for one.
pub const DEFAULT_FORECAST_DAYS: u32 = 5;

/// Requests above this are capped.
pub const MAX_FORECAST_DAYS: u32 = 10;

const USER_AGENT: &str = concat!("ncr-weather/", env!("CARGO_PKG_VERSION"));

/// Error body the provider sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client for the provider's current-conditions and forecast endpoints.
///
/// Holds its own credential; a gateway without one fails every call with
/// `WeatherError::Configuration` before touching the network. No retries and
/// no custom timeout are applied.
#[derive(Debug, Clone)]
pub struct WeatherGateway {
    client: Client,
    base_url: String,
    api_key: Option<ApiKey>,
    registry: Arc<LocationRegistry>,
}

impl WeatherGateway {
    pub fn new(
        base_url: &str,
        api_key: Option<ApiKey>,
        registry: Arc<LocationRegistry>,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            registry,
        })
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&ApiKey, WeatherError> {
        self.api_key.as_ref().ok_or_else(|| {
            WeatherError::Configuration("Weather API key not configured".to_string())
        })
    }

    /// Fetch current conditions (with air quality) for a municipality.
    ///
    /// The caller decides whether to store the returned reading.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(&self, location: &str) -> Result<WeatherReading, WeatherError> {
        let key = self.api_key()?;
        let municipality = self.registry.resolve(location)?;

        let url = format!("{}/current.json", self.base_url);
        tracing::debug!("Requesting current conditions for {}", municipality.coordinates);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", key.expose()),
                ("q", municipality.coordinates.as_str()),
                ("aqi", "yes"),
            ])
            .send()
            .await?;

        let payload = Self::read_json(response).await?;
        CurrentConditions::from_payload(&payload)?;

        tracing::info!("Fetched current conditions for {}", location);
        Ok(WeatherReading {
            location: municipality.name.clone(),
            payload,
            observed_at: Utc::now(),
        })
    }

    /// Fetch a multi-day forecast with alerts. Never cached.
    ///
    /// `days` above [`MAX_FORECAST_DAYS`] is capped; smaller values, including
    /// 0, are passed through unchanged.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(
        &self,
        location: &str,
        days: u32,
    ) -> Result<ForecastBundle, WeatherError> {
        let key = self.api_key()?;
        let municipality = self.registry.resolve(location)?;
        let days = clamp_forecast_days(days);

        let url = format!("{}/forecast.json", self.base_url);
        tracing::debug!(
            "Requesting {}-day forecast for {}",
            days,
            municipality.coordinates
        );

        let days_param = days.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", key.expose()),
                ("q", municipality.coordinates.as_str()),
                ("days", days_param.as_str()),
                ("aqi", "yes"),
                ("alerts", "yes"),
            ])
            .send()
            .await?;

        let payload = Self::read_json(response).await?;
        let bundle = ForecastBundle::from_payload(&municipality.name, &payload, Utc::now())?;

        tracing::info!(
            "Fetched {}-day forecast for {} ({} alerts)",
            bundle.days.len(),
            location,
            bundle.alerts.len()
        );
        Ok(bundle)
    }

    /// Check the status and parse the body as JSON.
    async fn read_json(response: Response) -> Result<Value, WeatherError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });
            tracing::warn!("Weather API returned {}: {}", status, message);
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| WeatherError::InvalidResponse(format!("body is not JSON: {}", e)))
    }
}

/// Upper bound only; see [`WeatherGateway::fetch_forecast`].
pub fn clamp_forecast_days(days: u32) -> u32 {
    days.min(MAX_FORECAST_DAYS)
}
