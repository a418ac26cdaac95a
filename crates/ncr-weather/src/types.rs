use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A supported municipality and where it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub name: String,
    /// "lat,lon", passed to the provider as-is
    pub coordinates: String,
}

impl Municipality {
    pub fn new(name: impl Into<String>, coordinates: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates: coordinates.into(),
        }
    }
}

/// One fetched snapshot of current conditions.
///
/// The payload is the provider's document, kept opaque; use
/// [`WeatherReading::conditions`] for the fields the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub location: String,
    pub payload: Value,
    pub observed_at: DateTime<Utc>,
}

impl WeatherReading {
    pub fn conditions(&self) -> Result<CurrentConditions, WeatherError> {
        CurrentConditions::from_payload(&self.payload)
    }
}

/// The latest stored reading for a municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub location: String,
    pub reading: WeatherReading,
    pub observed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.observed_at
    }
}

/// Provider condition summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Condition {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub icon: String,
}

impl Condition {
    /// Icon URL; the provider sends protocol-relative paths.
    pub fn icon_url(&self) -> String {
        if self.icon.starts_with("//") {
            format!("https:{}", self.icon)
        } else {
            self.icon.clone()
        }
    }
}

/// Current conditions as displayed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub location_name: String,
    /// Provider local time, "YYYY-MM-DD HH:MM"
    pub local_time: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: Condition,
    pub wind_kph: f64,
    pub humidity: u8,
    pub uv_index: f64,
    pub pm2_5: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    name: String,
    #[serde(default)]
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct RawCurrent {
    temp_c: f64,
    feelslike_c: f64,
    condition: Condition,
    wind_kph: f64,
    #[serde(deserialize_with = "deserialize_percent")]
    humidity: u8,
    #[serde(default)]
    uv: f64,
}

#[derive(Debug, Deserialize)]
struct RawAirQuality {
    #[serde(default)]
    pm2_5: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCurrentPayload {
    location: RawLocation,
    current: RawCurrent,
    #[serde(default)]
    air_quality: Option<RawAirQuality>,
}

impl CurrentConditions {
    pub fn from_payload(payload: &Value) -> Result<Self, WeatherError> {
        let raw = RawCurrentPayload::deserialize(payload)
            .map_err(|e| WeatherError::InvalidResponse(format!("current conditions: {}", e)))?;

        Ok(Self {
            location_name: raw.location.name,
            local_time: raw.location.localtime,
            temperature_c: raw.current.temp_c,
            feels_like_c: raw.current.feelslike_c,
            condition: raw.current.condition,
            wind_kph: raw.current.wind_kph,
            humidity: raw.current.humidity,
            uv_index: raw.current.uv,
            pm2_5: raw.air_quality.and_then(|aq| aq.pm2_5),
        })
    }
}

/// Daily forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub condition: Condition,
    pub chance_of_rain: u8,
    /// Provider-formatted, e.g. "05:43 AM"
    pub sunrise: String,
    pub sunset: String,
}

/// Weather advisory attached to a forecast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherAlert {
    #[serde(default)]
    pub headline: String,
    #[serde(default, rename = "desc")]
    pub description: String,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Multi-day outlook plus active advisories. Always fetched live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub location: String,
    pub days: Vec<DayForecast>,
    pub alerts: Vec<WeatherAlert>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    #[serde(default)]
    condition: Condition,
    #[serde(default, deserialize_with = "deserialize_percent")]
    daily_chance_of_rain: u8,
}

#[derive(Debug, Deserialize)]
struct RawAstro {
    #[serde(default)]
    sunrise: String,
    #[serde(default)]
    sunset: String,
}

#[derive(Debug, Deserialize)]
struct RawForecastDay {
    date: NaiveDate,
    day: RawDay,
    astro: RawAstro,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    forecastday: Vec<RawForecastDay>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAlerts {
    #[serde(default)]
    alert: Vec<WeatherAlert>,
}

#[derive(Debug, Deserialize)]
struct RawForecastPayload {
    forecast: RawForecast,
    #[serde(default)]
    alerts: Option<RawAlerts>,
}

impl ForecastBundle {
    pub fn from_payload(
        location: &str,
        payload: &Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, WeatherError> {
        let raw = RawForecastPayload::deserialize(payload)
            .map_err(|e| WeatherError::InvalidResponse(format!("forecast: {}", e)))?;

        let days = raw
            .forecast
            .forecastday
            .into_iter()
            .map(|d| DayForecast {
                date: d.date,
                max_temp_c: d.day.maxtemp_c,
                min_temp_c: d.day.mintemp_c,
                condition: d.day.condition,
                chance_of_rain: d.day.daily_chance_of_rain,
                sunrise: d.astro.sunrise,
                sunset: d.astro.sunset,
            })
            .collect();

        Ok(Self {
            location: location.to_string(),
            days,
            alerts: raw.alerts.unwrap_or_default().alert,
            fetched_at,
        })
    }
}

/// Percentages arrive as numbers or, from older API versions, as strings.
fn deserialize_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Percent {
        Number(f64),
        Text(String),
    }

    let value = match Percent::deserialize(deserializer)? {
        Percent::Number(n) => n,
        Percent::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
    };
    Ok(value.clamp(0.0, 100.0).round() as u8)
}

/// Weather errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// Missing or unusable provider credential; raised before any request.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Municipality not in the registry; raised before any request.
    #[error("Unknown location: {0}")]
    UnknownLocation(String),
    /// Provider answered with a non-2xx status.
    #[error("Weather API error: HTTP {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// 2xx body without the fields the dashboard consumes.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    /// HTTP status for provider errors
    pub fn status(&self) -> Option<u16> {
        match self {
            WeatherError::Provider { status, .. } => Some(*status),
            WeatherError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the failure happened before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            WeatherError::Configuration(_) | WeatherError::UnknownLocation(_)
        )
    }
}

impl From<rusqlite::Error> for WeatherError {
    fn from(e: rusqlite::Error) -> Self {
        WeatherError::Cache(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn current_payload() -> Value {
        json!({
            "location": { "name": "Manila", "region": "Manila", "country": "Philippines", "localtime": "2026-10-19 14:05" },
            "current": {
                "temp_c": 31.4,
                "temp_f": 88.5,
                "condition": { "text": "Partly cloudy", "icon": "//cdn.weatherapi.com/weather/64x64/day/116.png" },
                "wind_kph": 13.0,
                "humidity": 70,
                "uv": 8.0,
                "feelslike_c": 37.2
            },
            "air_quality": { "pm2_5": 18.5, "pm10": 25.1, "o3": 40.0 }
        })
    }

    #[test]
    fn test_current_conditions_from_payload() {
        let c = CurrentConditions::from_payload(&current_payload()).unwrap();
        assert_eq!(c.location_name, "Manila");
        assert_eq!(c.local_time, "2026-10-19 14:05");
        assert_eq!(c.temperature_c, 31.4);
        assert_eq!(c.feels_like_c, 37.2);
        assert_eq!(c.humidity, 70);
        assert_eq!(c.uv_index, 8.0);
        assert_eq!(c.pm2_5, Some(18.5));
        assert_eq!(c.condition.text, "Partly cloudy");
    }

    #[test]
    fn test_current_conditions_without_air_quality() {
        let mut payload = current_payload();
        payload.as_object_mut().unwrap().remove("air_quality");
        let c = CurrentConditions::from_payload(&payload).unwrap();
        assert_eq!(c.pm2_5, None);
    }

    #[test]
    fn test_current_conditions_missing_block_is_invalid() {
        let err = CurrentConditions::from_payload(&json!({ "location": { "name": "Manila" } }))
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidResponse(_)));
    }

    #[test]
    fn test_icon_url_prefixes_scheme() {
        let c = Condition {
            text: "Sunny".into(),
            icon: "//cdn.weatherapi.com/weather/64x64/day/113.png".into(),
        };
        assert_eq!(
            c.icon_url(),
            "https://cdn.weatherapi.com/weather/64x64/day/113.png"
        );

        let absolute = Condition {
            text: "Sunny".into(),
            icon: "https://example.com/a.png".into(),
        };
        assert_eq!(absolute.icon_url(), "https://example.com/a.png");
    }

    #[test]
    fn test_forecast_bundle_from_payload() {
        let payload = json!({
            "location": { "name": "Manila" },
            "forecast": { "forecastday": [
                {
                    "date": "2026-10-19",
                    "day": { "maxtemp_c": 32.6, "mintemp_c": 26.1, "condition": { "text": "Patchy rain nearby", "icon": "//x/176.png" }, "daily_chance_of_rain": 87 },
                    "astro": { "sunrise": "05:46 AM", "sunset": "05:36 PM" },
                    "hour": []
                },
                {
                    "date": "2026-10-20",
                    "day": { "maxtemp_c": 31.0, "mintemp_c": 25.9, "condition": { "text": "Sunny", "icon": "//x/113.png" }, "daily_chance_of_rain": "40" },
                    "astro": { "sunrise": "05:46 AM", "sunset": "05:35 PM" }
                }
            ]},
            "alerts": { "alert": [
                { "headline": "Heavy rainfall warning", "desc": "Orange warning over Metro Manila", "severity": "Moderate" }
            ]}
        });

        let fetched_at = Utc::now();
        let bundle = ForecastBundle::from_payload("Manila", &payload, fetched_at).unwrap();
        assert_eq!(bundle.location, "Manila");
        assert_eq!(bundle.days.len(), 2);
        assert_eq!(bundle.days[0].date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(bundle.days[0].chance_of_rain, 87);
        assert_eq!(bundle.days[1].chance_of_rain, 40);
        assert_eq!(bundle.days[0].sunset, "05:36 PM");
        assert_eq!(bundle.alerts.len(), 1);
        assert_eq!(bundle.alerts[0].description, "Orange warning over Metro Manila");
        assert_eq!(bundle.alerts[0].severity.as_deref(), Some("Moderate"));
        assert_eq!(bundle.fetched_at, fetched_at);
    }

    #[test]
    fn test_forecast_without_alerts() {
        let payload = json!({
            "forecast": { "forecastday": [] },
            "alerts": {}
        });
        let bundle = ForecastBundle::from_payload("Pasig", &payload, Utc::now()).unwrap();
        assert!(bundle.days.is_empty());
        assert!(bundle.alerts.is_empty());

        let payload = json!({ "forecast": { "forecastday": [] } });
        let bundle = ForecastBundle::from_payload("Pasig", &payload, Utc::now()).unwrap();
        assert!(bundle.alerts.is_empty());
    }

    #[test]
    fn test_forecast_missing_days_is_invalid() {
        let err = ForecastBundle::from_payload("Pasig", &json!({ "current": {} }), Utc::now())
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidResponse(_)));
    }

    #[test]
    fn test_error_classification() {
        assert!(WeatherError::Configuration("no key".into()).is_local());
        assert!(WeatherError::UnknownLocation("Atlantis".into()).is_local());
        let provider = WeatherError::Provider {
            status: 403,
            message: "API key has been disabled.".into(),
        };
        assert!(!provider.is_local());
        assert_eq!(provider.status(), Some(403));
        assert!(provider.to_string().contains("403"));
    }
}
