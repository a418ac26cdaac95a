//! Weather backend: async current-conditions and forecast fetching.
//! All network work runs off the UI thread; results sent via mpsc.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use ncr_weather::{ForecastBundle, WeatherReading, WeatherService};
use tokio::runtime::Handle;

/// Error type for weather operations
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherError {
    Configuration(String),
    UnknownLocation(String),
    Provider { status: u16, message: String },
    Network(String),
    Timeout,
    InvalidResponse(String),
    Cache(String),
}

impl std::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherError::Configuration(s) => write!(f, "Configuration error: {}", s),
            WeatherError::UnknownLocation(s) => write!(f, "Unknown location: {}", s),
            WeatherError::Provider { status, message } => {
                write!(f, "Weather API error: HTTP {}: {}", status, message)
            }
            WeatherError::Network(s) => write!(f, "Network error: {}", s),
            WeatherError::Timeout => write!(f, "Request timed out"),
            WeatherError::InvalidResponse(s) => write!(f, "Invalid response: {}", s),
            WeatherError::Cache(s) => write!(f, "Cache error: {}", s),
        }
    }
}

impl std::error::Error for WeatherError {}

impl From<ncr_weather::WeatherError> for WeatherError {
    fn from(e: ncr_weather::WeatherError) -> Self {
        use ncr_weather::WeatherError as Source;
        match e {
            Source::Configuration(s) => WeatherError::Configuration(s),
            Source::UnknownLocation(s) => WeatherError::UnknownLocation(s),
            Source::Provider { status, message } => WeatherError::Provider { status, message },
            Source::Transport(e) if e.is_timeout() => WeatherError::Timeout,
            Source::Transport(e) => WeatherError::Network(e.to_string()),
            Source::InvalidResponse(s) => WeatherError::InvalidResponse(s),
            Source::Cache(s) => WeatherError::Cache(s),
        }
    }
}

/// Messages sent from async operations back to the UI thread
#[derive(Debug)]
pub enum WeatherServiceMessage {
    /// Result of fetching current conditions for `city`
    CurrentDone {
        city: String,
        result: Result<WeatherReading, WeatherError>,
    },
    /// Result of fetching a forecast for `city`
    ForecastDone {
        city: String,
        result: Result<ForecastBundle, WeatherError>,
    },
}

impl WeatherServiceMessage {
    pub fn city(&self) -> &str {
        match self {
            WeatherServiceMessage::CurrentDone { city, .. } => city,
            WeatherServiceMessage::ForecastDone { city, .. } => city,
        }
    }
}

/// Request a live current-conditions fetch (the service stores the result).
/// Sends `CurrentDone` on the channel when complete.
pub fn request_current(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    service: Arc<WeatherService>,
    city: String,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        let result = service
            .current_weather(&city)
            .await
            .map_err(WeatherError::from);
        let _ = tx.send(WeatherServiceMessage::CurrentDone { city, result });
    });
}

/// Request a live forecast fetch. `None` uses the service default length.
/// Sends `ForecastDone` on the channel when complete.
pub fn request_forecast(
    tx: &Sender<WeatherServiceMessage>,
    runtime: &Handle,
    service: Arc<WeatherService>,
    city: String,
    days: Option<u32>,
) {
    let tx = tx.clone();
    runtime.spawn(async move {
        let result = service
            .forecast(&city, days)
            .await
            .map_err(WeatherError::from);
        let _ = tx.send(WeatherServiceMessage::ForecastDone { city, result });
    });
}
