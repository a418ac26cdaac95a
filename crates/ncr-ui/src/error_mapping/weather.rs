use crate::services::weather_service::WeatherError as UiWeatherError;
use ncr_core::{AppError, ConfigError, NetworkError, WeatherError};

impl From<UiWeatherError> for AppError {
    fn from(e: UiWeatherError) -> Self {
        match e {
            UiWeatherError::Configuration(s) => AppError::Config(ConfigError::MissingSetting(s)),
            UiWeatherError::UnknownLocation(s) => {
                AppError::Weather(WeatherError::LocationNotFound(s))
            }
            UiWeatherError::Provider { status, .. } if status == 401 || status == 403 => {
                AppError::Weather(WeatherError::InvalidApiKey)
            }
            UiWeatherError::Provider { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            UiWeatherError::Provider { status, message } => {
                AppError::Weather(WeatherError::ApiError { status, message })
            }
            UiWeatherError::Network(s) => AppError::Network(NetworkError::ConnectionFailed(s)),
            UiWeatherError::Timeout => AppError::Network(NetworkError::Timeout),
            UiWeatherError::InvalidResponse(s) => {
                AppError::Network(NetworkError::InvalidResponse(s))
            }
            UiWeatherError::Cache(s) => AppError::Weather(WeatherError::CacheError(s)),
        }
    }
}
