pub mod weather_service;

pub use weather_service::{
    request_current as request_weather_current, request_forecast as request_weather_forecast,
    WeatherError, WeatherServiceMessage,
};
