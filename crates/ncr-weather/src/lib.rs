//! Weather data for Metro Manila municipalities.
//!
//! Fetches current conditions and forecasts from a WeatherAPI-style provider,
//! caches current-conditions readings for a short freshness window, and
//! exposes the query/action surface the dashboard binds to.

pub mod cache;
pub mod credential;
pub mod freshness;
pub mod gateway;
pub mod location;
pub mod service;
pub mod types;

pub use cache::{SessionCache, SqliteWeatherCache, WeatherCache};
pub use credential::ApiKey;
pub use freshness::{is_fresh, FRESHNESS_WINDOW};
pub use gateway::{WeatherGateway, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS};
pub use location::LocationRegistry;
pub use service::WeatherService;
pub use types::*;
