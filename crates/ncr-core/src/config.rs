use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable holding the provider key for the server context.
pub const SERVER_API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Environment variable holding the provider key for the client context.
/// Read at build time first, then at runtime.
pub const CLIENT_API_KEY_ENV: &str = "NCR_CLIENT_WEATHER_API_KEY";

const APP_DIR_NAME: &str = "ncr-weather";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Largest forecast length the provider serves.
const MAX_FORECAST_DAYS: u32 = 10;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Where the dashboard runs. Selects both the cache backend and the
/// credential source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Persistent SQLite cache, key from `WEATHER_API_KEY`.
    #[default]
    Server,
    /// Session-only cache, build-time injected key.
    Client,
}

impl Deployment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deployment::Server => "server",
            Deployment::Client => "client",
        }
    }
}

impl std::str::FromStr for Deployment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Deployment::Server),
            "client" => Ok(Deployment::Client),
            other => Err(format!("unknown deployment '{}', expected server or client", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather provider and cache settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// UI preferences
    #[serde(default)]
    pub ui: UiConfig,
}

/// A municipality entry overriding the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityConfig {
    pub name: String,
    /// "lat,lon"
    pub coordinates: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the weather provider API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Deployment context
    #[serde(default)]
    pub deployment: Deployment,

    /// SQLite cache file, relative to the config directory (server deployment)
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Days requested by the "load forecast" action
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    /// Replaces the built-in municipality table when non-empty
    #[serde(default)]
    pub municipalities: Vec<MunicipalityConfig>,
}

fn default_api_base_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_cache_file() -> String {
    "weather_cache.db".to_string()
}

fn default_forecast_days() -> u32 {
    5
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            deployment: Deployment::default(),
            cache_file: default_cache_file(),
            forecast_days: default_forecast_days(),
            municipalities: Vec::new(),
        }
    }
}

impl WeatherConfig {
    /// Provider key for the server context, read from the environment.
    pub fn server_api_key() -> Option<String> {
        std::env::var(SERVER_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Provider key for the client context. A key baked in at build time wins
    /// over the runtime environment.
    pub fn client_api_key() -> Option<String> {
        option_env!("NCR_CLIENT_WEATHER_API_KEY")
            .map(str::to_string)
            .or_else(|| std::env::var(CLIENT_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Provider key for the configured deployment.
    pub fn api_key(&self) -> Option<String> {
        match self.deployment {
            Deployment::Server => Self::server_api_key(),
            Deployment::Client => Self::client_api_key(),
        }
    }

    /// Env var consulted for the configured deployment's key.
    pub fn api_key_env(&self) -> &'static str {
        match self.deployment {
            Deployment::Server => SERVER_API_KEY_ENV,
            Deployment::Client => CLIENT_API_KEY_ENV,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Municipality shown at startup
    #[serde(default = "default_city")]
    pub default_city: String,
}

fn default_city() -> String {
    "Manila".to_string()
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_city: default_city(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit file, creating a default one if it
    /// doesn't exist yet
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged. Returns an error if validation finds errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);

        if self.weather.forecast_days == 0 {
            result.add_warning(
                "weather.forecast_days",
                "Forecast length is 0 days; the provider decides what to return",
            );
        } else if self.weather.forecast_days > MAX_FORECAST_DAYS {
            result.add_warning(
                "weather.forecast_days",
                format!("Forecast length is capped at {} days", MAX_FORECAST_DAYS),
            );
        }

        if self.weather.deployment == Deployment::Server && self.weather.cache_file.trim().is_empty()
        {
            result.add_error("weather.cache_file", "Cache file name must not be empty");
        }

        if self.weather.api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!(
                    "{} is not set - weather requests will fail until it is",
                    self.weather.api_key_env()
                ),
            );
        }

        let mut seen = HashSet::new();
        for (i, m) in self.weather.municipalities.iter().enumerate() {
            let field = format!("weather.municipalities[{}]", i);
            if m.name.trim().is_empty() {
                result.add_error(&field, "Municipality name must not be empty");
            } else if !seen.insert(m.name.as_str()) {
                result.add_error(&field, format!("Duplicate municipality: {}", m.name));
            }
            if let Err(msg) = check_coordinates(&m.coordinates) {
                result.add_error(&field, msg);
            }
        }

        if !self.weather.municipalities.is_empty()
            && !self
                .weather
                .municipalities
                .iter()
                .any(|m| m.name == self.ui.default_city)
        {
            result.add_error(
                "ui.default_city",
                format!("'{}' is not in weather.municipalities", self.ui.default_city),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the SQLite cache file
    pub fn cache_path(&self) -> PathBuf {
        self.config_dir.join(&self.weather.cache_file)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }
}

/// Checks a "lat,lon" pair for shape and range.
fn check_coordinates(coords: &str) -> std::result::Result<(), String> {
    let mut parts = coords.split(',').map(str::trim);
    let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat, lon),
        _ => return Err(format!("Coordinates must be \"lat,lon\", got: {}", coords)),
    };

    let lat: f64 = lat
        .parse()
        .map_err(|_| format!("Invalid latitude: {}", lat))?;
    let lon: f64 = lon
        .parse()
        .map_err(|_| format!("Invalid longitude: {}", lon))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("Latitude out of range: {}", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("Longitude out of range: {}", lon));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.weather.api_base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.api_base_url = "ftp://api.weatherapi.com/v1".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_forecast_days_above_cap_is_warning() {
        let mut config = Config::default();
        config.weather.forecast_days = 14;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.forecast_days"));
    }

    #[test]
    fn test_municipality_override_checks() {
        let mut config = Config::default();
        config.weather.municipalities = vec![
            MunicipalityConfig {
                name: "Manila".into(),
                coordinates: "14.5995,120.9842".into(),
            },
            MunicipalityConfig {
                name: "Manila".into(),
                coordinates: "14.5995,120.9842".into(),
            },
            MunicipalityConfig {
                name: "Atlantis".into(),
                coordinates: "95.0,10.0".into(),
            },
        ];
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("Duplicate")));
        assert!(result.errors.iter().any(|e| e.message.contains("Latitude")));
    }

    #[test]
    fn test_default_city_must_be_listed_when_overridden() {
        let mut config = Config::default();
        config.weather.municipalities = vec![MunicipalityConfig {
            name: "Makati".into(),
            coordinates: "14.5547,121.0244".into(),
        }];
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "ui.default_city"));
    }

    #[test]
    fn test_check_coordinates() {
        assert!(check_coordinates("14.5995,120.9842").is_ok());
        assert!(check_coordinates("14.5995, 120.9842").is_ok());
        assert!(check_coordinates("14.5995").is_err());
        assert!(check_coordinates("a,b").is_err());
        assert!(check_coordinates("1,2,3").is_err());
        assert!(check_coordinates("10,200").is_err());
    }

    #[test]
    fn test_deployment_from_str() {
        assert_eq!("server".parse::<Deployment>(), Ok(Deployment::Server));
        assert_eq!("Client".parse::<Deployment>(), Ok(Deployment::Client));
        assert!("browser".parse::<Deployment>().is_err());
    }

    #[test]
    fn test_load_creates_default_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.config_dir, dir.path());

        let mut edited = created.clone();
        edited.weather.deployment = Deployment::Client;
        edited.ui.default_city = "Pasig".into();
        edited.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.weather.deployment, Deployment::Client);
        assert_eq!(loaded.ui.default_city, "Pasig");
        assert_eq!(loaded.cache_path(), dir.path().join("weather_cache.db"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = \"/tmp/ncr\"\n[weather]\ndeployment = \"client\"\n")
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.deployment, Deployment::Client);
        assert_eq!(config.weather.forecast_days, 5);
        assert_eq!(config.weather.api_base_url, "https://api.weatherapi.com/v1");
        assert_eq!(config.ui.default_city, "Manila");
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
