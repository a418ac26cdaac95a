//! Session-scoped cache, gone when the process exits.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{millis_to_utc, WeatherCache};
use crate::types::{CacheEntry, WeatherError, WeatherReading};

/// Serialized form kept under `weather_<city>`.
#[derive(Debug, Serialize, Deserialize)]
struct StoredReading {
    data: Value,
    fetched_at: i64,
    timestamp: i64,
}

/// In-memory key/value cache storing one serialized record per municipality.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<String, String>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(location: &str) -> String {
        format!("weather_{}", location)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl WeatherCache for SessionCache {
    fn get(&self, location: &str) -> Result<Option<CacheEntry>, WeatherError> {
        let raw = match self.entries.read().get(&Self::key(location)) {
            Some(raw) => raw.clone(),
            None => return Ok(None),
        };

        let stored: StoredReading = serde_json::from_str(&raw)
            .map_err(|e| WeatherError::Cache(format!("corrupt session entry: {}", e)))?;

        Ok(Some(CacheEntry {
            location: location.to_string(),
            reading: WeatherReading {
                location: location.to_string(),
                payload: stored.data,
                observed_at: millis_to_utc(stored.fetched_at)?,
            },
            observed_at: millis_to_utc(stored.timestamp)?,
        }))
    }

    fn put(
        &self,
        location: &str,
        reading: &WeatherReading,
        observed_at: DateTime<Utc>,
    ) -> Result<(), WeatherError> {
        let stored = StoredReading {
            data: reading.payload.clone(),
            fetched_at: reading.observed_at.timestamp_millis(),
            timestamp: observed_at.timestamp_millis(),
        };
        let raw = serde_json::to_string(&stored)
            .map_err(|e| WeatherError::Cache(format!("failed to serialize reading: {}", e)))?;

        self.entries.write().insert(Self::key(location), raw);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "session"
    }
}
