//! SQLite-backed reading cache for the server deployment.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{millis_to_utc, WeatherCache};
use crate::types::{CacheEntry, WeatherError, WeatherReading};

/// Append-only store of readings.
///
/// Every `put` inserts a row; `get` returns the row inserted last for the
/// location. Ordering is by insertion id, so stores for one location must be
/// issued in observation order. The connection mutex serializes inserts.
pub struct SqliteWeatherCache {
    conn: Mutex<Connection>,
}

impl SqliteWeatherCache {
    /// Open or create the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WeatherError> {
        let conn = Connection::open(path)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, WeatherError> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<(), WeatherError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                data TEXT NOT NULL,
                fetched_at INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_readings_city ON weather_readings(city, id DESC);
            "#,
        )?;
        Ok(())
    }

    /// Delete rows superseded by a newer reading for the same city.
    /// Returns the number of rows removed.
    pub fn prune_superseded(&self) -> Result<usize, WeatherError> {
        let removed = self.conn.lock().execute(
            "DELETE FROM weather_readings
             WHERE id NOT IN (SELECT MAX(id) FROM weather_readings GROUP BY city)",
            [],
        )?;
        if removed > 0 {
            tracing::debug!("Pruned {} superseded weather readings", removed);
        }
        Ok(removed)
    }

    /// Total stored rows across all cities.
    pub fn row_count(&self) -> Result<usize, WeatherError> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM weather_readings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl WeatherCache for SqliteWeatherCache {
    fn get(&self, location: &str) -> Result<Option<CacheEntry>, WeatherError> {
        let row: Option<(String, i64, i64)> = self
            .conn
            .lock()
            .query_row(
                "SELECT data, fetched_at, timestamp FROM weather_readings
                 WHERE city = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![location],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((data, fetched_at, timestamp)) = row else {
            return Ok(None);
        };

        let payload = serde_json::from_str(&data)
            .map_err(|e| WeatherError::Cache(format!("corrupt cached payload: {}", e)))?;

        Ok(Some(CacheEntry {
            location: location.to_string(),
            reading: WeatherReading {
                location: location.to_string(),
                payload,
                observed_at: millis_to_utc(fetched_at)?,
            },
            observed_at: millis_to_utc(timestamp)?,
        }))
    }

    fn put(
        &self,
        location: &str,
        reading: &WeatherReading,
        observed_at: DateTime<Utc>,
    ) -> Result<(), WeatherError> {
        let data = serde_json::to_string(&reading.payload)
            .map_err(|e| WeatherError::Cache(format!("failed to serialize reading: {}", e)))?;

        self.conn.lock().execute(
            "INSERT INTO weather_readings (city, data, fetched_at, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![
                location,
                data,
                reading.observed_at.timestamp_millis(),
                observed_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn reading(city: &str, temp: f64, at: DateTime<Utc>) -> WeatherReading {
        WeatherReading {
            location: city.into(),
            payload: json!({ "current": { "temp_c": temp } }),
            observed_at: at,
        }
    }

    #[test]
    fn test_puts_are_appended() {
        let cache = SqliteWeatherCache::in_memory().unwrap();
        let t0 = Utc::now();
        cache.put("Manila", &reading("Manila", 30.0, t0), t0).unwrap();
        cache
            .put("Manila", &reading("Manila", 31.0, t0), t0 + Duration::seconds(5))
            .unwrap();

        assert_eq!(cache.row_count().unwrap(), 2);
        let entry = cache.get("Manila").unwrap().unwrap();
        assert_eq!(entry.reading.payload["current"]["temp_c"], 31.0);
    }

    #[test]
    fn test_latest_is_by_insertion_not_timestamp() {
        let cache = SqliteWeatherCache::in_memory().unwrap();
        let now = Utc::now();
        let older = now - Duration::minutes(30);

        cache.put("Taguig", &reading("Taguig", 29.0, now), now).unwrap();
        cache
            .put("Taguig", &reading("Taguig", 27.0, older), older)
            .unwrap();

        let entry = cache.get("Taguig").unwrap().unwrap();
        assert_eq!(entry.reading.payload["current"]["temp_c"], 27.0);
        assert_eq!(entry.observed_at.timestamp_millis(), older.timestamp_millis());
    }

    #[test]
    fn test_prune_keeps_latest_per_city() {
        let cache = SqliteWeatherCache::in_memory().unwrap();
        let now = Utc::now();
        for temp in [28.0, 29.0, 30.0] {
            cache.put("Makati", &reading("Makati", temp, now), now).unwrap();
        }
        cache.put("Pasig", &reading("Pasig", 26.0, now), now).unwrap();

        assert_eq!(cache.prune_superseded().unwrap(), 2);
        assert_eq!(cache.row_count().unwrap(), 2);
        assert_eq!(
            cache.get("Makati").unwrap().unwrap().reading.payload["current"]["temp_c"],
            30.0
        );
        assert!(cache.get("Pasig").unwrap().is_some());
    }

    #[test]
    fn test_reopen_keeps_readings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let now = Utc::now();

        {
            let cache = SqliteWeatherCache::open(&path).unwrap();
            cache.put("Malabon", &reading("Malabon", 28.5, now), now).unwrap();
        }

        let cache = SqliteWeatherCache::open(&path).unwrap();
        let entry = cache.get("Malabon").unwrap().unwrap();
        assert_eq!(entry.observed_at.timestamp_millis(), now.timestamp_millis());
    }
}
