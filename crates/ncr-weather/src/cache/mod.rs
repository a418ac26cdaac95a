//! Latest current-conditions reading per municipality.
//!
//! Two backends share the [`WeatherCache`] contract: [`SqliteWeatherCache`]
//! persists across restarts (server deployment), [`SessionCache`] lives only
//! as long as the process (client deployment). Neither evicts; whether an
//! entry may be served is decided by [`crate::freshness::is_fresh`].

mod session;
mod sqlite;

pub use session::SessionCache;
pub use sqlite::SqliteWeatherCache;

use chrono::{DateTime, Utc};

use crate::freshness::is_fresh;
use crate::types::{CacheEntry, WeatherError, WeatherReading};

/// Storage for the latest reading per municipality.
///
/// Implementations must be last-write-wins: after `put(loc, a)` then
/// `put(loc, b)`, `get(loc)` returns `b`.
pub trait WeatherCache: Send + Sync {
    /// Most recently stored entry, fresh or not.
    fn get(&self, location: &str) -> Result<Option<CacheEntry>, WeatherError>;

    /// Store a reading, superseding any earlier one for `location`.
    fn put(
        &self,
        location: &str,
        reading: &WeatherReading,
        observed_at: DateTime<Utc>,
    ) -> Result<(), WeatherError>;

    /// Short name for logs.
    fn backend(&self) -> &'static str;

    /// The stored entry if it is still fresh at `now`.
    fn get_fresh(
        &self,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, WeatherError> {
        Ok(self
            .get(location)?
            .filter(|entry| is_fresh(Some(entry), now)))
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| WeatherError::Cache(format!("timestamp out of range: {}", ms)))
}
