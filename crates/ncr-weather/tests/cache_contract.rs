//! Both cache backends must behave the same through the `WeatherCache` trait.

use chrono::{DateTime, Duration, Utc};
use ncr_weather::{is_fresh, SessionCache, SqliteWeatherCache, WeatherCache, WeatherReading};
use serde_json::json;
use tempfile::TempDir;

fn reading(city: &str, temp: f64, at: DateTime<Utc>) -> WeatherReading {
    WeatherReading {
        location: city.to_string(),
        payload: json!({ "location": { "name": city }, "current": { "temp_c": temp } }),
        observed_at: at,
    }
}

fn absent_is_none(cache: &dyn WeatherCache) {
    assert!(cache.get("Valenzuela").unwrap().is_none());
    assert!(cache.get_fresh("Valenzuela", Utc::now()).unwrap().is_none());
}

fn put_then_get_is_fresh(cache: &dyn WeatherCache) {
    let now = Utc::now();
    cache.put("Quezon City", &reading("Quezon City", 30.5, now), now).unwrap();

    let entry = cache.get("Quezon City").unwrap().unwrap();
    assert_eq!(entry.location, "Quezon City");
    assert_eq!(entry.reading.location, "Quezon City");
    assert_eq!(entry.reading.payload["current"]["temp_c"], 30.5);
    assert!(is_fresh(Some(&entry), now + Duration::seconds(1)));
    assert!(cache.get_fresh("Quezon City", now).unwrap().is_some());
}

fn last_write_wins(cache: &dyn WeatherCache) {
    let t0 = Utc::now();
    let t1 = t0 + Duration::seconds(30);
    cache.put("Caloocan", &reading("Caloocan", 28.0, t0), t0).unwrap();
    cache.put("Caloocan", &reading("Caloocan", 29.0, t1), t1).unwrap();

    let entry = cache.get("Caloocan").unwrap().unwrap();
    assert_eq!(entry.reading.payload["current"]["temp_c"], 29.0);
    assert_eq!(entry.observed_at.timestamp_millis(), t1.timestamp_millis());
}

fn stale_entry_is_kept_but_not_served(cache: &dyn WeatherCache) {
    let observed = Utc::now() - Duration::minutes(11);
    cache.put("Parañaque", &reading("Parañaque", 27.0, observed), observed).unwrap();

    assert!(cache.get("Parañaque").unwrap().is_some());
    assert!(cache.get_fresh("Parañaque", Utc::now()).unwrap().is_none());
}

fn locations_are_independent(cache: &dyn WeatherCache) {
    let now = Utc::now();
    cache.put("Mandaluyong", &reading("Mandaluyong", 31.0, now), now).unwrap();
    cache.put("San Juan", &reading("San Juan", 32.0, now), now).unwrap();

    let a = cache.get("Mandaluyong").unwrap().unwrap();
    let b = cache.get("San Juan").unwrap().unwrap();
    assert_eq!(a.reading.payload["current"]["temp_c"], 31.0);
    assert_eq!(b.reading.payload["current"]["temp_c"], 32.0);
}

fn run_contract(cache: &dyn WeatherCache) {
    absent_is_none(cache);
    put_then_get_is_fresh(cache);
    last_write_wins(cache);
    stale_entry_is_kept_but_not_served(cache);
    locations_are_independent(cache);
}

#[test]
fn test_session_cache_contract() {
    let cache = SessionCache::new();
    assert_eq!(cache.backend(), "session");
    run_contract(&cache);
}

#[test]
fn test_sqlite_cache_contract() {
    let dir = TempDir::new().unwrap();
    let cache = SqliteWeatherCache::open(dir.path().join("weather_cache.db")).unwrap();
    assert_eq!(cache.backend(), "sqlite");
    run_contract(&cache);
}

#[test]
fn test_sqlite_prune_preserves_contract() {
    let dir = TempDir::new().unwrap();
    let cache = SqliteWeatherCache::open(dir.path().join("weather_cache.db")).unwrap();
    last_write_wins(&cache);

    assert_eq!(cache.prune_superseded().unwrap(), 1);
    let entry = cache.get("Caloocan").unwrap().unwrap();
    assert_eq!(entry.reading.payload["current"]["temp_c"], 29.0);
}
