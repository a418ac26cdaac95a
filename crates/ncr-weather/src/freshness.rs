//! When a cached reading may be reused.
//!
//! Every cache consumer decides staleness through [`is_fresh`]; there is no
//! per-backend or per-municipality window.

use chrono::{DateTime, Duration, Utc};

use crate::types::CacheEntry;

/// How long a stored reading may be served instead of fetching.
pub const FRESHNESS_WINDOW: Duration = Duration::milliseconds(10 * 60 * 1000);

/// True iff an entry exists and is younger than [`FRESHNESS_WINDOW`].
pub fn is_fresh(entry: Option<&CacheEntry>, now: DateTime<Utc>) -> bool {
    match entry {
        Some(entry) => entry.age(now) < FRESHNESS_WINDOW,
        None => false,
    }
}
