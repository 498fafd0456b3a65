//! Stats processing
//!
//! Pure transformation from the raw stored documents into the shape the UI
//! consumes. Missing or malformed fields were already defaulted at the data
//! boundary, so processing is total: it never fails, it only trims and sorts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::constants::{MONTHLY_HISTOGRAM_CAP, POPULAR_LOCATIONS_CAP, RECENT_SEARCHES_CAP};
use crate::data::types::{LocationCount, RawUserStats};

/// Processed per-user statistics: derived, cache-resident, never persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedStats {
    pub total_searches: u64,
    /// Ascending by month, at most 12 entries (oldest trimmed)
    pub monthly_searches: Vec<MonthlyCount>,
    /// Descending by count, ties in insertion order, at most 10 entries
    pub popular_locations: Vec<LocationCount>,
    /// Descending by resolved timestamp, at most 20 entries
    pub recent_searches: Vec<RecentSearch>,
}

/// One month of the histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: u64,
}

/// One normalized entry of the recent-activity feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSearch {
    pub id: String,
    pub city: String,
    pub weather: String,
    pub temperature: i32,
    pub humidity: f64,
    pub wind_speed: f64,
    /// Server timestamp when resolvable, else the client fallback, else `now`
    pub timestamp: DateTime<Utc>,
}

/// Transform the raw fetch bundle into the externally consumed shape
pub fn process(raw: &RawUserStats, now: DateTime<Utc>) -> ProcessedStats {
    // BTreeMap iterates keys ascending; YYYY-MM sorts correctly as a string
    let mut monthly_searches: Vec<MonthlyCount> = raw
        .stats
        .monthly_searches
        .iter()
        .map(|(month, bucket)| MonthlyCount {
            month: month.clone(),
            count: bucket.count(),
        })
        .collect();
    if monthly_searches.len() > MONTHLY_HISTOGRAM_CAP {
        monthly_searches.drain(..monthly_searches.len() - MONTHLY_HISTOGRAM_CAP);
    }

    let mut popular_locations = raw.stats.popular_locations.clone();
    // Stable sort keeps insertion order for equal counts
    popular_locations.sort_by(|a, b| b.count.cmp(&a.count));
    popular_locations.truncate(POPULAR_LOCATIONS_CAP);

    let mut recent_searches: Vec<RecentSearch> = raw
        .history
        .iter()
        .map(|event| RecentSearch {
            id: event.id.clone(),
            city: event.city.clone(),
            weather: event.weather.clone(),
            temperature: event.temperature,
            humidity: event.humidity,
            wind_speed: event.wind_speed,
            timestamp: event.resolved_time().unwrap_or(now),
        })
        .collect();
    recent_searches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent_searches.truncate(RECENT_SEARCHES_CAP);

    ProcessedStats {
        total_searches: raw.stats.total_searches,
        monthly_searches,
        popular_locations,
        recent_searches,
    }
}
