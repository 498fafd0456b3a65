//! Statistics core configuration
//!
//! A `StatsConfig` is injected into the service instance at construction.
//! There is no ambient global state; tests build a fresh config (and thus a
//! fresh cache) per case.

use std::time::Duration;

use super::constants::{
    CACHE_MAX_ENTRIES, CACHE_TTL_SECS, DEDUP_WINDOW_MS, FETCH_TIMEOUT_SECS, HISTORY_RETENTION,
};

/// Tunables for the statistics service
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// How long a processed statistics entry stays valid in the read cache
    pub cache_ttl: Duration,
    /// Maximum number of per-user entries held by the read cache
    pub cache_max_entries: u64,
    /// Duplicate window for history appends, in milliseconds
    pub dedup_window_ms: i64,
    /// Upper bound on one raw fetch; expiry fails the coalesced request
    pub fetch_timeout: Duration,
    /// Number of events retained in the stored history document
    pub history_retention: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            cache_max_entries: CACHE_MAX_ENTRIES,
            dedup_window_ms: DEDUP_WINDOW_MS,
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            history_retention: HISTORY_RETENTION,
        }
    }
}
