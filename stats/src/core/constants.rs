// =============================================================================
// Read Cache
// =============================================================================

/// Default time-to-live for cached processed statistics
pub const CACHE_TTL_SECS: u64 = 300;

/// Default maximum number of cached per-user entries
pub const CACHE_MAX_ENTRIES: u64 = 10_000;

// =============================================================================
// Write Path
// =============================================================================

/// Two history entries for the same city and weather description closer than
/// this are considered duplicates
pub const DEDUP_WINDOW_MS: i64 = 60_000;

/// Maximum number of events kept in the stored history document.
/// Older entries are trimmed on write to bound document size and the
/// dedup scan cost.
pub const HISTORY_RETENTION: usize = 200;

// =============================================================================
// Read Path
// =============================================================================

/// Default timeout for one raw statistics fetch. A stalled backend rejects
/// the coalesced fetch instead of wedging the pending entry for its user.
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Maximum number of months in the processed histogram (oldest trimmed)
pub const MONTHLY_HISTOGRAM_CAP: usize = 12;

/// Maximum number of entries in the processed popularity ranking
pub const POPULAR_LOCATIONS_CAP: usize = 10;

/// Maximum number of entries in the processed recent-activity feed
pub const RECENT_SEARCHES_CAP: usize = 20;

// =============================================================================
// Document Layout
// =============================================================================

/// Month bucket key format; sorts correctly as a plain string
pub const MONTH_KEY_FORMAT: &str = "%Y-%m";
