//! Persisted document schemas
//!
//! Documents in the store are loosely shaped: fields written by older clients
//! may be missing or carry a different wire form. Readers apply defaulting at
//! this boundary — a malformed field degrades to its default instead of
//! failing the whole document — so business logic never sees a parse error.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::constants::MONTH_KEY_FORMAT;
use crate::data::store::{DocKey, SERVER_TIMESTAMP_SENTINEL};

// ============================================================================
// Timestamps
// ============================================================================

/// Persisted timestamp value.
///
/// Store-assigned timestamps arrive as native objects, but documents may also
/// carry ISO-8601 strings or epoch milliseconds written by other clients.
/// `Pending` doubles as the write-time sentinel (the store replaces it with
/// its own clock) and as the read-time state of an assignment that has not
/// resolved yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Timestamp {
    #[default]
    Pending,
    /// Store-native form: `{"_seconds": i64, "_nanoseconds": u32}`
    Native { seconds: i64, nanos: u32 },
    /// ISO-8601 / RFC-3339 string
    Iso(String),
    /// Milliseconds since the Unix epoch
    EpochMillis(i64),
}

impl Timestamp {
    /// Native timestamp for a concrete instant
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::Native {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }

    /// Resolve to a concrete instant. Unknown or out-of-range shapes resolve
    /// to `None`; this never panics.
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Native { seconds, nanos } => Utc.timestamp_opt(*seconds, *nanos).single(),
            Self::Iso(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::EpochMillis(millis) => Utc.timestamp_millis_opt(*millis).single(),
        }
    }

    /// Parse any of the accepted wire shapes. Anything unrecognized maps to
    /// `Pending`, which resolves to `None`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(raw) => Self::Iso(raw.clone()),
            Value::Number(num) => num.as_i64().map(Self::EpochMillis).unwrap_or_default(),
            Value::Object(map) => match map.get("_seconds").and_then(Value::as_i64) {
                Some(seconds) => Self::Native {
                    seconds,
                    nanos: map
                        .get("_nanoseconds")
                        .and_then(Value::as_u64)
                        .unwrap_or(0) as u32,
                },
                None => Self::Pending,
            },
            _ => Self::Pending,
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pending => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(SERVER_TIMESTAMP_SENTINEL, &true)?;
                map.end()
            }
            Self::Native { seconds, nanos } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("_seconds", seconds)?;
                map.serialize_entry("_nanoseconds", nanos)?;
                map.end()
            }
            Self::Iso(raw) => serializer.serialize_str(raw),
            Self::EpochMillis(millis) => serializer.serialize_i64(*millis),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

// ============================================================================
// Search events
// ============================================================================

/// One canonical search record, immutable once created.
///
/// `id` is best-effort unique (`{userId}_{city}_{epochMillis}`); collisions
/// are an accepted low-probability risk. The wire form is camelCase to match
/// the stored documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchEvent {
    pub id: String,
    pub city: String,
    /// Server-assigned; `Pending` until the store resolves it
    pub timestamp: Timestamp,
    /// ISO-8601 capture at creation time, fallback for `timestamp`
    pub client_timestamp: String,
    /// Weather description, possibly empty
    pub weather: String,
    /// Rounded degrees Celsius
    pub temperature: i32,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl SearchEvent {
    /// Display instant: authoritative server timestamp when resolvable, else
    /// the client-side fallback
    pub fn resolved_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp.resolve().or_else(|| {
            DateTime::parse_from_rfc3339(&self.client_timestamp)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    /// `YYYY-MM` bucket key this event belongs to
    pub fn month_key(&self) -> String {
        self.resolved_time()
            .unwrap_or_else(Utc::now)
            .format(MONTH_KEY_FORMAT)
            .to_string()
    }
}

// ============================================================================
// Stats document
// ============================================================================

/// One month of searches: either the full event list, or a pre-aggregated
/// count for months whose events were compacted away
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MonthBucket {
    Events(Vec<SearchEvent>),
    Aggregate { count: u64 },
}

impl MonthBucket {
    pub fn count(&self) -> u64 {
        match self {
            Self::Events(events) => events.len() as u64,
            Self::Aggregate { count } => *count,
        }
    }

    /// Record one more event in this bucket
    pub fn push(&mut self, event: SearchEvent) {
        match self {
            Self::Events(events) => events.push(event),
            Self::Aggregate { count } => *count += 1,
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => serde_json::from_value(value.clone())
                .map(Self::Events)
                .unwrap_or(Self::Aggregate {
                    count: items.len() as u64,
                }),
            Value::Object(map) => Self::Aggregate {
                count: map.get("count").and_then(Value::as_u64).unwrap_or(0),
            },
            _ => Self::Aggregate { count: 0 },
        }
    }
}

impl<'de> Deserialize<'de> for MonthBucket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// A location and how often it was searched, unique by name within one
/// document; the count never decreases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationCount {
    pub name: String,
    pub count: u64,
}

/// Per-user aggregate document: running counters and histograms.
///
/// Created on first tracked search or on first statistics read; mutated by
/// every tracked search; never deleted by this subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStatsDocument {
    #[serde(deserialize_with = "lenient")]
    pub total_searches: u64,
    /// Month key (`YYYY-MM`) to bucket; `BTreeMap` keeps keys ascending
    #[serde(deserialize_with = "lenient")]
    pub monthly_searches: BTreeMap<String, MonthBucket>,
    #[serde(deserialize_with = "lenient")]
    pub popular_locations: Vec<LocationCount>,
    #[serde(deserialize_with = "lenient")]
    pub last_search: Option<SearchEvent>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ============================================================================
// History document
// ============================================================================

/// Per-user search history, separate from the stats document to bound
/// document size. Insertion-ordered; the write path trims it to the retention
/// cap, the read path emits only the newest entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserHistoryDocument {
    #[serde(deserialize_with = "lenient_events")]
    pub searches: Vec<SearchEvent>,
}

/// Fetch bundle handed to the stats processor: the aggregate document plus
/// the raw history events feeding the recent-activity feed
#[derive(Debug, Clone, Default)]
pub struct RawUserStats {
    pub stats: UserStatsDocument,
    pub history: Vec<SearchEvent>,
}

// ============================================================================
// Lenient parsing
// ============================================================================

/// Field-level defaulting: a value that does not match the expected shape
/// becomes the type's default instead of failing the document
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Entry-level defaulting for event lists: malformed entries are dropped,
/// the rest survive
fn lenient_events<'de, D>(deserializer: D) -> Result<Vec<SearchEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Value> = lenient(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

/// Parse a stored document, degrading to defaults when the top-level shape is
/// unusable
pub(crate) fn parse_or_default<T>(value: Value, key: &DocKey) -> T
where
    T: DeserializeOwned + Default,
{
    serde_json::from_value(value).unwrap_or_else(|err| {
        tracing::warn!(key = %key, error = %err, "malformed document, using defaults");
        T::default()
    })
}
