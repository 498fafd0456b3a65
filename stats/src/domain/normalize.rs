//! Search event normalization
//!
//! Turns a raw (user, city, weather snapshot) triple into the canonical
//! search record. Tracking is best-effort: missing inputs produce `None` and
//! a warning, never an error into the caller's flow.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::data::types::{SearchEvent, Timestamp};

/// Raw snapshot as delivered by the weather provider:
/// `{weather: [{description}], main: {temp, humidity}, wind: {speed}}`.
/// Every level is optional; absent fields default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeatherSnapshot {
    pub weather: Vec<WeatherCondition>,
    pub main: Option<MainConditions>,
    pub wind: Option<WindConditions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeatherCondition {
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MainConditions {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WindConditions {
    pub speed: f64,
}

/// Build the canonical search record for one lookup.
///
/// The id (`{userId}_{city}_{epochMillis}`) is best-effort unique; collisions
/// are an accepted low-probability risk and are not resolved.
pub fn normalize(
    user_id: &str,
    city: &str,
    snapshot: Option<&WeatherSnapshot>,
    now: DateTime<Utc>,
) -> Option<SearchEvent> {
    if user_id.is_empty() {
        tracing::warn!("no user id provided for search tracking");
        return None;
    }
    let city = city.trim();
    if city.is_empty() {
        tracing::warn!(user_id, "empty city, skipping search tracking");
        return None;
    }
    let Some(snapshot) = snapshot else {
        tracing::warn!(user_id, city, "missing weather snapshot, skipping search tracking");
        return None;
    };

    Some(SearchEvent {
        id: format!("{user_id}_{city}_{}", now.timestamp_millis()),
        city: city.to_string(),
        timestamp: Timestamp::Pending,
        client_timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        weather: snapshot
            .weather
            .first()
            .map(|condition| condition.description.clone())
            .unwrap_or_default(),
        temperature: snapshot
            .main
            .as_ref()
            .map(|main| main.temp.round() as i32)
            .unwrap_or(0),
        humidity: snapshot
            .main
            .as_ref()
            .map(|main| main.humidity)
            .unwrap_or(0.0),
        wind_speed: snapshot
            .wind
            .as_ref()
            .map(|wind| wind.speed)
            .unwrap_or(0.0),
    })
}
