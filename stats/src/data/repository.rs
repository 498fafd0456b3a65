//! Aggregate store adapter
//!
//! Read-modify-write maintenance of the two per-user documents. The stats
//! document and the history document are written separately and are not
//! transactional: a crash between the two can leave them inconsistent.
//! The stats update is also not atomic across tasks: two concurrent
//! `record_search` calls for the same user can read the same counter value
//! and lose one increment. Both risks are accepted — losing a statistics
//! event is preferable to blocking the search flow.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::config::StatsConfig;
use crate::data::error::StoreError;
use crate::data::store::{DocKey, DocumentStore, server_timestamp};
use crate::data::types::{
    LocationCount, MonthBucket, RawUserStats, SearchEvent, UserHistoryDocument, UserStatsDocument,
    parse_or_default,
};
use crate::domain::dedup::should_append;

/// Adapter over the document store for the statistics documents
pub struct StatsRepository {
    store: Arc<dyn DocumentStore>,
    dedup_window_ms: i64,
    history_retention: usize,
}

impl StatsRepository {
    pub fn new(store: Arc<dyn DocumentStore>, config: &StatsConfig) -> Self {
        Self {
            store,
            dedup_window_ms: config.dedup_window_ms,
            history_retention: config.history_retention,
        }
    }

    /// Write path: fold one event into the aggregate document, then append it
    /// to the history document behind the dedup gate
    pub async fn record_search(
        &self,
        user_id: &str,
        event: &SearchEvent,
    ) -> Result<(), StoreError> {
        self.update_user_stats(user_id, event).await?;
        self.add_to_search_history(user_id, event).await?;
        Ok(())
    }

    /// Read path: load both documents, creating an empty stats document for
    /// first-time users so repeated calls are idempotent
    pub async fn fetch_raw(&self, user_id: &str) -> Result<RawUserStats, StoreError> {
        let stats_key = DocKey::statistics(user_id);
        let stats = match self.store.get(&stats_key).await? {
            Some(raw) => parse_or_default(raw, &stats_key),
            None => {
                tracing::debug!(user_id, "no statistics document, initializing");
                self.initialize_user_stats(user_id).await?;
                UserStatsDocument::default()
            }
        };

        let history_key = DocKey::search_history(user_id);
        let history = match self.store.get(&history_key).await? {
            Some(raw) => parse_or_default::<UserHistoryDocument>(raw, &history_key).searches,
            None => Vec::new(),
        };

        Ok(RawUserStats { stats, history })
    }

    /// Create the zero-counter statistics document for a new user
    pub async fn initialize_user_stats(&self, user_id: &str) -> Result<(), StoreError> {
        let key = DocKey::statistics(user_id);
        let doc = to_value(&UserStatsDocument::default(), &key)?;
        self.store.set(&key, doc, false).await
    }

    async fn update_user_stats(&self, user_id: &str, event: &SearchEvent) -> Result<(), StoreError> {
        let key = DocKey::statistics(user_id);
        let month_key = event.month_key();

        let Some(raw) = self.store.get(&key).await? else {
            let doc = UserStatsDocument {
                total_searches: 1,
                monthly_searches: [(month_key, MonthBucket::Events(vec![event.clone()]))].into(),
                popular_locations: vec![LocationCount {
                    name: event.city.clone(),
                    count: 1,
                }],
                last_search: Some(event.clone()),
                ..UserStatsDocument::default()
            };
            let value = to_value(&doc, &key)?;
            return self.store.set(&key, value, false).await;
        };

        let mut doc: UserStatsDocument = parse_or_default(raw, &key);
        doc.total_searches += 1;
        doc.monthly_searches
            .entry(month_key)
            .and_modify(|bucket| bucket.push(event.clone()))
            .or_insert_with(|| MonthBucket::Events(vec![event.clone()]));
        match doc
            .popular_locations
            .iter_mut()
            .find(|location| location.name == event.city)
        {
            Some(location) => location.count += 1,
            None => doc.popular_locations.push(LocationCount {
                name: event.city.clone(),
                count: 1,
            }),
        }

        // Merge-update: only the touched fields, nothing else clobbered
        let mut fields = Map::new();
        fields.insert("totalSearches".to_string(), doc.total_searches.into());
        fields.insert(
            "monthlySearches".to_string(),
            to_value(&doc.monthly_searches, &key)?,
        );
        fields.insert(
            "popularLocations".to_string(),
            to_value(&doc.popular_locations, &key)?,
        );
        fields.insert("lastSearch".to_string(), to_value(event, &key)?);
        fields.insert("updatedAt".to_string(), server_timestamp());
        self.store.update(&key, fields).await
    }

    async fn add_to_search_history(
        &self,
        user_id: &str,
        event: &SearchEvent,
    ) -> Result<(), StoreError> {
        let key = DocKey::search_history(user_id);

        let Some(raw) = self.store.get(&key).await? else {
            let doc = to_value(&UserHistoryDocument {
                searches: vec![event.clone()],
            }, &key)?;
            return self.store.set(&key, doc, false).await;
        };

        let doc: UserHistoryDocument = parse_or_default(raw, &key);
        if !should_append(&doc.searches, event, self.dedup_window_ms) {
            tracing::debug!(user_id, city = %event.city, "duplicate search, skipping history append");
            return Ok(());
        }

        if doc.searches.len() + 1 > self.history_retention {
            // Retention trim: rewrite the list with only the newest entries.
            // This is a full-field write rather than an atomic append; the
            // trim happens rarely (once per append past the cap).
            let keep_from = doc.searches.len() + 1 - self.history_retention;
            let mut kept: Vec<SearchEvent> = doc.searches[keep_from..].to_vec();
            kept.push(event.clone());
            let mut fields = Map::new();
            fields.insert("searches".to_string(), to_value(&kept, &key)?);
            self.store.update(&key, fields).await
        } else {
            self.store
                .append_to_array(&key, "searches", to_value(event, &key)?)
                .await
        }
    }
}

fn to_value<T: serde::Serialize>(doc: &T, key: &DocKey) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(|source| StoreError::Malformed {
        key: key.path(),
        source,
    })
}
