//! Statistics service
//!
//! Public surface of the statistics core. Reads go through a TTL cache whose
//! entries are materialized by `moka`'s coalesced init: concurrent misses for
//! the same user share one backend fetch, and a failed fetch is never cached.
//! Writes are fire-and-forget from the caller's point of view; failures are
//! logged and swallowed so tracking can never break a search.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;

use crate::core::config::StatsConfig;
use crate::data::error::StoreError;
use crate::data::repository::StatsRepository;
use crate::data::store::DocumentStore;
use crate::domain::normalize::{WeatherSnapshot, normalize};
use crate::domain::process::{ProcessedStats, process};

/// User statistics service with a read-through TTL cache
pub struct StatisticsService {
    repository: Arc<StatsRepository>,
    cache: Cache<String, ProcessedStats>,
    fetch_timeout: Duration,
}

impl StatisticsService {
    pub fn new(store: Arc<dyn DocumentStore>, config: StatsConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(config.cache_ttl)
            .build();
        Self {
            repository: Arc::new(StatsRepository::new(store, &config)),
            cache,
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Record one weather lookup. Best-effort: invalid input or a store
    /// failure is logged, never surfaced.
    pub async fn track_search(
        &self,
        user_id: &str,
        city: &str,
        snapshot: Option<&WeatherSnapshot>,
    ) {
        let Some(event) = normalize(user_id, city, snapshot, Utc::now()) else {
            return;
        };

        match self.repository.record_search(user_id, &event).await {
            Ok(()) => {
                // Invalidate only after a successful write so readers never
                // re-fetch a document the write path failed to touch
                self.cache.invalidate(user_id).await;
                tracing::debug!(user_id, city = %event.city, "search tracked");
            }
            Err(error) => log_store_failure(user_id, "track_search", &error),
        }
    }

    /// Fetch the processed statistics for a user, served from cache when
    /// fresh. Failures degrade to empty statistics.
    pub async fn get_user_statistics(&self, user_id: &str) -> ProcessedStats {
        if user_id.is_empty() {
            tracing::warn!("no user id provided for statistics fetch");
            return ProcessedStats::default();
        }

        let result = self
            .cache
            .try_get_with(user_id.to_string(), self.load(user_id))
            .await;

        match result {
            Ok(stats) => stats,
            Err(error) => {
                log_store_failure(user_id, "get_user_statistics", &error);
                ProcessedStats::default()
            }
        }
    }

    /// Drop the cached entry for a user, forcing the next read to hit the
    /// store
    pub async fn clear_cache(&self, user_id: &str) {
        self.cache.invalidate(user_id).await;
    }

    async fn load(&self, user_id: &str) -> Result<ProcessedStats, StoreError> {
        let raw = tokio::time::timeout(self.fetch_timeout, self.repository.fetch_raw(user_id))
            .await
            .map_err(|_| StoreError::timeout(self.fetch_timeout.as_secs()))??;
        Ok(process(&raw, Utc::now()))
    }
}

fn log_store_failure(user_id: &str, op: &str, error: &StoreError) {
    if error.is_permission() {
        tracing::warn!(user_id, op, %error, "store denied access, degrading");
    } else if error.is_transient() {
        tracing::warn!(user_id, op, %error, "store unavailable, degrading");
    } else {
        tracing::error!(user_id, op, %error, "store operation failed");
    }
}
