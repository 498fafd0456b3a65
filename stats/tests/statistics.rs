//! End-to-end tests for the statistics service: caching, coalescing, and
//! degradation behavior over a real in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::Semaphore;

use skycast_stats::{
    DocKey, DocumentStore, InMemoryStore, ProcessedStats, StatisticsService, StatsConfig,
    StoreError, WeatherSnapshot,
};

fn snapshot(description: &str, temp: f64) -> WeatherSnapshot {
    serde_json::from_value(json!({
        "weather": [{"description": description}],
        "main": {"temp": temp, "humidity": 50},
        "wind": {"speed": 2.0},
    }))
    .unwrap()
}

/// Store wrapper that counts reads of statistics documents and can hold them
/// behind a semaphore to force overlap between concurrent fetches.
struct GatedStore {
    inner: InMemoryStore,
    stats_reads: AtomicUsize,
    gate: Semaphore,
}

impl GatedStore {
    fn new(gated: bool) -> Self {
        Self {
            inner: InMemoryStore::new(),
            stats_reads: AtomicUsize::new(0),
            gate: Semaphore::new(if gated { 0 } else { Semaphore::MAX_PERMITS }),
        }
    }

    fn stats_reads(&self) -> usize {
        self.stats_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Value>, StoreError> {
        if key.path().contains("/statistics/") {
            self.stats_reads.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &DocKey, doc: Value, merge: bool) -> Result<(), StoreError> {
        self.inner.set(key, doc, merge).await
    }

    async fn update(&self, key: &DocKey, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.inner.update(key, fields).await
    }

    async fn append_to_array(
        &self,
        key: &DocKey,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.inner.append_to_array(key, field, value).await
    }
}

/// Store that fails every operation with a fixed error.
struct FailingStore {
    error: fn() -> StoreError,
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, _key: &DocKey) -> Result<Option<Value>, StoreError> {
        Err((self.error)())
    }

    async fn set(&self, _key: &DocKey, _doc: Value, _merge: bool) -> Result<(), StoreError> {
        Err((self.error)())
    }

    async fn update(&self, _key: &DocKey, _fields: Map<String, Value>) -> Result<(), StoreError> {
        Err((self.error)())
    }

    async fn append_to_array(
        &self,
        _key: &DocKey,
        _field: &str,
        _value: Value,
    ) -> Result<(), StoreError> {
        Err((self.error)())
    }
}

#[tokio::test]
async fn test_concurrent_reads_coalesce_into_one_fetch() {
    let store = Arc::new(GatedStore::new(true));
    let service = Arc::new(StatisticsService::new(
        store.clone(),
        StatsConfig::default(),
    ));

    let mut readers = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        readers.push(tokio::spawn(
            async move { service.get_user_statistics("u1").await },
        ));
    }

    // Let every reader reach the cache before the store answers
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.gate.add_permits(Semaphore::MAX_PERMITS);

    for reader in readers {
        let stats = reader.await.unwrap();
        assert_eq!(stats.total_searches, 0);
    }
    assert_eq!(store.stats_reads(), 1);
}

#[tokio::test]
async fn test_cached_reads_skip_the_store_until_ttl() {
    let store = Arc::new(GatedStore::new(false));
    let config = StatsConfig {
        cache_ttl: Duration::from_millis(80),
        ..StatsConfig::default()
    };
    let service = StatisticsService::new(store.clone(), config);

    service.get_user_statistics("u1").await;
    service.get_user_statistics("u1").await;
    service.get_user_statistics("u1").await;
    assert_eq!(store.stats_reads(), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    service.get_user_statistics("u1").await;
    assert_eq!(store.stats_reads(), 2);
}

#[tokio::test]
async fn test_clear_cache_forces_store_read() {
    let store = Arc::new(GatedStore::new(false));
    let service = StatisticsService::new(store.clone(), StatsConfig::default());

    service.get_user_statistics("u1").await;
    service.get_user_statistics("u1").await;
    assert_eq!(store.stats_reads(), 1);

    service.clear_cache("u1").await;
    service.get_user_statistics("u1").await;
    assert_eq!(store.stats_reads(), 2);
}

#[tokio::test]
async fn test_rapid_repeat_search_recorded_once_in_history() {
    let service = StatisticsService::new(Arc::new(InMemoryStore::new()), StatsConfig::default());

    service
        .track_search("u1", "Tashkent", Some(&snapshot("clear sky", 25.0)))
        .await;
    service
        .track_search("u1", "Tashkent", Some(&snapshot("clear sky", 25.0)))
        .await;

    let stats = service.get_user_statistics("u1").await;
    assert_eq!(stats.total_searches, 2);
    assert_eq!(stats.recent_searches.len(), 1);
    assert_eq!(stats.popular_locations[0].count, 2);
}

#[tokio::test]
async fn test_two_city_session_end_to_end() {
    let service = StatisticsService::new(Arc::new(InMemoryStore::new()), StatsConfig::default());

    service
        .track_search("u1", "Tashkent", Some(&snapshot("clear sky", 25.0)))
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    service
        .track_search("u1", "Samarkand", Some(&snapshot("sunny", 20.0)))
        .await;

    let stats = service.get_user_statistics("u1").await;
    assert_eq!(stats.total_searches, 2);
    assert_eq!(stats.monthly_searches.len(), 1);
    assert_eq!(stats.monthly_searches[0].count, 2);

    // Equal counts keep first-seen order
    assert_eq!(stats.popular_locations.len(), 2);
    assert_eq!(stats.popular_locations[0].name, "Tashkent");
    assert_eq!(stats.popular_locations[1].name, "Samarkand");

    assert_eq!(stats.recent_searches.len(), 2);
    assert_eq!(stats.recent_searches[0].city, "Samarkand");
    assert_eq!(stats.recent_searches[0].temperature, 20);
    assert_eq!(stats.recent_searches[1].city, "Tashkent");
}

#[tokio::test]
async fn test_counter_grows_with_every_tracked_search() {
    let service = StatisticsService::new(Arc::new(InMemoryStore::new()), StatsConfig::default());

    for i in 1..=5u64 {
        service
            .track_search("u1", "Tashkent", Some(&snapshot("clear sky", 25.0)))
            .await;
        service.clear_cache("u1").await;
        let stats = service.get_user_statistics("u1").await;
        assert_eq!(stats.total_searches, i);
    }
}

#[tokio::test]
async fn test_unavailable_store_degrades_to_empty_stats() {
    let store = Arc::new(FailingStore {
        error: || StoreError::unavailable("connection refused"),
    });
    let service = StatisticsService::new(store, StatsConfig::default());

    service
        .track_search("u1", "Tashkent", Some(&snapshot("clear sky", 25.0)))
        .await;
    let stats = service.get_user_statistics("u1").await;
    assert_eq!(stats, ProcessedStats::default());
}

#[tokio::test]
async fn test_permission_denied_degrades_to_empty_stats() {
    let store = Arc::new(FailingStore {
        error: || StoreError::permission_denied("users/u1/statistics/u1"),
    });
    let service = StatisticsService::new(store, StatsConfig::default());

    let stats = service.get_user_statistics("u1").await;
    assert_eq!(stats, ProcessedStats::default());
}

#[tokio::test]
async fn test_stalled_store_times_out_and_next_read_retries() {
    /// Store whose reads never settle; only the read count is observable.
    struct StalledStore {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for StalledStore {
        async fn get(&self, _key: &DocKey) -> Result<Option<Value>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }

        async fn set(&self, _key: &DocKey, _doc: Value, _merge: bool) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn update(
            &self,
            _key: &DocKey,
            _fields: Map<String, Value>,
        ) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn append_to_array(
            &self,
            _key: &DocKey,
            _field: &str,
            _value: Value,
        ) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    let store = Arc::new(StalledStore {
        reads: AtomicUsize::new(0),
    });
    let config = StatsConfig {
        fetch_timeout: Duration::from_millis(100),
        ..StatsConfig::default()
    };
    let service = StatisticsService::new(store.clone(), config);

    // The stalled fetch is rejected by the timeout instead of wedging the key
    let stats = service.get_user_statistics("u1").await;
    assert_eq!(stats, ProcessedStats::default());
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);

    // The timeout was not cached, so the next call issues a fresh read
    let stats = service.get_user_statistics("u1").await;
    assert_eq!(stats, ProcessedStats::default());
    assert_eq!(store.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let flaky_reads = Arc::new(AtomicUsize::new(0));

    struct FlakyStore {
        inner: InMemoryStore,
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, key: &DocKey) -> Result<Option<Value>, StoreError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(StoreError::unavailable("transient outage"));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &DocKey, doc: Value, merge: bool) -> Result<(), StoreError> {
            self.inner.set(key, doc, merge).await
        }

        async fn update(&self, key: &DocKey, fields: Map<String, Value>) -> Result<(), StoreError> {
            self.inner.update(key, fields).await
        }

        async fn append_to_array(
            &self,
            key: &DocKey,
            field: &str,
            value: Value,
        ) -> Result<(), StoreError> {
            self.inner.append_to_array(key, field, value).await
        }
    }

    let store = Arc::new(FlakyStore {
        inner: InMemoryStore::new(),
        reads: flaky_reads.clone(),
    });
    let service = StatisticsService::new(store, StatsConfig::default());

    // First read hits the outage and degrades
    let degraded = service.get_user_statistics("u1").await;
    assert_eq!(degraded, ProcessedStats::default());

    // The failure was not cached, so the next read goes back to the store
    let recovered = service.get_user_statistics("u1").await;
    assert_eq!(recovered.total_searches, 0);
    assert!(flaky_reads.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_malformed_stored_document_degrades_per_field() {
    let store = Arc::new(InMemoryStore::new());
    store
        .set(
            &DocKey::statistics("u1"),
            json!({"totalSearches": 7, "monthlySearches": "scrambled"}),
            false,
        )
        .await
        .unwrap();

    let service = StatisticsService::new(store, StatsConfig::default());
    let stats = service.get_user_statistics("u1").await;
    assert_eq!(stats.total_searches, 7);
    assert!(stats.monthly_searches.is_empty());
}
