//! User search statistics core for a weather dashboard.
//!
//! Tracks per-user weather lookups into two store documents (an aggregate
//! statistics document and a raw search history), and serves processed
//! statistics through a TTL read cache with coalesced fetches. Storage is
//! abstracted behind [`data::DocumentStore`]; an in-memory implementation is
//! provided.
//!
//! Typical usage:
//!
//! ```no_run
//! use std::sync::Arc;
//! use skycast_stats::{InMemoryStore, StatisticsService, StatsConfig};
//!
//! # async fn example() {
//! let service = StatisticsService::new(Arc::new(InMemoryStore::new()), StatsConfig::default());
//! service.track_search("user-1", "Tashkent", None).await;
//! let stats = service.get_user_statistics("user-1").await;
//! println!("{} searches", stats.total_searches);
//! # }
//! ```

pub mod core;
pub mod data;
pub mod domain;

pub use crate::core::config::StatsConfig;
pub use crate::data::error::StoreError;
pub use crate::data::memory::InMemoryStore;
pub use crate::data::repository::StatsRepository;
pub use crate::data::store::{DocKey, DocumentStore};
pub use crate::domain::normalize::WeatherSnapshot;
pub use crate::domain::process::ProcessedStats;
pub use crate::domain::statistics::StatisticsService;
