//! Data storage layer
//!
//! Store boundary for the statistics core:
//! - `store` - document store trait and per-user document keys
//! - `memory` - in-process dashmap-backed store implementation
//! - `types` - persisted document schemas with boundary defaulting
//! - `repository` - aggregate store adapter (read/write paths)
//! - `error` - unified store error type

pub mod error;
pub mod memory;
pub mod repository;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use repository::StatsRepository;
pub use store::{DocKey, DocumentStore};
