//! Document store trait definition
//!
//! The statistics core is agnostic to the concrete backend; it only needs a
//! per-user document store with get/set/merge-update, an atomic array append,
//! and server-assigned timestamps. The in-memory implementation lives in
//! [`super::memory`]; a managed remote store would implement the same trait.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::error::StoreError;

/// Field name of the write-time sentinel a store replaces with its own clock
pub const SERVER_TIMESTAMP_SENTINEL: &str = "__server_timestamp__";

/// Sentinel value resolved server-side at write time, distinct from
/// client-computed ISO strings
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_SENTINEL: true })
}

/// Two-level per-user document key: `users/{userId}/{collection}/{docId}`.
///
/// The doubled id segment reflects the subcollection-per-user layout of the
/// backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocKey {
    user_id: String,
    collection: &'static str,
}

impl DocKey {
    /// Key of the per-user statistics document (counters and histograms)
    pub fn statistics(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            collection: "statistics",
        }
    }

    /// Key of the per-user search history document (raw event list)
    pub fn search_history(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            collection: "searchHistory",
        }
    }

    /// Full storage path of this document
    pub fn path(&self) -> String {
        format!(
            "users/{}/{}/{}",
            self.user_id, self.collection, self.user_id
        )
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Document store trait
///
/// All operations are non-blocking and may suspend until the backend
/// responds. Server-timestamp sentinels embedded anywhere in a written value
/// are replaced with the store's clock before the value becomes visible.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if it does not exist
    async fn get(&self, key: &DocKey) -> Result<Option<Value>, StoreError>;

    /// Write a document. With `merge` set, top-level fields are merged into
    /// an existing document instead of replacing it wholesale.
    async fn set(&self, key: &DocKey, doc: Value, merge: bool) -> Result<(), StoreError>;

    /// Partial write of the given top-level fields, leaving the rest of the
    /// document untouched. Creates the document when absent.
    async fn update(&self, key: &DocKey, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Atomically append a value to an array field, creating the document
    /// and field as needed. Tolerates concurrent writers (no full-document
    /// overwrite).
    async fn append_to_array(
        &self,
        key: &DocKey,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_key_paths() {
        assert_eq!(
            DocKey::statistics("u1").path(),
            "users/u1/statistics/u1"
        );
        assert_eq!(
            DocKey::search_history("u1").path(),
            "users/u1/searchHistory/u1"
        );
    }

    #[test]
    fn test_server_timestamp_sentinel_shape() {
        let sentinel = server_timestamp();
        assert!(sentinel.get(SERVER_TIMESTAMP_SENTINEL).is_some());
    }
}
