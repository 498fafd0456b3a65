//! In-memory document store using dashmap
//!
//! Reference backend for local runs and tests. Server-timestamp sentinels are
//! resolved against the process clock at write time, matching the managed
//! store's behavior at the interface boundary.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value, json};

use super::error::StoreError;
use super::store::{DocKey, DocumentStore, SERVER_TIMESTAMP_SENTINEL};

/// Process-local document store
#[derive(Default)]
pub struct InMemoryStore {
    docs: DashMap<String, Value>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held (test observability)
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn server_now() -> Value {
        let now = Utc::now();
        json!({
            "_seconds": now.timestamp(),
            "_nanoseconds": now.timestamp_subsec_nanos(),
        })
    }

    fn write(&self, key: &DocKey, mut doc: Value, merge: bool) {
        resolve_sentinels(&mut doc, &Self::server_now());
        match self.docs.entry(key.path()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) if merge => {
                merge_fields(occupied.get_mut(), doc);
            }
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                occupied.insert(doc);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(doc);
            }
        }
    }
}

/// Replace every server-timestamp sentinel in the value tree with the store's
/// current clock
fn resolve_sentinels(value: &mut Value, now: &Value) {
    let is_sentinel = matches!(
        value,
        Value::Object(map) if map.contains_key(SERVER_TIMESTAMP_SENTINEL)
    );
    if is_sentinel {
        *value = now.clone();
        return;
    }
    match value {
        Value::Object(map) => {
            for (_, nested) in map.iter_mut() {
                resolve_sentinels(nested, now);
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_sentinels(item, now);
            }
        }
        _ => {}
    }
}

/// Merge top-level fields of `incoming` into `existing`; non-object documents
/// are replaced wholesale
fn merge_fields(existing: &mut Value, incoming: Value) {
    match (existing.as_object_mut(), incoming) {
        (Some(target), Value::Object(fields)) => {
            for (name, value) in fields {
                target.insert(name, value);
            }
        }
        (_, incoming) => *existing = incoming,
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.get(&key.path()).map(|doc| doc.clone()))
    }

    async fn set(&self, key: &DocKey, doc: Value, merge: bool) -> Result<(), StoreError> {
        self.write(key, doc, merge);
        Ok(())
    }

    async fn update(&self, key: &DocKey, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.write(key, Value::Object(fields), true);
        Ok(())
    }

    async fn append_to_array(
        &self,
        key: &DocKey,
        field: &str,
        mut value: Value,
    ) -> Result<(), StoreError> {
        resolve_sentinels(&mut value, &Self::server_now());
        let mut entry = self
            .docs
            .entry(key.path())
            .or_insert_with(|| Value::Object(Map::new()));
        let doc = entry.value_mut();
        if !doc.is_object() {
            *doc = Value::Object(Map::new());
        }
        if let Value::Object(fields) = doc {
            let slot = fields
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => items.push(value),
                other => *other = Value::Array(vec![value]),
            }
        }
        Ok(())
    }
}
