// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, DocumentStore, Filter, StoreError};

struct Entry {
    id: String,
    doc: Value,
}

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(
    collection: Collection,
    entries: &[Entry],
    id: &str,
    doc: &Value,
) -> Result<(), StoreError> {
    let Some(key) = collection.unique_key(doc) else {
        return Ok(());
    };
    let clash = entries
        .iter()
        .any(|e| e.id != id && collection.unique_key(&e.doc).as_deref() == Some(key.as_str()));
    if clash {
        return Err(StoreError::Conflict(format!(
            "duplicate key '{}' in {}",
            key, collection
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: Collection, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let entries = guard.entry(collection).or_default();

        if entries.iter().any(|e| e.id == id) {
            return Err(StoreError::Conflict(format!(
                "id '{}' already exists in {}",
                id, collection
            )));
        }
        check_unique(collection, entries, id, &doc)?;

        entries.push(Entry {
            id: id.to_string(),
            doc,
        });
        Ok(())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|entries| entries.iter().find(|e| filter.matches(&e.doc)))
            .map(|e| e.doc.clone()))
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| filter.matches(&e.doc))
                    .map(|e| e.doc.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(&self, collection: Collection, id: &str, doc: Value) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(entries) = guard.get_mut(&collection) else {
            return Ok(false);
        };
        check_unique(collection, entries, id, &doc)?;

        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.doc = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(entries) = guard.get_mut(&collection) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }
}
