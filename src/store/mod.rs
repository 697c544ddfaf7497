// src/store/mod.rs

//! Document storage capability.
//!
//! Components receive an `Arc<dyn DocumentStore>` at construction and talk to
//! it through [`Documents`], which owns the serde boundary so that business
//! logic only ever sees typed records.

pub mod memory;
pub mod postgres;

use std::{fmt, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Logical collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Questions,
    ExamConfigs,
    ExamSessions,
    ExamResults,
    QuestionShares,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Questions => "questions",
            Collection::ExamConfigs => "exam_configs",
            Collection::ExamSessions => "exam_sessions",
            Collection::ExamResults => "exam_results",
            Collection::QuestionShares => "question_shares",
        }
    }

    /// Uniqueness key of a document, if the collection constrains one.
    ///
    /// * users: email
    /// * exam_results: one result per session
    /// * exam_sessions: one unsubmitted session per (user, exam config)
    pub fn unique_key(&self, doc: &Value) -> Option<String> {
        match self {
            Collection::Users => doc.get("email")?.as_str().map(str::to_string),
            Collection::ExamResults => doc
                .get("exam_session_id")?
                .as_str()
                .map(str::to_string),
            Collection::ExamSessions => {
                if doc.get("submitted").and_then(Value::as_bool) != Some(false) {
                    return None;
                }
                let user_id = doc.get("user_id")?.as_str()?;
                let exam_config_id = doc.get("exam_config_id")?.as_str()?;
                Some(format!("{user_id}:{exam_config_id}"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single condition on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => doc.get(field) == Some(value),
            Condition::In(field, values) => doc
                .get(field)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
        })
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    Conflict(String),
    Serialization(String),
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
            StoreError::Serialization(msg) => write!(f, "serialization error: {}", msg),
            StoreError::Backend(msg) => write!(f, "storage backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Insert/find/update/delete over JSON documents, keyed by collection + id.
///
/// Implementations must enforce [`Collection::unique_key`] and must return
/// documents in insertion order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: Collection, id: &str, doc: Value) -> Result<(), StoreError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Value>, StoreError>;

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Replaces the document with the given id. Returns `false` if absent.
    async fn replace(&self, collection: Collection, id: &str, doc: Value) -> Result<bool, StoreError>;

    /// Deletes the document with the given id. Returns `false` if absent.
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;
}

/// Typed view over one collection.
pub struct Documents<T> {
    store: Arc<dyn DocumentStore>,
    collection: Collection,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Documents<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            collection: self.collection,
            _marker: PhantomData,
        }
    }
}

impl<T> Documents<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn DocumentStore>, collection: Collection) -> Self {
        Self {
            store,
            collection,
            _marker: PhantomData,
        }
    }

    pub async fn insert(&self, id: &str, item: &T) -> Result<(), StoreError> {
        let doc = serde_json::to_value(item)?;
        self.store.insert(self.collection, id, doc).await
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        match self.store.find_one(self.collection, filter).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.find_one(&Filter::new().eq("id", id)).await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        self.store
            .find(self.collection, filter)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn replace(&self, id: &str, item: &T) -> Result<bool, StoreError> {
        let doc = serde_json::to_value(item)?;
        self.store.replace(self.collection, id, doc).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(self.collection, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_eq_and_in() {
        let doc = json!({"id": "q1", "subject": "Math", "marks": 2.0});
        assert!(Filter::new().matches(&doc));
        assert!(Filter::new().eq("subject", "Math").matches(&doc));
        assert!(!Filter::new().eq("subject", "Physics").matches(&doc));
        assert!(Filter::new().is_in("subject", ["Physics", "Math"]).matches(&doc));
        assert!(!Filter::new().is_in("subject", Vec::<String>::new()).matches(&doc));
        assert!(!Filter::new().eq("missing", "x").matches(&doc));
    }

    #[test]
    fn session_unique_key_only_while_unsubmitted() {
        let open = json!({"user_id": "u1", "exam_config_id": "e1", "submitted": false});
        let done = json!({"user_id": "u1", "exam_config_id": "e1", "submitted": true});
        assert_eq!(
            Collection::ExamSessions.unique_key(&open).as_deref(),
            Some("u1:e1")
        );
        assert_eq!(Collection::ExamSessions.unique_key(&done), None);
        assert_eq!(Collection::Questions.unique_key(&open), None);
    }
}
