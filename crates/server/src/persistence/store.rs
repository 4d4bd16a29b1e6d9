//! [`DocumentStore`]: the storage seam, and [`MemoryStore`], its in-process
//! implementation.
//!
//! Stores persist whatever values they are given. They know nothing about
//! encryption; sensitive fields arrive already sealed from the repository.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use common::{
    fields::{CREATED_AT, ID, UPDATED_AT},
    Map, Value,
};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Update operator assigning fields.
pub const SET: &str = "$set";

/// Update operator removing fields.
pub const UNSET: &str = "$unset";

/// Errors produced by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document with this `_id` already exists in the collection.
    #[error("document already exists: {0}")]
    Duplicate(String),

    /// The supplied `_id` is not a string.
    #[error("_id must be a string")]
    InvalidId,

    /// The update description uses a shape or operator the store cannot apply.
    #[error("unsupported update: {0}")]
    UnsupportedUpdate(String),

    /// The update tries to change a field that is fixed at insert time.
    #[error("field {0} cannot be modified")]
    ImmutableField(String),
}

/// Asynchronous document persistence keyed by collection and `_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document, assigning `_id` and timestamps when absent.
    /// Returns the stored document.
    async fn insert(&self, collection: &str, fields: Map) -> Result<Map, StoreError>;

    /// Apply `update` (`$set` / `$unset` / flat field map) to the document
    /// with `id`. Returns the updated document, or `None` if absent.
    async fn update(&self, collection: &str, id: &str, update: Value)
        -> Result<Option<Map>, StoreError>;

    /// All documents whose top-level fields equal every entry of `filter`.
    async fn find(&self, collection: &str, filter: Map) -> Result<Vec<Map>, StoreError>;

    /// The document with `id`, if any.
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Map>, StoreError>;

    /// Remove the document with `id`. Returns whether one was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// Thread-safe in-memory store.
///
/// Documents are kept per collection in insertion order. Nothing is
/// persisted across restarts.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Vec<Map>>>>,
}

impl MemoryStore {
    /// Create a new, empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, mut fields: Map) -> Result<Map, StoreError> {
        let id = match fields.get(ID) {
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err(StoreError::InvalidId),
            None => {
                let id = Uuid::new_v4().simple().to_string();
                fields.insert(ID.to_owned(), Value::String(id.clone()));
                id
            }
        };
        let now = Utc::now();
        fields
            .entry(CREATED_AT.to_owned())
            .or_insert(Value::Date(now));
        fields.insert(UPDATED_AT.to_owned(), Value::Date(now));

        let mut lock = self.inner.write().await;
        let docs = lock.entry(collection.to_owned()).or_default();
        if docs.iter().any(|d| id_of(d) == Some(id.as_str())) {
            return Err(StoreError::Duplicate(id));
        }
        docs.push(fields.clone());
        Ok(fields)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        update: Value,
    ) -> Result<Option<Map>, StoreError> {
        let ops = UpdateOps::parse(update)?;

        let mut lock = self.inner.write().await;
        let Some(doc) = lock
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id)))
        else {
            return Ok(None);
        };
        ops.apply(doc);
        doc.insert(UPDATED_AT.to_owned(), Value::Date(Utc::now()));
        Ok(Some(doc.clone()))
    }

    async fn find(&self, collection: &str, filter: Map) -> Result<Vec<Map>, StoreError> {
        let lock = self.inner.read().await;
        let Some(docs) = lock.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|d| filter.iter().all(|(k, v)| d.get(k) == Some(v)))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Map>, StoreError> {
        let lock = self.inner.read().await;
        Ok(lock
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut lock = self.inner.write().await;
        let Some(docs) = lock.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| id_of(d) != Some(id));
        Ok(docs.len() != before)
    }
}

fn id_of(doc: &Map) -> Option<&str> {
    doc.get(ID).and_then(Value::as_str)
}

/// A parsed update description.
#[derive(Debug, Default)]
struct UpdateOps {
    set: Map,
    unset: Vec<String>,
}

impl UpdateOps {
    fn parse(update: Value) -> Result<Self, StoreError> {
        let Value::Map(map) = update else {
            return Err(StoreError::UnsupportedUpdate(
                "update must be an object".into(),
            ));
        };

        let mut ops = Self::default();
        for (key, value) in map {
            if key == SET {
                let Value::Map(fields) = value else {
                    return Err(StoreError::UnsupportedUpdate(format!("{SET} must be an object")));
                };
                ops.set.extend(fields);
            } else if key == UNSET {
                match value {
                    Value::Map(fields) => ops.unset.extend(fields.into_keys()),
                    Value::String(field) => ops.unset.push(field),
                    Value::List(items) => {
                        for item in items {
                            let Value::String(field) = item else {
                                return Err(StoreError::UnsupportedUpdate(format!(
                                    "{UNSET} entries must be field names"
                                )));
                            };
                            ops.unset.push(field);
                        }
                    }
                    _ => {
                        return Err(StoreError::UnsupportedUpdate(format!(
                            "{UNSET} must be an object, list, or field name"
                        )))
                    }
                }
            } else if key.starts_with('$') {
                return Err(StoreError::UnsupportedUpdate(format!("operator {key}")));
            } else {
                ops.set.insert(key, value);
            }
        }

        for field in ops.set.keys().chain(ops.unset.iter()) {
            if field == ID || field == CREATED_AT {
                return Err(StoreError::ImmutableField(field.clone()));
            }
        }
        Ok(ops)
    }

    fn apply(self, doc: &mut Map) {
        for field in self.unset {
            doc.remove(&field);
        }
        doc.extend(self.set);
    }
}
