//! [`EncryptedRepository`]: a [`DocumentStore`] wrapped in [`FieldHooks`].
//!
//! Every store call runs its hook in sequence: the before-write hook finishes
//! before the write is issued, and the after-read hook finishes before a
//! document is returned. The store only ever sees sensitive fields as
//! envelopes; callers only ever see them as plaintext.

use std::sync::Arc;

use common::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::{
    document::Document,
    hooks::FieldHooks,
    store::{DocumentStore, StoreError, SET},
};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A filter names a sensitive field. Envelopes use a random IV, so such a
    /// filter could never match.
    #[error("field {0} is encrypted and cannot be used as a filter")]
    EncryptedFilter(String),

    /// An existing document has no string `_id`.
    #[error("document has no _id")]
    MissingId,

    /// The document was removed before it could be saved.
    #[error("document not found: {0}")]
    NotFound(String),
}

/// One collection of a [`DocumentStore`] with its encryption hooks applied.
#[derive(Clone)]
pub struct EncryptedRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
    hooks: FieldHooks,
}

impl EncryptedRepository {
    /// Wrap `collection` of `store` with `hooks`.
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, hooks: FieldHooks) -> Self {
        Self {
            store,
            collection: collection.into(),
            hooks,
        }
    }

    /// Name of the wrapped collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Insert a new document or write the modified fields of an existing one.
    ///
    /// On success `doc` holds the stored document with sensitive fields in
    /// plaintext. On failure `doc` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] if the store rejects the write,
    /// [`RepositoryError::MissingId`] for an existing document without `_id`,
    /// or [`RepositoryError::NotFound`] if it no longer exists.
    pub async fn save(&self, doc: &mut Document) -> Result<(), RepositoryError> {
        let mut pending = doc.clone();
        self.hooks.before_save(&mut pending);

        let mut stored = if pending.is_new() {
            self.store
                .insert(&self.collection, pending.into_fields())
                .await?
        } else {
            let id = pending.id().ok_or(RepositoryError::MissingId)?.to_owned();
            let mut set = Map::new();
            for field in pending.modified_fields() {
                if let Some(value) = pending.get(field) {
                    set.insert(field.to_owned(), value.clone());
                }
            }
            if set.is_empty() {
                debug!(collection = %self.collection, "save with no modified fields");
                return Ok(());
            }
            let mut update = Map::new();
            update.insert(SET.to_owned(), Value::Map(set));
            self.store
                .update(&self.collection, &id, Value::Map(update))
                .await?
                .ok_or(RepositoryError::NotFound(id))?
        };

        self.hooks.after_read(&mut stored);
        doc.reset(stored);
        Ok(())
    }

    /// Apply a partial update to the document with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] if the store rejects the update.
    pub async fn update(&self, id: &str, mut update: Value) -> Result<Option<Document>, RepositoryError> {
        self.hooks.before_update(&mut update);
        let updated = self.store.update(&self.collection, id, update).await?;
        Ok(updated.map(|record| self.loaded(record)))
    }

    /// Documents whose top-level fields equal every entry of `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::EncryptedFilter`] if `filter` names a
    /// sensitive field.
    pub async fn find(&self, filter: Map) -> Result<Vec<Document>, RepositoryError> {
        if let Some(field) = filter.keys().find(|k| self.hooks.fields().contains(*k)) {
            return Err(RepositoryError::EncryptedFilter(field.clone()));
        }
        let records = self.store.find(&self.collection, filter).await?;
        Ok(records.into_iter().map(|r| self.loaded(r)).collect())
    }

    /// The document with `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] on a store failure.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>, RepositoryError> {
        let found = self.store.find_by_id(&self.collection, id).await?;
        Ok(found.map(|r| self.loaded(r)))
    }

    /// Remove the document with `id`. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] on a store failure.
    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(&self.collection, id).await?)
    }

    /// Render `doc` for the caller, decrypting sensitive fields once more.
    pub fn to_payload(&self, doc: &Document) -> serde_json::Value {
        self.hooks.to_payload(doc.fields())
    }

    fn loaded(&self, mut record: Map) -> Document {
        self.hooks.after_read(&mut record);
        Document::loaded(record)
    }
}
