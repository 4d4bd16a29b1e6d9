//! In-memory document with field modification tracking.

use std::collections::BTreeSet;

use common::{fields, Map, Value};

/// A record as business logic sees it: plaintext fields plus the set of
/// fields changed since it was loaded.
///
/// A document that has never been saved treats every field as modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    fields: Map,
    modified: BTreeSet<String>,
    is_new: bool,
}

impl Document {
    /// A new, unsaved document.
    pub fn new(fields: Map) -> Self {
        Self {
            fields,
            modified: BTreeSet::new(),
            is_new: true,
        }
    }

    /// A document as returned by the store.
    pub(crate) fn loaded(fields: Map) -> Self {
        Self {
            fields,
            modified: BTreeSet::new(),
            is_new: false,
        }
    }

    /// The `_id` field, if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.fields.get(fields::ID).and_then(Value::as_str)
    }

    /// Returns `true` until the document has been saved once.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Value of `field`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Assign `field` and mark it modified.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.modified.insert(field.clone());
        self.fields.insert(field, value.into());
    }

    /// Returns `true` if `field` must be written on the next save.
    pub fn is_modified(&self, field: &str) -> bool {
        self.is_new || self.modified.contains(field)
    }

    /// Fields changed since load, in name order. Empty for new documents.
    pub fn modified_fields(&self) -> impl Iterator<Item = &str> {
        self.modified.iter().map(String::as_str)
    }

    /// All fields.
    pub fn fields(&self) -> &Map {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map {
        &mut self.fields
    }

    /// Consume the document, returning its fields.
    pub fn into_fields(self) -> Map {
        self.fields
    }

    /// Replace the contents with what the store returned and clear tracking.
    pub(crate) fn reset(&mut self, fields: Map) {
        self.fields = fields;
        self.modified.clear();
        self.is_new = false;
    }
}
