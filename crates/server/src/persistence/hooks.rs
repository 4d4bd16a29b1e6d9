//! [`FieldHooks`]: the encryption steps run at each point of a record's
//! persistence lifecycle.
//!
//! | Point | Step |
//! |---|---|
//! | before insert / save | encrypt modified sensitive string fields |
//! | before partial update | encrypt sensitive fields under `$set` and at top level |
//! | after read | decrypt sensitive fields |
//! | serialisation to caller | decrypt sensitive fields again |
//!
//! Every step is idempotent: sealing an envelope and opening a plaintext are
//! both no-ops. The serialisation step repeats the after-read step so that
//! records reaching the caller through a path that skipped it still come out
//! as plaintext.

use std::sync::Arc;

use common::{Map, Value};
use tracing::debug;

use super::{document::Document, store::SET};
use crate::crypto::FieldCipher;
use crate::policy::{FieldPolicy, FieldSet};
use crate::transform::{self, Direction};

/// Lifecycle hooks for one record type's allow-listed sensitive fields.
#[derive(Debug, Clone)]
pub struct FieldHooks {
    cipher: FieldCipher,
    fields: Arc<FieldSet>,
}

impl FieldHooks {
    /// Bind `cipher` to the sensitive `fields` of one record type.
    pub fn new(cipher: FieldCipher, fields: Arc<FieldSet>) -> Self {
        Self { cipher, fields }
    }

    /// The sensitive field names.
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Encrypt every sensitive field that is modified and holds a plain string.
    pub fn before_save(&self, doc: &mut Document) {
        for field in self.fields.iter() {
            if !doc.is_modified(field) {
                continue;
            }
            if let Some(Value::String(s)) = doc.fields_mut().get_mut(field) {
                self.cipher.encrypt_in_place(s);
            }
        }
    }

    /// Encrypt sensitive fields of a partial update, in place.
    ///
    /// Handles both `{"$set": {..}}` and a flat field map, or a mix. Any other
    /// shape is left untouched so the store can accept or reject it.
    pub fn before_update(&self, update: &mut Value) {
        let Some(map) = update.as_map_mut() else {
            debug!("update is not an object; leaving it untouched");
            return;
        };
        match map.get_mut(SET) {
            Some(Value::Map(set)) => transform::encrypt_fields(set, &self.fields, &self.cipher),
            Some(_) => debug!("{SET} is not an object; leaving it untouched"),
            None => {}
        }
        transform::encrypt_fields(map, &self.fields, &self.cipher);
    }

    /// Decrypt sensitive fields of a record read from the store.
    pub fn after_read(&self, record: &mut Map) {
        transform::decrypt_fields(record, &self.fields, &self.cipher);
    }

    /// Render `record` as an outbound payload with sensitive fields decrypted.
    pub fn to_payload(&self, record: &Map) -> serde_json::Value {
        let mut value = Value::Map(record.clone());
        transform::transform(
            &mut value,
            Direction::Decrypt,
            FieldPolicy::Allow(&self.fields),
            &self.cipher,
        );
        value.into_json()
    }
}
