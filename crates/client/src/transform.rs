//! Request encryptor and response decryptor.
//!
//! Outgoing bodies are encrypted in skip-list mode: every string leaf except
//! identifiers and timestamps, at any depth. Incoming bodies are decrypted at
//! every string leaf. Dates and other scalars pass through in both directions.

use common::{envelope, fields, Value};
use futures::future::{join_all, BoxFuture, FutureExt};

use crate::cipher::ClientCipher;

/// Encrypt every eligible string leaf of an outgoing request body.
///
/// Leaves that are already envelopes are not encrypted twice.
pub fn encrypt_request(body: &mut Value, cipher: &ClientCipher) {
    match body {
        Value::String(s) => {
            if !envelope::is_envelope(s) {
                *s = cipher.encrypt(s);
            }
        }
        Value::List(items) => {
            for item in items.iter_mut() {
                encrypt_request(item, cipher);
            }
        }
        Value::Map(map) => {
            for (key, child) in map.iter_mut() {
                if !fields::is_skipped(key) {
                    encrypt_request(child, cipher);
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Date(_) => {}
    }
}

/// Decrypt every string leaf of an incoming response body.
///
/// Siblings in a list or map are decrypted concurrently. Leaves that do not
/// decrypt are kept as they are.
pub fn decrypt_response(body: Value, cipher: &ClientCipher) -> BoxFuture<'_, Value> {
    async move {
        match body {
            Value::String(s) => Value::String(cipher.decrypt(&s).await),
            Value::List(items) => {
                Value::List(join_all(items.into_iter().map(|v| decrypt_response(v, cipher))).await)
            }
            Value::Map(map) => {
                let (keys, values): (Vec<_>, Vec<_>) = map.into_iter().unzip();
                let values = join_all(values.into_iter().map(|v| decrypt_response(v, cipher))).await;
                Value::Map(keys.into_iter().zip(values).collect())
            }
            other => other,
        }
    }
    .boxed()
}
