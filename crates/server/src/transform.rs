//! Recursive encrypt-or-skip / decrypt-or-skip over payload values.
//!
//! Only string leaves are ever touched. Dates, numbers, booleans and nulls pass
//! through, lists keep their order, and map keys are filtered through a
//! [`FieldPolicy`]. Encrypting an envelope and decrypting a plaintext are both
//! no-ops, so any transform may be applied to mixed or already-transformed data.
//!
//! Payloads must be trees; there is no cycle detection.

use common::{Map, Value};

use crate::crypto::FieldCipher;
use crate::policy::{FieldPolicy, FieldSet};

/// Which way a transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext leaves become envelopes.
    Encrypt,
    /// Envelope leaves become plaintext.
    Decrypt,
}

/// Apply `direction` to every string leaf of `value` admitted by `policy`.
pub fn transform(
    value: &mut Value,
    direction: Direction,
    policy: FieldPolicy<'_>,
    cipher: &FieldCipher,
) {
    match value {
        Value::String(s) => apply(s, direction, cipher),
        Value::List(items) => {
            for item in items.iter_mut() {
                transform(item, direction, policy, cipher);
            }
        }
        Value::Map(map) => {
            for (key, child) in map.iter_mut() {
                if let Some(next) = policy.descend(key) {
                    transform(child, direction, next, cipher);
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Date(_) => {}
    }
}

/// Ingress transform: decrypt every string leaf except identifiers and timestamps.
pub fn decrypt_request(body: &mut Value, cipher: &FieldCipher) {
    transform(body, Direction::Decrypt, FieldPolicy::skip_list(), cipher);
}

/// Encrypt every string leaf except identifiers and timestamps.
///
/// Not mounted on the router: outbound plaintext is produced by the
/// persistence hooks, and running both on one payload would re-encrypt it.
pub fn encrypt_response(body: &mut Value, cipher: &FieldCipher) {
    transform(body, Direction::Encrypt, FieldPolicy::skip_list(), cipher);
}

/// Encrypt the top-level string values of `record` named in `fields`.
///
/// Shallow: nested values and non-strings are left alone.
pub fn encrypt_fields(record: &mut Map, fields: &FieldSet, cipher: &FieldCipher) {
    for field in fields {
        if let Some(Value::String(s)) = record.get_mut(field) {
            cipher.encrypt_in_place(s);
        }
    }
}

/// Decrypt the top-level string values of `record` named in `fields`.
pub fn decrypt_fields(record: &mut Map, fields: &FieldSet, cipher: &FieldCipher) {
    for field in fields {
        if let Some(Value::String(s)) = record.get_mut(field) {
            cipher.decrypt_in_place(s);
        }
    }
}

fn apply(s: &mut String, direction: Direction, cipher: &FieldCipher) {
    match direction {
        Direction::Encrypt => cipher.encrypt_in_place(s),
        Direction::Decrypt => cipher.decrypt_in_place(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::tests::test_cipher;
    use chrono::{TimeZone, Utc};
    use common::envelope::is_envelope;
    use serde_json::json;

    fn fields(names: &[&str]) -> FieldSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn skip_list_request_decrypts_all_but_identifiers() {
        let c = test_cipher();
        let name = c.encrypt("Juan");
        let a = c.encrypt("a");
        let id_lookalike = c.encrypt("1");
        let mut body = Value::from(json!({
            "user": {"name": name, "_id": id_lookalike},
            "tags": [a, "b"],
        }));

        decrypt_request(&mut body, &c);

        let out = body.into_json();
        assert_eq!(out["user"]["name"], "Juan");
        assert_eq!(out["user"]["_id"], json!(id_lookalike));
        assert_eq!(out["tags"], json!(["a", "b"]));
    }

    #[test]
    fn skip_list_encrypt_leaves_ids_and_timestamps() {
        let c = test_cipher();
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut body = Value::from(json!({"_id": "x", "id": "7", "updatedAt": "2024-01-02", "name": "Juan"}));
        body.as_map_mut()
            .unwrap()
            .insert("createdAt".into(), Value::Date(created));

        encrypt_response(&mut body, &c);

        let map = body.as_map().unwrap();
        assert_eq!(map["_id"].as_str(), Some("x"));
        assert_eq!(map["id"].as_str(), Some("7"));
        assert_eq!(map["updatedAt"].as_str(), Some("2024-01-02"));
        assert_eq!(map["createdAt"], Value::Date(created));
        assert!(is_envelope(map["name"].as_str().unwrap()));
    }

    #[test]
    fn dates_and_scalars_pass_through_in_both_directions() {
        let c = test_cipher();
        let d = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let original = Value::List(vec![
            Value::Date(d),
            Value::Null,
            Value::Bool(false),
            Value::from(42i64),
        ]);
        for direction in [Direction::Encrypt, Direction::Decrypt] {
            let mut v = original.clone();
            transform(&mut v, direction, FieldPolicy::All, &c);
            assert_eq!(v, original);
        }
    }

    #[test]
    fn encrypt_is_idempotent() {
        let c = test_cipher();
        let mut v = Value::from(json!({"a": "x", "b": ["y", {"c": "z"}]}));
        transform(&mut v, Direction::Encrypt, FieldPolicy::All, &c);
        let once = v.clone();
        transform(&mut v, Direction::Encrypt, FieldPolicy::All, &c);
        assert_eq!(v, once);
        transform(&mut v, Direction::Decrypt, FieldPolicy::All, &c);
        assert_eq!(v.into_json(), json!({"a": "x", "b": ["y", {"c": "z"}]}));
    }

    #[test]
    fn list_order_is_preserved() {
        let c = test_cipher();
        let mut v = Value::from(json!(["1", "2", "3"]));
        transform(&mut v, Direction::Encrypt, FieldPolicy::All, &c);
        transform(&mut v, Direction::Decrypt, FieldPolicy::All, &c);
        assert_eq!(v.into_json(), json!(["1", "2", "3"]));
    }

    #[test]
    fn allow_list_transforms_named_subtrees_only() {
        let c = test_cipher();
        let allowed = fields(&["name", "contact"]);
        let mut v = Value::from(json!({
            "name": "Juan",
            "contact": {"email": "j@example.com", "_id": "c1"},
            "status": "open",
        }));
        transform(&mut v, Direction::Encrypt, FieldPolicy::Allow(&allowed), &c);
        let out = v.into_json();
        assert!(is_envelope(out["name"].as_str().unwrap()));
        assert!(is_envelope(out["contact"]["email"].as_str().unwrap()));
        // Below an allowed key the whole subtree is sensitive.
        assert!(is_envelope(out["contact"]["_id"].as_str().unwrap()));
        assert_eq!(out["status"], "open");
    }

    #[test]
    fn bare_string_body_is_transformed() {
        let c = test_cipher();
        let mut v = Value::String(c.encrypt("hi"));
        decrypt_request(&mut v, &c);
        assert_eq!(v.as_str(), Some("hi"));
    }

    #[test]
    fn deep_nesting_is_handled() {
        let c = test_cipher();
        let mut v = Value::from("leaf");
        for _ in 0..200 {
            let mut m = Map::new();
            m.insert("n".into(), v);
            v = Value::Map(m);
        }
        transform(&mut v, Direction::Encrypt, FieldPolicy::skip_list(), &c);
        let mut cursor = &v;
        while let Value::Map(m) = cursor {
            cursor = &m["n"];
        }
        assert!(is_envelope(cursor.as_str().unwrap()));
    }

    #[test]
    fn field_helpers_are_shallow_and_string_only() {
        let c = test_cipher();
        let allowed = fields(&["name", "age", "address"]);
        let mut record = Value::from(json!({
            "_id": "x",
            "name": "Juan",
            "age": 30,
            "address": {"city": "Manila"},
        }))
        .as_map()
        .cloned()
        .unwrap();

        encrypt_fields(&mut record, &allowed, &c);
        assert!(is_envelope(record["name"].as_str().unwrap()));
        assert_eq!(record["_id"].as_str(), Some("x"));
        assert_eq!(record["age"], Value::from(30i64));
        assert_eq!(record["address"].clone().into_json(), json!({"city": "Manila"}));

        let sealed = record["name"].clone();
        encrypt_fields(&mut record, &allowed, &c);
        assert_eq!(record["name"], sealed);

        decrypt_fields(&mut record, &allowed, &c);
        assert_eq!(record["name"].as_str(), Some("Juan"));
        decrypt_fields(&mut record, &allowed, &c);
        assert_eq!(record["name"].as_str(), Some("Juan"));
    }
}
