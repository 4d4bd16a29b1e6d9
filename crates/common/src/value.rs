//! Payload value model walked by the recursive transformers.
//!
//! A closed set of shapes: null, bool, number, string, date, list, map. Dates
//! are their own variant so that a transformer never mistakes a timestamp for
//! a cipher-eligible string. JSON has no date type, so values decoded from
//! JSON never contain [`Value::Date`]; dates enter through the persistence
//! layer and leave as RFC 3339 strings.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field map of an object value.
pub type Map = BTreeMap<String, Value>;

/// A JSON-like payload value with a distinct date variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Any JSON number.
    Number(serde_json::Number),
    /// A string leaf: plaintext or envelope.
    String(String),
    /// A timestamp. Never encrypted.
    Date(DateTime<Utc>),
    /// Ordered list.
    List(Vec<Value>),
    /// Object keyed by field name.
    Map(Map),
}

impl Value {
    /// Returns the string contents if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the field map if this is a [`Value::Map`].
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable variant of [`Value::as_map`].
    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert to a [`serde_json::Value`], rendering dates as RFC 3339 strings.
    pub fn into_json(self) -> serde_json::Value {
        self.into()
    }
}

/// Render a date the way it appears on the wire.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Date(d) => serde_json::Value::String(format_date(&d)),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&format_date(d)),
            Value::List(items) => items.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn json_round_trip_preserves_shape() {
        let src = json!({"user": {"name": "Juan", "_id": "1"}, "tags": ["a", "b"], "n": 3, "ok": true, "x": null});
        let value = Value::from(src.clone());
        assert_eq!(value.into_json(), src);
    }

    #[test]
    fn dates_serialise_as_rfc3339() {
        let d = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let v = Value::Date(d);
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"2024-05-01T08:30:00.000Z\"");
        assert_eq!(v.into_json(), json!("2024-05-01T08:30:00.000Z"));
    }

    #[test]
    fn deserialised_strings_stay_strings() {
        let v: Value = serde_json::from_str(r#"{"createdAt":"2024-05-01T08:30:00.000Z"}"#).unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map["createdAt"].as_str(), Some("2024-05-01T08:30:00.000Z"));
    }

    #[test]
    fn accessors() {
        let mut v = Value::from(json!({"a": "b"}));
        assert!(v.as_str().is_none());
        v.as_map_mut().unwrap().insert("c".into(), Value::Null);
        assert!(v.as_map().unwrap()["c"].is_null());
        assert_eq!(Value::from("s").as_str(), Some("s"));
    }
}
