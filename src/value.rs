//! Report values
//!
//! The backend report has no schema the client can rely on. It is held as a
//! closed recursive sum type so the tree model and the formatter can match on
//! every shape exhaustively. Object members keep the order the backend wrote
//! them in.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Sequence(Vec<ReportValue>),
    /// Insertion-ordered key/value pairs
    Mapping(Vec<(String, ReportValue)>),
}

impl ReportValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ReportValue::Null)
    }

    /// Member lookup on a mapping. First match wins on duplicate keys.
    pub fn get(&self, key: &str) -> Option<&ReportValue> {
        match self {
            ReportValue::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Element lookup on a sequence.
    pub fn index(&self, index: usize) -> Option<&ReportValue> {
        match self {
            ReportValue::Sequence(items) => items.get(index),
            _ => None,
        }
    }

    /// Number of direct children; 0 for scalars.
    pub fn len(&self) -> usize {
        match self {
            ReportValue::Sequence(items) => items.len(),
            ReportValue::Mapping(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric reading of numbers and of strings that parse entirely as one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReportValue::Number(n) => n.as_f64(),
            ReportValue::Text(s) => crate::format::parse_numeric(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ReportValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ReportValue::Null,
            serde_json::Value::Bool(b) => ReportValue::Bool(b),
            serde_json::Value::Number(n) => ReportValue::Number(n),
            serde_json::Value::String(s) => ReportValue::Text(s),
            serde_json::Value::Array(items) => {
                ReportValue::Sequence(items.into_iter().map(ReportValue::from).collect())
            }
            // serde_json is built with preserve_order, so this walks insertion order
            serde_json::Value::Object(map) => ReportValue::Mapping(
                map.into_iter().map(|(k, v)| (k, ReportValue::from(v))).collect(),
            ),
        }
    }
}

impl From<&ReportValue> for serde_json::Value {
    fn from(value: &ReportValue) -> Self {
        match value {
            ReportValue::Null => serde_json::Value::Null,
            ReportValue::Bool(b) => serde_json::Value::Bool(*b),
            ReportValue::Number(n) => serde_json::Value::Number(n.clone()),
            ReportValue::Text(s) => serde_json::Value::String(s.clone()),
            ReportValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            ReportValue::Mapping(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for ReportValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReportValue::Null => serializer.serialize_unit(),
            ReportValue::Bool(b) => serializer.serialize_bool(*b),
            ReportValue::Number(n) => n.serialize(serializer),
            ReportValue::Text(s) => serializer.serialize_str(s),
            ReportValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ReportValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ReportValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(ReportValue::from)
    }
}

/// Parse a JSON document with no nesting limit.
///
/// serde_json stops at 128 levels by default. Reports may nest deeper, so
/// the limit is lifted and the recursion runs on a growable stack.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Compact JSON text, as the raw viewer shows scalars.
impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<bool> for ReportValue {
    fn from(b: bool) -> Self {
        ReportValue::Bool(b)
    }
}

impl From<i64> for ReportValue {
    fn from(n: i64) -> Self {
        ReportValue::Number(n.into())
    }
}

impl From<&str> for ReportValue {
    fn from(s: &str) -> Self {
        ReportValue::Text(s.to_owned())
    }
}

impl From<String> for ReportValue {
    fn from(s: String) -> Self {
        ReportValue::Text(s)
    }
}
