use bytes::Bytes;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::{ParquetError, Result};

/// A loosely-typed field value as it arrives from an upstream decoder.
///
/// The writer never rejects a value because of its variant; each column
/// coerces what it receives to its physical type or falls back to its
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DynamicValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    String(Arc<str>),
    Bytes(Bytes),
    List(Vec<DynamicValue>),
}

impl DynamicValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            DynamicValue::Null => "Null",
            DynamicValue::Boolean(_) => "Boolean",
            DynamicValue::Int32(_) => "Int32",
            DynamicValue::Int64(_) => "Int64",
            DynamicValue::Float32(_) => "Float32",
            DynamicValue::Float64(_) => "Float64",
            DynamicValue::String(_) => "String",
            DynamicValue::Bytes(_) => "Bytes",
            DynamicValue::List(_) => "List",
        }
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Null => f.write_str("<nil>"),
            DynamicValue::Boolean(b) => write!(f, "{}", b),
            DynamicValue::Int32(v) => write!(f, "{}", v),
            DynamicValue::Int64(v) => write!(f, "{}", v),
            DynamicValue::Float32(v) => write!(f, "{}", v.0),
            DynamicValue::Float64(v) => write!(f, "{}", v.0),
            DynamicValue::String(s) => f.write_str(s),
            DynamicValue::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            DynamicValue::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(v: bool) -> Self {
        DynamicValue::Boolean(v)
    }
}

impl From<i32> for DynamicValue {
    fn from(v: i32) -> Self {
        DynamicValue::Int32(v)
    }
}

impl From<i64> for DynamicValue {
    fn from(v: i64) -> Self {
        DynamicValue::Int64(v)
    }
}

impl From<f32> for DynamicValue {
    fn from(v: f32) -> Self {
        DynamicValue::Float32(OrderedFloat(v))
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        DynamicValue::Float64(OrderedFloat(v))
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        DynamicValue::String(Arc::from(v))
    }
}

impl From<String> for DynamicValue {
    fn from(v: String) -> Self {
        DynamicValue::String(Arc::from(v))
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(v: Vec<DynamicValue>) -> Self {
        DynamicValue::List(v)
    }
}

impl<T: Into<DynamicValue>> From<Option<T>> for DynamicValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DynamicValue::Null)
    }
}

/// JSON numbers keep their integer form when they have one; everything
/// else becomes a double, matching what a generic JSON decoder hands out.
impl From<serde_json::Value> for DynamicValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;

        match v {
            Value::Null => DynamicValue::Null,
            Value::Bool(b) => DynamicValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DynamicValue::Int64(i),
                None => DynamicValue::Float64(OrderedFloat(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => DynamicValue::String(Arc::from(s)),
            Value::Array(items) => {
                DynamicValue::List(items.into_iter().map(DynamicValue::from).collect())
            }
            obj @ Value::Object(_) => DynamicValue::String(Arc::from(obj.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for DynamicValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(DynamicValue::from)
    }
}

/// Read access to one input record by field name.
///
/// This is the only thing the writer needs from an upstream decoder, so any
/// map-like structure can be fed in without conversion.
pub trait Record {
    /// Look up a field; `None` means the field is absent
    fn get(&self, name: &str) -> Option<&DynamicValue>;
}

impl Record for IndexMap<Arc<str>, DynamicValue> {
    fn get(&self, name: &str) -> Option<&DynamicValue> {
        IndexMap::get(self, name)
    }
}

impl Record for IndexMap<String, DynamicValue> {
    fn get(&self, name: &str) -> Option<&DynamicValue> {
        IndexMap::get(self, name)
    }
}

impl Record for HashMap<String, DynamicValue> {
    fn get(&self, name: &str) -> Option<&DynamicValue> {
        HashMap::get(self, name)
    }
}

impl Record for BTreeMap<String, DynamicValue> {
    fn get(&self, name: &str) -> Option<&DynamicValue> {
        BTreeMap::get(self, name)
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn get(&self, name: &str) -> Option<&DynamicValue> {
        (**self).get(name)
    }
}

/// Decode one JSON object into a record
pub fn record_from_json(json: &[u8]) -> Result<IndexMap<Arc<str>, DynamicValue>> {
    let value: serde_json::Value = serde_json::from_slice(json)?;
    match value {
        serde_json::Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(name, value)| (Arc::from(name), DynamicValue::from(value)))
            .collect()),
        other => Err(ParquetError::invalid_argument(format!(
            "expected a JSON object record, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
