use std::sync::Arc;

use crate::column::TypedValue;
use crate::schema::PhysicalType;
use crate::DynamicValue;

/// Convert `value` to `physical_type`, or `None` when it has no usable
/// representation (including null).
pub fn coerce(physical_type: PhysicalType, value: &DynamicValue) -> Option<TypedValue> {
    match physical_type {
        PhysicalType::ByteArray => to_byte_array(value).map(TypedValue::ByteArray),
        PhysicalType::Int32 => to_i32(value).map(TypedValue::Int32),
        PhysicalType::Int64 => to_i64(value).map(TypedValue::Int64),
        PhysicalType::Float => to_f32(value).map(TypedValue::Float),
        PhysicalType::Double => to_f64(value).map(TypedValue::Double),
        PhysicalType::Boolean => to_bool(value).map(TypedValue::Boolean),
    }
}

fn to_byte_array(value: &DynamicValue) -> Option<Arc<str>> {
    match value {
        DynamicValue::Null => None,
        DynamicValue::String(s) => Some(s.clone()),
        other => Some(Arc::from(other.to_string())),
    }
}

fn text(value: &DynamicValue) -> Option<&str> {
    match value {
        DynamicValue::String(s) => Some(s),
        DynamicValue::Bytes(b) => std::str::from_utf8(b).ok(),
        _ => None,
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn to_i32(value: &DynamicValue) -> Option<i32> {
    match value {
        DynamicValue::Int32(v) => Some(*v),
        DynamicValue::Int64(v) => i32::try_from(*v).ok(),
        DynamicValue::Float32(v) => finite(f64::from(v.0)).map(|v| v as i32),
        DynamicValue::Float64(v) => finite(v.0).map(|v| v as i32),
        other => text(other)?.parse().ok(),
    }
}

fn to_i64(value: &DynamicValue) -> Option<i64> {
    match value {
        DynamicValue::Int32(v) => Some(i64::from(*v)),
        DynamicValue::Int64(v) => Some(*v),
        DynamicValue::Float32(v) => finite(f64::from(v.0)).map(|v| v as i64),
        DynamicValue::Float64(v) => finite(v.0).map(|v| v as i64),
        other => text(other)?.parse().ok(),
    }
}

fn to_f32(value: &DynamicValue) -> Option<f32> {
    match value {
        DynamicValue::Int32(v) => Some(*v as f32),
        DynamicValue::Int64(v) => Some(*v as f32),
        DynamicValue::Float32(v) => Some(v.0),
        DynamicValue::Float64(v) => Some(v.0 as f32),
        other => text(other)?.parse().ok(),
    }
}

fn to_f64(value: &DynamicValue) -> Option<f64> {
    match value {
        DynamicValue::Int32(v) => Some(f64::from(*v)),
        DynamicValue::Int64(v) => Some(*v as f64),
        DynamicValue::Float32(v) => Some(f64::from(v.0)),
        DynamicValue::Float64(v) => Some(v.0),
        other => text(other)?.parse().ok(),
    }
}

fn to_bool(value: &DynamicValue) -> Option<bool> {
    match value {
        DynamicValue::Null => None,
        DynamicValue::Boolean(b) => Some(*b),
        other => parse_bool(&other.to_string()),
    }
}

/// Accepts the usual spellings of a boolean flag
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
