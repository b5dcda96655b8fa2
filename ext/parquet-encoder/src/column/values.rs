use ordered_float::OrderedFloat;
use std::sync::Arc;

use crate::schema::PhysicalType;
use crate::{DynamicValue, ParquetError, Result};

/// A single value already converted to a column's physical type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    ByteArray(Arc<str>),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
}

impl TypedValue {
    /// Type-level fallback: empty string, `false`, or `default_number`
    pub fn fallback(physical_type: PhysicalType, default_number: i64) -> Self {
        match physical_type {
            PhysicalType::ByteArray => TypedValue::ByteArray(Arc::from("")),
            PhysicalType::Int32 => TypedValue::Int32(default_number as i32),
            PhysicalType::Int64 => TypedValue::Int64(default_number),
            PhysicalType::Float => TypedValue::Float(default_number as f32),
            PhysicalType::Double => TypedValue::Double(default_number as f64),
            PhysicalType::Boolean => TypedValue::Boolean(false),
        }
    }

    pub fn physical_type(&self) -> PhysicalType {
        match self {
            TypedValue::ByteArray(_) => PhysicalType::ByteArray,
            TypedValue::Int32(_) => PhysicalType::Int32,
            TypedValue::Int64(_) => PhysicalType::Int64,
            TypedValue::Float(_) => PhysicalType::Float,
            TypedValue::Double(_) => PhysicalType::Double,
            TypedValue::Boolean(_) => PhysicalType::Boolean,
        }
    }
}

impl From<TypedValue> for DynamicValue {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::ByteArray(s) => DynamicValue::String(s),
            TypedValue::Int32(v) => DynamicValue::Int32(v),
            TypedValue::Int64(v) => DynamicValue::Int64(v),
            TypedValue::Float(v) => DynamicValue::Float32(OrderedFloat(v)),
            TypedValue::Double(v) => DynamicValue::Float64(OrderedFloat(v)),
            TypedValue::Boolean(v) => DynamicValue::Boolean(v),
        }
    }
}

/// The non-null values of one column, stored by physical type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    ByteArray(Vec<Arc<str>>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Boolean(Vec<bool>),
}

impl ColumnValues {
    pub fn with_capacity(physical_type: PhysicalType, capacity: usize) -> Self {
        match physical_type {
            PhysicalType::ByteArray => ColumnValues::ByteArray(Vec::with_capacity(capacity)),
            PhysicalType::Int32 => ColumnValues::Int32(Vec::with_capacity(capacity)),
            PhysicalType::Int64 => ColumnValues::Int64(Vec::with_capacity(capacity)),
            PhysicalType::Float => ColumnValues::Float(Vec::with_capacity(capacity)),
            PhysicalType::Double => ColumnValues::Double(Vec::with_capacity(capacity)),
            PhysicalType::Boolean => ColumnValues::Boolean(Vec::with_capacity(capacity)),
        }
    }

    pub fn physical_type(&self) -> PhysicalType {
        match self {
            ColumnValues::ByteArray(_) => PhysicalType::ByteArray,
            ColumnValues::Int32(_) => PhysicalType::Int32,
            ColumnValues::Int64(_) => PhysicalType::Int64,
            ColumnValues::Float(_) => PhysicalType::Float,
            ColumnValues::Double(_) => PhysicalType::Double,
            ColumnValues::Boolean(_) => PhysicalType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::ByteArray(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Double(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value; its type must match the column's
    pub fn push(&mut self, value: TypedValue) -> Result<()> {
        match (self, value) {
            (ColumnValues::ByteArray(v), TypedValue::ByteArray(x)) => v.push(x),
            (ColumnValues::Int32(v), TypedValue::Int32(x)) => v.push(x),
            (ColumnValues::Int64(v), TypedValue::Int64(x)) => v.push(x),
            (ColumnValues::Float(v), TypedValue::Float(x)) => v.push(x),
            (ColumnValues::Double(v), TypedValue::Double(x)) => v.push(x),
            (ColumnValues::Boolean(v), TypedValue::Boolean(x)) => v.push(x),
            (values, value) => {
                return Err(ParquetError::internal(format!(
                    "cannot store {:?} value in a {:?} column",
                    value.physical_type(),
                    values.physical_type()
                )))
            }
        }
        Ok(())
    }

    /// Drop all values, keeping the allocation
    pub fn clear(&mut self) {
        match self {
            ColumnValues::ByteArray(v) => v.clear(),
            ColumnValues::Int32(v) => v.clear(),
            ColumnValues::Int64(v) => v.clear(),
            ColumnValues::Float(v) => v.clear(),
            ColumnValues::Double(v) => v.clear(),
            ColumnValues::Boolean(v) => v.clear(),
        }
    }

    pub fn get(&self, index: usize) -> Option<TypedValue> {
        match self {
            ColumnValues::ByteArray(v) => v.get(index).cloned().map(TypedValue::ByteArray),
            ColumnValues::Int32(v) => v.get(index).copied().map(TypedValue::Int32),
            ColumnValues::Int64(v) => v.get(index).copied().map(TypedValue::Int64),
            ColumnValues::Float(v) => v.get(index).copied().map(TypedValue::Float),
            ColumnValues::Double(v) => v.get(index).copied().map(TypedValue::Double),
            ColumnValues::Boolean(v) => v.get(index).copied().map(TypedValue::Boolean),
        }
    }

    /// Append the PLAIN encoding of every value to `out`
    pub fn encode_plain(&self, out: &mut Vec<u8>) {
        match self {
            ColumnValues::ByteArray(values) => {
                for s in values {
                    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
            }
            ColumnValues::Int32(values) => {
                out.reserve(values.len() * 4);
                values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            }
            ColumnValues::Int64(values) => {
                out.reserve(values.len() * 8);
                values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            }
            ColumnValues::Float(values) => {
                out.reserve(values.len() * 4);
                values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            }
            ColumnValues::Double(values) => {
                out.reserve(values.len() * 8);
                values.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            }
            ColumnValues::Boolean(values) => {
                for chunk in values.chunks(8) {
                    let byte = chunk
                        .iter()
                        .enumerate()
                        .fold(0u8, |acc, (bit, &set)| acc | ((set as u8) << bit));
                    out.push(byte);
                }
            }
        }
    }

    /// Decode `count` PLAIN values, returning them and the bytes consumed
    pub fn decode_plain(
        physical_type: PhysicalType,
        data: &[u8],
        count: usize,
    ) -> Result<(Self, usize)> {
        match physical_type {
            PhysicalType::ByteArray => {
                let mut values = Vec::with_capacity(count);
                let mut pos = 0;
                for _ in 0..count {
                    let len = read_fixed::<4>(data, pos)?;
                    let len = u32::from_le_bytes(len) as usize;
                    pos += 4;
                    let bytes = data.get(pos..pos + len).ok_or_else(|| truncated(physical_type))?;
                    let s = std::str::from_utf8(bytes).map_err(|e| {
                        ParquetError::corrupt(format!("byte array value is not UTF-8: {}", e))
                    })?;
                    values.push(Arc::from(s));
                    pos += len;
                }
                Ok((ColumnValues::ByteArray(values), pos))
            }
            PhysicalType::Int32 => decode_fixed(data, count, i32::from_le_bytes, ColumnValues::Int32),
            PhysicalType::Int64 => decode_fixed(data, count, i64::from_le_bytes, ColumnValues::Int64),
            PhysicalType::Float => decode_fixed(data, count, f32::from_le_bytes, ColumnValues::Float),
            PhysicalType::Double => decode_fixed(data, count, f64::from_le_bytes, ColumnValues::Double),
            PhysicalType::Boolean => {
                let len = count.div_ceil(8);
                let bytes = data.get(..len).ok_or_else(|| truncated(physical_type))?;
                let values = (0..count)
                    .map(|i| (bytes[i / 8] >> (i % 8)) & 1 == 1)
                    .collect();
                Ok((ColumnValues::Boolean(values), len))
            }
        }
    }
}

fn truncated(physical_type: PhysicalType) -> ParquetError {
    ParquetError::corrupt(format!(
        "page ends inside a {} value",
        physical_type.type_name()
    ))
}

fn read_fixed<const N: usize>(data: &[u8], pos: usize) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    let src = data
        .get(pos..pos + N)
        .ok_or_else(|| ParquetError::corrupt("page ends inside a value length"))?;
    buf.copy_from_slice(src);
    Ok(buf)
}

fn decode_fixed<T, const N: usize>(
    data: &[u8],
    count: usize,
    from_le: fn([u8; N]) -> T,
    wrap: fn(Vec<T>) -> ColumnValues,
) -> Result<(ColumnValues, usize)> {
    let len = count * N;
    if data.len() < len {
        return Err(ParquetError::corrupt(format!(
            "expected {} bytes for {} values, page has {}",
            len,
            count,
            data.len()
        )));
    }
    let values = data[..len]
        .chunks_exact(N)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            from_le(buf)
        })
        .collect();
    Ok((wrap(values), len))
}
