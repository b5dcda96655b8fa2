use crate::column::{ColumnValues, TypedValue};
use crate::schema::{PhysicalType, Repetition};

/// Finished statistics for one page or column chunk.
///
/// Min/max are encoded as the column's PLAIN bytes without a length prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub min: Option<Vec<u8>>,
    pub max: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
}

impl Statistics {
    pub fn has_min_max(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

/// Bounds go to both the legacy `min`/`max` and the `min_value`/`max_value` fields
impl From<&Statistics> for parquet::format::Statistics {
    fn from(stats: &Statistics) -> Self {
        parquet::format::Statistics {
            max: stats.max.clone(),
            min: stats.min.clone(),
            null_count: stats.null_count,
            distinct_count: stats.distinct_count,
            max_value: stats.max.clone(),
            min_value: stats.min.clone(),
            is_max_value_exact: None,
            is_min_value_exact: None,
        }
    }
}

trait Bound: Copy + PartialOrd {
    const LOWEST: Self;
    const HIGHEST: Self;

    fn to_le_vec(self) -> Vec<u8>;
}

macro_rules! impl_bound {
    ($($t:ty),*) => {
        $(impl Bound for $t {
            const LOWEST: Self = <$t>::MIN;
            const HIGHEST: Self = <$t>::MAX;

            fn to_le_vec(self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }
        })*
    };
}

impl_bound!(i32, i64, f32, f64);

/// Running min/max for a numeric column
#[derive(Debug, Clone)]
struct MinMax<T> {
    min: T,
    max: T,
    seen: bool,
}

impl<T: Bound> MinMax<T> {
    fn new() -> Self {
        Self {
            min: T::HIGHEST,
            max: T::LOWEST,
            seen: false,
        }
    }

    fn observe(&mut self, v: T) {
        // NaN is unordered against itself
        if v.partial_cmp(&v).is_none() {
            return;
        }
        if v < self.min {
            self.min = v;
        }
        if v > self.max {
            self.max = v;
        }
        self.seen = true;
    }

    fn bounds(&self) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
        if self.seen {
            (Some(self.min.to_le_vec()), Some(self.max.to_le_vec()))
        } else {
            (None, None)
        }
    }
}

#[derive(Debug, Clone)]
enum Accumulator {
    Int32(MinMax<i32>),
    Int64(MinMax<i64>),
    Float(MinMax<f32>),
    Double(MinMax<f64>),
    // computed from the retained values at flush
    ByteArray,
    Boolean,
}

impl Accumulator {
    fn new(physical_type: PhysicalType) -> Self {
        match physical_type {
            PhysicalType::Int32 => Accumulator::Int32(MinMax::new()),
            PhysicalType::Int64 => Accumulator::Int64(MinMax::new()),
            PhysicalType::Float => Accumulator::Float(MinMax::new()),
            PhysicalType::Double => Accumulator::Double(MinMax::new()),
            PhysicalType::ByteArray => Accumulator::ByteArray,
            PhysicalType::Boolean => Accumulator::Boolean,
        }
    }
}

/// Collects statistics for one column between flushes
#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    physical_type: PhysicalType,
    accumulator: Accumulator,
    null_count: i64,
    counts_nulls: bool,
}

impl StatisticsCollector {
    pub fn new(physical_type: PhysicalType, repetition: Repetition) -> Self {
        Self {
            physical_type,
            accumulator: Accumulator::new(physical_type),
            null_count: 0,
            counts_nulls: repetition != Repetition::Required,
        }
    }

    pub fn observe(&mut self, value: &TypedValue) {
        match (&mut self.accumulator, value) {
            (Accumulator::Int32(acc), TypedValue::Int32(v)) => acc.observe(*v),
            (Accumulator::Int64(acc), TypedValue::Int64(v)) => acc.observe(*v),
            (Accumulator::Float(acc), TypedValue::Float(v)) => acc.observe(*v),
            (Accumulator::Double(acc), TypedValue::Double(v)) => acc.observe(*v),
            _ => {}
        }
    }

    pub fn observe_null(&mut self) {
        self.null_count += 1;
    }

    pub fn null_count(&self) -> i64 {
        self.null_count
    }

    /// Produce the statistics for the values buffered since the last reset
    pub fn finish(&self, values: &ColumnValues) -> Statistics {
        let (min, max) = match (&self.accumulator, values) {
            (Accumulator::Int32(acc), _) => acc.bounds(),
            (Accumulator::Int64(acc), _) => acc.bounds(),
            (Accumulator::Float(acc), _) => acc.bounds(),
            (Accumulator::Double(acc), _) => acc.bounds(),
            (Accumulator::ByteArray, ColumnValues::ByteArray(strings)) => (
                strings.iter().min().map(|s| s.as_bytes().to_vec()),
                strings.iter().max().map(|s| s.as_bytes().to_vec()),
            ),
            _ => (None, None),
        };

        Statistics {
            min,
            max,
            null_count: Some(if self.counts_nulls { self.null_count } else { 0 }),
            distinct_count: None,
        }
    }

    pub fn reset(&mut self) {
        self.accumulator = Accumulator::new(self.physical_type);
        self.null_count = 0;
    }
}
