use crate::column::coerce::coerce;
use crate::column::{ColumnValues, Statistics, StatisticsCollector, TypedValue};
use crate::schema::{ColumnDescriptor, Repetition};
use crate::{DynamicValue, ParquetError, Record, Result};

/// Buffered values, levels and statistics for one column of the current
/// row group.
#[derive(Debug, Clone)]
pub struct ColumnBuffer {
    descriptor: ColumnDescriptor,
    values: ColumnValues,
    def_levels: Vec<u8>,
    rep_levels: Vec<u8>,
    stats: StatisticsCollector,
}

impl ColumnBuffer {
    pub(crate) fn new(descriptor: ColumnDescriptor, capacity: usize) -> Self {
        let physical_type = descriptor.physical_type();
        let repetition = descriptor.repetition();
        let level_capacity = match repetition {
            Repetition::Required => 0,
            Repetition::Optional | Repetition::Repeated => capacity,
        };
        Self {
            values: ColumnValues::with_capacity(physical_type, capacity),
            def_levels: Vec::with_capacity(level_capacity),
            rep_levels: Vec::with_capacity(if repetition == Repetition::Repeated {
                capacity
            } else {
                0
            }),
            stats: StatisticsCollector::new(physical_type, repetition),
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// Coerce this column's field of `record` and buffer it
    pub fn append<R: Record + ?Sized>(&mut self, record: &R) -> Result<()> {
        let value = record.get(self.descriptor.name());
        match self.descriptor.repetition() {
            Repetition::Required => {
                let typed = value
                    .and_then(|v| coerce(self.descriptor.physical_type(), v))
                    .map_or_else(|| self.required_default(), Ok)?;
                self.push_value(typed)
            }
            Repetition::Optional => {
                let typed = match value {
                    Some(DynamicValue::Null) => None,
                    Some(v) => coerce(self.descriptor.physical_type(), v)
                        .or_else(|| self.descriptor.default_value().cloned()),
                    None => self.descriptor.default_value().cloned(),
                };
                match typed {
                    Some(v) => {
                        self.def_levels.push(1);
                        self.push_value(v)
                    }
                    None => {
                        self.def_levels.push(0);
                        self.stats.observe_null();
                        Ok(())
                    }
                }
            }
            Repetition::Repeated => match value {
                None | Some(DynamicValue::Null) => {
                    self.push_empty_list();
                    Ok(())
                }
                Some(DynamicValue::List(items)) if items.is_empty() => {
                    self.push_empty_list();
                    Ok(())
                }
                Some(DynamicValue::List(items)) => {
                    for (idx, item) in items.iter().enumerate() {
                        self.push_element(item, idx > 0)?;
                    }
                    Ok(())
                }
                Some(scalar) => self.push_element(scalar, false),
            },
        }
    }

    fn required_default(&self) -> Result<TypedValue> {
        self.descriptor.default_value().cloned().ok_or_else(|| {
            ParquetError::internal(format!(
                "column '{}' has no default value",
                self.descriptor.name()
            ))
        })
    }

    fn push_value(&mut self, value: TypedValue) -> Result<()> {
        self.stats.observe(&value);
        self.values.push(value)
    }

    fn push_empty_list(&mut self) {
        self.rep_levels.push(0);
        self.def_levels.push(0);
        self.stats.observe_null();
    }

    fn push_element(&mut self, item: &DynamicValue, continues_list: bool) -> Result<()> {
        let typed = coerce(self.descriptor.physical_type(), item)
            .map_or_else(|| self.required_default(), Ok)?;
        self.rep_levels.push(u8::from(continues_list));
        self.def_levels.push(1);
        self.push_value(typed)
    }

    /// Level slots buffered: one per record for flat columns, one per list
    /// element (or empty list) for repeated columns.
    pub fn slots(&self) -> usize {
        match self.descriptor.repetition() {
            Repetition::Required => self.values.len(),
            Repetition::Optional | Repetition::Repeated => self.def_levels.len(),
        }
    }

    /// Number of non-null values buffered
    pub fn non_null_values(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots() == 0
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn def_levels(&self) -> &[u8] {
        &self.def_levels
    }

    pub fn rep_levels(&self) -> &[u8] {
        &self.rep_levels
    }

    /// Statistics for everything buffered since the last reset
    pub fn statistics(&self) -> Statistics {
        self.stats.finish(&self.values)
    }

    /// Clear values, levels and statistics, keeping allocations
    pub fn reset(&mut self) {
        self.values.clear();
        self.def_levels.clear();
        self.rep_levels.clear();
        self.stats.reset();
    }
}
