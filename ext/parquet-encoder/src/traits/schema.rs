use crate::schema::{ColumnDescriptor, PhysicalType, Repetition};

/// Trait for schema introspection
///
/// This trait provides methods for examining and querying schemas
/// without modifying them.
pub trait SchemaInspector {
    /// Get the total number of columns
    fn field_count(&self) -> usize;

    /// Get a column by name
    fn get_field(&self, name: &str) -> Option<&ColumnDescriptor>;

    /// Check if schema contains a specific field
    fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Get all column names in declaration order
    fn all_field_paths(&self) -> Vec<String>;

    /// Columns stored with the given physical type
    fn fields_of_type(&self, physical_type: PhysicalType) -> Vec<&ColumnDescriptor>;

    /// Whether any column can hold nulls or lists, i.e. needs level streams
    fn has_levels(&self) -> bool;
}

impl SchemaInspector for crate::Schema {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn get_field(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.column_by_name(name)
    }

    fn all_field_paths(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn fields_of_type(&self, physical_type: PhysicalType) -> Vec<&ColumnDescriptor> {
        self.columns()
            .iter()
            .filter(|c| c.physical_type() == physical_type)
            .collect()
    }

    fn has_levels(&self) -> bool {
        self.columns()
            .iter()
            .any(|c| c.repetition() != Repetition::Required)
    }
}
