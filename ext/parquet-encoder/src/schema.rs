use parquet::format;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::column::coerce::coerce;
use crate::column::{ColumnBuffer, TypedValue};
use crate::compression::Codec;
use crate::{DynamicValue, ParquetError, Result};

/// Environment variable holding the numeric fallback default
pub const DEFAULT_NUMBER_ENV: &str = "PARQUET_SCHEMA_DEFAULT_NUMBER";

/// Numeric fallback used when the environment does not set one
pub const FALLBACK_DEFAULT_NUMBER: i64 = -1;

/// Physical storage types a column can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    ByteArray,
    Int32,
    Int64,
    Float,
    Double,
    Boolean,
}

impl PhysicalType {
    /// Resolve a schema type name (`string`, `int`, `long`, ...), ignoring case
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(PhysicalType::ByteArray),
            "int" => Some(PhysicalType::Int32),
            "long" => Some(PhysicalType::Int64),
            "float" => Some(PhysicalType::Float),
            "double" => Some(PhysicalType::Double),
            "boolean" => Some(PhysicalType::Boolean),
            _ => None,
        }
    }

    /// The schema type name this physical type is declared with
    pub fn type_name(&self) -> &'static str {
        match self {
            PhysicalType::ByteArray => "string",
            PhysicalType::Int32 => "int",
            PhysicalType::Int64 => "long",
            PhysicalType::Float => "float",
            PhysicalType::Double => "double",
            PhysicalType::Boolean => "boolean",
        }
    }
}

impl From<PhysicalType> for format::Type {
    fn from(value: PhysicalType) -> Self {
        match value {
            PhysicalType::Boolean => format::Type::BOOLEAN,
            PhysicalType::Int32 => format::Type::INT32,
            PhysicalType::Int64 => format::Type::INT64,
            PhysicalType::Float => format::Type::FLOAT,
            PhysicalType::Double => format::Type::DOUBLE,
            PhysicalType::ByteArray => format::Type::BYTE_ARRAY,
        }
    }
}

impl TryFrom<format::Type> for PhysicalType {
    type Error = ParquetError;

    fn try_from(value: format::Type) -> Result<Self> {
        match value {
            format::Type::BOOLEAN => Ok(PhysicalType::Boolean),
            format::Type::INT32 => Ok(PhysicalType::Int32),
            format::Type::INT64 => Ok(PhysicalType::Int64),
            format::Type::FLOAT => Ok(PhysicalType::Float),
            format::Type::DOUBLE => Ok(PhysicalType::Double),
            format::Type::BYTE_ARRAY => Ok(PhysicalType::ByteArray),
            other => Err(ParquetError::unsupported(format!(
                "physical type id {} is not supported",
                other.0
            ))),
        }
    }
}

/// How many values a column holds per record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repetition {
    /// Exactly one value
    #[default]
    Required,
    /// Zero or one value
    Optional,
    /// Zero or more values
    Repeated,
}

impl Repetition {
    /// Maximum (definition, repetition) levels for a flat column
    pub fn max_levels(&self) -> (u8, u8) {
        match self {
            Repetition::Required => (0, 0),
            Repetition::Optional => (1, 0),
            Repetition::Repeated => (1, 1),
        }
    }
}

impl From<Repetition> for format::FieldRepetitionType {
    fn from(value: Repetition) -> Self {
        match value {
            Repetition::Required => format::FieldRepetitionType::REQUIRED,
            Repetition::Optional => format::FieldRepetitionType::OPTIONAL,
            Repetition::Repeated => format::FieldRepetitionType::REPEATED,
        }
    }
}

impl TryFrom<format::FieldRepetitionType> for Repetition {
    type Error = ParquetError;

    fn try_from(value: format::FieldRepetitionType) -> Result<Self> {
        match value {
            format::FieldRepetitionType::REQUIRED => Ok(Repetition::Required),
            format::FieldRepetitionType::OPTIONAL => Ok(Repetition::Optional),
            format::FieldRepetitionType::REPEATED => Ok(Repetition::Repeated),
            other => Err(ParquetError::corrupt(format!(
                "unknown repetition type {}",
                other.0
            ))),
        }
    }
}

/// One field as declared by the caller, before compilation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "AvroField")]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    pub default: Option<DynamicValue>,
    pub repetition: Repetition,
    pub codec: Option<Codec>,
}

impl FieldSpec {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default: None,
            repetition: Repetition::Required,
            codec: None,
        }
    }

    pub fn with_default<V: Into<DynamicValue>>(mut self, default: V) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        self.repetition = repetition;
        self
    }

    pub fn optional(self) -> Self {
        self.with_repetition(Repetition::Optional)
    }

    pub fn repeated(self) -> Self {
        self.with_repetition(Repetition::Repeated)
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = Some(codec);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AvroType {
    Name(String),
    Union(Vec<String>),
}

#[derive(Deserialize)]
struct AvroField {
    name: String,
    #[serde(rename = "type")]
    field_type: AvroType,
    #[serde(default)]
    default: Option<DynamicValue>,
    #[serde(default)]
    repetition: Option<Repetition>,
    #[serde(default)]
    codec: Option<Codec>,
}

// A `["null", T]` union is an optional T. Anything else stays as written and
// is rejected by `Schema::compile`.
impl From<AvroField> for FieldSpec {
    fn from(field: AvroField) -> Self {
        let (type_name, nullable) = match field.field_type {
            AvroType::Name(name) => (name, false),
            AvroType::Union(members) => {
                let nullable = members.iter().any(|m| m.eq_ignore_ascii_case("null"));
                let rest: Vec<String> = members
                    .into_iter()
                    .filter(|m| !m.eq_ignore_ascii_case("null"))
                    .collect();
                let name = if rest.is_empty() {
                    "null".to_string()
                } else {
                    rest.join("|")
                };
                (name, nullable)
            }
        };

        let repetition = field.repetition.unwrap_or(if nullable {
            Repetition::Optional
        } else {
            Repetition::Required
        });

        FieldSpec {
            name: field.name,
            type_name,
            default: field.default,
            repetition,
            codec: field.codec,
        }
    }
}

#[derive(Deserialize)]
struct AvroRecord {
    #[serde(default)]
    name: Option<String>,
    fields: Vec<FieldSpec>,
}

/// Parse the `fields` of an Avro-style record schema document
pub fn parse_avro_fields(json: &str) -> Result<Vec<FieldSpec>> {
    let record: AvroRecord = serde_json::from_str(json)?;
    Ok(record.fields)
}

/// Options threaded through schema compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub default_codec: Codec,
    pub default_number: i64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_codec: Codec::default(),
            default_number: FALLBACK_DEFAULT_NUMBER,
        }
    }
}

impl CompileOptions {
    /// Read the numeric fallback from `PARQUET_SCHEMA_DEFAULT_NUMBER`
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(DEFAULT_NUMBER_ENV).ok().as_deref())
    }

    /// Options for a raw value of the environment variable. Missing or
    /// unparsable values fall back to [`FALLBACK_DEFAULT_NUMBER`].
    pub fn from_env_value(raw: Option<&str>) -> Self {
        let default_number = raw
            .and_then(parse_default_number)
            .unwrap_or(FALLBACK_DEFAULT_NUMBER);
        Self {
            default_number,
            ..Self::default()
        }
    }

    pub fn with_default_codec(mut self, codec: Codec) -> Self {
        self.default_codec = codec;
        self
    }

    pub fn with_default_number(mut self, default_number: i64) -> Self {
        self.default_number = default_number;
        self
    }
}

fn parse_default_number(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// A compiled, immutable column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    name: Arc<str>,
    physical_type: PhysicalType,
    repetition: Repetition,
    default: Option<TypedValue>,
    codec: Codec,
}

impl ColumnDescriptor {
    pub(crate) fn new(
        name: Arc<str>,
        physical_type: PhysicalType,
        repetition: Repetition,
        default: Option<TypedValue>,
        codec: Codec,
    ) -> Self {
        Self {
            name,
            physical_type,
            repetition,
            default,
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    /// Value used when a record has nothing usable for this column.
    ///
    /// Always present for required and repeated columns; `None` on an
    /// optional column means the fallback is null.
    pub fn default_value(&self) -> Option<&TypedValue> {
        self.default.as_ref()
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn max_def_level(&self) -> u8 {
        self.repetition.max_levels().0
    }

    pub fn max_rep_level(&self) -> u8 {
        self.repetition.max_levels().1
    }

    /// Allocate an empty buffer sized for `capacity` records
    pub fn allocate(&self, capacity: usize) -> ColumnBuffer {
        ColumnBuffer::new(self.clone(), capacity)
    }
}

/// An ordered set of compiled columns
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    /// Compile field declarations into a schema. Nothing is returned unless
    /// every field compiles.
    pub fn compile(fields: Vec<FieldSpec>, options: &CompileOptions) -> Result<Self> {
        Self::compile_named("schema", fields, options)
    }

    /// Compile an Avro-style record schema document
    pub fn from_avro_json(json: &str, options: &CompileOptions) -> Result<Self> {
        let record: AvroRecord = serde_json::from_str(json)?;
        let name = record.name.unwrap_or_else(|| "schema".to_string());
        Self::compile_named(&name, record.fields, options)
    }

    fn compile_named(name: &str, fields: Vec<FieldSpec>, options: &CompileOptions) -> Result<Self> {
        let mut seen = HashSet::with_capacity(fields.len());
        let mut columns = Vec::with_capacity(fields.len());

        for field in fields {
            if field.name.is_empty() {
                return Err(ParquetError::schema("field name must not be empty"));
            }
            if !seen.insert(field.name.clone()) {
                return Err(ParquetError::schema(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }

            let physical_type = PhysicalType::from_type_name(&field.type_name).ok_or_else(|| {
                ParquetError::schema(format!(
                    "field '{}' has unsupported type '{}'",
                    field.name, field.type_name
                ))
            })?;

            let declared = field
                .default
                .as_ref()
                .and_then(|value| coerce(physical_type, value));
            let default = match field.repetition {
                Repetition::Optional => declared,
                Repetition::Required | Repetition::Repeated => Some(declared.unwrap_or_else(|| {
                    TypedValue::fallback(physical_type, options.default_number)
                })),
            };

            columns.push(ColumnDescriptor::new(
                Arc::from(field.name),
                physical_type,
                field.repetition,
                default,
                field.codec.unwrap_or(options.default_codec),
            ));
        }

        if columns.is_empty() {
            return Err(ParquetError::schema("schema must declare at least one field"));
        }

        Ok(Self {
            name: name.to_string(),
            columns,
        })
    }

    pub(crate) fn from_columns(name: String, columns: Vec<ColumnDescriptor>) -> Self {
        Self { name, columns }
    }

    /// Name written on the root schema element
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Builder for compiling schemas
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    options: CompileOptions,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            name: "schema".to_string(),
            fields: Vec::new(),
            options: CompileOptions::from_env(),
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields<I: IntoIterator<Item = FieldSpec>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Codec for every column that does not name its own
    pub fn with_compression(mut self, codec: Codec) -> Self {
        self.options.default_codec = codec;
        self
    }

    pub fn with_default_number(mut self, default_number: i64) -> Self {
        self.options.default_number = default_number;
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<Schema> {
        Schema::compile_named(&self.name, self.fields, &self.options)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CompileOptions {
        CompileOptions::default()
    }

    #[test]
    fn test_type_names() {
        assert_eq!(PhysicalType::from_type_name("string"), Some(PhysicalType::ByteArray));
        assert_eq!(PhysicalType::from_type_name("INT"), Some(PhysicalType::Int32));
        assert_eq!(PhysicalType::from_type_name("Long"), Some(PhysicalType::Int64));
        assert_eq!(PhysicalType::from_type_name("decimal"), None);
        assert_eq!(PhysicalType::Double.type_name(), "double");
    }

    #[test]
    fn test_compile_defaults() {
        let schema = Schema::compile(
            vec![
                FieldSpec::new("uid", "string"),
                FieldSpec::new("code", "int").with_default("500"),
                FieldSpec::new("type", "int").with_default(-2),
                FieldSpec::new("ratio", "double"),
                FieldSpec::new("flag", "boolean").with_default("T"),
                FieldSpec::new("note", "string").optional(),
            ],
            &options().with_default_number(7),
        )
        .unwrap();

        assert_eq!(schema.len(), 6);
        let defaults: Vec<_> = schema.columns().iter().map(|c| c.default_value().cloned()).collect();
        assert_eq!(defaults[0], Some(TypedValue::ByteArray(Arc::from(""))));
        assert_eq!(defaults[1], Some(TypedValue::Int32(500)));
        assert_eq!(defaults[2], Some(TypedValue::Int32(-2)));
        assert_eq!(defaults[3], Some(TypedValue::Double(7.0)));
        assert_eq!(defaults[4], Some(TypedValue::Boolean(true)));
        assert_eq!(defaults[5], None);
    }

    #[test]
    fn test_uncoercible_default_uses_fallback() {
        let schema = Schema::compile(
            vec![FieldSpec::new("n", "long").with_default("lots")],
            &options(),
        )
        .unwrap();
        assert_eq!(
            schema.column(0).unwrap().default_value(),
            Some(&TypedValue::Int64(-1))
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = Schema::compile(
            vec![FieldSpec::new("a", "int"), FieldSpec::new("when", "timestamp")],
            &options(),
        )
        .unwrap_err();
        assert!(matches!(err, ParquetError::Schema(_)));
        assert!(err.to_string().contains("when"));
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_duplicate_and_empty_names_rejected() {
        assert!(Schema::compile(
            vec![FieldSpec::new("a", "int"), FieldSpec::new("a", "long")],
            &options()
        )
        .is_err());
        assert!(Schema::compile(vec![FieldSpec::new("", "int")], &options()).is_err());
        assert!(Schema::compile(vec![], &options()).is_err());
    }

    #[test]
    fn test_levels_and_codecs() {
        let schema = SchemaBuilder::new()
            .with_compression(Codec::Gzip)
            .field(FieldSpec::new("a", "int"))
            .field(FieldSpec::new("b", "string").optional().with_codec(Codec::Uncompressed))
            .field(FieldSpec::new("c", "long").repeated())
            .build()
            .unwrap();

        let a = schema.column_by_name("a").unwrap();
        assert_eq!((a.max_def_level(), a.max_rep_level()), (0, 0));
        assert_eq!(a.codec(), Codec::Gzip);

        let b = schema.column_by_name("b").unwrap();
        assert_eq!((b.max_def_level(), b.max_rep_level()), (1, 0));
        assert_eq!(b.codec(), Codec::Uncompressed);

        let c = schema.column_by_name("c").unwrap();
        assert_eq!((c.max_def_level(), c.max_rep_level()), (1, 1));
        assert!(c.default_value().is_some());
    }

    #[test]
    fn test_parse_avro_fields() {
        let fields = parse_avro_fields(
            r#"{"type":"record","name":"event","fields":[
                {"name":"uid","type":"string"},
                {"name":"code","type":"int","default":"500"},
                {"name":"tag","type":["null","string"]},
                {"name":"ids","type":"long","repetition":"repeated","codec":"gzip"},
                {"name":"gone","type":"int","default":null}
            ]}"#,
        )
        .unwrap();

        assert_eq!(fields.len(), 5);
        assert_eq!(fields[1].default, Some(DynamicValue::from("500")));
        assert_eq!(fields[2].type_name, "string");
        assert_eq!(fields[2].repetition, Repetition::Optional);
        assert_eq!(fields[3].repetition, Repetition::Repeated);
        assert_eq!(fields[3].codec, Some(Codec::Gzip));
        assert_eq!(fields[4].default, None);
    }

    #[test]
    fn test_from_avro_json_names_schema() {
        let schema = Schema::from_avro_json(
            r#"{"name":"event","fields":[{"name":"a","type":["int","string"]}]}"#,
            &options(),
        );
        assert!(matches!(schema, Err(ParquetError::Schema(_))));

        let schema = Schema::from_avro_json(
            r#"{"name":"event","fields":[{"name":"a","type":"int"}]}"#,
            &options(),
        )
        .unwrap();
        assert_eq!(schema.name(), "event");
    }

    #[test]
    fn test_footer_type_conversions() {
        for physical_type in [
            PhysicalType::ByteArray,
            PhysicalType::Int32,
            PhysicalType::Int64,
            PhysicalType::Float,
            PhysicalType::Double,
            PhysicalType::Boolean,
        ] {
            let id = format::Type::from(physical_type);
            assert_eq!(PhysicalType::try_from(id).unwrap(), physical_type);
        }
        assert_eq!(format::Type::from(PhysicalType::Double), format::Type::DOUBLE);
        assert!(matches!(
            PhysicalType::try_from(format::Type::INT96),
            Err(ParquetError::Unsupported(_))
        ));

        assert_eq!(
            format::FieldRepetitionType::from(Repetition::Repeated),
            format::FieldRepetitionType::REPEATED
        );
        assert_eq!(
            Repetition::try_from(format::FieldRepetitionType::OPTIONAL).unwrap(),
            Repetition::Optional
        );
        assert!(matches!(
            Repetition::try_from(format::FieldRepetitionType(9)),
            Err(ParquetError::Corrupt(_))
        ));
    }

    #[test]
    fn test_parse_default_number() {
        assert_eq!(parse_default_number(" 42 "), Some(42));
        assert_eq!(parse_default_number("-9"), Some(-9));
        assert_eq!(parse_default_number("nope"), None);
    }
}
