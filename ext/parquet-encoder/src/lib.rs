//! Streaming columnar file encoder
//!
//! `parquet-encoder` turns a stream of loosely-typed records into a
//! Parquet-compatible file without going through an in-memory table format.
//! Records are name → value maps; each field is coerced to its column's
//! physical type (or replaced by the column default) and buffered until a
//! row group's worth of records has arrived.
//!
//! # Key Components
//!
//! - **Schema**: compiled column definitions
//!   - [`Schema::compile`] / [`SchemaBuilder`] from [`FieldSpec`]s or an
//!     Avro-style JSON document
//!   - Defaults are coerced once, at compile time
//!   - Introspection through the [`traits::SchemaInspector`] trait
//!
//! - **Writer**: record-at-a-time encoder on any `std::io::Write`
//!   - One row group per `page_size` records, one data page per column
//!   - Definition/repetition levels in the RLE/bit-packed hybrid encoding
//!   - Snappy or gzip compression per column
//!   - Min/max/null-count statistics in page headers and the footer
//!
//! - **Reader**: read-back for validating written files
//!
//! # Example
//!
//! ```no_run
//! use parquet_encoder::{CompileOptions, FieldSpec, Schema, Writer};
//!
//! let schema = Schema::compile(
//!     vec![
//!         FieldSpec::new("uid", "string"),
//!         FieldSpec::new("code", "int").with_default("500"),
//!     ],
//!     &CompileOptions::from_env(),
//! )?;
//!
//! let file = std::fs::File::create("events.parquet")?;
//! let mut writer = Writer::new(file, schema)?;
//! writer.write_json(br#"{"uid": "us-1", "code": 104}"#)?;
//! writer.close()?;
//! # Ok::<(), parquet_encoder::ParquetError>(())
//! ```

pub mod column;
pub mod compression;
pub mod error;
pub mod file;
pub mod page;
pub mod pool;
pub mod reader;
pub mod row_group;
pub mod schema;
pub mod traits;
pub mod value;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use column::Statistics;
pub use compression::Codec;
pub use error::{ErrorContext, ParquetError, Result};
pub use reader::{ColumnChunkData, Reader, Row};
pub use schema::{
    parse_avro_fields, ColumnDescriptor, CompileOptions, FieldSpec, PhysicalType, Repetition,
    Schema, SchemaBuilder,
};
pub use value::{record_from_json, DynamicValue, Record};
pub use writer::{Writer, WriterBuilder, DEFAULT_PAGE_SIZE};
