//! Per-column buffering and encoding
//!
//! A [`ColumnBuffer`] accumulates one column's values, definition and
//! repetition levels, and statistics until its row group is flushed. The
//! pieces it is built from live in the submodules:
//!
//! - [`coerce`]: converting loosely-typed input to the column's physical type
//! - [`levels`]: the RLE/bit-packed hybrid used for level streams
//! - [`values`]: typed value arrays and their PLAIN encoding
//! - [`stats`]: min/max/null-count tracking

pub mod buffer;
pub mod coerce;
pub mod levels;
pub mod stats;
pub mod values;

pub use buffer::ColumnBuffer;
pub use levels::LevelEncoder;
pub use stats::{Statistics, StatisticsCollector};
pub use values::{ColumnValues, TypedValue};
