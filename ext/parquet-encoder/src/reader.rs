//! Read-back of files produced by [`crate::Writer`]
//!
//! This is a validation reader: it parses the footer, walks every page of a
//! column chunk and rebuilds rows. It does not do projection or filtering.

use bytes::Bytes;
use indexmap::IndexMap;
use parquet::format::{ColumnMetaData, FileMetaData};
use std::sync::Arc;

use crate::column::TypedValue;
use crate::compression::Codec;
use crate::file::{read_thrift, MAGIC};
use crate::page::read_page;
use crate::schema::{ColumnDescriptor, PhysicalType, Repetition, FALLBACK_DEFAULT_NUMBER};
use crate::{DynamicValue, ErrorContext, ParquetError, Result, Schema};

/// Fixed bytes around the footer: leading magic, footer length, trailing magic
const FRAMING_LEN: usize = 12;

/// One row of a file
pub type Row = IndexMap<Arc<str>, DynamicValue>;

/// Decoded contents of one column chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunkData {
    /// One entry per row; `Null` for null slots, `List` for repeated columns
    pub rows: Vec<DynamicValue>,
    pub def_levels: Vec<u8>,
    pub rep_levels: Vec<u8>,
    pub pages: usize,
}

/// In-memory reader over a complete file
#[derive(Debug, Clone)]
pub struct Reader {
    data: Bytes,
    metadata: FileMetaData,
    schema: Schema,
}

impl Reader {
    /// Validate the magic markers and parse the footer
    pub fn new(data: Bytes) -> Result<Self> {
        if data.len() < FRAMING_LEN {
            return Err(ParquetError::corrupt(format!(
                "file of {} bytes is too short",
                data.len()
            )));
        }
        if &data[..4] != MAGIC {
            return Err(ParquetError::corrupt("missing leading magic"));
        }
        if &data[data.len() - 4..] != MAGIC {
            return Err(ParquetError::corrupt("missing trailing magic"));
        }

        let mut len = [0u8; 4];
        len.copy_from_slice(&data[data.len() - 8..data.len() - 4]);
        let footer_len = u32::from_le_bytes(len) as usize;
        if footer_len > data.len() - FRAMING_LEN {
            return Err(ParquetError::corrupt(format!(
                "footer length {} exceeds file size {}",
                footer_len,
                data.len()
            )));
        }
        let footer_start = data.len() - 8 - footer_len;
        let (metadata, _) = read_thrift::<FileMetaData>(&data[footer_start..data.len() - 8])
            .context("Reading footer")?;
        let schema = schema_from_metadata(&metadata)?;

        Ok(Self {
            data,
            metadata,
            schema,
        })
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn num_rows(&self) -> i64 {
        self.metadata.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.row_groups.len()
    }

    /// Columns as declared in the footer. Defaults are not stored in files,
    /// so every column carries its type fallback.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn created_by(&self) -> Option<&str> {
        self.metadata.created_by.as_deref()
    }

    fn column_meta(&self, row_group: usize, column: usize) -> Result<&ColumnMetaData> {
        let group = self.metadata.row_groups.get(row_group).ok_or_else(|| {
            ParquetError::invalid_argument(format!(
                "row group {} out of range ({} row groups)",
                row_group,
                self.num_row_groups()
            ))
        })?;
        let chunk = group.columns.get(column).ok_or_else(|| {
            ParquetError::invalid_argument(format!(
                "column {} out of range ({} columns)",
                column,
                group.columns.len()
            ))
        })?;
        chunk
            .meta_data
            .as_ref()
            .ok_or_else(|| ParquetError::unsupported("column chunk metadata stored out of line"))
    }

    /// Decode every page of one column chunk
    pub fn read_column(&self, row_group: usize, column: usize) -> Result<ColumnChunkData> {
        let meta = self.column_meta(row_group, column)?;
        let descriptor = self.schema.column(column).ok_or_else(|| {
            ParquetError::corrupt(format!("column {} missing from schema", column))
        })?;
        let codec = Codec::try_from(meta.codec)?;
        let num_values = usize::try_from(meta.num_values)
            .map_err(|_| ParquetError::corrupt("negative column value count"))?;

        let mut pos = usize::try_from(meta.data_page_offset)
            .map_err(|_| ParquetError::corrupt("negative data page offset"))?;
        let limit = self.data.len() - 8;
        let mut def_levels = Vec::with_capacity(num_values);
        let mut rep_levels = Vec::new();
        let mut values = Vec::with_capacity(num_values);
        let mut slots = 0;
        let mut pages = 0;

        while slots < num_values {
            let window = self.data.get(pos..limit).ok_or_else(|| {
                ParquetError::corrupt(format!("page offset {} is outside the file", pos))
            })?;
            let page = read_page(window, codec, descriptor).with_context(|| {
                format!(
                    "Reading page {} of column '{}' in row group {}",
                    pages,
                    descriptor.name(),
                    row_group
                )
            })?;
            if page.num_values() == 0 {
                return Err(ParquetError::corrupt("page with no values"));
            }

            slots += page.num_values();
            pos += page.consumed;
            pages += 1;
            def_levels.extend_from_slice(&page.def_levels);
            rep_levels.extend_from_slice(&page.rep_levels);
            values.extend((0..page.values.len()).filter_map(|i| page.values.get(i)));
        }

        let rows = assemble_rows(descriptor, slots, &def_levels, &rep_levels, values)?;
        Ok(ColumnChunkData {
            rows,
            def_levels,
            rep_levels,
            pages,
        })
    }

    /// Iterate all rows of all row groups
    pub fn read_rows(&self) -> RowIterator<'_> {
        RowIterator {
            reader: self,
            row_group: 0,
            pending: Vec::new().into_iter(),
            failed: false,
        }
    }
}

fn assemble_rows(
    descriptor: &ColumnDescriptor,
    slots: usize,
    def_levels: &[u8],
    rep_levels: &[u8],
    values: Vec<TypedValue>,
) -> Result<Vec<DynamicValue>> {
    let mut values = values.into_iter().map(DynamicValue::from);
    let mut next_value = || {
        values
            .next()
            .ok_or_else(|| ParquetError::corrupt("fewer values than defined levels"))
    };

    match descriptor.repetition() {
        Repetition::Required => (0..slots).map(|_| next_value()).collect(),
        Repetition::Optional => def_levels
            .iter()
            .map(|&def| match def {
                0 => Ok(DynamicValue::Null),
                _ => next_value(),
            })
            .collect(),
        Repetition::Repeated => {
            let mut rows = Vec::new();
            for (&def, &rep) in def_levels.iter().zip(rep_levels) {
                if rep == 0 {
                    rows.push(Vec::new());
                }
                if def > 0 {
                    let value = next_value()?;
                    rows.last_mut()
                        .ok_or_else(|| ParquetError::corrupt("list continues before it starts"))?
                        .push(value);
                }
            }
            Ok(rows.into_iter().map(DynamicValue::List).collect())
        }
    }
}

/// Rebuild column descriptors from the footer's flat schema
fn schema_from_metadata(metadata: &FileMetaData) -> Result<Schema> {
    let (root, leaves) = metadata
        .schema
        .split_first()
        .ok_or_else(|| ParquetError::corrupt("footer has an empty schema"))?;
    if root.num_children.map(|n| n as usize) != Some(leaves.len()) {
        return Err(ParquetError::unsupported(
            "only flat schemas with one level of columns can be read",
        ));
    }

    let codecs = metadata.row_groups.first().map(|g| &g.columns);
    let columns = leaves
        .iter()
        .enumerate()
        .map(|(idx, element)| {
            let type_id = element.type_.ok_or_else(|| {
                ParquetError::unsupported(format!("group column '{}'", element.name))
            })?;
            let physical_type = PhysicalType::try_from(type_id)?;
            let repetition = element
                .repetition_type
                .map(Repetition::try_from)
                .transpose()?
                .unwrap_or_default();
            let codec = codecs
                .and_then(|columns| columns.get(idx))
                .and_then(|chunk| chunk.meta_data.as_ref())
                .map(|meta| Codec::try_from(meta.codec))
                .transpose()?
                .unwrap_or(Codec::Uncompressed);
            let default = match repetition {
                Repetition::Optional => None,
                Repetition::Required | Repetition::Repeated => {
                    Some(TypedValue::fallback(physical_type, FALLBACK_DEFAULT_NUMBER))
                }
            };
            Ok(ColumnDescriptor::new(
                Arc::from(element.name.as_str()),
                physical_type,
                repetition,
                default,
                codec,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Schema::from_columns(root.name.clone(), columns))
}

/// Iterator over the rows of a [`Reader`], one row group decoded at a time
pub struct RowIterator<'a> {
    reader: &'a Reader,
    row_group: usize,
    pending: std::vec::IntoIter<Row>,
    failed: bool,
}

impl RowIterator<'_> {
    fn load_row_group(&mut self, row_group: usize) -> Result<Vec<Row>> {
        let schema = self.reader.schema();
        let columns = (0..schema.len())
            .map(|col| self.reader.read_column(row_group, col))
            .collect::<Result<Vec<_>>>()?;
        let num_rows = usize::try_from(self.reader.metadata.row_groups[row_group].num_rows)
            .map_err(|_| ParquetError::corrupt("negative row count"))?;

        for (descriptor, column) in schema.columns().iter().zip(&columns) {
            if column.rows.len() != num_rows {
                return Err(ParquetError::corrupt(format!(
                    "column '{}' has {} rows, row group {} declares {}",
                    descriptor.name(),
                    column.rows.len(),
                    row_group,
                    num_rows
                )));
            }
        }

        let mut iters: Vec<_> = columns.into_iter().map(|c| c.rows.into_iter()).collect();
        let rows = (0..num_rows)
            .map(|_| {
                schema
                    .columns()
                    .iter()
                    .zip(iters.iter_mut())
                    .map(|(descriptor, values)| {
                        (
                            descriptor.name_arc().clone(),
                            values.next().unwrap_or(DynamicValue::Null),
                        )
                    })
                    .collect()
            })
            .collect();
        Ok(rows)
    }
}

impl Iterator for RowIterator<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            if let Some(row) = self.pending.next() {
                return Some(Ok(row));
            }
            if self.row_group >= self.reader.num_row_groups() {
                return None;
            }

            let row_group = self.row_group;
            self.row_group += 1;
            match self.load_row_group(row_group) {
                Ok(rows) => self.pending = rows.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test::*;
    use parquet::format::CompressionCodec;
    use crate::{Writer, WriterBuilder};

    fn write(records: &[Row], page_size: usize) -> Bytes {
        let mut writer = WriterBuilder::new()
            .with_page_size(page_size)
            .build(Vec::new(), event_schema())
            .unwrap();
        for record in records {
            writer.write_record(record).unwrap();
        }
        Bytes::from(writer.close().unwrap())
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = write(&event_records(3), 10).to_vec();
        bytes[0] = b'X';
        assert!(matches!(
            Reader::new(Bytes::from(bytes.clone())),
            Err(ParquetError::Corrupt(_))
        ));
        bytes[0] = b'P';
        let last = bytes.len() - 1;
        bytes[last] = b'0';
        assert!(Reader::new(Bytes::from(bytes)).is_err());
        assert!(Reader::new(Bytes::from_static(b"PAR1PAR1")).is_err());
    }

    #[test]
    fn test_schema_rebuilt_from_footer() {
        let reader = Reader::new(write(&event_records(3), 10)).unwrap();
        let names: Vec<_> = reader.schema().columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["uid", "did", "code", "type", "time"]);
        assert_eq!(
            reader.schema().column(2).unwrap().physical_type(),
            PhysicalType::Int32
        );
        assert_eq!(reader.created_by(), Some(crate::file::CREATED_BY));
    }

    #[test]
    fn test_read_column() {
        let reader = Reader::new(write(&event_records(5), 10)).unwrap();
        let uid = reader.read_column(0, 0).unwrap();
        assert_eq!(uid.pages, 1);
        assert_eq!(uid.rows[4], DynamicValue::from("us-4"));
        assert!(reader.read_column(1, 0).is_err());
        assert!(reader.read_column(0, 9).is_err());
    }

    #[test]
    fn test_unsupported_codec_on_read() {
        let bytes = write(&event_records(2), 10);
        let mut reader = Reader::new(bytes).unwrap();
        reader.metadata.row_groups[0].columns[0]
            .meta_data
            .as_mut()
            .unwrap()
            .codec = CompressionCodec::ZSTD;
        assert!(matches!(reader.read_column(0, 0), Err(ParquetError::Codec(_))));
    }

    #[test]
    fn test_empty_file() {
        let writer = Writer::new(Vec::new(), event_schema()).unwrap();
        let reader = Reader::new(Bytes::from(writer.close().unwrap())).unwrap();
        assert_eq!(reader.num_rows(), 0);
        assert_eq!(reader.num_row_groups(), 0);
        assert_eq!(reader.read_rows().count(), 0);
    }
}
