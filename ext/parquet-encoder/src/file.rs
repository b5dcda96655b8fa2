//! File framing: magic markers, column chunk bookkeeping and the footer.

use std::io::Write;
use std::sync::Arc;

use parquet::file::writer::TrackedWrite;
use parquet::format::{
    ColumnChunk, ColumnMetaData, ConvertedType, DataPageHeader, Encoding, FileMetaData,
    PageHeader, PageType, RowGroup, SchemaElement,
};
use parquet::thrift::TSerializable;
use thrift::protocol::{TCompactInputProtocol, TCompactOutputProtocol};

use crate::column::Statistics;
use crate::compression::Codec;
use crate::schema::{PhysicalType, Schema};
use crate::{ParquetError, Result};

/// Marker at both ends of every file
pub const MAGIC: &[u8; 4] = b"PAR1";

/// Footer format version
pub const FORMAT_VERSION: i32 = 1;

/// Value of the footer's `created_by` field
pub const CREATED_BY: &str = concat!("parquet-encoder version ", env!("CARGO_PKG_VERSION"));

/// Append `value` to `out` in the thrift compact encoding, returning its length
pub fn write_thrift<T: TSerializable>(value: &T, out: &mut Vec<u8>) -> Result<usize> {
    let start = out.len();
    {
        let mut protocol = TCompactOutputProtocol::new(&mut *out);
        value.write_to_out_protocol(&mut protocol)?;
    }
    Ok(out.len() - start)
}

/// Decode one thrift compact struct from the front of `data`, returning it
/// with the number of bytes it took
pub fn read_thrift<T: TSerializable>(data: &[u8]) -> Result<(T, usize)> {
    let mut remaining = data;
    let value = {
        let mut protocol = TCompactInputProtocol::new(&mut remaining);
        T::read_from_in_protocol(&mut protocol)?
    };
    Ok((value, data.len() - remaining.len()))
}

/// Everything the footer needs to know about one written page
#[derive(Debug, Clone)]
pub struct PageSpec<'a> {
    pub column: usize,
    pub uncompressed_size: usize,
    pub compressed_size: usize,
    pub total_values: usize,
    pub codec: Codec,
    pub statistics: &'a Statistics,
}

#[derive(Debug, Clone, Default)]
struct ChunkState {
    data_page_offset: Option<i64>,
    total_compressed_size: i64,
    total_uncompressed_size: i64,
    num_values: i64,
    codec: Codec,
    pages: usize,
    statistics: Option<parquet::format::Statistics>,
}

/// Tracks where every page lands and writes the footer
#[derive(Debug)]
pub struct FileAssembler {
    schema: Arc<Schema>,
    chunks: Vec<ChunkState>,
    row_groups: Vec<RowGroup>,
    num_rows: i64,
    footer_written: bool,
}

impl FileAssembler {
    pub fn new(schema: Arc<Schema>) -> Self {
        let chunks = vec![ChunkState::default(); schema.len()];
        Self {
            schema,
            chunks,
            row_groups: Vec::new(),
            num_rows: 0,
            footer_written: false,
        }
    }

    pub fn write_magic<W: Write>(&self, sink: &mut TrackedWrite<W>) -> Result<()> {
        sink.write_all(MAGIC)?;
        Ok(())
    }

    /// Serialize and write the header of one data page, recording it
    /// against its column chunk. The caller writes the payload right after.
    pub fn write_page_header<W: Write>(
        &mut self,
        sink: &mut TrackedWrite<W>,
        page: &PageSpec<'_>,
        scratch: &mut Vec<u8>,
    ) -> Result<usize> {
        let stats = parquet::format::Statistics::from(page.statistics);
        let header = PageHeader {
            type_: PageType::DATA_PAGE,
            uncompressed_page_size: to_i32(page.uncompressed_size, "uncompressed page size")?,
            compressed_page_size: to_i32(page.compressed_size, "compressed page size")?,
            crc: None,
            data_page_header: Some(DataPageHeader {
                num_values: to_i32(page.total_values, "page value count")?,
                encoding: Encoding::PLAIN,
                definition_level_encoding: Encoding::RLE,
                repetition_level_encoding: Encoding::RLE,
                statistics: Some(stats.clone()),
            }),
            index_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: None,
        };

        scratch.clear();
        let header_len = write_thrift(&header, scratch)?;
        let offset = sink.bytes_written() as i64;
        sink.write_all(scratch)?;

        let chunk = self.chunks.get_mut(page.column).ok_or_else(|| {
            ParquetError::internal(format!("page written for unknown column {}", page.column))
        })?;
        chunk.data_page_offset.get_or_insert(offset);
        chunk.total_compressed_size += (header_len + page.compressed_size) as i64;
        chunk.total_uncompressed_size += (header_len + page.uncompressed_size) as i64;
        chunk.num_values += page.total_values as i64;
        chunk.codec = page.codec;
        chunk.pages += 1;
        // chunk statistics are only exact for single-page chunks
        chunk.statistics = (chunk.pages == 1).then_some(stats);

        Ok(header_len)
    }

    /// Seal the current row group. Nothing is recorded for an empty group.
    pub fn finish_row_group(&mut self, rows: usize) -> Result<()> {
        if rows == 0 {
            return Ok(());
        }

        let mut columns = Vec::with_capacity(self.chunks.len());
        let mut total_byte_size = 0;
        let mut total_compressed_size = 0;
        for (descriptor, chunk) in self.schema.columns().iter().zip(self.chunks.iter_mut()) {
            let state = std::mem::take(chunk);
            let data_page_offset = state.data_page_offset.ok_or_else(|| {
                ParquetError::internal(format!(
                    "column '{}' has no pages in row group {}",
                    descriptor.name(),
                    self.row_groups.len()
                ))
            })?;
            total_byte_size += state.total_uncompressed_size;
            total_compressed_size += state.total_compressed_size;
            let meta_data = ColumnMetaData::new(
                descriptor.physical_type().into(),
                vec![Encoding::PLAIN, Encoding::RLE],
                vec![descriptor.name().to_string()],
                state.codec.into(),
                state.num_values,
                state.total_uncompressed_size,
                state.total_compressed_size,
                None,
                data_page_offset,
                None,
                None,
                state.statistics,
                None,
                None,
                None,
                None,
            );
            columns.push(ColumnChunk::new(
                None,
                data_page_offset,
                meta_data,
                None,
                None,
                None,
                None,
                None,
                None,
            ));
        }

        let ordinal = i16::try_from(self.row_groups.len()).ok();
        let file_offset = columns.first().map(|c| c.file_offset);
        self.row_groups.push(RowGroup::new(
            columns,
            total_byte_size,
            rows as i64,
            None,
            file_offset,
            total_compressed_size,
            ordinal,
        ));
        self.num_rows += rows as i64;

        log::debug!(
            "sealed row group {} with {} rows ({} bytes compressed)",
            self.row_groups.len() - 1,
            rows,
            total_compressed_size
        );
        Ok(())
    }

    pub fn row_groups(&self) -> &[RowGroup] {
        &self.row_groups
    }

    pub fn num_rows(&self) -> i64 {
        self.num_rows
    }

    /// The footer as it would be written now
    pub fn file_metadata(&self) -> FileMetaData {
        FileMetaData::new(
            FORMAT_VERSION,
            schema_elements(&self.schema),
            self.num_rows,
            self.row_groups.clone(),
            None,
            CREATED_BY.to_string(),
            None,
            None,
            None,
        )
    }

    /// Write the footer, its length and the trailing magic
    pub fn write_footer<W: Write>(&mut self, sink: &mut TrackedWrite<W>) -> Result<()> {
        if self.footer_written {
            return Err(ParquetError::invalid_state("footer already written"));
        }

        let mut footer = Vec::new();
        let len = write_thrift(&self.file_metadata(), &mut footer)?;
        let len = u32::try_from(len)
            .map_err(|_| ParquetError::internal(format!("footer of {} bytes is too large", len)))?;
        sink.write_all(&footer)?;
        sink.write_all(&len.to_le_bytes())?;
        sink.write_all(MAGIC)?;
        self.footer_written = true;

        log::debug!(
            "wrote footer: {} rows in {} row groups, {} footer bytes",
            self.num_rows,
            self.row_groups.len(),
            len
        );
        Ok(())
    }
}

fn to_i32(v: usize, what: &str) -> Result<i32> {
    i32::try_from(v).map_err(|_| ParquetError::internal(format!("{} {} overflows i32", what, v)))
}

/// Root element followed by one leaf per column
pub fn schema_elements(schema: &Schema) -> Vec<SchemaElement> {
    let mut elements = Vec::with_capacity(schema.len() + 1);
    elements.push(SchemaElement::new(
        None,
        None,
        None,
        schema.name().to_string(),
        schema.len() as i32,
        None,
        None,
        None,
        None,
        None,
    ));
    for column in schema.columns() {
        let converted_type = (column.physical_type() == PhysicalType::ByteArray)
            .then_some(ConvertedType::UTF8);
        elements.push(SchemaElement::new(
            parquet::format::Type::from(column.physical_type()),
            None,
            parquet::format::FieldRepetitionType::from(column.repetition()),
            column.name().to_string(),
            None,
            converted_type,
            None,
            None,
            None,
            None,
        ));
    }
    elements
}
