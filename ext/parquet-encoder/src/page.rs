use std::io::Write;

use parquet::file::writer::TrackedWrite;
use parquet::format::{Encoding, PageHeader, PageType};

use crate::column::{ColumnBuffer, ColumnValues, LevelEncoder};
use crate::compression::{decompress, Codec, Compressor};
use crate::file::{read_thrift, FileAssembler, PageSpec};
use crate::pool::{Scratch, ScratchPool};
use crate::schema::ColumnDescriptor;
use crate::{ParquetError, Result};

/// Encodes buffered columns into data pages and writes them out
#[derive(Debug, Default)]
pub struct PageWriter {
    compressor: Compressor,
    pool: ScratchPool,
}

impl PageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> &ScratchPool {
        &self.pool
    }

    /// Write everything in `buffer` as one page of column `column`.
    ///
    /// Payload layout is `[def levels][rep levels][values]`; level blocks are
    /// only present for columns whose max level is non-zero.
    pub fn write_page<W: Write>(
        &mut self,
        sink: &mut TrackedWrite<W>,
        assembler: &mut FileAssembler,
        column: usize,
        buffer: &ColumnBuffer,
    ) -> Result<()> {
        let descriptor = buffer.descriptor();
        let mut payload = self.pool.get(Scratch::Payload);

        if descriptor.max_def_level() > 0 {
            LevelEncoder::for_max_level(descriptor.max_def_level())
                .encode(buffer.def_levels(), &mut payload);
        }
        if descriptor.max_rep_level() > 0 {
            LevelEncoder::for_max_level(descriptor.max_rep_level())
                .encode(buffer.rep_levels(), &mut payload);
        }
        buffer.values().encode_plain(&mut payload);

        let mut scratch = self.pool.get(Scratch::Compressed);
        let compressed = self
            .compressor
            .compress(descriptor.codec(), &payload, &mut scratch)?;

        let statistics = buffer.statistics();
        let spec = PageSpec {
            column,
            uncompressed_size: compressed.uncompressed_len,
            compressed_size: compressed.compressed_len,
            total_values: buffer.slots(),
            codec: descriptor.codec(),
            statistics: &statistics,
        };

        let mut header = self.pool.get(Scratch::Header);
        let header_len = assembler.write_page_header(sink, &spec, &mut header)?;
        sink.write_all(compressed.bytes)?;

        log::trace!(
            "column '{}': page of {} values ({} non-null), {} header + {} payload bytes ({} uncompressed, {})",
            descriptor.name(),
            spec.total_values,
            buffer.non_null_values(),
            header_len,
            spec.compressed_size,
            spec.uncompressed_size,
            spec.codec.name()
        );
        Ok(())
    }
}

/// One data page decoded back into levels and values
#[derive(Debug, Clone)]
pub struct DecodedPage {
    pub header: PageHeader,
    pub def_levels: Vec<u8>,
    pub rep_levels: Vec<u8>,
    pub values: ColumnValues,
    pub def_levels_byte_len: usize,
    pub rep_levels_byte_len: usize,
    /// Header plus payload bytes taken from the input
    pub consumed: usize,
}

impl DecodedPage {
    pub fn num_values(&self) -> usize {
        self.header
            .data_page_header
            .as_ref()
            .map_or(0, |h| h.num_values.max(0) as usize)
    }
}

fn non_negative(v: i32, what: &str) -> Result<usize> {
    usize::try_from(v).map_err(|_| ParquetError::corrupt(format!("negative {}: {}", what, v)))
}

/// Parse one page from the front of `data`
pub fn read_page(data: &[u8], codec: Codec, descriptor: &ColumnDescriptor) -> Result<DecodedPage> {
    let (header, header_len) = read_thrift::<PageHeader>(data)?;
    if header.type_ != PageType::DATA_PAGE {
        return Err(ParquetError::unsupported(format!(
            "page type {} in column '{}'",
            header.type_.0,
            descriptor.name()
        )));
    }
    let data_header = header
        .data_page_header
        .as_ref()
        .ok_or_else(|| ParquetError::corrupt("data page without a data page header"))?;
    if data_header.encoding != Encoding::PLAIN {
        return Err(ParquetError::unsupported(format!(
            "value encoding {} in column '{}'",
            data_header.encoding.0,
            descriptor.name()
        )));
    }

    let compressed_size = non_negative(header.compressed_page_size, "compressed page size")?;
    let uncompressed_size = non_negative(header.uncompressed_page_size, "uncompressed page size")?;
    let total_values = non_negative(data_header.num_values, "page value count")?;
    let end = header_len + compressed_size;
    let body = data.get(header_len..end).ok_or_else(|| {
        ParquetError::corrupt(format!(
            "page declares {} payload bytes, only {} available",
            compressed_size,
            data.len().saturating_sub(header_len)
        ))
    })?;
    let payload = decompress(codec, body, uncompressed_size)?;

    let mut pos = 0;
    let (def_levels, def_levels_byte_len) = match descriptor.max_def_level() {
        0 => (Vec::new(), 0),
        max => LevelEncoder::for_max_level(max).decode(&payload, total_values)?,
    };
    pos += def_levels_byte_len;
    let (rep_levels, rep_levels_byte_len) = match descriptor.max_rep_level() {
        0 => (Vec::new(), 0),
        max => LevelEncoder::for_max_level(max).decode(&payload[pos..], total_values)?,
    };
    pos += rep_levels_byte_len;

    let non_null = match descriptor.max_def_level() {
        0 => total_values,
        max => def_levels.iter().filter(|&&d| d == max).count(),
    };
    let (values, _) = ColumnValues::decode_plain(descriptor.physical_type(), &payload[pos..], non_null)?;

    Ok(DecodedPage {
        header,
        def_levels,
        rep_levels,
        values,
        def_levels_byte_len,
        rep_levels_byte_len,
        consumed: end,
    })
}
