use std::io::Write;

use parquet::file::writer::TrackedWrite;

use crate::column::ColumnBuffer;
use crate::file::FileAssembler;
use crate::page::PageWriter;
use crate::schema::Schema;
use crate::{Record, Result};

/// Buffers records across all columns and flushes them as row groups of
/// `page_size` records, one page per column.
#[derive(Debug)]
pub struct RowGroupCoordinator {
    columns: Vec<ColumnBuffer>,
    page_size: usize,
    buffered_rows: usize,
}

impl RowGroupCoordinator {
    pub fn new(schema: &Schema, page_size: usize) -> Self {
        Self {
            columns: schema
                .columns()
                .iter()
                .map(|c| c.allocate(page_size))
                .collect(),
            page_size,
            buffered_rows: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Records buffered since the last flush
    pub fn buffered_rows(&self) -> usize {
        self.buffered_rows
    }

    pub fn is_empty(&self) -> bool {
        self.buffered_rows == 0
    }

    pub fn is_full(&self) -> bool {
        self.buffered_rows >= self.page_size
    }

    pub fn columns(&self) -> &[ColumnBuffer] {
        &self.columns
    }

    /// Append one record to every column. Returns true once the row group
    /// has reached its size and should be flushed.
    pub fn write_record<R: Record + ?Sized>(&mut self, record: &R) -> Result<bool> {
        for column in &mut self.columns {
            column.append(record)?;
        }
        self.buffered_rows += 1;
        Ok(self.is_full())
    }

    /// Write one page per column, seal the row group and reset every buffer.
    /// Returns the number of rows flushed.
    pub fn flush<W: Write>(
        &mut self,
        sink: &mut TrackedWrite<W>,
        page_writer: &mut PageWriter,
        assembler: &mut FileAssembler,
    ) -> Result<usize> {
        let rows = self.buffered_rows;
        if rows == 0 {
            return Ok(0);
        }

        let result = self
            .columns
            .iter()
            .enumerate()
            .try_for_each(|(idx, column)| page_writer.write_page(sink, assembler, idx, column))
            .and_then(|()| assembler.finish_row_group(rows));
        self.reset();
        result.map(|()| rows)
    }

    fn reset(&mut self) {
        self.columns.iter_mut().for_each(ColumnBuffer::reset);
        self.buffered_rows = 0;
    }
}
