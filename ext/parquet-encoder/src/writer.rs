//! Record-at-a-time file writer

use std::io::Write;
use std::sync::Arc;

use indexmap::IndexMap;
use parquet::file::writer::TrackedWrite;

use crate::file::FileAssembler;
use crate::page::PageWriter;
use crate::row_group::RowGroupCoordinator;
use crate::value::record_from_json;
use crate::{DynamicValue, ParquetError, Record, Result, Schema};

/// Records per row group unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Builder for creating a configured Writer
#[derive(Debug, Clone)]
pub struct WriterBuilder {
    page_size: usize,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many records are buffered before a row group is written
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Build a Writer with the configured settings. The leading magic is
    /// written immediately.
    pub fn build<W: Write>(self, sink: W, schema: Schema) -> Result<Writer<W>> {
        Writer::try_new(sink, schema, self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Finished,
    Failed,
}

/// Streams records into a columnar file on any [`Write`] sink.
///
/// Records are buffered per column and written as one row group every
/// `page_size` records. Call [`Writer::finish`] or [`Writer::close`] to
/// write the remaining rows and the footer; a writer dropped before that
/// leaves an incomplete file.
pub struct Writer<W: Write> {
    sink: TrackedWrite<W>,
    schema: Arc<Schema>,
    row_group: RowGroupCoordinator,
    assembler: FileAssembler,
    page_writer: PageWriter,
    rows_written: u64,
    state: State,
}

impl<W: Write> Writer<W> {
    /// Create a new writer with default settings
    pub fn new(sink: W, schema: Schema) -> Result<Self> {
        WriterBuilder::new().build(sink, schema)
    }

    pub fn try_new(sink: W, schema: Schema, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(ParquetError::invalid_argument(
                "page size must be at least one record",
            ));
        }

        let schema = Arc::new(schema);
        let mut sink = TrackedWrite::new(sink);
        let assembler = FileAssembler::new(schema.clone());
        assembler.write_magic(&mut sink)?;

        log::debug!(
            "opened writer: {} columns, {} records per row group",
            schema.len(),
            page_size
        );

        Ok(Self {
            sink,
            row_group: RowGroupCoordinator::new(&schema, page_size),
            assembler,
            page_writer: PageWriter::new(),
            rows_written: 0,
            state: State::Open,
            schema,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Records accepted so far, buffered ones included
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Row groups already written to the sink
    pub fn row_groups_written(&self) -> usize {
        self.assembler.row_groups().len()
    }

    /// Bytes written to the sink so far
    pub fn bytes_written(&self) -> usize {
        self.sink.bytes_written()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Finished => Err(ParquetError::invalid_state("writer is already closed")),
            State::Failed => Err(ParquetError::invalid_state(
                "writer failed earlier and the file is incomplete",
            )),
        }
    }

    fn poison_on_err<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = State::Failed;
        }
        result
    }

    /// Write one record. Missing or unconvertible fields fall back to their
    /// column defaults, so this only fails when the sink does.
    pub fn write_record<R: Record + ?Sized>(&mut self, record: &R) -> Result<()> {
        self.ensure_open()?;

        let full = self.row_group.write_record(record);
        let full = self.poison_on_err(full)?;
        self.rows_written += 1;

        if full {
            let flushed = self.flush_row_group();
            self.poison_on_err(flushed)?;
        }
        Ok(())
    }

    /// Write a batch of records
    pub fn write_records<I, R>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: Record,
    {
        for record in records {
            self.write_record(&record)?;
        }
        Ok(())
    }

    /// Decode a JSON object and write it as a record. Input that is not a
    /// JSON object is logged and written as a row of defaults.
    pub fn write_json(&mut self, json: &[u8]) -> Result<()> {
        let record = match record_from_json(json) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("writing default row for malformed JSON record: {}", e);
                IndexMap::<Arc<str>, DynamicValue>::new()
            }
        };
        self.write_record(&record)
    }

    fn flush_row_group(&mut self) -> Result<usize> {
        self.row_group
            .flush(&mut self.sink, &mut self.page_writer, &mut self.assembler)
    }

    /// Write any buffered rows, the footer and the trailing magic, then
    /// flush the sink. Calling this again after success does nothing.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            State::Finished => return Ok(()),
            State::Failed => self.ensure_open()?,
            State::Open => {}
        }

        let result = self.finish_inner();
        self.poison_on_err(result)?;
        self.state = State::Finished;

        log::debug!(
            "closed writer: {} rows, {} row groups, {} bytes",
            self.rows_written,
            self.assembler.row_groups().len(),
            self.sink.bytes_written()
        );
        Ok(())
    }

    fn finish_inner(&mut self) -> Result<()> {
        if !self.row_group.is_empty() {
            self.flush_row_group()?;
        }
        self.assembler.write_footer(&mut self.sink)?;
        self.sink.flush()?;
        Ok(())
    }

    /// Finish the file and return the sink
    pub fn close(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.sink.into_inner()?)
    }

    pub fn inner(&self) -> &W {
        self.sink.inner()
    }
}
