use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use serde::Deserialize;

use crate::extract::CandidateRecord;

/// Row terminator of the CSV output (RFC 4180).
pub const ROW_TERMINATOR: &str = "\r\n";

/// One timestamped data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub timestamp: String,
    pub record: CandidateRecord,
}

/// Append-only destination for the header and data rows. Implementations
/// must have handed each row to durable storage before returning.
pub trait RecordSink {
    fn write_header(&mut self, columns: &[&str]) -> io::Result<()>;
    fn write_row(&mut self, row: &OutputRow) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// A writer that can additionally push its data past the OS page cache.
pub trait DurableWrite: Write {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DurableWrite for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl DurableWrite for Vec<u8> {}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Truncate,
    Append,
}

/// Comma-delimited record writer. Every row is written in one call and
/// flushed before `write_row` returns.
pub struct CsvSink<W: DurableWrite> {
    writer: W,
    delimiter: char,
    sync_rows: bool,
    resumed: bool,
    rows_written: u64,
    line: String,
}

impl<W: DurableWrite> CsvSink<W> {
    pub fn new(writer: W, delimiter: char) -> Self {
        Self {
            writer,
            delimiter,
            sync_rows: false,
            resumed: false,
            rows_written: 0,
            line: String::new(),
        }
    }

    /// Also `sync` the writer after every row.
    pub fn with_sync(mut self, sync_rows: bool) -> Self {
        self.sync_rows = sync_rows;
        self
    }

    /// `true` when the sink appends to output that already holds rows.
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    /// Data rows written through this sink (the header is not counted).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn push_fields<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        self.line.clear();
        for (idx, field) in fields.into_iter().enumerate() {
            if idx > 0 {
                self.line.push(self.delimiter);
            }
            self.line.push_str(field);
        }
        self.line.push_str(ROW_TERMINATOR);
    }

    fn commit_line(&mut self) -> io::Result<()> {
        self.writer.write_all(self.line.as_bytes())?;
        self.writer.flush()?;
        if self.sync_rows {
            self.writer.sync()?;
        }
        Ok(())
    }
}

impl CsvSink<File> {
    /// Opens `path` for writing. In [`OutputMode::Append`] an existing
    /// non-empty file marks the sink as resumed.
    pub fn create(path: &Path, mode: OutputMode, delimiter: char) -> io::Result<Self> {
        let file = match mode {
            OutputMode::Truncate => File::create(path)?,
            OutputMode::Append => OpenOptions::new().create(true).append(true).open(path)?,
        };
        let resumed = mode == OutputMode::Append && file.metadata()?.len() > 0;
        let mut sink = Self::new(file, delimiter);
        sink.resumed = resumed;
        Ok(sink)
    }
}

impl<W: DurableWrite> RecordSink for CsvSink<W> {
    fn write_header(&mut self, columns: &[&str]) -> io::Result<()> {
        self.push_fields(columns.iter().copied());
        self.commit_line()
    }

    fn write_row(&mut self, row: &OutputRow) -> io::Result<()> {
        let values = row.record.values();
        let mut fields: Vec<&str> = Vec::with_capacity(values.len() + 1);
        fields.push(&row.timestamp);
        fields.extend(values.iter().map(String::as_str));
        self.push_fields(fields);
        self.commit_line()?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        if self.sync_rows {
            self.writer.sync()?;
        }
        Ok(())
    }
}
