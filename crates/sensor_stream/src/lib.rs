#![forbid(unsafe_code)]
//! Classification and recovery engine for noisy, line-oriented sensor streams.
//!
//! The crate turns an unreliable sequence of device lines (boot banners, debug
//! chatter, partial frames, real measurements) into schema-stable CSV rows:
//! - [`LineSplitter`] / [`SyncBoundedLineReader`] bound and split raw bytes,
//!   decoding lossily so a corrupted byte never stops the stream.
//! - [`Classifier`] sorts each line into header, noise, candidate or
//!   unrecognized.
//! - [`extract`] realigns a candidate on the first full-width numeric run.
//! - [`Ingestor`] sequences the header, stamps and flushes every record, and
//!   emits periodic [`Diagnostic::Summary`] lines.
//!
//! Transport handling and the operator command relay live in the
//! `sensor_logger` crate.

mod classify;
mod config;
mod diagnostics;
mod error;
mod extract;
mod pipeline;
mod reader;
mod schema;
mod session;
mod sink;

pub use classify::{clean_line, is_numeric, Classifier, LineClass, NoiseDenylist, ShapeTolerance};
pub use config::{ConfigError, IngestConfig, SchemaConfig};
pub use diagnostics::{ConsoleDiagnostics, Diagnostic, DiagnosticSink};
pub use error::IngestError;
pub use extract::{extract, CandidateRecord};
pub use pipeline::{IngestStats, Ingestor, LineOutcome, SessionReport};
pub use reader::{BoundedLine, LineSplitter, RawLine, SyncBoundedLineReader};
pub use schema::{
    FieldName, FieldSchema, SchemaError, DEFAULT_DELIMITER, IMU_GPS_FIELDS, SUPPORTED_DELIMITERS,
    TIMESTAMP_COLUMN,
};
pub use session::{Clock, ManualClock, SessionPhase, SessionState, SystemClock, WindowSummary};
pub use sink::{CsvSink, DurableWrite, OutputMode, OutputRow, RecordSink, ROW_TERMINATOR};
