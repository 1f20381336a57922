use std::io;

use thiserror::Error;

/// Failures that end an ingestion session. Per-line problems (noise, parse
/// failures, oversized lines) are reported as diagnostics instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to write {what} to record sink: {source}")]
    Sink {
        what: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to format record timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("I/O error while reading line {line_number}: {source}")]
    Read {
        line_number: usize,
        #[source]
        source: io::Error,
    },
}
