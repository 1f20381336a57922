use std::fmt;
use std::io::Write;
use std::sync::mpsc;

use crate::classify::LineClass;
use crate::session::WindowSummary;

/// Human-readable side channel of the logger. One diagnostic renders as one
/// console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Noise or unrecognized device output, passed through verbatim.
    Device { class: LineClass, line: String },
    /// A candidate line that did not yield a full record.
    ParseError { line: String },
    HeaderWritten { columns: usize },
    Discarded {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    Summary(WindowSummary),
    Sent { command: String },
    SendFailed { command: String, message: String },
    Final {
        total_records: u64,
        window_records: u64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Device { line, .. } => write!(f, "[DEVICE] {line}"),
            Diagnostic::ParseError { line } => write!(f, "[PARSE ERROR] {line}"),
            Diagnostic::HeaderWritten { columns } => {
                write!(f, "[HEADER] schema header written ({columns} columns)")
            }
            Diagnostic::Discarded {
                line_number,
                observed_bytes,
                max_line_bytes,
            } => write!(
                f,
                "[DISCARDED] line {line_number}: {observed_bytes} bytes exceeds limit of {max_line_bytes}"
            ),
            Diagnostic::Summary(summary) => write!(
                f,
                "[SUMMARY] {} records in last {:?}",
                summary.records, summary.interval
            ),
            Diagnostic::Sent { command } => write!(f, "[SENT] {command}"),
            Diagnostic::SendFailed { command, message } => {
                write!(f, "[SEND ERROR] {command}: {message}")
            }
            Diagnostic::Final {
                total_records,
                window_records,
            } => write!(
                f,
                "[FINAL] {total_records} records logged this session ({window_records} since last summary)"
            ),
        }
    }
}

pub trait DiagnosticSink: Send {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Writes each diagnostic as a line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDiagnostics;

impl DiagnosticSink for ConsoleDiagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not take the ingestion loop down with it.
        let _ = writeln!(out, "{diagnostic}");
        let _ = out.flush();
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &mut T {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl DiagnosticSink for mpsc::Sender<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let _ = self.send(diagnostic);
    }
}
