use std::io::Read;

use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

use crate::classify::{clean_line, Classifier, LineClass};
use crate::config::IngestConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::IngestError;
use crate::extract::{extract_cleaned, CandidateRecord};
use crate::reader::{BoundedLine, RawLine, SyncBoundedLineReader};
use crate::schema::FieldSchema;
use crate::session::{Clock, SessionState, SystemClock, WindowSummary};
use crate::sink::{OutputRow, RecordSink};

/// What happened to one line handed to [`Ingestor`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LineOutcome {
    Blank,
    HeaderWritten,
    HeaderRepeated,
    RecordWritten,
    ParseError,
    Noise,
    Unrecognized,
    Discarded,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct IngestStats {
    /// Non-blank lines processed, including discarded ones.
    pub lines: u64,
    pub records: u64,
    pub parse_errors: u64,
    pub device_lines: u64,
    pub repeated_headers: u64,
    pub discarded: u64,
    pub lossy_lines: u64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SessionReport {
    pub total_records: u64,
    /// Records counted since the last summary was emitted.
    pub window_records: u64,
    pub stats: IngestStats,
}

/// The ingestion path: classifies each line, realigns candidate records,
/// sequences the header and writes flushed rows to the sink.
pub struct Ingestor<S, D, C = SystemClock> {
    schema: FieldSchema,
    classifier: Classifier,
    session: SessionState,
    sink: S,
    diagnostics: D,
    clock: C,
    stats: IngestStats,
    max_line_bytes: usize,
}

impl<S: RecordSink, D: DiagnosticSink, C: Clock> Ingestor<S, D, C> {
    pub fn new(
        schema: FieldSchema,
        config: &IngestConfig,
        sink: S,
        diagnostics: D,
        clock: C,
    ) -> Self {
        let classifier = Classifier::new(&schema, config.denylist(), config.tolerance());
        let session = SessionState::new(config.summary_interval(), clock.monotonic());
        Self {
            schema,
            classifier,
            session,
            sink,
            diagnostics,
            clock,
            stats: IngestStats::default(),
            max_line_bytes: config.max_line_bytes,
        }
    }

    /// Starts in the streaming phase because the sink already holds a header.
    pub fn resume_existing_output(&mut self) {
        self.session.mark_header_emitted();
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    pub fn process_bounded(&mut self, line: BoundedLine) -> Result<LineOutcome, IngestError> {
        match line {
            BoundedLine::Line { line_number, bytes } => {
                let raw = RawLine::decode(line_number, &bytes);
                if raw.lossy {
                    self.stats.lossy_lines += 1;
                    debug!(line_number, "replaced invalid UTF-8 in device line");
                }
                self.process_line(&raw.text)
            }
            BoundedLine::LineTooLong {
                line_number,
                observed_bytes,
                max_line_bytes,
            } => {
                self.stats.lines += 1;
                self.stats.discarded += 1;
                warn!(
                    line_number,
                    observed_bytes, max_line_bytes, "discarding oversized device line"
                );
                self.diagnostics.emit(Diagnostic::Discarded {
                    line_number,
                    observed_bytes,
                    max_line_bytes,
                });
                self.poll_summary();
                Ok(LineOutcome::Discarded)
            }
        }
    }

    /// Handles one decoded line. Only sink and timestamp failures are
    /// returned as errors; everything else is contained at the line.
    pub fn process_line(&mut self, line: &str) -> Result<LineOutcome, IngestError> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.chars().all(|ch| ch.is_whitespace()) {
            return Ok(LineOutcome::Blank);
        }
        self.stats.lines += 1;

        let cleaned = clean_line(line);
        let class = self.classifier.classify_cleaned(&cleaned);
        debug!(?class, "classified device line");

        let outcome = match class {
            LineClass::Header => self.handle_header()?,
            LineClass::Candidate => match extract_cleaned(&cleaned, &self.schema) {
                Some(record) => {
                    self.write_record(record)?;
                    LineOutcome::RecordWritten
                }
                None => {
                    self.stats.parse_errors += 1;
                    self.diagnostics.emit(Diagnostic::ParseError {
                        line: line.trim().to_string(),
                    });
                    LineOutcome::ParseError
                }
            },
            LineClass::Noise | LineClass::Unrecognized => {
                self.stats.device_lines += 1;
                self.diagnostics.emit(Diagnostic::Device {
                    class,
                    line: line.trim().to_string(),
                });
                if class == LineClass::Noise {
                    LineOutcome::Noise
                } else {
                    LineOutcome::Unrecognized
                }
            }
        };

        self.poll_summary();
        Ok(outcome)
    }

    fn handle_header(&mut self) -> Result<LineOutcome, IngestError> {
        if self.session.header_emitted() {
            self.stats.repeated_headers += 1;
            return Ok(LineOutcome::HeaderRepeated);
        }
        let columns = self.schema.header_columns();
        self.sink
            .write_header(&columns)
            .map_err(|source| IngestError::Sink {
                what: "header",
                source,
            })?;
        self.session.mark_header_emitted();
        self.diagnostics.emit(Diagnostic::HeaderWritten {
            columns: columns.len(),
        });
        Ok(LineOutcome::HeaderWritten)
    }

    fn write_record(&mut self, record: CandidateRecord) -> Result<(), IngestError> {
        let timestamp = self.clock.wall().format(&Rfc3339)?;
        let row = OutputRow { timestamp, record };
        self.sink
            .write_row(&row)
            .map_err(|source| IngestError::Sink {
                what: "record",
                source,
            })?;
        self.session.record_written();
        self.stats.records += 1;
        Ok(())
    }

    /// Emits a window summary when the interval has elapsed. Called after
    /// every processed line and by idle polling loops.
    pub fn poll_summary(&mut self) -> Option<WindowSummary> {
        let summary = self.session.poll_summary(self.clock.monotonic())?;
        self.diagnostics.emit(Diagnostic::Summary(summary));
        Some(summary)
    }

    /// Runs a whole captured stream through the pipeline, including a final
    /// unterminated line.
    pub fn ingest_reader<R: Read>(&mut self, reader: R) -> Result<IngestStats, IngestError> {
        let mut lines = SyncBoundedLineReader::new(reader, self.max_line_bytes);
        while let Some(next) = lines.next() {
            let line = next.map_err(|source| IngestError::Read {
                line_number: lines.lines_seen() + 1,
                source,
            })?;
            self.process_bounded(line)?;
        }
        Ok(self.stats)
    }

    /// Flushes the sink and reports the session totals.
    pub fn finish(mut self) -> Result<(SessionReport, S), IngestError> {
        self.sink.flush().map_err(|source| IngestError::Sink {
            what: "final flush",
            source,
        })?;
        let report = SessionReport {
            total_records: self.session.total_records(),
            window_records: self.session.record_count(),
            stats: self.stats,
        };
        self.diagnostics.emit(Diagnostic::Final {
            total_records: report.total_records,
            window_records: report.window_records,
        });
        Ok((report, self.sink))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::OffsetDateTime;

    use super::*;
    use crate::session::ManualClock;
    use crate::sink::CsvSink;

    type TestIngestor = Ingestor<CsvSink<Vec<u8>>, Vec<Diagnostic>, ManualClock>;

    fn ingestor(clock: &ManualClock) -> TestIngestor {
        Ingestor::new(
            FieldSchema::default(),
            &IngestConfig::default(),
            CsvSink::new(Vec::new(), ','),
            Vec::new(),
            clock.clone(),
        )
    }

    fn data_line(base: usize) -> String {
        (0..21)
            .map(|idx| format!("{}.{}", base, idx))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn header_line() -> String {
        FieldSchema::default()
            .field_names()
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn header_is_written_once() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = ingestor(&clock);
        let header = header_line();

        assert_eq!(
            ingestor.process_line(&header).unwrap(),
            LineOutcome::HeaderWritten
        );
        assert_eq!(
            ingestor.process_line(&data_line(1)).unwrap(),
            LineOutcome::RecordWritten
        );
        assert_eq!(
            ingestor.process_line(&header).unwrap(),
            LineOutcome::HeaderRepeated
        );
        assert_eq!(
            ingestor.process_line(&format!("junk {header}")).unwrap(),
            LineOutcome::HeaderRepeated
        );

        let (report, sink) = ingestor.finish().unwrap();
        assert_eq!(report.stats.repeated_headers, 2);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.matches("Timestamp,AccX").count(), 1);
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn records_before_header_are_still_logged() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = ingestor(&clock);
        assert_eq!(
            ingestor.process_line(&data_line(2)).unwrap(),
            LineOutcome::RecordWritten
        );
        assert!(!ingestor.session().header_emitted());
        let (report, sink) = ingestor.finish().unwrap();
        assert_eq!(report.total_records, 1);
        assert!(String::from_utf8(sink.into_inner())
            .unwrap()
            .starts_with("1970-01-01T00:00:00Z,2.0,"));
    }

    #[test]
    fn parse_errors_leave_session_untouched() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = ingestor(&clock);
        // 20 numeric parts passes the shape check but cannot fill 21 fields.
        let short: Vec<String> = (0..20).map(|idx| idx.to_string()).collect();
        assert_eq!(
            ingestor.process_line(&short.join(",")).unwrap(),
            LineOutcome::ParseError
        );
        assert_eq!(ingestor.session().total_records(), 0);
        assert_eq!(ingestor.stats().parse_errors, 1);
        assert_eq!(ingestor.sink().rows_written(), 0);
    }

    #[test]
    fn summaries_are_emitted_per_window() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = ingestor(&clock);

        ingestor.process_line(&data_line(1)).unwrap();
        ingestor.process_line(&data_line(2)).unwrap();
        clock.advance(Duration::from_secs(15));
        ingestor.process_line("status: idle").unwrap();

        ingestor.process_line(&data_line(3)).unwrap();
        clock.advance(Duration::from_secs(16));
        assert_eq!(ingestor.poll_summary().map(|s| s.records), Some(1));
        assert_eq!(ingestor.poll_summary(), None);

        let (report, _sink) = ingestor.finish().unwrap();
        assert_eq!(report.total_records, 3);
        assert_eq!(report.window_records, 0);
    }

    #[test]
    fn summary_diagnostics_report_window_counts() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = ingestor(&clock);
        ingestor.process_line(&data_line(1)).unwrap();
        clock.advance(Duration::from_secs(15));
        ingestor.process_line(&data_line(2)).unwrap();

        let summaries: Vec<u64> = ingestor
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Summary(summary) => Some(summary.records),
                _ => None,
            })
            .collect();
        assert_eq!(summaries, vec![2]);
        assert_eq!(ingestor.session().record_count(), 0);
    }

    #[test]
    fn oversized_and_blank_lines() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = ingestor(&clock);
        assert_eq!(ingestor.process_line("  \r").unwrap(), LineOutcome::Blank);
        let outcome = ingestor
            .process_bounded(BoundedLine::LineTooLong {
                line_number: 7,
                observed_bytes: 9000,
                max_line_bytes: 4096,
            })
            .unwrap();
        assert_eq!(outcome, LineOutcome::Discarded);
        assert_eq!(ingestor.stats().discarded, 1);
        assert_eq!(ingestor.stats().lines, 1);
    }

    /// Accepts the header, refuses every row and counts flushes.
    #[derive(Default)]
    struct FullDisk {
        headers: usize,
        flushes: usize,
    }

    impl RecordSink for FullDisk {
        fn write_header(&mut self, _columns: &[&str]) -> std::io::Result<()> {
            self.headers += 1;
            Ok(())
        }

        fn write_row(&mut self, _row: &OutputRow) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no space left on device",
            ))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn sink_write_failure_is_fatal_and_leaves_counts_untouched() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = Ingestor::new(
            FieldSchema::default(),
            &IngestConfig::default(),
            FullDisk::default(),
            Vec::<Diagnostic>::new(),
            clock,
        );
        assert_eq!(
            ingestor.process_line(&header_line()).unwrap(),
            LineOutcome::HeaderWritten
        );

        let err = ingestor.process_line(&data_line(1)).unwrap_err();
        assert!(matches!(err, IngestError::Sink { what: "record", .. }));
        assert!(err.to_string().contains("no space left on device"));
        assert_eq!(ingestor.session().total_records(), 0);
        assert_eq!(ingestor.session().record_count(), 0);
        assert_eq!(ingestor.stats().records, 0);

        let (report, sink) = ingestor.finish().unwrap();
        assert_eq!(report.total_records, 0);
        assert_eq!(sink.headers, 1);
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn ingest_reader_decodes_lossy_bytes() {
        let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
        let mut ingestor = ingestor(&clock);
        let mut capture = Vec::new();
        capture.extend_from_slice(b"\xffBoot\xfe\r\n");
        capture.extend_from_slice(data_line(4).as_bytes());
        let stats = ingestor.ingest_reader(capture.as_slice()).unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.records, 1);
        assert_eq!(stats.lossy_lines, 1);
        assert_eq!(stats.device_lines, 1);
    }
}
