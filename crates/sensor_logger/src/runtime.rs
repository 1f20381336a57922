use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
    time::Duration,
};

use sensor_stream::{
    Clock, CsvSink, DiagnosticSink, FieldSchema, Ingestor, LineSplitter, RecordSink, SessionReport,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::defaults::{READ_CHUNK_BYTES, RELAY_CHANNEL_CAPACITY};
use crate::relay::{run_relay, spawn_operator_reader, RelaySummary};
use crate::settings::{LoggerConfig, OutputConfig};
use crate::transport::{open_transport, TransportTarget, TransportWriter};
use crate::LoggerError;

/// Why the ingestion loop returned.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IngestionEnd {
    Shutdown,
    EndOfStream,
}

/// Reads the transport until shutdown or, when `eof_ends_session` is set,
/// until the peer closes. A zero-byte read otherwise parks the loop for
/// `poll_interval`, racing the shutdown token.
pub async fn run_ingestion<R, S, D, C>(
    mut reader: R,
    ingestor: &mut Ingestor<S, D, C>,
    poll_interval: Duration,
    eof_ends_session: bool,
    shutdown: &CancellationToken,
) -> Result<IngestionEnd, LoggerError>
where
    R: AsyncRead + Unpin,
    S: RecordSink,
    D: DiagnosticSink,
    C: Clock,
{
    let mut splitter = LineSplitter::new(ingestor.max_line_bytes());
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut lines = Vec::new();

    loop {
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!(pending_bytes = splitter.pending_bytes(), "shutdown requested during read");
                return Ok(IngestionEnd::Shutdown);
            }
            read = reader.read(&mut chunk) => read,
        };

        match read {
            Ok(0) if eof_ends_session => {
                if let Some(line) = splitter.finish() {
                    ingestor.process_bounded(line)?;
                }
                info!(lines = splitter.lines_seen(), "transport closed by peer");
                return Ok(IngestionEnd::EndOfStream);
            }
            Ok(0) => {
                ingestor.poll_summary();
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return Ok(IngestionEnd::Shutdown),
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Ok(n) => {
                splitter.push(&chunk[..n], &mut lines);
                for line in lines.drain(..) {
                    ingestor.process_bounded(line)?;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(LoggerError::TransportRead { source }),
        }
    }
}

/// Runs one live logging session: validates `config`, opens the transport
/// and the CSV sink, relays operator commands when `operator_input` is
/// given, and ingests until `shutdown` fires or a TCP peer disconnects.
/// The sink is flushed and the final count reported on every exit path.
pub async fn run_session<C, D, I>(
    config: &LoggerConfig,
    clock: C,
    diagnostics: D,
    operator_input: Option<I>,
    shutdown: CancellationToken,
) -> Result<SessionReport, LoggerError>
where
    C: Clock,
    D: DiagnosticSink + Clone + 'static,
    I: BufRead + Send + 'static,
{
    let schema = config.validate()?;
    let target = TransportTarget::parse(&config.transport.port)?;
    let transport = open_transport(&target, config.transport.baud_rate).await?;
    let (reader, writer) = transport.into_split();

    let mut ingestor = Ingestor::new(
        schema.clone(),
        &config.ingest,
        open_sink(&config.output, &schema)?,
        diagnostics.clone(),
        clock,
    );
    if ingestor.sink().resumed() {
        info!(path = %config.output.path.display(), "appending to existing log without a new header");
        ingestor.resume_existing_output();
    }

    let relay = match operator_input {
        Some(input) => Some(start_relay(
            input,
            writer,
            config.transport.command_terminator.clone(),
            diagnostics,
        )?),
        None => {
            debug!("command relay disabled");
            drop(writer);
            None
        }
    };

    info!(
        target = %target,
        output = %config.output.path.display(),
        fields = schema.len(),
        "logging session started"
    );
    let ended = run_ingestion(
        reader,
        &mut ingestor,
        config.transport.poll_interval(),
        target.eof_ends_session(),
        &shutdown,
    )
    .await;

    if let Some(relay) = relay {
        relay.abort();
    }
    let finished = ingestor.finish();
    let ended = ended?;
    let (report, _sink) = finished?;
    info!(
        ?ended,
        total_records = report.total_records,
        parse_errors = report.stats.parse_errors,
        device_lines = report.stats.device_lines,
        discarded = report.stats.discarded,
        "logging session finished"
    );
    Ok(report)
}

/// Runs a captured device log through the same pipeline as a live session.
pub fn replay_file<C, D>(
    config: &LoggerConfig,
    input: &Path,
    clock: C,
    diagnostics: D,
) -> Result<SessionReport, LoggerError>
where
    C: Clock,
    D: DiagnosticSink,
{
    let schema = config.validate()?;
    let capture = File::open(input).map_err(|source| LoggerError::ReplayInput {
        path: input.to_path_buf(),
        source,
    })?;
    let sink = open_sink(&config.output, &schema)?;
    let resumed = sink.resumed();
    let mut ingestor = Ingestor::new(schema, &config.ingest, sink, diagnostics, clock);
    if resumed {
        ingestor.resume_existing_output();
    }

    info!(input = %input.display(), output = %config.output.path.display(), "replaying capture");
    let ingested = ingestor.ingest_reader(capture);
    let finished = ingestor.finish();
    ingested?;
    let (report, _sink) = finished?;
    info!(
        total_records = report.total_records,
        lines = report.stats.lines,
        "replay finished"
    );
    Ok(report)
}

fn open_sink(output: &OutputConfig, schema: &FieldSchema) -> Result<CsvSink<File>, LoggerError> {
    let sink = CsvSink::create(&output.path, output.mode, schema.delimiter()).map_err(|source| {
        LoggerError::SinkOpen {
            path: output.path.clone(),
            source,
        }
    })?;
    Ok(sink.with_sync(output.sync))
}

fn start_relay<I, D>(
    input: I,
    writer: TransportWriter,
    terminator: String,
    diagnostics: D,
) -> Result<JoinHandle<RelaySummary>, LoggerError>
where
    I: BufRead + Send + 'static,
    D: DiagnosticSink + 'static,
{
    let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
    spawn_operator_reader(input, tx).map_err(|source| LoggerError::RelaySpawn { source })?;
    Ok(tokio::spawn(run_relay(rx, writer, terminator, diagnostics)))
}
