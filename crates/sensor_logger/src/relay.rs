//! Operator command relay: stdin lines in, terminated commands out to the
//! device, independent of the ingestion loop.

use std::{
    io::{self, BufRead},
    thread,
};

use sensor_stream::{Diagnostic, DiagnosticSink};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::{debug, info, warn};

const QUIT_COMMAND: &str = "quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    Command(String),
    Quit,
    Blank,
}

pub fn parse_operator_line(line: &str) -> OperatorInput {
    let command = line.trim();
    if command.is_empty() {
        OperatorInput::Blank
    } else if command.eq_ignore_ascii_case(QUIT_COMMAND) {
        OperatorInput::Quit
    } else {
        OperatorInput::Command(command.to_string())
    }
}

/// Reads operator lines on a dedicated thread until `quit`, end of input or
/// the relay going away. Blocking reads never touch the async runtime.
pub fn spawn_operator_reader<I>(
    mut input: I,
    commands: mpsc::Sender<String>,
) -> io::Result<thread::JoinHandle<()>>
where
    I: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("operator-input".to_string())
        .spawn(move || {
            let mut line = String::new();
            loop {
                line.clear();
                match input.read_line(&mut line) {
                    Ok(0) => {
                        debug!("operator input closed");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        warn!(error = %err, "operator input failed; command relay stopped");
                        break;
                    }
                }
                match parse_operator_line(&line) {
                    OperatorInput::Blank => continue,
                    OperatorInput::Quit => {
                        info!("operator quit; command relay stopped, logging continues");
                        break;
                    }
                    OperatorInput::Command(command) => {
                        if commands.blocking_send(command).is_err() {
                            break;
                        }
                    }
                }
            }
        })
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct RelaySummary {
    pub sent: u64,
    pub failed: u64,
}

/// Writes each command plus `terminator` to the device. A failed write is
/// reported and the relay keeps serving later commands.
pub async fn run_relay<W, D>(
    mut commands: mpsc::Receiver<String>,
    mut writer: W,
    terminator: String,
    mut diagnostics: D,
) -> RelaySummary
where
    W: AsyncWrite + Unpin,
    D: DiagnosticSink,
{
    let mut summary = RelaySummary::default();
    let mut frame = Vec::new();
    while let Some(command) = commands.recv().await {
        frame.clear();
        frame.extend_from_slice(command.as_bytes());
        frame.extend_from_slice(terminator.as_bytes());

        match write_frame(&mut writer, &frame).await {
            Ok(()) => {
                summary.sent += 1;
                diagnostics.emit(Diagnostic::Sent { command });
            }
            Err(err) => {
                summary.failed += 1;
                warn!(command = %command, error = %err, "failed to relay operator command");
                diagnostics.emit(Diagnostic::SendFailed {
                    command,
                    message: err.to_string(),
                });
            }
        }
    }
    info!(
        sent = summary.sent,
        failed = summary.failed,
        "command relay finished"
    );
    summary
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}
