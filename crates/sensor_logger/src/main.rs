use std::{
    io::{self, BufReader},
    process::ExitCode,
};

use clap::Parser;
use sensor_logger::{
    cli::{Cli, Command},
    logging::init_tracing,
    replay_file, run_session,
    signal::spawn_signal_listener,
    LoggerConfig, LoggerError, SHUTDOWN_GRACE,
};
use sensor_stream::{ConsoleDiagnostics, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    // The local offset lookup must happen while the process is single-threaded.
    let clock = SystemClock::local();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(&cli, clock) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "sensor-logger failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, clock: SystemClock) -> Result<(), LoggerError> {
    let mut config = LoggerConfig::load(cli.config.as_deref())?;
    info!(utc_offset = %clock.offset(), "sensor-logger starting");

    match cli.command() {
        Command::Run(args) => {
            config.apply(args.overrides());
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|source| LoggerError::Runtime { source })?;

            let shutdown = CancellationToken::new();
            let operator_input = (!args.no_relay).then(|| BufReader::new(io::stdin()));
            let result = runtime.block_on(async {
                let _signals = spawn_signal_listener(shutdown.clone());
                run_session(
                    &config,
                    clock,
                    ConsoleDiagnostics,
                    operator_input,
                    shutdown.clone(),
                )
                .await
            });
            // Blocked device or stdin reads must not hold the process open.
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            result.map(|_| ())
        }
        Command::Replay(args) => {
            config.apply(args.overrides());
            replay_file(&config, &args.input, clock, ConsoleDiagnostics).map(|_| ())
        }
    }
}
