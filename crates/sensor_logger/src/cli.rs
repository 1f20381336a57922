use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::defaults::DEFAULT_LOG_LEVEL;
use crate::settings::ConfigOverrides;

/// Serial IMU/GPS stream logger.
#[derive(Debug, Parser)]
#[command(name = "sensor-logger")]
#[command(version, about = "Log a serial IMU/GPS sensor stream to CSV", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The selected subcommand; `run` with no overrides when omitted.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(RunArgs::default()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log the live device stream and relay stdin commands to the device.
    Run(RunArgs),
    /// Run a captured device log through the pipeline offline.
    Replay(ReplayArgs),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RunArgs {
    /// Device node, or tcp://host:port for a serial-over-TCP bridge.
    #[arg(short, long)]
    pub port: Option<String>,

    /// Line speed of the serial link.
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// CSV output file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append to the output file instead of truncating it.
    #[arg(long)]
    pub append: bool,

    /// Do not read operator commands from stdin.
    #[arg(long)]
    pub no_relay: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port.clone(),
            baud_rate: self.baud,
            output: self.output.clone(),
            append: self.append,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ReplayArgs {
    /// Captured device output, one line per device line.
    pub input: PathBuf,

    /// CSV output file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append to the output file instead of truncating it.
    #[arg(long)]
    pub append: bool,
}

impl ReplayArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            output: self.output.clone(),
            append: self.append,
            ..ConfigOverrides::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::try_parse_from(["sensor-logger"]).unwrap();
        assert_eq!(cli.command(), Command::Run(RunArgs::default()));
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.config, None);
    }

    #[test]
    fn run_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "sensor-logger",
            "run",
            "--port",
            "tcp://10.0.0.2:4000",
            "-b",
            "57600",
            "-o",
            "flight.csv",
            "--append",
            "--no-relay",
            "--config",
            "logger.toml",
        ])
        .unwrap();
        let Command::Run(args) = cli.command() else {
            panic!("expected run");
        };
        assert!(args.no_relay);
        assert_eq!(cli.config, Some(PathBuf::from("logger.toml")));
        assert_eq!(
            args.overrides(),
            ConfigOverrides {
                port: Some("tcp://10.0.0.2:4000".to_string()),
                baud_rate: Some(57_600),
                output: Some(PathBuf::from("flight.csv")),
                append: true,
            }
        );
    }

    #[test]
    fn replay_takes_an_input_path() {
        let cli =
            Cli::try_parse_from(["sensor-logger", "--log-level", "debug", "replay", "cap.log"])
                .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Command::Replay(args) = cli.command() else {
            panic!("expected replay");
        };
        assert_eq!(args.input, PathBuf::from("cap.log"));
        assert_eq!(args.overrides(), ConfigOverrides::default());

        assert!(Cli::try_parse_from(["sensor-logger", "replay"]).is_err());
    }
}
