#![forbid(unsafe_code)]
//! Live logger for a serial IMU/GPS sensor unit.
//!
//! Opens the device transport, feeds every received line through the
//! [`sensor_stream`] ingestion pipeline into a CSV file, and relays operator
//! commands typed on stdin back to the device. A session ends on SIGINT or
//! SIGTERM (or when a TCP bridge disconnects) with the output flushed and a
//! final record count on stdout.
//!
//! ```no_run
//! use sensor_logger::{run_session, LoggerConfig};
//! use sensor_stream::{ConsoleDiagnostics, SystemClock};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), sensor_logger::LoggerError> {
//! let config = LoggerConfig::from_toml_str("[transport]\nport = \"tcp://127.0.0.1:4000\"\n")
//!     .expect("valid config");
//! let report = run_session(
//!     &config,
//!     SystemClock::local(),
//!     ConsoleDiagnostics,
//!     None::<std::io::Empty>,
//!     CancellationToken::new(),
//! )
//! .await?;
//! println!("{} records", report.total_records);
//! # Ok(())
//! # }
//! ```

pub mod cli;
mod defaults;
mod error;
pub mod logging;
pub mod relay;
mod runtime;
mod settings;
pub mod signal;
pub mod transport;

pub use defaults::SHUTDOWN_GRACE;
pub use error::LoggerError;
pub use runtime::{replay_file, run_ingestion, run_session, IngestionEnd};
pub use settings::{ConfigOverrides, LoggerConfig, OutputConfig, TransportConfig};
