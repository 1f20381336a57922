use std::{env, path::PathBuf, time::Duration};

pub(crate) const PORT_ENV: &str = "SENSOR_LOGGER_PORT";
pub(crate) const DEFAULT_PORT: &str = "/dev/ttyACM0";
pub(crate) const DEFAULT_BAUD_RATE: u32 = 115_200;
pub(crate) const DEFAULT_OUTPUT_PATH: &str = "serial_log.csv";
pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
pub(crate) const DEFAULT_COMMAND_TERMINATOR: &str = "\r";
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";
/// Pending operator commands before the input thread blocks.
pub(crate) const RELAY_CHANNEL_CAPACITY: usize = 16;
pub(crate) const READ_CHUNK_BYTES: usize = 4096;
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub(crate) fn default_port() -> String {
    env::var(PORT_ENV)
        .ok()
        .filter(|port| !port.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PORT.to_string())
}

pub(crate) fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}
