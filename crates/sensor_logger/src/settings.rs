use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use sensor_stream::{FieldSchema, IngestConfig, OutputMode, SchemaConfig};
use serde::Deserialize;

use crate::defaults::{
    default_output_path, default_port, DEFAULT_BAUD_RATE, DEFAULT_COMMAND_TERMINATOR,
    DEFAULT_POLL_INTERVAL_MS,
};
use crate::LoggerError;

/// Complete logger configuration. Every section is optional in the TOML
/// file and unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    pub transport: TransportConfig,
    pub output: OutputConfig,
    pub ingest: IngestConfig,
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Device node path, or `tcp://host:port` for a serial-over-TCP bridge.
    pub port: String,
    pub baud_rate: u32,
    /// Idle sleep after a read returned no bytes.
    pub poll_interval_ms: u64,
    /// Appended to every operator command before it is written.
    pub command_terminator: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            command_terminator: DEFAULT_COMMAND_TERMINATOR.to_string(),
        }
    }
}

impl TransportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub mode: OutputMode,
    /// `sync_data` after every row in addition to the flush.
    pub sync: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            mode: OutputMode::default(),
            sync: false,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub output: Option<PathBuf>,
    pub append: bool,
}

impl LoggerConfig {
    /// Loads `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, LoggerError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, LoggerError> {
        let contents = fs::read_to_string(path).map_err(|source| LoggerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| LoggerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.transport.port = port;
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.transport.baud_rate = baud_rate;
        }
        if let Some(path) = overrides.output {
            self.output.path = path;
        }
        if overrides.append {
            self.output.mode = OutputMode::Append;
        }
    }

    /// Checks every section and builds the record schema.
    pub fn validate(&self) -> Result<FieldSchema, LoggerError> {
        self.ingest.validate()?;
        let schema = self.schema.build()?;
        if self.transport.port.trim().is_empty() {
            return Err(LoggerError::TransportConfig {
                reason: "port must not be empty".to_string(),
            });
        }
        if self.transport.baud_rate == 0 {
            return Err(LoggerError::TransportConfig {
                reason: "baud_rate must be greater than zero".to_string(),
            });
        }
        if self.transport.poll_interval_ms == 0 {
            return Err(LoggerError::TransportConfig {
                reason: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = LoggerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LoggerConfig::default());
        assert_eq!(config.transport.baud_rate, 115_200);
        assert_eq!(config.transport.command_terminator, "\r");
        assert_eq!(config.output.path, PathBuf::from("serial_log.csv"));
        assert_eq!(config.output.mode, OutputMode::Truncate);
        assert_eq!(config.validate().unwrap(), FieldSchema::default());
    }

    #[test]
    fn parses_every_section() {
        let config = LoggerConfig::from_toml_str(
            r#"
[transport]
port = "tcp://127.0.0.1:4000"
baud_rate = 9600
poll_interval_ms = 25
command_terminator = "\r\n"

[output]
path = "flight.csv"
mode = "append"
sync = true

[ingest]
min_parts = 3
max_parts = 6
noise_keywords = ["boot"]
summary_interval_secs = 5

[schema]
fields = ["Roll", "Pitch", "Yaw"]
delimiter = ";"
"#,
        )
        .unwrap();

        assert_eq!(config.transport.port, "tcp://127.0.0.1:4000");
        assert_eq!(config.transport.poll_interval(), Duration::from_millis(25));
        assert_eq!(config.transport.command_terminator, "\r\n");
        assert_eq!(config.output.mode, OutputMode::Append);
        assert!(config.output.sync);
        assert_eq!(config.ingest.noise_keywords, vec!["boot".to_string()]);
        assert_eq!(config.ingest.max_line_bytes, 4096);

        let schema = config.validate().unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.delimiter(), ';');
        assert_eq!(schema.marker(), "Roll;Pitch;Yaw");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(LoggerConfig::from_toml_str("[transport]\nspeed = 9600\n").is_err());
        assert!(LoggerConfig::from_toml_str("[extras]\n").is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = LoggerConfig::from_toml_str("[output]\npath = \"a.csv\"\n").unwrap();
        config.apply(ConfigOverrides {
            port: Some("/dev/ttyUSB1".to_string()),
            baud_rate: Some(57_600),
            output: Some(PathBuf::from("b.csv")),
            append: true,
        });
        assert_eq!(config.transport.port, "/dev/ttyUSB1");
        assert_eq!(config.transport.baud_rate, 57_600);
        assert_eq!(config.output.path, PathBuf::from("b.csv"));
        assert_eq!(config.output.mode, OutputMode::Append);

        config.apply(ConfigOverrides::default());
        assert_eq!(config.output.path, PathBuf::from("b.csv"));
    }

    #[test]
    fn validation_reports_bad_sections() {
        let mut config = LoggerConfig::default();
        config.ingest.summary_interval_secs = 0;
        assert!(matches!(config.validate(), Err(LoggerError::Config(_))));

        let mut config = LoggerConfig::default();
        config.schema.fields = vec!["AccX".to_string(), "AccX".to_string()];
        assert!(matches!(config.validate(), Err(LoggerError::Schema(_))));

        let mut config = LoggerConfig::default();
        config.transport.poll_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(LoggerError::TransportConfig { .. })
        ));
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = LoggerConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, LoggerError::ConfigRead { ref path, .. } if path == &missing));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[output\n").unwrap();
        let err = LoggerConfig::from_file(&broken).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
