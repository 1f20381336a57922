use std::{io, path::PathBuf};

use sensor_stream::{ConfigError, IngestError, SchemaError};
use thiserror::Error;

/// Errors that stop the logger. Anything scoped to a single device line or
/// operator command is reported as a diagnostic instead.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to read config file `{path}`: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file `{path}`: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid ingest settings: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid record schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("invalid transport setting: {reason}")]
    TransportConfig { reason: String },
    #[error("failed to open transport `{target}`: {source}")]
    TransportOpen {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("transport read failed: {source}")]
    TransportRead {
        #[source]
        source: io::Error,
    },
    #[error("failed to open output `{path}`: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open replay input `{path}`: {source}")]
    ReplayInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("failed to spawn operator input thread: {source}")]
    RelaySpawn {
        #[source]
        source: io::Error,
    },
    #[error("failed to build async runtime: {source}")]
    Runtime {
        #[source]
        source: io::Error,
    },
}
