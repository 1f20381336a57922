//! Byte transport to the sensor unit: a local device node or a
//! serial-over-TCP bridge, split into independent read and write halves.

use std::{fmt, io, path::PathBuf};

use tokio::{
    fs::OpenOptions,
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tracing::{debug, info};

use crate::LoggerError;

const TCP_SCHEME: &str = "tcp://";

pub type TransportReader = Box<dyn AsyncRead + Send + Unpin>;
pub type TransportWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    /// Serial device node (`/dev/ttyACM0`, `COM17`, a FIFO, ...), opened read/write.
    Device(PathBuf),
    /// `host:port` of a serial-over-TCP bridge.
    Tcp(String),
}

impl TransportTarget {
    pub fn parse(raw: &str) -> Result<Self, LoggerError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LoggerError::TransportConfig {
                reason: "port must not be empty".to_string(),
            });
        }
        let Some(address) = raw.strip_prefix(TCP_SCHEME) else {
            return Ok(Self::Device(PathBuf::from(raw)));
        };
        let valid = address
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !valid {
            return Err(LoggerError::TransportConfig {
                reason: format!("expected tcp://host:port, got `{raw}`"),
            });
        }
        Ok(Self::Tcp(address.to_string()))
    }

    /// Whether a zero-byte read means the peer is gone for good. Device
    /// nodes report zero bytes whenever no data is pending.
    pub fn eof_ends_session(&self) -> bool {
        matches!(self, Self::Tcp(_))
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(path) => write!(f, "{}", path.display()),
            Self::Tcp(address) => write!(f, "{TCP_SCHEME}{address}"),
        }
    }
}

pub struct Transport {
    pub target: TransportTarget,
    pub reader: TransportReader,
    pub writer: TransportWriter,
}

impl Transport {
    pub fn into_split(self) -> (TransportReader, TransportWriter) {
        (self.reader, self.writer)
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Opens `target`. Line settings (baud rate, framing) are left to the
/// device or bridge; `baud_rate` is only recorded.
pub async fn open_transport(
    target: &TransportTarget,
    baud_rate: u32,
) -> Result<Transport, LoggerError> {
    let open_error = |source: io::Error| LoggerError::TransportOpen {
        target: target.to_string(),
        source,
    };

    let (reader, writer): (TransportReader, TransportWriter) = match target {
        TransportTarget::Device(path) => {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .await
                .map_err(open_error)?;
            let writer = file.try_clone().await.map_err(open_error)?;
            (Box::new(file), Box::new(writer))
        }
        TransportTarget::Tcp(address) => {
            let stream = TcpStream::connect(address.as_str())
                .await
                .map_err(open_error)?;
            if let Err(err) = stream.set_nodelay(true) {
                debug!(error = %err, "could not disable Nagle on transport socket");
            }
            let (reader, writer) = stream.into_split();
            (Box::new(reader), Box::new(writer))
        }
    };

    info!(target = %target, baud_rate, "transport opened");
    Ok(Transport {
        target: target.clone(),
        reader,
        writer,
    })
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn parses_targets() {
        assert_eq!(
            TransportTarget::parse("/dev/ttyACM0").unwrap(),
            TransportTarget::Device(PathBuf::from("/dev/ttyACM0"))
        );
        assert_eq!(
            TransportTarget::parse(" COM17 ").unwrap(),
            TransportTarget::Device(PathBuf::from("COM17"))
        );
        let tcp = TransportTarget::parse("tcp://127.0.0.1:4000").unwrap();
        assert_eq!(tcp, TransportTarget::Tcp("127.0.0.1:4000".to_string()));
        assert!(tcp.eof_ends_session());
        assert_eq!(tcp.to_string(), "tcp://127.0.0.1:4000");

        for bad in ["", "tcp://", "tcp://host", "tcp://:4000", "tcp://host:99999"] {
            assert!(
                matches!(
                    TransportTarget::parse(bad),
                    Err(LoggerError::TransportConfig { .. })
                ),
                "{bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn missing_device_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = TransportTarget::Device(dir.path().join("no-such-tty"));
        let err = open_transport(&target, 115_200).await.unwrap_err();
        assert!(matches!(err, LoggerError::TransportOpen { .. }));
        assert!(err.to_string().contains("no-such-tty"));
    }

    #[tokio::test]
    async fn tcp_halves_are_independent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let target = TransportTarget::parse(&format!("tcp://{address}")).unwrap();

        let (transport, accepted) = tokio::join!(open_transport(&target, 9600), listener.accept());
        let (mut reader, mut writer) = transport.unwrap().into_split();
        let (mut device, _) = accepted.unwrap();

        device.write_all(b"AccX,AccY\n").await.unwrap();
        writer.write_all(b"zero\r").await.unwrap();
        writer.flush().await.unwrap();

        let mut from_device = [0u8; 10];
        reader.read_exact(&mut from_device).await.unwrap();
        assert_eq!(&from_device, b"AccX,AccY\n");
        let mut from_relay = [0u8; 5];
        device.read_exact(&mut from_relay).await.unwrap();
        assert_eq!(&from_relay, b"zero\r");
    }
}
