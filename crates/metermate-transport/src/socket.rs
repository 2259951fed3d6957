use std::io::Read;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::address::{DeviceAddress, ServiceId};
use crate::error::{Result, TransportError};
use crate::traits::{ByteStream, Connector};

const TCP_SCHEME: &str = "tcp://";
const UNIX_SCHEME: &str = "unix://";

/// Socket-backed device stream.
///
/// On every platform this can wrap a TCP stream (serial-over-TCP bridges).
/// On Unix it can also wrap a Unix domain socket stream.
pub struct SocketStream {
    inner: SocketStreamInner,
    closed: bool,
}

enum SocketStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for SocketStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SocketStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            SocketStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl SocketStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: SocketStreamInner::Tcp(stream),
            closed: false,
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: SocketStreamInner::Unix(stream),
            closed: false,
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            SocketStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            SocketStreamInner::Unix(_) => "unix-domain-socket",
        }
    }

    /// Whether [`ByteStream::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ByteStream for SocketStream {
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = match &self.inner {
            SocketStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            SocketStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        debug!(transport = self.transport_name(), "closed device stream");

        match result {
            Ok(()) => Ok(()),
            // The peer may already have torn the connection down.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            SocketStreamInner::Tcp(stream) => stream.set_read_timeout(timeout)?,
            #[cfg(unix)]
            SocketStreamInner::Unix(stream) => stream.set_read_timeout(timeout)?,
        }
        Ok(())
    }
}

impl std::fmt::Debug for SocketStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketStream")
            .field("type", &self.transport_name())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Connects to devices exposed through socket bridges.
///
/// Addresses are dispatched on their scheme prefix; the rest of the address
/// is passed to the operating system unchanged.
#[derive(Debug, Clone, Default)]
pub struct SocketConnector {
    connect_timeout: Option<Duration>,
}

impl SocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound how long a TCP connect may take.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    fn connect_tcp(&self, address: &DeviceAddress, target: &str) -> Result<SocketStream> {
        let connect_err = |source| TransportError::Connect {
            address: address.to_string(),
            source,
        };

        let stream = match self.connect_timeout {
            None => TcpStream::connect(target).map_err(connect_err)?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in target.to_socket_addrs().map_err(connect_err)? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(connect_err(last_err.unwrap_or_else(|| {
                            std::io::Error::new(
                                std::io::ErrorKind::AddrNotAvailable,
                                "address resolved to no socket addresses",
                            )
                        })))
                    }
                }
            }
        };

        // Frames are small and latency-sensitive.
        stream.set_nodelay(true)?;
        Ok(SocketStream::from_tcp(stream))
    }

    #[cfg(unix)]
    fn connect_unix(&self, address: &DeviceAddress, path: &str) -> Result<SocketStream> {
        let stream = std::os::unix::net::UnixStream::connect(path).map_err(|source| {
            TransportError::Connect {
                address: address.to_string(),
                source,
            }
        })?;
        Ok(SocketStream::from_unix(stream))
    }

    #[cfg(not(unix))]
    fn connect_unix(&self, address: &DeviceAddress, _path: &str) -> Result<SocketStream> {
        Err(TransportError::Unsupported(address.to_string()))
    }
}

impl Connector for SocketConnector {
    type Stream = SocketStream;

    fn connect(&self, address: &DeviceAddress, service: &ServiceId) -> Result<SocketStream> {
        let raw = address.as_str();
        let stream = if let Some(target) = raw.strip_prefix(TCP_SCHEME) {
            if target.is_empty() {
                return Err(TransportError::InvalidAddress {
                    address: raw.to_string(),
                    reason: "missing host:port".to_string(),
                });
            }
            self.connect_tcp(address, target)?
        } else if let Some(path) = raw.strip_prefix(UNIX_SCHEME) {
            if path.is_empty() {
                return Err(TransportError::InvalidAddress {
                    address: raw.to_string(),
                    reason: "missing socket path".to_string(),
                });
            }
            self.connect_unix(address, path)?
        } else {
            return Err(TransportError::Unsupported(raw.to_string()));
        };

        debug!(
            %address,
            %service,
            transport = stream.transport_name(),
            "connected to device"
        );
        Ok(stream)
    }
}
