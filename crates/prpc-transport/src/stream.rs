use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

const TCP_SCHEME: &str = "tcp://";
const UNIX_SCHEME: &str = "unix://";

/// A connected PRPC byte stream. Implements Read + Write + [`Transport`].
///
/// Wraps either a Unix domain socket or a TCP connection so that callers
/// can pick the link at runtime from an address string.
pub struct PrpcStream {
    inner: PrpcStreamInner,
}

enum PrpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for PrpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => stream.read(buf),
            PrpcStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for PrpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => stream.write(buf),
            PrpcStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => stream.flush(),
            PrpcStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl PrpcStream {
    /// Create a stream from a Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: PrpcStreamInner::Unix(stream),
        }
    }

    /// Create a stream from a TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: PrpcStreamInner::Tcp(stream),
        }
    }

    /// Connect to `tcp://host:port`, `unix:///path` or a bare socket path.
    pub fn connect(addr: &str) -> Result<Self> {
        if let Some(host) = addr.strip_prefix(TCP_SCHEME) {
            if host.is_empty() {
                return Err(TransportError::InvalidAddress(addr.to_string()));
            }
            return Self::connect_tcp(host);
        }

        let path = addr.strip_prefix(UNIX_SCHEME).unwrap_or(addr);
        if path.is_empty() {
            return Err(TransportError::InvalidAddress(addr.to_string()));
        }

        #[cfg(unix)]
        {
            Self::connect_unix(path)
        }

        #[cfg(not(unix))]
        {
            Err(TransportError::InvalidAddress(path.to_string()))
        }
    }

    /// Connect to a Unix domain socket at `path`.
    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<Self> {
        crate::uds::UnixDomainSocket::connect(path)
    }

    /// Connect to a TCP endpoint (`host:port`).
    pub fn connect_tcp(host: &str) -> Result<Self> {
        let stream = TcpStream::connect(host).map_err(|e| TransportError::Connect {
            addr: host.to_string(),
            source: e,
        })?;
        // Frames are small and latency-sensitive.
        stream.set_nodelay(true)?;
        debug!(addr = host, "connected tcp stream");
        Ok(Self::from_tcp(stream))
    }

    /// Create a connected pair of in-process streams.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }
}

impl Transport for PrpcStream {
    fn try_clone_transport(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            PrpcStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
        }
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => Transport::set_read_timeout(stream, timeout),
            PrpcStreamInner::Tcp(stream) => Transport::set_read_timeout(stream, timeout),
        }
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => Transport::set_write_timeout(stream, timeout),
            PrpcStreamInner::Tcp(stream) => Transport::set_write_timeout(stream, timeout),
        }
    }

    fn cancel_read(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => stream.cancel_read(),
            PrpcStreamInner::Tcp(stream) => stream.cancel_read(),
        }
    }

    fn close(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(stream) => Transport::close(stream),
            PrpcStreamInner::Tcp(stream) => Transport::close(stream),
        }
    }
}

impl std::fmt::Debug for PrpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            PrpcStreamInner::Unix(_) => f.debug_struct("PrpcStream").field("type", &"unix").finish(),
            PrpcStreamInner::Tcp(stream) => f
                .debug_struct("PrpcStream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
        }
    }
}
