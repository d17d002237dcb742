use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::{is_closed_kind, Result};

/// Result of a single non-fatal read attempt on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were placed at the start of the buffer (`n > 0`).
    Data(usize),
    /// No data arrived before the read timeout elapsed.
    Idle,
    /// The stream has ended; no further bytes will arrive.
    Closed,
}

/// A full-duplex byte stream a PRPC peer is reachable through.
///
/// Reads are blocking, bounded by the configured read timeout. Each
/// implementation decides how its own timeout and end-of-stream signals map
/// onto [`ReadOutcome`]: a serial port typically reports a timeout as a
/// zero-length read, while a socket reports it as `WouldBlock`.
pub trait Transport: Read + Write + Send + 'static {
    /// Read whatever is available into `buf`.
    fn read_some(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        classify_read(self.read(buf))
    }

    /// Create a second handle on the same stream, used by the background reader.
    fn try_clone_transport(&self) -> Result<Self>
    where
        Self: Sized;

    /// Set read timeout on the underlying stream.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()>;

    /// Set write timeout on the underlying stream.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()>;

    /// Unblock a pending read on any handle of this stream.
    fn cancel_read(&self) -> Result<()>;

    /// Close both directions of the stream.
    fn close(&self) -> Result<()>;
}

/// Map a socket-style `read` result onto [`ReadOutcome`].
///
/// A zero-length read is end-of-stream; `WouldBlock`, `TimedOut` and
/// `Interrupted` mean "no data yet".
pub fn classify_read(result: std::io::Result<usize>) -> Result<ReadOutcome> {
    match result {
        Ok(0) => Ok(ReadOutcome::Closed),
        Ok(n) => Ok(ReadOutcome::Data(n)),
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
            ) =>
        {
            Ok(ReadOutcome::Idle)
        }
        Err(err) if is_closed_kind(err.kind()) => Ok(ReadOutcome::Closed),
        Err(err) => Err(err.into()),
    }
}

fn ignore_not_connected(result: std::io::Result<()>) -> Result<()> {
    match result {
        Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
        other => other.map_err(Into::into),
    }
}

impl Transport for TcpStream {
    fn try_clone_transport(&self) -> Result<Self> {
        self.try_clone().map_err(Into::into)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        TcpStream::set_read_timeout(self, timeout).map_err(Into::into)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        TcpStream::set_write_timeout(self, timeout).map_err(Into::into)
    }

    fn cancel_read(&self) -> Result<()> {
        ignore_not_connected(self.shutdown(Shutdown::Read))
    }

    fn close(&self) -> Result<()> {
        ignore_not_connected(self.shutdown(Shutdown::Both))
    }
}

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    fn try_clone_transport(&self) -> Result<Self> {
        self.try_clone().map_err(Into::into)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout).map_err(Into::into)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        std::os::unix::net::UnixStream::set_write_timeout(self, timeout).map_err(Into::into)
    }

    fn cancel_read(&self) -> Result<()> {
        ignore_not_connected(self.shutdown(Shutdown::Read))
    }

    fn close(&self) -> Result<()> {
        ignore_not_connected(self.shutdown(Shutdown::Both))
    }
}
