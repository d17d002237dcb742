use std::path::PathBuf;

/// Failures of the byte stream underneath PRPC.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A simulated device socket could not be created.
    #[error("cannot listen on {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The device at `addr` could not be reached.
    #[error("cannot reach device at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(std::io::Error),

    /// Read, write or socket option failure on an open stream.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The address could not be interpreted as a Unix path or `tcp://host:port`.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("socket path is {len} bytes, platform limit is {max}: {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// Returns true when the error means the peer end of the stream is gone.
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Io(err) if is_closed_kind(err.kind()))
    }
}

pub(crate) fn is_closed_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::UnexpectedEof
    )
}

pub type Result<T> = std::result::Result<T, TransportError>;
