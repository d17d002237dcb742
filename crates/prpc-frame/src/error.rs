/// A line that does not match the frame grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at column {column}: {reason}")]
pub struct ParseError {
    /// 1-based character column where parsing stopped.
    pub column: usize,
    /// Human-readable reason.
    pub reason: String,
}

impl ParseError {
    pub fn new(column: usize, reason: impl Into<String>) -> Self {
        Self {
            column,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An inbound line is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An argument value has no wire representation.
    #[error("unsupported argument type: {0}")]
    UnsupportedArgumentType(String),

    /// The command identifier does not match the identifier grammar.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] prpc_transport::TransportError),

    /// The stream ended before another frame was received.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
