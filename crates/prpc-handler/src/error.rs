use std::time::Duration;

use crate::pool::PoolError;

/// Errors that can occur in handler operations.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Frame-level error (encoding, I/O while writing).
    #[error("frame error: {0}")]
    Frame(#[from] prpc_frame::FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] prpc_transport::TransportError),

    /// No free sequence id; the caller may retry once a request completes.
    #[error("no free sequence id ({capacity} requests in flight); retry later or raise max_reqs")]
    PoolExhausted { capacity: u32 },

    /// A sequence id was handed out while still registered.
    #[error("sequence id {0} is already waiting for a response")]
    DuplicateSequenceId(u32),

    /// Sequence id bookkeeping error other than exhaustion.
    #[error("sequence id pool error: {0}")]
    Pool(PoolError),

    /// The peer answered with an `error` frame.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The request was aborted before a response arrived.
    #[error("request aborted")]
    RequestAborted,

    /// No response arrived in time; the request has been aborted.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// A response frame with an identifier other than ok/result/error.
    #[error("unexpected response '{0}'")]
    UnexpectedResponse(String),

    /// `start()` called on a running handler.
    #[error("handler already running")]
    AlreadyRunning,

    /// The handler is not running.
    #[error("handler not running")]
    NotRunning,

    /// The background reader did not exit in time.
    #[error("reader did not stop within {0:?}")]
    StopTimeout(Duration),

    /// The reader thread could not be spawned.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The background reader panicked.
    #[error("reader thread panicked")]
    ReaderPanicked,
}

impl HandlerError {
    /// True for conditions that may clear up if the call is retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::PoolExhausted { .. })
    }
}

impl From<PoolError> for HandlerError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted { capacity } => HandlerError::PoolExhausted { capacity },
            other => HandlerError::Pool(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, HandlerError>;
