use std::fmt;
use std::io;

use prpc_frame::FrameError;
use prpc_handler::HandlerError;
use prpc_transport::TransportError;

pub const SUCCESS: i32 = 0;
/// Also used when the device answers with an `error` frame.
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
/// No free sequence id; retrying later may succeed.
pub const TEMPFAIL: i32 = 75;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidAddress(_) | TransportError::PathTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Parse(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::UnsupportedArgumentType(_) | FrameError::InvalidIdentifier(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn handler_error(context: &str, err: HandlerError) -> CliError {
    match err {
        HandlerError::Frame(err) => frame_error(context, err),
        HandlerError::Transport(err) => transport_error(context, err),
        HandlerError::PoolExhausted { .. } => CliError::new(TEMPFAIL, format!("{context}: {err}")),
        HandlerError::RequestFailed(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        HandlerError::RequestTimeout(_) | HandlerError::StopTimeout(_) => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        HandlerError::RequestAborted => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        HandlerError::UnexpectedResponse(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
