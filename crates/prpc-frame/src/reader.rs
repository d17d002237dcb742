use prpc_transport::{ReadOutcome, Transport};
use tracing::{debug, warn};

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, ParseError, Result};
use crate::lines::LineBuffer;

const READ_CHUNK_SIZE: usize = 512;

/// What one [`FrameReader::poll`] call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A complete, well-formed frame.
    Frame(Frame),
    /// A complete line that does not match the grammar.
    Invalid { line: String, error: ParseError },
    /// The read timeout elapsed without completing a line.
    Idle,
    /// The stream has ended.
    Closed,
}

/// Reads complete frames from a [`Transport`].
///
/// Handles partial reads and text decoding internally: callers only see
/// whole lines, already parsed.
pub struct FrameReader<T> {
    inner: T,
    lines: LineBuffer,
    config: FrameConfig,
    closed: bool,
}

impl<T: Transport> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::build(inner, FrameConfig::default())
    }

    /// Create a frame reader and apply the read timeout from `config`.
    pub fn with_config(inner: T, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::build(inner, config))
    }

    fn build(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            lines: LineBuffer::new(config.encoding, config.max_line_length),
            config,
            closed: false,
        }
    }

    /// Return the next buffered line, reading from the transport at most
    /// until one read attempt yields no complete line.
    pub fn poll(&mut self) -> Result<Incoming> {
        loop {
            if let Some(line) = self.lines.next_line() {
                debug!(line = line.trim_end(), "received line");
                return Ok(match decode_frame(&line) {
                    Ok(frame) => Incoming::Frame(frame),
                    Err(error) => Incoming::Invalid { line, error },
                });
            }

            if self.closed {
                return Ok(Incoming::Closed);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.inner.read_some(&mut chunk)? {
                ReadOutcome::Data(n) => self.lines.push(&chunk[..n]),
                ReadOutcome::Idle => return Ok(Incoming::Idle),
                ReadOutcome::Closed => {
                    if self.lines.partial_len() > 0 {
                        debug!(
                            bytes = self.lines.partial_len(),
                            "stream closed with an unterminated line"
                        );
                    }
                    self.closed = true;
                    return Ok(Incoming::Closed);
                }
            }
        }
    }

    /// Read the next well-formed frame (blocking).
    ///
    /// Malformed lines are logged and skipped. Returns
    /// `Err(FrameError::ConnectionClosed)` once the stream has ended.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match self.poll()? {
                Incoming::Frame(frame) => return Ok(frame),
                Incoming::Invalid { line, error } => {
                    warn!(line = line.trim_end(), %error, "skipping malformed line");
                }
                Incoming::Idle => continue,
                Incoming::Closed => return Err(FrameError::ConnectionClosed),
            }
        }
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
