use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use prpc_transport::Transport;
use tracing::debug;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::lines::TextEncoding;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    encoding: TextEncoding,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            encoding: TextEncoding::default(),
        }
    }

    /// Restrict outgoing text to `encoding`.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Encode, write and flush one frame (blocking).
    ///
    /// Encoding happens before any byte is written, so an unencodable
    /// frame never reaches the stream. Text outside the writer's
    /// [`TextEncoding`] is rejected the same way.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;
        check_encoding(self.encoding, &self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        debug!(
            line = String::from_utf8_lossy(&self.buf).trim_end(),
            "sent line"
        );

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> FrameWriter<T> {
    /// Create a frame writer and apply the write timeout from `config`.
    pub fn with_config(inner: T, config: &FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::new(inner).with_encoding(config.encoding))
    }
}

/// Fail with `UnsupportedArgumentType` if an encoded line holds characters
/// outside `encoding`.
pub(crate) fn check_encoding(encoding: TextEncoding, line: &[u8]) -> Result<()> {
    let fits = std::str::from_utf8(line).is_ok_and(|text| encoding.can_encode(text));
    if fits {
        Ok(())
    } else {
        Err(FrameError::UnsupportedArgumentType(format!(
            "text not representable in {encoding}"
        )))
    }
}
