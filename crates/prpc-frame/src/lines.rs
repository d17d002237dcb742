use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BytesMut};
use tracing::warn;

/// Text encoding of a PRPC byte stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// 7-bit ASCII; any byte above 0x7F is malformed.
    Ascii,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
        }
    }

    /// Returns true if every character of `text` exists in this encoding.
    pub fn can_encode(self, text: &str) -> bool {
        match self {
            TextEncoding::Utf8 => true,
            TextEncoding::Ascii => text.is_ascii(),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            other => Err(format!("unsupported encoding '{other}'")),
        }
    }
}

/// Turns an arbitrarily chunked byte stream into complete text lines.
///
/// Bytes are decoded as they arrive. A multi-byte sequence split across two
/// pushes is reassembled; bytes that can never decode are dropped with a
/// warning. Each yielded line keeps its trailing `\n`.
#[derive(Debug)]
pub struct LineBuffer {
    encoding: TextEncoding,
    max_line_length: usize,
    /// Undecoded tail: at most one incomplete UTF-8 sequence.
    pending: BytesMut,
    line: String,
    complete: VecDeque<String>,
    /// Set while skipping the remainder of an oversized line.
    discarding: bool,
}

impl LineBuffer {
    pub fn new(encoding: TextEncoding, max_line_length: usize) -> Self {
        Self {
            encoding,
            max_line_length,
            pending: BytesMut::new(),
            line: String::new(),
            complete: VecDeque::new(),
            discarding: false,
        }
    }

    /// Feed raw bytes from the stream.
    pub fn push(&mut self, bytes: &[u8]) {
        match self.encoding {
            TextEncoding::Ascii => {
                for &byte in bytes {
                    if byte.is_ascii() {
                        self.push_char(char::from(byte));
                    } else {
                        warn!(byte, encoding = "ascii", "dropping malformed byte");
                    }
                }
            }
            TextEncoding::Utf8 => {
                self.pending.extend_from_slice(bytes);
                self.decode_pending();
            }
        }
    }

    fn decode_pending(&mut self) {
        loop {
            let (valid, invalid) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), None),
                Err(err) => (err.valid_up_to(), Some(err.error_len())),
            };

            let decoded = self.pending.split_to(valid);
            if let Ok(text) = std::str::from_utf8(&decoded) {
                for c in text.chars() {
                    self.push_char(c);
                }
            }

            match invalid {
                Some(Some(len)) => {
                    warn!(
                        bytes = ?&self.pending[..len],
                        encoding = "utf-8",
                        "dropping malformed bytes"
                    );
                    self.pending.advance(len);
                }
                // Nothing left, or an incomplete sequence waiting for more bytes.
                _ => return,
            }
        }
    }

    fn push_char(&mut self, c: char) {
        if self.discarding {
            if c == '\n' {
                self.discarding = false;
            }
            return;
        }

        self.line.push(c);
        if c == '\n' {
            self.complete.push_back(std::mem::take(&mut self.line));
        } else if self.line.len() >= self.max_line_length {
            warn!(
                max = self.max_line_length,
                "discarding oversized line"
            );
            self.line.clear();
            self.discarding = true;
        }
    }

    /// Remove and return the oldest complete line.
    pub fn next_line(&mut self) -> Option<String> {
        self.complete.pop_front()
    }

    /// Bytes of the current, not yet terminated line.
    pub fn partial_len(&self) -> usize {
        self.line.len() + self.pending.len()
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(buf: &mut LineBuffer) -> Vec<String> {
        std::iter::from_fn(|| buf.next_line()).collect()
    }

    #[test]
    fn splits_on_newline_inclusive() {
        let mut buf = LineBuffer::new(TextEncoding::Utf8, 64);
        buf.push(b"0:ok\n1:result 4");
        assert_eq!(drain(&mut buf), vec!["0:ok\n"]);
        assert_eq!(buf.partial_len(), 10);

        buf.push(b"2\n*:tick\n");
        assert_eq!(drain(&mut buf), vec!["1:result 42\n", "*:tick\n"]);
        assert_eq!(buf.partial_len(), 0);
    }

    #[test]
    fn byte_by_byte_feed() {
        let mut buf = LineBuffer::new(TextEncoding::Utf8, 64);
        for byte in b"0:hello\n" {
            buf.push(&[*byte]);
        }
        assert_eq!(drain(&mut buf), vec!["0:hello\n"]);
    }

    #[test]
    fn split_multibyte_sequence_is_reassembled() {
        let text = "0:say \"µ°\"\n".as_bytes();
        let mut buf = LineBuffer::new(TextEncoding::Utf8, 64);
        for byte in text {
            buf.push(&[*byte]);
        }
        assert_eq!(drain(&mut buf), vec!["0:say \"µ°\"\n"]);
    }

    #[test]
    fn malformed_utf8_is_dropped() {
        let mut buf = LineBuffer::new(TextEncoding::Utf8, 64);
        buf.push(b"0:o\xffk\n1:\xc3\x28ok\n");
        assert_eq!(drain(&mut buf), vec!["0:ok\n", "1:(ok\n"]);
    }

    #[test]
    fn ascii_drops_high_bytes() {
        let mut buf = LineBuffer::new(TextEncoding::Ascii, 64);
        buf.push("0:o\u{e9}k\n".as_bytes());
        assert_eq!(drain(&mut buf), vec!["0:ok\n"]);
    }

    #[test]
    fn oversized_line_is_skipped_until_newline() {
        let mut buf = LineBuffer::new(TextEncoding::Utf8, 8);
        buf.push(b"0:way_too_long_identifier\n1:ok\n");
        assert_eq!(drain(&mut buf), vec!["1:ok\n"]);
    }

    #[test]
    fn encoding_from_str() {
        assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("ascii".parse::<TextEncoding>(), Ok(TextEncoding::Ascii));
        assert!("latin-1".parse::<TextEncoding>().is_err());
        assert_eq!(TextEncoding::default().to_string(), "utf-8");
    }
}
