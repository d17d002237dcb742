use std::fmt;
use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::arg::Arg;
use crate::error::{FrameError, ParseError, Result};
use crate::lines::TextEncoding;
use crate::parser;

/// Default maximum line length in bytes, newline included.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Sequence id of a frame: a correlation number, or `*` for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqId {
    /// `*`: no response is expected and none can be correlated.
    Notification,
    Id(u32),
}

impl SeqId {
    /// The numeric id, if this is not a notification.
    pub fn id(self) -> Option<u32> {
        match self {
            SeqId::Notification => None,
            SeqId::Id(id) => Some(id),
        }
    }

    pub fn is_notification(self) -> bool {
        matches!(self, SeqId::Notification)
    }
}

impl From<u32> for SeqId {
    fn from(id: u32) -> Self {
        SeqId::Id(id)
    }
}

impl fmt::Display for SeqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeqId::Notification => f.write_str("*"),
            SeqId::Id(id) => write!(f, "{id}"),
        }
    }
}

/// The three identifiers that make a frame a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Success without payload.
    Ok,
    /// Success carrying the frame arguments.
    Result,
    /// Failure; the first argument is the message.
    Error,
}

impl ResponseKind {
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "ok" => Some(ResponseKind::Ok),
            "result" => Some(ResponseKind::Result),
            "error" => Some(ResponseKind::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Ok => "ok",
            ResponseKind::Result => "result",
            ResponseKind::Error => "error",
        }
    }
}

/// One PRPC message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub seq_id: SeqId,
    /// `/`-separated command path.
    pub identifier: String,
    /// `None` when the frame carries no arguments at all.
    pub args: Option<Vec<Arg>>,
}

impl Frame {
    /// Create a new frame.
    pub fn new(seq_id: SeqId, identifier: impl Into<String>, args: Option<Vec<Arg>>) -> Self {
        Self {
            seq_id,
            identifier: identifier.into(),
            args,
        }
    }

    /// A request expecting a response under `id`.
    pub fn request(id: u32, identifier: impl Into<String>, args: Vec<Arg>) -> Self {
        Self::new(SeqId::Id(id), identifier, non_empty(args))
    }

    /// A notification (`*` sequence id).
    pub fn notification(identifier: impl Into<String>, args: Vec<Arg>) -> Self {
        Self::new(SeqId::Notification, identifier, non_empty(args))
    }

    pub fn ok(id: u32) -> Self {
        Self::new(SeqId::Id(id), ResponseKind::Ok.as_str(), None)
    }

    pub fn result(id: u32, args: Vec<Arg>) -> Self {
        Self::new(SeqId::Id(id), ResponseKind::Result.as_str(), non_empty(args))
    }

    pub fn error(id: u32, message: impl Into<String>) -> Self {
        Self::new(
            SeqId::Id(id),
            ResponseKind::Error.as_str(),
            Some(vec![Arg::Str(message.into())]),
        )
    }

    /// True for `ok`, `result` and `error` frames.
    pub fn is_response(&self) -> bool {
        self.response_kind().is_some()
    }

    pub fn response_kind(&self) -> Option<ResponseKind> {
        ResponseKind::from_identifier(&self.identifier)
    }

    pub fn is_notification(&self) -> bool {
        self.seq_id.is_notification()
    }

    /// The arguments as a slice, empty when absent.
    pub fn args(&self) -> &[Arg] {
        self.args.as_deref().unwrap_or(&[])
    }

    /// Encode to the wire line, trailing newline included.
    pub fn encode(&self) -> Result<String> {
        if !is_valid_identifier(&self.identifier) {
            return Err(FrameError::InvalidIdentifier(self.identifier.clone()));
        }

        let mut line = format!("{}:{}", self.seq_id, self.identifier);
        for arg in self.args() {
            line.push(' ');
            arg.encode_into(&mut line)?;
        }
        line.push('\n');
        Ok(line)
    }
}

fn non_empty(args: Vec<Arg>) -> Option<Vec<Arg>> {
    if args.is_empty() {
        None
    } else {
        Some(args)
    }
}

/// Returns true if `c` may appear in a command identifier.
pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-')
}

/// Returns true if `identifier` matches `(alnum | "/" | "_" | "-")+`.
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.chars().all(is_identifier_char)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬───┬────────────┬──────────────────────┬────┐
/// │ seq | *  │ : │ identifier │ ( SP arg )*          │ \n │
/// └──────────┴───┴────────────┴──────────────────────┴────┘
/// ```
///
/// Nothing is appended to `dst` when encoding fails.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let line = frame.encode()?;
    dst.reserve(line.len());
    dst.put_slice(line.as_bytes());
    Ok(())
}

/// Decode one `\n`-terminated line into a frame.
pub fn decode_frame(line: &str) -> std::result::Result<Frame, ParseError> {
    parser::parse_frame(line)
}

/// Configuration for frame streams.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Longest accepted line in bytes; longer lines are dropped. Default: 4096.
    pub max_line_length: usize,
    /// Text encoding of the stream. Default: UTF-8.
    pub encoding: TextEncoding,
    /// Read timeout applied to the transport.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the transport.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            encoding: TextEncoding::default(),
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_bare_response() {
        assert_eq!(Frame::ok(0).encode().unwrap(), "0:ok\n");
    }

    #[test]
    fn encode_request_with_args() {
        let frame = Frame::request(
            12,
            "gpio/led/set",
            vec![Arg::from(true), Arg::from(3), Arg::from(2.0), Arg::from("on")],
        );
        assert_eq!(
            frame.encode().unwrap(),
            "12:gpio/led/set yes 3 2.0 \"on\"\n"
        );
    }

    #[test]
    fn encode_notification() {
        let frame = Frame::notification("gpio/my_gpio/value/change", vec![Arg::from(true)]);
        assert_eq!(frame.encode().unwrap(), "*:gpio/my_gpio/value/change yes\n");
    }

    #[test]
    fn empty_args_encode_without_trailing_space() {
        let frame = Frame::new(SeqId::Id(1), "hello", Some(Vec::new()));
        assert_eq!(frame.encode().unwrap(), "1:hello\n");
        assert_eq!(Frame::request(1, "hello", Vec::new()).args, None);
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        for identifier in ["", "has space", "has:colon", "new\nline"] {
            let frame = Frame::new(SeqId::Id(0), identifier, None);
            assert!(matches!(
                frame.encode(),
                Err(FrameError::InvalidIdentifier(_))
            ));
        }
    }

    #[test]
    fn failed_encode_leaves_buffer_untouched() {
        let mut buf = BytesMut::from(&b"1:ok\n"[..]);
        let frame = Frame::result(2, vec![Arg::Float(f64::NAN)]);
        assert!(encode_frame(&frame, &mut buf).is_err());
        assert_eq!(&buf[..], b"1:ok\n");
    }

    #[test]
    fn encode_frame_appends() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::ok(1), &mut buf).unwrap();
        encode_frame(&Frame::error(2, "bad state"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"1:ok\n2:error \"bad state\"\n");
    }

    #[test]
    fn response_predicates() {
        assert!(Frame::ok(0).is_response());
        assert_eq!(
            Frame::result(0, vec![]).response_kind(),
            Some(ResponseKind::Result)
        );
        assert_eq!(Frame::error(0, "x").response_kind(), Some(ResponseKind::Error));
        assert!(!Frame::request(0, "okay", vec![]).is_response());
        assert!(Frame::notification("ok", vec![]).is_notification());
    }

    #[test]
    fn roundtrip_preserves_frames() {
        let frames = [
            Frame::request(0, "hello", vec![]),
            Frame::notification("sensor/temp", vec![Arg::from(-12.25), Arg::from(-7)]),
            Frame::result(1023, vec![Arg::from("escaped \"quote\""), Arg::from(false)]),
            Frame::request(5, "path/with-dash_and_underscore", vec![Arg::from(r"a\b")]),
            Frame::error(9, "µ-controller says no"),
        ];
        for frame in frames {
            let line = frame.encode().unwrap();
            assert_eq!(decode_frame(&line).unwrap(), frame, "line: {line:?}");
        }
    }

    #[test]
    fn string_escaping_roundtrips() {
        for text in ["\"", "\"\"", "a\\\"b", "\\\\x", "quote at end\"", "tab\there"] {
            let frame = Frame::result(0, vec![Arg::from(text)]);
            let decoded = decode_frame(&frame.encode().unwrap()).unwrap();
            assert_eq!(decoded.args()[0].as_str(), Some(text));
        }
    }

    #[test]
    fn seq_id_display() {
        assert_eq!(SeqId::Notification.to_string(), "*");
        assert_eq!(SeqId::from(17).to_string(), "17");
        assert_eq!(SeqId::Id(3).id(), Some(3));
        assert_eq!(SeqId::Notification.id(), None);
    }
}
