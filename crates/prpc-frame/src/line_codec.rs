//! `tokio_util::codec` adapter for PRPC lines.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig};
use crate::error::FrameError;
use crate::lines::LineBuffer;
use crate::writer::check_encoding;

/// Line-oriented PRPC codec for `FramedRead`/`FramedWrite`.
///
/// Malformed lines are logged and skipped rather than ending the stream.
#[derive(Debug)]
pub struct LineCodec {
    lines: LineBuffer,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            lines: LineBuffer::new(config.encoding, config.max_line_length),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if !src.is_empty() {
            let bytes = src.split();
            self.lines.push(&bytes);
        }

        while let Some(line) = self.lines.next_line() {
            match decode_frame(&line) {
                Ok(frame) => return Ok(Some(frame)),
                Err(error) => warn!(line = line.trim_end(), %error, "skipping malformed line"),
            }
        }
        Ok(None)
    }
}

impl Encoder<&Frame> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        let mut line = BytesMut::new();
        encode_frame(frame, &mut line)?;
        check_encoding(self.lines.encoding(), &line)?;
        dst.extend_from_slice(&line);
        Ok(())
    }
}

impl Encoder<Frame> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        Encoder::<&Frame>::encode(self, &frame, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::Arg;

    #[test]
    fn decodes_frames_across_chunks() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"0:result 4"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"2\n1:ok\n");
        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.args, Some(vec![Arg::Int(42)]));
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second, Frame::ok(1));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"nonsense\n*:tick\n"[..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(frame.is_notification());
    }

    #[test]
    fn encodes_owned_and_borrowed() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(&Frame::ok(0), &mut buf).unwrap();
        codec.encode(Frame::error(1, "bad state"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"0:ok\n1:error \"bad state\"\n");
    }

    #[test]
    fn ascii_codec_refuses_non_ascii_text() {
        let config = FrameConfig {
            encoding: crate::lines::TextEncoding::Ascii,
            ..FrameConfig::default()
        };
        let mut codec = LineCodec::with_config(&config);
        let mut buf = BytesMut::new();
        let err = codec
            .encode(Frame::notification("label", vec![Arg::from("café")]), &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedArgumentType(_)));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn framed_duplex_roundtrip() {
        use futures_util::{SinkExt, StreamExt};
        use tokio_util::codec::{FramedRead, FramedWrite};

        let (client, server) = tokio::io::duplex(64);
        let mut writer = FramedWrite::new(client, LineCodec::new());
        let mut reader = FramedRead::new(server, LineCodec::new());

        let request = Frame::request(1, "sensor/read", vec![Arg::from("temp")]);
        let reply = Frame::result(1, vec![Arg::Float(21.5)]);
        writer.send(request.clone()).await.expect("send request");
        writer.send(reply.clone()).await.expect("send reply");
        drop(writer);

        assert_eq!(reader.next().await.expect("frame").expect("valid"), request);
        assert_eq!(reader.next().await.expect("frame").expect("valid"), reply);
        assert!(reader.next().await.is_none());
    }
}
