use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use prpc_frame::{Arg, Frame, FrameWriter, TextEncoding};

use crate::error::Result;

type SharedWriter = Arc<Mutex<FrameWriter<Box<dyn Write + Send>>>>;

/// Serialized access to the write half of a handler's transport.
///
/// Clones share one writer, so frames from different threads never
/// interleave on the wire.
#[derive(Clone)]
pub struct FrameSender {
    writer: SharedWriter,
}

impl FrameSender {
    pub(crate) fn new<W: Write + Send + 'static>(inner: W, encoding: TextEncoding) -> Self {
        let boxed: Box<dyn Write + Send> = Box::new(inner);
        Self {
            writer: Arc::new(Mutex::new(
                FrameWriter::new(boxed).with_encoding(encoding),
            )),
        }
    }

    /// Write one frame and flush.
    pub fn send(&self, frame: &Frame) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_frame(frame)?;
        Ok(())
    }

    /// Answer request `seq_id` with `ok`.
    pub fn reply_ok(&self, seq_id: u32) -> Result<()> {
        self.send(&Frame::ok(seq_id))
    }

    /// Answer request `seq_id` with `result` and `args`.
    pub fn reply_result(&self, seq_id: u32, args: Vec<Arg>) -> Result<()> {
        self.send(&Frame::result(seq_id, args))
    }

    /// Answer request `seq_id` with `error` and a message.
    pub fn reply_error(&self, seq_id: u32, message: impl Into<String>) -> Result<()> {
        self.send(&Frame::error(seq_id, message))
    }

    /// Send a `*:` notification.
    pub fn notify(&self, identifier: &str, args: Vec<Arg>) -> Result<()> {
        self.send(&Frame::notification(identifier, args))
    }
}

impl std::fmt::Debug for FrameSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSender").finish_non_exhaustive()
    }
}

/// Receives every frame that is not a response (peer requests and
/// notifications).
///
/// Called on the reader thread; a slow implementation delays dispatch of
/// later responses. Nothing is acknowledged automatically: answer through
/// `sender` if the peer expects it.
pub trait InboundHandler: Send + Sync + 'static {
    fn on_inbound_frame(&self, frame: Frame, sender: &FrameSender);
}

impl<F> InboundHandler for F
where
    F: Fn(Frame, &FrameSender) + Send + Sync + 'static,
{
    fn on_inbound_frame(&self, frame: Frame, sender: &FrameSender) {
        self(frame, sender)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::thread;

    use super::*;

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn replies_use_response_identifiers() {
        let sink = Sink::default();
        let sender = FrameSender::new(sink.clone(), TextEncoding::Utf8);

        sender.reply_ok(3).unwrap();
        sender.reply_result(4, vec![Arg::Int(1), Arg::from("x")]).unwrap();
        sender.reply_error(5, "nope").unwrap();
        sender.notify("evt/boot", vec![]).unwrap();

        assert_eq!(
            sink.text(),
            "3:ok\n4:result 1 \"x\"\n5:error \"nope\"\n*:evt/boot\n"
        );
    }

    #[test]
    fn concurrent_senders_do_not_interleave() {
        let sink = Sink::default();
        let sender = FrameSender::new(sink.clone(), TextEncoding::Utf8);

        let workers: Vec<_> = (0..4u32)
            .map(|n| {
                let sender = sender.clone();
                thread::spawn(move || {
                    for i in 0..50u32 {
                        sender
                            .reply_result(n * 100 + i, vec![Arg::from("payload")])
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let text = sink.text();
        assert_eq!(text.lines().count(), 200);
        for line in text.lines() {
            assert!(line.ends_with(":result \"payload\""), "torn line: {line}");
        }
    }

    #[test]
    fn invalid_frame_is_rejected_before_writing() {
        let sink = Sink::default();
        let sender = FrameSender::new(sink.clone(), TextEncoding::Utf8);

        assert!(sender.notify("bad name", vec![]).is_err());
        assert!(sink.text().is_empty());
    }

    #[test]
    fn ascii_sender_refuses_non_ascii_replies() {
        let sink = Sink::default();
        let sender = FrameSender::new(sink.clone(), TextEncoding::Ascii);

        assert!(sender.reply_error(7, "température").is_err());
        sender.reply_error(8, "temperature").unwrap();
        assert_eq!(sink.text(), "8:error \"temperature\"\n");
    }

    #[test]
    fn closures_are_inbound_handlers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let seen = Arc::clone(&seen);
            move |frame: Frame, _sender: &FrameSender| seen.lock().unwrap().push(frame)
        };

        let sender = FrameSender::new(Sink::default(), TextEncoding::Utf8);
        handler.on_inbound_frame(Frame::notification("tick", vec![]), &sender);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
