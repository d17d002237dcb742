use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prpc_frame::{Frame, SeqId};
use prpc_handler::{FrameSender, InboundHandler, IoHandler};
use prpc_transport::{PrpcStream, TransportError, UnixDomainSocket};

use crate::cmd::ServeArgs;
use crate::exit::{handler_error, transport_error, CliError, CliResult, SUCCESS};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Answers requests the way a minimal device firmware would.
struct Simulator;

impl Simulator {
    fn reply(&self, seq_id: u32, frame: Frame, sender: &FrameSender) -> prpc_handler::Result<()> {
        match frame.identifier.as_str() {
            "ping" => sender.reply_ok(seq_id),
            "echo" => sender.reply_result(seq_id, frame.args.unwrap_or_default()),
            other => sender.reply_error(seq_id, format!("unknown command: {other}")),
        }
    }
}

impl InboundHandler for Simulator {
    fn on_inbound_frame(&self, frame: Frame, sender: &FrameSender) {
        let SeqId::Id(seq_id) = frame.seq_id else {
            tracing::info!(
                identifier = %frame.identifier,
                args = ?frame.args(),
                "notification received"
            );
            return;
        };

        tracing::info!(seq_id, identifier = %frame.identifier, "request received");
        if let Err(err) = self.reply(seq_id, frame, sender) {
            tracing::warn!(seq_id, error = %err, "failed sending reply");
        }
    }
}

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let listener =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| transport_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut sessions: Vec<IoHandler<PrpcStream>> = Vec::new();
    while running.load(Ordering::SeqCst) {
        sessions.retain(IoHandler::is_running);

        let stream = match listener.accept() {
            Ok(stream) => stream,
            Err(TransportError::Accept(err)) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
            Err(err) => return Err(transport_error("accept failed", err)),
        };

        let session = IoHandler::new(stream)
            .map_err(|err| handler_error("session setup failed", err))?
            .with_inbound_handler(Simulator);
        session
            .start()
            .map_err(|err| handler_error("session setup failed", err))?;
        tracing::info!(sessions = sessions.len() + 1, "client connected");
        sessions.push(session);
    }

    tracing::info!("shutting down");
    for session in &sessions {
        if let Err(err) = session.close() {
            tracing::warn!(error = %err, "session close failed");
        }
    }
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
