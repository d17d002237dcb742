use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use prpc_frame::{Arg, Frame, FrameConfig, FrameError, FrameReader, Incoming};
use prpc_transport::Transport;
use tracing::{debug, error, info, warn};

use crate::error::{HandlerError, Result};
use crate::inbound::{FrameSender, InboundHandler};
use crate::registry::{Registry, Resolution};
use crate::request::Request;

/// Default sequence-id pool capacity.
pub const DEFAULT_MAX_REQS: u32 = 1024;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handler configuration.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Number of requests that may be in flight at once. Default: 1024.
    pub max_reqs: u32,
    /// Line length, encoding and write timeout. The read timeout is
    /// replaced by `poll_interval`.
    pub frame: FrameConfig,
    /// How long one read may block before the reader re-checks the stop
    /// flag. Default: 100ms.
    pub poll_interval: Duration,
    /// How long `stop()` waits for the reader to exit. Default: 10s.
    pub join_timeout: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_reqs: DEFAULT_MAX_REQS,
            frame: FrameConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<()>,
    running: Arc<AtomicBool>,
}

/// Correlates PRPC requests and responses over one transport.
///
/// Any number of threads may call [`req`](Self::req) concurrently; a
/// single background reader (started with [`start`](Self::start)) routes
/// responses back to the waiting [`Request`]s and hands every other frame
/// to the configured [`InboundHandler`].
pub struct IoHandler<T: Transport> {
    transport: Mutex<T>,
    sender: FrameSender,
    registry: Arc<Registry>,
    config: HandlerConfig,
    inbound: Option<Arc<dyn InboundHandler>>,
    worker: Mutex<Option<Worker>>,
    running: Mutex<Arc<AtomicBool>>,
}

impl<T: Transport> IoHandler<T> {
    /// Create a stopped handler with default configuration.
    pub fn new(transport: T) -> Result<Self> {
        Self::with_config(transport, HandlerConfig::default())
    }

    /// Create a stopped handler.
    pub fn with_config(transport: T, config: HandlerConfig) -> Result<Self> {
        let writer = transport.try_clone_transport()?;
        writer.set_write_timeout(config.frame.write_timeout)?;

        Ok(Self {
            transport: Mutex::new(transport),
            sender: FrameSender::new(writer, config.frame.encoding),
            registry: Arc::new(Registry::new(config.max_reqs)),
            config,
            inbound: None,
            worker: Mutex::new(None),
            running: Mutex::new(Arc::new(AtomicBool::new(false))),
        })
    }

    /// Route non-response frames to `handler`. Takes effect on the next
    /// `start()`.
    pub fn with_inbound_handler(mut self, handler: impl InboundHandler) -> Self {
        self.inbound = Some(Arc::new(handler));
        self
    }

    /// Spawn the background reader.
    ///
    /// A previous reader that has already been told to stop (by `stop()`
    /// or a peer close) is joined first. If it is still busy after
    /// `join_timeout`, [`HandlerError::StopTimeout`] is returned and no new
    /// reader is spawned.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.lock_worker();
        if let Some(previous) = worker.take() {
            if previous.running.load(Ordering::Acquire) {
                *worker = Some(previous);
                return Err(HandlerError::AlreadyRunning);
            }
            self.join_reader(previous, &mut worker)?;
        }

        let half = self.lock_transport().try_clone_transport()?;
        let frame_config = FrameConfig {
            read_timeout: Some(self.config.poll_interval.max(MIN_POLL_INTERVAL)),
            ..self.config.frame.clone()
        };
        let reader = FrameReader::with_config(half, frame_config)?;

        let (done_tx, done_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let context = ReaderContext {
            registry: Arc::clone(&self.registry),
            sender: self.sender.clone(),
            inbound: self.inbound.clone(),
            running: Arc::clone(&running),
            backoff: self.config.poll_interval,
        };

        *self.lock_running() = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("prpc-reader".to_string())
            .spawn(move || context.run(reader, done_tx))
            .map_err(|err| {
                running.store(false, Ordering::Release);
                HandlerError::Spawn(err)
            })?;

        *worker = Some(Worker {
            handle,
            done: done_rx,
            running,
        });
        info!(max_reqs = self.registry.capacity(), "handler started");
        Ok(())
    }

    /// Stop the background reader and abort every outstanding request.
    ///
    /// Fails with [`HandlerError::StopTimeout`] if the reader does not exit
    /// within `join_timeout`; outstanding requests are aborted regardless.
    /// The late reader stays told to stop, and `stop()` or `start()` may be
    /// called again to wait for it.
    pub fn stop(&self) -> Result<()> {
        let mut worker = self.lock_worker();
        let current = worker.take().ok_or(HandlerError::NotRunning)?;
        current.running.store(false, Ordering::Release);

        let outcome = self.join_reader(current, &mut worker);
        drop(worker);

        let aborted = self.registry.abort_all();
        info!(aborted, "handler stopped");
        outcome
    }

    /// Wait for a reader whose stop flag is cleared. A reader still running
    /// after `join_timeout` is put back into `slot`.
    fn join_reader(&self, reader: Worker, slot: &mut Option<Worker>) -> Result<()> {
        match reader.done.recv_timeout(self.config.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match reader.handle.join() {
                Ok(()) => Ok(()),
                Err(_) => {
                    error!("reader thread panicked");
                    Err(HandlerError::ReaderPanicked)
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.config.join_timeout, "reader did not stop in time");
                *slot = Some(reader);
                Err(HandlerError::StopTimeout(self.config.join_timeout))
            }
        }
    }

    /// Stop the handler if it is running, then close the transport.
    pub fn close(&self) -> Result<()> {
        match self.stop() {
            Ok(()) | Err(HandlerError::NotRunning) => {}
            Err(err) => return Err(err),
        }
        self.lock_transport().close()?;
        Ok(())
    }

    /// Send a request and return its handle without waiting.
    ///
    /// The request is registered before its frame is written, so a fast
    /// reply cannot miss it. If encoding or writing fails, the id is
    /// released and the error returned; nothing partial reaches the wire
    /// for unencodable arguments.
    pub fn req<I>(&self, identifier: &str, args: I) -> Result<Request>
    where
        I: IntoIterator<Item = Arg>,
    {
        if !self.is_running() {
            return Err(HandlerError::NotRunning);
        }

        let args: Vec<Arg> = args.into_iter().collect();
        let registration = self.registry.register()?;
        let request = Request::new(registration, Arc::clone(&self.registry));

        let frame = Frame::request(request.seq_id(), identifier, args);
        self.sender.send(&frame)?;
        debug!(seq_id = request.seq_id(), identifier, "request sent");
        Ok(request)
    }

    /// `req` followed by `wait`.
    pub fn call<I>(&self, identifier: &str, args: I, timeout: Option<Duration>) -> Result<Vec<Arg>>
    where
        I: IntoIterator<Item = Arg>,
    {
        self.req(identifier, args)?.wait(timeout)
    }

    /// Send a `*:` notification. No sequence id is used and no reply is
    /// expected.
    pub fn notify<I>(&self, identifier: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = Arg>,
    {
        self.sender.notify(identifier, args.into_iter().collect())
    }

    /// A handle for writing frames to the peer, shared with `req`.
    pub fn sender(&self) -> FrameSender {
        self.sender.clone()
    }

    /// Requests waiting for a response.
    pub fn in_flight(&self) -> usize {
        self.registry.in_flight()
    }

    /// Sequence ids currently free.
    pub fn available_ids(&self) -> usize {
        self.registry.available()
    }

    pub fn capacity(&self) -> u32 {
        self.registry.capacity()
    }

    /// True while the reader is running. Turns false on `stop()` or when the
    /// peer closes the stream.
    pub fn is_running(&self) -> bool {
        self.lock_running().load(Ordering::Acquire)
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_running(&self) -> MutexGuard<'_, Arc<AtomicBool>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_transport(&self) -> MutexGuard<'_, T> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport> Drop for IoHandler<T> {
    fn drop(&mut self) {
        if self.lock_worker().is_some() {
            if let Err(err) = self.stop() {
                warn!(error = %err, "handler stop on drop failed");
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for IoHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoHandler")
            .field("running", &self.is_running())
            .field("capacity", &self.capacity())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

struct ReaderContext {
    registry: Arc<Registry>,
    sender: FrameSender,
    inbound: Option<Arc<dyn InboundHandler>>,
    running: Arc<AtomicBool>,
    backoff: Duration,
}

impl ReaderContext {
    fn run<T: Transport>(self, mut reader: FrameReader<T>, done: Sender<()>) {
        debug!("reader started");
        while self.running.load(Ordering::Acquire) {
            match reader.poll() {
                Ok(Incoming::Frame(frame)) => self.dispatch(frame),
                Ok(Incoming::Invalid { line, error }) => {
                    warn!(line = line.trim_end(), %error, "discarding malformed line");
                }
                Ok(Incoming::Idle) => {}
                Ok(Incoming::Closed) => {
                    info!("peer closed the stream");
                    break;
                }
                Err(FrameError::Transport(err)) if err.is_closed() => {
                    info!(error = %err, "transport closed");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "read failed");
                    thread::sleep(self.backoff);
                }
            }
        }

        self.running.store(false, Ordering::Release);
        let aborted = self.registry.abort_all();
        if aborted > 0 {
            info!(aborted, "aborted outstanding requests");
        }
        debug!("reader exited");
        let _ = done.send(());
    }

    fn dispatch(&self, frame: Frame) {
        if !frame.is_response() {
            match &self.inbound {
                Some(handler) => handler.on_inbound_frame(frame, &self.sender),
                None => warn!(
                    seq_id = %frame.seq_id,
                    identifier = %frame.identifier,
                    "unhandled inbound frame"
                ),
            }
            return;
        }

        match self.registry.deliver(frame) {
            Resolution::Delivered(id) => debug!(seq_id = id, "response delivered"),
            Resolution::NotificationId => warn!("response with notification id, ignored"),
            Resolution::OutOfRange(id) => warn!(
                seq_id = id,
                capacity = self.registry.capacity(),
                "response id out of range"
            ),
            Resolution::Unknown(id) => warn!(seq_id = id, "response for unknown id"),
        }
    }
}
