use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use prpc_frame::{Arg, Frame, ResponseKind};
use tracing::debug;

use crate::error::{HandlerError, Result};
use crate::registry::{Delivery, Registration, Registry};

/// Lifecycle of a [`Request`] as its owner observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Sent, no response yet.
    Pending,
    /// A response frame was received.
    Fulfilled,
    /// Aborted before a response arrived.
    Aborted,
    /// `wait` gave up; the registration has been aborted.
    TimedOut,
}

/// Handle to one outstanding request.
///
/// Dropping a pending request aborts it, returning its sequence id to the
/// pool.
pub struct Request {
    seq_id: u32,
    generation: u64,
    rx: Mutex<Receiver<Delivery>>,
    registry: Arc<Registry>,
    state: Mutex<RequestState>,
}

impl Request {
    pub(crate) fn new(registration: Registration, registry: Arc<Registry>) -> Self {
        Self {
            seq_id: registration.id,
            generation: registration.generation,
            rx: Mutex::new(registration.rx),
            registry,
            state: Mutex::new(RequestState::Pending),
        }
    }

    /// The sequence id this request was sent under.
    pub fn seq_id(&self) -> u32 {
        self.seq_id
    }

    pub fn state(&self) -> RequestState {
        *self.lock_state()
    }

    /// Block until the response arrives, the request is aborted or
    /// `timeout` elapses. `None` waits forever.
    ///
    /// `ok` yields an empty vector and `result` yields its arguments.
    /// An `error` reply becomes [`HandlerError::RequestFailed`] carrying the
    /// first argument as message. On timeout the request is aborted before
    /// [`HandlerError::RequestTimeout`] is returned.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Vec<Arg>> {
        let received = {
            let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
            match timeout {
                Some(limit) => rx.recv_timeout(limit),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            }
        };

        match received {
            Ok(Delivery::Frame(frame)) => {
                self.transition(RequestState::Fulfilled);
                interpret_response(frame)
            }
            Ok(Delivery::Aborted) | Err(RecvTimeoutError::Disconnected) => {
                self.transition(RequestState::Aborted);
                Err(HandlerError::RequestAborted)
            }
            Err(RecvTimeoutError::Timeout) => self.expire(timeout.unwrap_or_default()),
        }
    }

    /// Give up on the response after `limit`. A response delivered between
    /// the timeout and the cancel still wins.
    fn expire(&self, limit: Duration) -> Result<Vec<Arg>> {
        if !self.registry.cancel(self.seq_id, self.generation) {
            let late = self
                .rx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .try_recv();
            if let Ok(Delivery::Frame(frame)) = late {
                debug!(seq_id = self.seq_id, "response arrived as the wait expired");
                self.transition(RequestState::Fulfilled);
                return interpret_response(frame);
            }
        }
        self.transition(RequestState::TimedOut);
        debug!(seq_id = self.seq_id, ?limit, "request timed out");
        Err(HandlerError::RequestTimeout(limit))
    }

    /// Abort the request: wake any waiter and return the id to the pool.
    /// Calling it again, or after a response arrived, does nothing.
    pub fn abort(&self) {
        if self.registry.cancel(self.seq_id, self.generation) {
            self.transition(RequestState::Aborted);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: RequestState) {
        let mut state = self.lock_state();
        if *state == RequestState::Pending {
            *state = next;
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if self.state() == RequestState::Pending {
            self.registry.cancel(self.seq_id, self.generation);
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("seq_id", &self.seq_id)
            .field("state", &self.state())
            .finish()
    }
}

fn interpret_response(frame: Frame) -> Result<Vec<Arg>> {
    match frame.response_kind() {
        Some(ResponseKind::Ok) => Ok(Vec::new()),
        Some(ResponseKind::Result) => Ok(frame.args.unwrap_or_default()),
        Some(ResponseKind::Error) => {
            let message = match frame.args().first() {
                Some(Arg::Str(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Err(HandlerError::RequestFailed(message))
        }
        None => Err(HandlerError::UnexpectedResponse(frame.identifier)),
    }
}
