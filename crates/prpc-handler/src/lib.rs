//! PRPC request/response correlation.
//!
//! [`IoHandler`] owns a transport, runs a background reader thread and
//! matches incoming `ok`/`result`/`error` frames to outstanding
//! [`Request`]s by sequence id. Sequence ids come from a fixed-capacity
//! [`IdPool`]; the pool and the registration table share one lock so an id
//! is never free while still registered.
//!
//! ```no_run
//! use prpc_frame::Arg;
//! use prpc_handler::IoHandler;
//! use prpc_transport::PrpcStream;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = PrpcStream::connect("/tmp/device.sock")?;
//! let handler = IoHandler::new(stream)?;
//! handler.start()?;
//!
//! let request = handler.req("gpio/led/set", [Arg::from(true)])?;
//! let reply = request.wait(Some(Duration::from_secs(1)))?;
//! println!("{reply:?}");
//!
//! handler.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod inbound;
pub mod pool;
pub mod registry;
pub mod request;

pub use error::{HandlerError, Result};
pub use handler::{HandlerConfig, IoHandler, DEFAULT_MAX_REQS};
pub use inbound::{FrameSender, InboundHandler};
pub use pool::{IdPool, PoolError};
pub use registry::{Registry, Resolution};
pub use request::{Request, RequestState};
