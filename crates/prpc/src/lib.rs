//! Line-oriented RPC for microcontrollers.
//!
//! PRPC speaks one text frame per line over any full-duplex byte stream
//! (serial link, Unix socket, TCP). Requests carry a sequence id that the
//! peer echoes in its `ok`, `result` or `error` reply.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream contract and socket transports
//! - [`frame`]: Frame grammar, encoder and line framing
//! - [`handler`]: Sequence-id pool and request/response correlation

/// Re-export transport types.
pub mod transport {
    pub use prpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use prpc_frame::*;
}

/// Re-export handler types.
pub mod handler {
    pub use prpc_handler::*;
}

pub use prpc_frame::{Arg, Frame, SeqId};
pub use prpc_handler::{HandlerConfig, HandlerError, IoHandler, Request};
