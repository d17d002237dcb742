//! Byte-stream transport contract for PRPC.
//!
//! PRPC peers are reached over a single full-duplex byte stream: a serial
//! link, a Unix domain socket or a TCP connection. This crate defines the
//! [`Transport`] trait the rest of the stack is written against and ships
//! socket-backed implementations of it.
//!
//! This is the lowest layer of prpc. Everything else builds on top of
//! the [`Transport`] contract provided here.

pub mod error;
pub mod stream;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::PrpcStream;
pub use traits::{ReadOutcome, Transport};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
